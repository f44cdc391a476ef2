//! Delete confirmation
//!
//! Before the initial sync the user is shown the target paths that no
//! longer exist in the source and asked whether to delete them.

use std::io::{self, BufRead, Write};

/// Answer to the delete confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Delete the stale paths
    Yes,
    /// Keep them and carry on
    No,
    /// Exit immediately
    Quit,
}

impl Answer {
    /// Case-insensitive; `None` for anything unrecognised.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" | "yep" | "yeah" | "sure" => Some(Answer::Yes),
            "n" | "no" | "nope" | "nah" => Some(Answer::No),
            "q" | "quit" | "exit" | "abort" => Some(Answer::Quit),
            _ => None,
        }
    }
}

/// Print `paths` and ask until a valid answer is given.
///
/// End of input counts as [`Answer::No`].
pub fn confirm_deletions<R: BufRead, W: Write>(
    paths: &[String],
    input: &mut R,
    output: &mut W,
) -> io::Result<Answer> {
    writeln!(output)?;
    writeln!(
        output,
        "These {} path(s) exist on the target but not in the source:",
        paths.len()
    )?;
    for path in paths {
        writeln!(output, "  {}", path)?;
    }

    loop {
        write!(output, "Delete them from the target? [y]es / [n]o / [q]uit: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(Answer::No);
        }

        match Answer::parse(&line) {
            Some(answer) => return Ok(answer),
            None => writeln!(output, "Please answer yes, no or quit.")?,
        }
    }
}
