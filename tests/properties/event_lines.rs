//! Property tests for inotifywait line parsing.

use std::path::PathBuf;

use proptest::prelude::*;

use mirrorwatch::ChangeEvent;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: parsing never panics on arbitrary input.
    #[test]
    fn property_parse_never_panics(line in "(?s).{0,256}") {
        let _ = ChangeEvent::parse_line(&line);
    }

    /// PROPERTY: everything after the first space is the path, spaces included.
    #[test]
    fn property_path_survives_parsing(
        flags in prop::sample::select(vec![
            "MODIFY",
            "CREATE,ISDIR",
            "CLOSE_WRITE,CLOSE",
            "MOVED_TO",
            "DELETE",
        ]),
        path in "/[A-Za-z0-9 ._/-]{1,64}",
    ) {
        let event = ChangeEvent::parse_line(&format!("{} {}", flags, path)).unwrap();
        prop_assert_eq!(event.path, PathBuf::from(path));
    }
}
