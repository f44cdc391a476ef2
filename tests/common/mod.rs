//! Common test utilities for mirrorwatch integration and scenario tests.
//!
//! This module provides:
//! - `TestEnv`: isolated source, target, home and scratch directories plus a
//!   helper to run the CLI against them
//! - `LocalCopyMirror`: a [`Mirror`] built on `std::fs` so lifecycle tests do
//!   not depend on rsync being installed
//! - `wait_until`: polling helper for asynchronous assertions

#![allow(dead_code)]

pub mod env;
pub mod mirrors;

pub use env::*;
pub use mirrors::*;

use std::thread;
use std::time::{Duration, Instant};

/// Poll `condition` every 20ms until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}
