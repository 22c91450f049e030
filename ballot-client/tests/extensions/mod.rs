#![allow(dead_code)]

pub mod fake;

use slog::Logger;
use std::path::PathBuf;

use ballot_common::test_utils::{TempDir, TestLogger};

pub fn test_logger() -> Logger {
    TestLogger::stdout()
}

pub fn get_test_dir(subdir_name: &str) -> PathBuf {
    TempDir::create("ballot_client_integration", subdir_name)
}
