//! Test utilities
//!
//! They contain:
//! * A [TestLogger] writing to stdout or to a file
//! * A [TempDir] builder
//! * Some [fake data][fake_data] builders

pub mod fake_data;
mod temp_dir;

pub use temp_dir::TempDir;

use slog::{Drain, Logger};
use slog_async::Async;
use slog_term::{CompactFormat, PlainDecorator};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Logger builder for tests
pub struct TestLogger;

impl TestLogger {
    fn from_writer<W: io::Write + Send + 'static>(writer: W) -> Logger {
        let decorator = PlainDecorator::new(writer);
        let drain = CompactFormat::new(decorator).build().fuse();
        let drain = Async::new(drain).build().fuse();
        Logger::root(Arc::new(drain), slog::o!())
    }

    /// Logger that writes its output to stdout, captured by the test harness.
    pub fn stdout() -> Logger {
        Self::from_writer(slog_term::TestStdoutWriter)
    }

    /// Logger that writes its output to the given file.
    ///
    /// The file is flushed when the last clone of the logger is dropped.
    pub fn file(filepath: &Path) -> Logger {
        let file = std::fs::File::create(filepath)
            .unwrap_or_else(|e| panic!("Could not create log file {filepath:?}: {e}"));
        Self::from_writer(file)
    }
}
