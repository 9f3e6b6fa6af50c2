//! Diagnostic sink injected into the trie, kept separate from the `debug`
//! option bit (see [`crate::options::Options`]): options is data the engine
//! reads, the logger is where diagnostics go.

/// Severity of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
    Data,
}

/// A diagnostic sink. Implementations must be safe to call from anywhere in
/// the single-threaded estimation/mixing/pruning passes; the engine never
/// holds the sink across a call back into itself.
pub trait Logger {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }
    fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
    fn data(&self, message: &str) {
        self.log(Level::Data, message);
    }
}

/// Discards everything. The default sink when the `debug` option bit is unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Writes to stderr, prefixed with the severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn log(&self, level: Level, message: &str) {
        let tag = match level {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Data => "data",
        };
        eprintln!("[{tag}] {message}");
    }
}

/// Forwards to the `log` facade, so `RUST_LOG` controls verbosity the same
/// way it does for the rest of a binary built on this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeLogger;

impl Logger for FacadeLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Info => log::info!("{message}"),
            Level::Warning => log::warn!("{message}"),
            Level::Error => log::error!("{message}"),
            Level::Data => log::debug!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingLogger {
        lines: RefCell<Vec<(Level, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: Level, message: &str) {
            self.lines.borrow_mut().push((level, message.to_string()));
        }
    }

    #[test]
    fn default_methods_forward_the_right_level() {
        let logger = RecordingLogger { lines: RefCell::new(Vec::new()) };
        logger.info("a");
        logger.warning("b");
        logger.error("c");
        logger.data("d");
        let lines = logger.lines.borrow();
        assert_eq!(lines[0], (Level::Info, "a".to_string()));
        assert_eq!(lines[1], (Level::Warning, "b".to_string()));
        assert_eq!(lines[2], (Level::Error, "c".to_string()));
        assert_eq!(lines[3], (Level::Data, "d".to_string()));
    }

    #[test]
    fn null_logger_does_not_panic() {
        let logger = NullLogger;
        logger.info("ignored");
    }
}
