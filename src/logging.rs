use std::cell::RefCell;
use std::rc::Rc;

/// Debug sink handed to a session instead of a process-wide logger.
pub trait SessionLogger {
    fn debug(&self, message: &str);
}

/// Forwards session events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl SessionLogger for LogFacade {
    fn debug(&self, message: &str) {
        log::debug!(target: "flashquiz::session", "{message}");
    }
}

/// Keeps messages in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl SessionLogger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.lines.borrow_mut().push(message.to_string());
    }
}

/// The configured logger, or none when debug logging is off.
pub fn session_logger(enabled: bool) -> Option<Box<dyn SessionLogger>> {
    if enabled {
        Some(Box::new(LogFacade))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_logger_flag() {
        assert!(session_logger(false).is_none());
        let logger = session_logger(true).unwrap();
        logger.debug("does not panic without an installed logger");
    }

    #[test]
    fn test_memory_logger_shares_buffer() {
        let logger = MemoryLogger::new();
        let handle = logger.clone();
        logger.debug("first");
        logger.debug("second");
        assert_eq!(handle.lines(), vec!["first", "second"]);
    }
}
