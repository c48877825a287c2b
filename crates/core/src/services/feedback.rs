use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::traits::Feedback;

/// Feedback through the `log` facade, with a settable cancel flag.
#[derive(Debug, Default)]
pub struct LogFeedback {
    canceled: AtomicBool,
}

impl LogFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The pipeline stops at its next check.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

impl Feedback for LogFeedback {
    fn push_info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn report_error(&self, message: &str) {
        log::error!("{}", message);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}
