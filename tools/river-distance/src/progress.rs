use indicatif::{ProgressBar, ProgressStyle};
use river_distance_core::prelude::Feedback;
use std::time::Duration;

/// Shows the current pipeline phase on a spinner
pub struct SpinnerFeedback {
    pb: ProgressBar,
}

impl SpinnerFeedback {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(&self, message: String) {
        self.pb.finish_with_message(message);
    }
}

impl Feedback for SpinnerFeedback {
    fn push_info(&self, message: &str) {
        log::debug!("{}", message);
        self.pb.set_message(message.to_string());
    }

    fn report_error(&self, message: &str) {
        self.pb.abandon_with_message(format!("Error: {}", message));
        log::error!("{}", message);
    }

    fn is_canceled(&self) -> bool {
        // No interactive cancellation from the command line
        false
    }
}
