use parking_lot::Mutex;
use tracing::{info, warn};

/// Toasts and modals shown to the user
pub trait Notifier: Send + Sync {
    /// Short transient message
    fn toast(&self, message: &str);

    /// Blocking modal offering to open the system settings
    fn settings_modal(&self, title: &str, content: &str);
}

/// Writes notifications to stderr and the log
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    settings_hint: Option<String>,
}

impl ConsoleNotifier {
    /// `settings_hint` is printed under permission modals, pointing the user at
    /// whatever they have to change
    #[must_use]
    pub fn new(settings_hint: Option<String>) -> Self {
        Self { settings_hint }
    }
}

impl Notifier for ConsoleNotifier {
    fn toast(&self, message: &str) {
        info!(target: "nomark::toast", "{}", message);
        eprintln!("{message}");
    }

    fn settings_modal(&self, title: &str, content: &str) {
        warn!(target: "nomark::modal", "{}: {}", title, content);
        eprintln!("[{title}] {content}");
        if let Some(hint) = &self.settings_hint {
            eprintln!("  -> {hint}");
        }
    }
}

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Toast(String),
    Modal { title: String, content: String },
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Toast messages only, in order
    #[must_use]
    pub fn toasts(&self) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Toast(m) => Some(m.clone()),
                Notice::Modal { .. } => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, message: &str) {
        self.notices.lock().push(Notice::Toast(message.to_string()));
    }

    fn settings_modal(&self, title: &str, content: &str) {
        self.notices.lock().push(Notice::Modal {
            title: title.to_string(),
            content: content.to_string(),
        });
    }
}
