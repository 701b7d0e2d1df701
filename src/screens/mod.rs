//! Page-level orchestration: each screen owns its view state, calls the
//! backend through [`ApiClient`](crate::api::ApiClient), and reports back to
//! the user through a [`Notifier`].

pub mod format;
mod history;
mod notifier;
mod profile;
mod resolver;
mod rewards;
mod saver;


pub use history::{HistoryEntry, HistoryScreen, ParseStatus, decode_atlas};
pub use notifier::{ConsoleNotifier, Notice, Notifier, RecordingNotifier};
pub use profile::ProfileScreen;
pub use resolver::{
    DisplayMode, Resolution, ResolverScreen, ensure_https, extract_link, is_share_link,
    shorten_url,
};
pub use rewards::{RewardsScreen, RewardsView, SignInOutcome};
pub use saver::MediaSaver;
