//! Client for a short-video watermark removal backend.
//!
//! Paste a share link, let the backend resolve it to media URLs, then save
//! the video (with progress and cancellation) or every image of an atlas to
//! a local album. Also covers the history, daily check-in and profile pages.

pub mod api;
pub mod config;
pub mod logging;
pub mod media;
pub mod screens;
pub mod session;

pub use api::{ApiClient, ApiError, HttpClient};
pub use config::AppConfig;
pub use media::{AlbumDir, HttpFetcher, MediaError};
pub use screens::{ConsoleNotifier, MediaSaver, Notifier};
pub use session::{DeviceLogin, FileStore, Session};
