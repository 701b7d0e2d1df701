mod client;
mod endpoints;
mod http;
mod types;


pub use client::ApiClient;
pub use endpoints::{Endpoint, Method};
pub use http::{Envelope, HttpClient};
pub use types::{
    HistoryPage, HistoryRecord, InitConfig, PlatformIcon, PlatformList, ResolvedMedia, SignInData,
};

use crate::session::SessionError;

/// Backend API result type
pub type Result<T> = std::result::Result<T, ApiError>;

/// Backend API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Identity token rejected by backend")]
    Unauthorized,

    #[error("Backend error: {status} - {message}")]
    Business { status: i64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("登录失败，请重试 ({0})")]
    LoginFailed(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Session write interrupted: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// Message the backend attached to a business error, if any
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Business { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Whether the request never produced a backend answer
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http { .. })
    }
}
