mod context;
mod login;
mod profile;
mod store;


pub use context::Session;
pub use login::{DeviceLogin, PlatformLogin};
pub use profile::Profile;
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Storage key holding the identity token
pub const TOKEN_KEY: &str = "identity_token";
/// Storage key holding the cached profile
pub const PROFILE_KEY: &str = "profile";

/// Session result type
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session and local storage errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Platform login failed: {0}")]
    LoginCode(String),
}
