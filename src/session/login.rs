use crate::session::{Result, SessionError};
use async_trait::async_trait;

/// Issues the one-shot platform login code that the backend exchanges for an
/// identity token
#[async_trait]
pub trait PlatformLogin: Send + Sync {
    async fn login_code(&self) -> Result<String>;
}

/// Login code source for a plain device: a configured code, or a fresh random
/// one per handshake
#[derive(Debug, Clone, Default)]
pub struct DeviceLogin {
    code: Option<String>,
}

impl DeviceLogin {
    #[must_use]
    pub fn new(code: Option<String>) -> Self {
        Self { code }
    }
}

#[async_trait]
impl PlatformLogin for DeviceLogin {
    async fn login_code(&self) -> Result<String> {
        match &self.code {
            Some(code) if code.trim().is_empty() => {
                Err(SessionError::LoginCode("configured login code is empty".to_string()))
            }
            Some(code) => Ok(code.trim().to_string()),
            None => Ok(uuid::Uuid::new_v4().simple().to_string()),
        }
    }
}
