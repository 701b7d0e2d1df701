use crate::api::{ApiClient, Result};
use crate::screens::Notifier;
use crate::session::Profile;
use std::sync::Arc;
use tracing::{info, warn};

/// Display name and avatar editing
pub struct ProfileScreen {
    api: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
}

impl ProfileScreen {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Cached profile, empty before the first login
    #[must_use]
    pub fn profile(&self) -> Profile {
        self.api.session().profile().unwrap_or_default()
    }

    /// Set the display name.
    ///
    /// The name can be set once. Empty input and any edit after a name exists
    /// are ignored and return `Ok(false)`.
    pub async fn set_display_name(&self, input: &str) -> Result<bool> {
        let name = input.trim();
        let current = self.profile();
        if name.is_empty() || current.has_display_name() {
            return Ok(false);
        }

        let avatar = current.avatar().unwrap_or_default().to_string();
        self.push(name, &avatar).await?;

        let nick_name = name.to_string();
        self.api
            .with_session(move |s| s.update_profile(|p| p.nick_name = Some(nick_name)))
            .await?;
        info!("Display name set");
        Ok(true)
    }

    /// Replace the avatar; always allowed
    pub async fn set_avatar(&self, avatar_url: &str) -> Result<()> {
        let current = self.profile();
        let name = current.display_name().unwrap_or_default().to_string();
        self.push(&name, avatar_url).await?;

        let avatar = avatar_url.to_string();
        self.api
            .with_session(move |s| s.update_profile(|p| p.avatar_url = Some(avatar)))
            .await?;
        info!("Avatar updated");
        Ok(())
    }

    /// Forget the identity; the next authenticated call logs in again
    pub fn logout(&self) -> Result<()> {
        self.api.session().invalidate()?;
        Ok(())
    }

    async fn push(&self, nick_name: &str, avatar_url: &str) -> Result<()> {
        if let Err(e) = self.api.update_user_info(nick_name, avatar_url).await {
            warn!("Profile update failed: {}", e);
            self.notifier
                .toast(e.backend_message().unwrap_or("保存失败，请稍后重试"));
            return Err(e);
        }
        Ok(())
    }
}
