use serde::{Deserialize, Serialize};

/// Cached user profile plus the streak/points summary returned by `wx/login`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub open_id: Option<String>,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub sign_in_sum: Option<i64>,
    #[serde(default)]
    pub video_number: Option<i64>,
    #[serde(default)]
    pub continuous_sign_days: Option<i64>,
    #[serde(default)]
    pub last_sign_time: Option<String>,
    #[serde(default)]
    pub today_signin: Option<bool>,
}

impl Profile {
    /// Display name, if one has been set
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.nick_name.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// Whether the one-time display name has already been used
    #[must_use]
    pub fn has_display_name(&self) -> bool {
        self.display_name().is_some()
    }

    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar_url.as_deref().filter(|a| !a.is_empty())
    }
}
