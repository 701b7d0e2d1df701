use std::fmt;

/// HTTP method an endpoint is called with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Backend endpoints consumed by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Exchange a platform login code for an identity token
    Auth,
    /// Fetch the profile plus streak/points summary
    Login,
    /// Promotional banner config
    InitConfig,
    /// Daily check-in
    SignIn,
    /// Persist avatar and display name
    UpdateUserInfo,
    /// Resolve a share link
    GetVideoInfo,
    /// Past resolution records
    GetParsingInfo,
    /// Supported platform names
    SupportedPlatforms,
    /// Service health
    Health,
}

impl Endpoint {
    /// Path suffix relative to the API base URL
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Auth => "wx/auth",
            Self::Login => "wx/login",
            Self::InitConfig => "wx/initConfig",
            Self::SignIn => "wx/signIn",
            Self::UpdateUserInfo => "wx/updateUserInfo",
            Self::GetVideoInfo => "video/getVideoInfo",
            Self::GetParsingInfo => "video/getParsingInfo",
            Self::SupportedPlatforms => "video/getSupportedPlatforms",
            Self::Health => "video/health",
        }
    }

    #[must_use]
    pub const fn method(self) -> Method {
        match self {
            Self::GetParsingInfo | Self::SupportedPlatforms | Self::Health => Method::Get,
            _ => Method::Post,
        }
    }

    /// Public endpoints never carry the identity token and never trigger a login.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(
            self,
            Self::Auth | Self::InitConfig | Self::Health | Self::SupportedPlatforms
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_allow_list() {
        assert!(Endpoint::Auth.is_public());
        assert!(Endpoint::InitConfig.is_public());
        assert!(Endpoint::Health.is_public());
        assert!(Endpoint::SupportedPlatforms.is_public());

        assert!(!Endpoint::Login.is_public());
        assert!(!Endpoint::SignIn.is_public());
        assert!(!Endpoint::UpdateUserInfo.is_public());
        assert!(!Endpoint::GetVideoInfo.is_public());
        assert!(!Endpoint::GetParsingInfo.is_public());
    }

    #[test]
    fn test_methods() {
        assert_eq!(Endpoint::GetParsingInfo.method(), Method::Get);
        assert_eq!(Endpoint::GetVideoInfo.method(), Method::Post);
        assert_eq!(Endpoint::SignIn.method(), Method::Post);
    }
}
