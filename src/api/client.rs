use crate::api::{
    ApiError, Endpoint, Envelope, HistoryPage, HttpClient, InitConfig, PlatformList,
    Method, ResolvedMedia, Result, SignInData,
};
use crate::session::{self, PlatformLogin, Profile, Session};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Request parameter carrying the identity token
const TOKEN_PARAM: &str = "openId";

/// Backend client that resolves the identity token before any authenticated
/// call.
///
/// Public endpoints go straight out. Everything else needs a cached token; if
/// none is cached, the login handshake runs first and the original request is
/// only sent once it has succeeded.
pub struct ApiClient {
    http: HttpClient,
    session: Arc<Session>,
    login: Arc<dyn PlatformLogin>,
    handshake: Mutex<()>,
}

impl ApiClient {
    #[must_use]
    pub fn new(http: HttpClient, session: Arc<Session>, login: Arc<dyn PlatformLogin>) -> Self {
        Self {
            http,
            session,
            login,
            handshake: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub const fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Call an endpoint, injecting the identity token when it is not public
    pub async fn call(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> Result<Envelope> {
        if endpoint.is_public() {
            return self.send(endpoint, params).await;
        }

        let token = self.ensure_token().await?;
        let mut authed = params.to_vec();
        authed.push((TOKEN_PARAM, token.as_str()));

        match self.send(endpoint, &authed).await {
            Err(ApiError::Unauthorized) => {
                warn!("Backend rejected the identity token on {}", endpoint);
                self.with_session(Session::invalidate).await?;
                Err(ApiError::Unauthorized)
            }
            other => other,
        }
    }

    /// Return the cached token, running the login handshake when there is none
    pub async fn ensure_token(&self) -> Result<String> {
        self.acquire_token().await.map(|(token, _)| token)
    }

    /// Like [`Self::ensure_token`], plus the profile when this call ran the
    /// handshake itself
    async fn acquire_token(&self) -> Result<(String, Option<Profile>)> {
        if let Some(token) = self.session.token() {
            return Ok((token, None));
        }

        let _guard = self.handshake.lock().await;

        // Another caller may have finished the handshake while we waited
        if let Some(token) = self.session.token() {
            return Ok((token, None));
        }

        self.handshake()
            .await
            .map(|(token, profile)| (token, Some(profile)))
            .map_err(|e| {
                error!("Login handshake failed: {}", e);
                ApiError::LoginFailed(e.to_string())
            })
    }

    async fn handshake(&self) -> Result<(String, Profile)> {
        info!("No cached identity, starting login handshake");

        let code = self.login.login_code().await?;

        let token: String = self
            .send(Endpoint::Auth, &[("js_code", code.as_str())])
            .await?
            .into_data()?;

        if token.trim().is_empty() {
            return Err(ApiError::Parse("backend returned an empty token".to_string()));
        }

        let profile: Option<Profile> = self
            .send(Endpoint::Login, &[(TOKEN_PARAM, token.as_str())])
            .await?
            .into_data()?;
        let profile = profile.unwrap_or_default();

        let (stored_token, stored_profile) = (token.clone(), profile.clone());
        self.with_session(move |s| s.establish(&stored_token, stored_profile))
            .await?;

        Ok((token, profile))
    }

    /// Run a session write on the blocking pool, since the store flushes to
    /// disk synchronously
    pub async fn with_session<T, F>(&self, write: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Session) -> session::Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        let written = tokio::task::spawn_blocking(move || write(&session)).await?;
        Ok(written?)
    }

    async fn send(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> Result<Envelope> {
        debug!("Calling {} with {} params", endpoint, params.len());

        match endpoint.method() {
            Method::Get => self.http.get_with_params(endpoint.path(), params).await,
            Method::Post => self.http.post_form(endpoint.path(), params).await,
        }
    }

    /// Promotional banner config
    pub async fn init_config(&self) -> Result<InitConfig> {
        let config: Option<InitConfig> = self.call(Endpoint::InitConfig, &[]).await?.into_data()?;
        Ok(config.unwrap_or_default())
    }

    /// Refresh the profile and streak summary, mirroring it into the session
    pub async fn login_summary(&self) -> Result<Profile> {
        // A cold session already fetched the summary during the handshake
        if let (_, Some(profile)) = self.acquire_token().await? {
            return Ok(profile);
        }

        let profile: Option<Profile> = self.call(Endpoint::Login, &[]).await?.into_data()?;
        let profile = profile.unwrap_or_default();
        let stored = profile.clone();
        self.with_session(move |s| s.store_profile(stored)).await?;
        Ok(profile)
    }

    /// Daily check-in
    pub async fn sign_in(&self) -> Result<SignInData> {
        let data: Option<SignInData> = self.call(Endpoint::SignIn, &[]).await?.into_data()?;
        Ok(data.unwrap_or_default())
    }

    /// Persist display name and avatar
    pub async fn update_user_info(&self, nick_name: &str, avatar_url: &str) -> Result<()> {
        let _: Value = self
            .call(
                Endpoint::UpdateUserInfo,
                &[("nickName", nick_name), ("avatarUrl", avatar_url)],
            )
            .await?
            .into_data()?;
        Ok(())
    }

    /// Resolve a share link into media URLs
    pub async fn resolve_link(&self, url: &str) -> Result<ResolvedMedia> {
        let media: Option<ResolvedMedia> = self
            .call(Endpoint::GetVideoInfo, &[("url", url)])
            .await?
            .into_data()?;
        Ok(media.unwrap_or_default())
    }

    /// Past resolution records
    pub async fn history(&self) -> Result<HistoryPage> {
        let page: Option<HistoryPage> = self.call(Endpoint::GetParsingInfo, &[]).await?.into_data()?;
        Ok(page.unwrap_or_default())
    }

    pub async fn supported_platforms(&self) -> Result<PlatformList> {
        let list: Option<PlatformList> = self
            .call(Endpoint::SupportedPlatforms, &[])
            .await?
            .into_data()?;
        Ok(list.unwrap_or_default())
    }

    pub async fn health(&self) -> Result<Value> {
        self.call(Endpoint::Health, &[]).await?.into_data()
    }
}
