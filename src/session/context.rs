use crate::session::{KeyValueStore, PROFILE_KEY, Profile, Result, TOKEN_KEY};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
struct SessionState {
    token: Option<String>,
    profile: Option<Profile>,
}

/// Identity token and cached profile, backed by a persistent store.
///
/// A session is established by the first successful login handshake and
/// invalidated by an explicit logout or by the backend rejecting the token.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
}

impl Session {
    /// Load whatever a previous run left in `store`
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let token = store
            .get(TOKEN_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|t| !t.is_empty());

        let profile = store.get(PROFILE_KEY).and_then(|v| {
            serde_json::from_value::<Profile>(v)
                .map_err(|e| warn!("Discarding unreadable cached profile: {}", e))
                .ok()
        });

        debug!(
            "Session loaded (token cached: {}, profile cached: {})",
            token.is_some(),
            profile.is_some()
        );

        Self {
            store,
            state: RwLock::new(SessionState { token, profile }),
        }
    }

    /// Session with nothing cached and nothing persisted
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::load(Arc::new(crate::session::MemoryStore::new()))
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.state.read().profile.clone()
    }

    #[must_use]
    pub fn is_established(&self) -> bool {
        self.state.read().token.is_some()
    }

    /// Cache the token and profile from a completed handshake
    pub fn establish(&self, token: &str, profile: Profile) -> Result<()> {
        self.store.set(TOKEN_KEY, Value::String(token.to_string()))?;
        self.store.set(PROFILE_KEY, serde_json::to_value(&profile)?)?;

        let mut state = self.state.write();
        state.token = Some(token.to_string());
        state.profile = Some(profile);

        info!("Session established");
        Ok(())
    }

    /// Replace the cached profile, keeping the token
    pub fn store_profile(&self, profile: Profile) -> Result<()> {
        self.store.set(PROFILE_KEY, serde_json::to_value(&profile)?)?;
        self.state.write().profile = Some(profile);
        Ok(())
    }

    /// Apply an edit to the cached profile and persist it
    pub fn update_profile(&self, edit: impl FnOnce(&mut Profile)) -> Result<Profile> {
        let mut profile = self.profile().unwrap_or_default();
        edit(&mut profile);
        self.store_profile(profile.clone())?;
        Ok(profile)
    }

    /// Drop the token and profile, in memory and on disk
    pub fn invalidate(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(PROFILE_KEY)?;
        *self.state.write() = SessionState::default();

        info!("Session invalidated");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("established", &self.is_established())
            .finish_non_exhaustive()
    }
}
