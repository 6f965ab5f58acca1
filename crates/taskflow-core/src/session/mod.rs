//! Session lifecycle: anonymous ⇄ authenticated.
//!
//! [`SessionManager`] is the only owner of the credential. Every request that
//! needs it asks [`SessionManager::authorize`], and every continuation checks
//! [`SessionManager::is_current`] before touching shared state again.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::models::{Credential, UserProfile};
use crate::storage::{KeyValueStore, StorageResult, CREDENTIAL_KEY, PROFILE_KEY};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    UserLogout,
    Expired,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated {
        credential: Credential,
        profile: UserProfile,
    },
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { profile, .. } => Some(profile),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    /// Bumped whenever the session starts or ends.
    generation: u64,
}

pub struct SessionManager {
    store: Box<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl SessionManager {
    pub fn new(store: impl KeyValueStore) -> Self {
        Self {
            store: Box::new(store),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Load a persisted session, if a complete and well-formed one exists.
    ///
    /// Anything partial or unparsable is wiped and treated as absent.
    pub fn restore(&self) -> SessionState {
        let mut inner = self.inner.lock();
        match self.read_stored() {
            Some((credential, profile)) => {
                let continuing = inner
                    .state
                    .profile()
                    .is_some_and(|current| current.same_identity(&profile));
                tracing::info!("Restored session for {}", profile.username);
                inner.state = SessionState::Authenticated {
                    credential,
                    profile,
                };
                if !continuing {
                    inner.generation = inner.generation.wrapping_add(1);
                }
            }
            None => {
                if let Err(error) = self.clear_stored() {
                    tracing::warn!("Failed to clear persisted session: {}", error);
                }
                if inner.state.is_authenticated() {
                    inner.generation = inner.generation.wrapping_add(1);
                }
                inner.state = SessionState::Anonymous;
            }
        }
        inner.state.clone()
    }

    /// Persist and adopt a session granted by a successful register/login.
    pub fn establish(&self, credential: Credential, profile: UserProfile) -> Result<()> {
        if !credential.is_well_formed() {
            return Err(Error::Validation("Credential must not be empty".to_string()));
        }

        let mut inner = self.inner.lock();
        if let SessionState::Authenticated {
            profile: current, ..
        } = &inner.state
        {
            if !current.same_identity(&profile) {
                return Err(Error::InvariantViolation(format!(
                    "already signed in as '{}'; log out before signing in as '{}'",
                    current.username, profile.username
                )));
            }
        }

        let raw_profile = serde_json::to_string(&profile)
            .map_err(|error| Error::InvariantViolation(error.to_string()))?;
        if let Err(error) = self.write_stored(&credential, &raw_profile) {
            if let Err(cleanup) = self.clear_stored() {
                tracing::warn!("Failed to clear partially written session: {}", cleanup);
            }
            return Err(error.into());
        }

        // Same identity signing in again only swaps the credential; requests
        // in flight still belong to this session.
        let entering = !inner.state.is_authenticated();
        tracing::info!("Session established for {}", profile.username);
        inner.state = SessionState::Authenticated {
            credential,
            profile,
        };
        if entering {
            inner.generation = inner.generation.wrapping_add(1);
        }
        Ok(())
    }

    /// End the current session. Returns `None` when already anonymous.
    pub fn terminate(&self, reason: Termination) -> Option<Termination> {
        let mut inner = self.inner.lock();
        if !inner.state.is_authenticated() {
            return None;
        }

        if let Err(error) = self.clear_stored() {
            tracing::warn!("Failed to clear persisted session: {}", error);
        }
        inner.state = SessionState::Anonymous;
        inner.generation = inner.generation.wrapping_add(1);
        tracing::info!("Session terminated ({:?})", reason);
        Some(reason)
    }

    /// Current bearer credential.
    pub fn credential_for(&self) -> Result<Credential> {
        self.authorize().map(|(credential, _)| credential)
    }

    /// Credential plus the generation it belongs to, read atomically.
    pub fn authorize(&self) -> Result<(Credential, u64)> {
        let inner = self.inner.lock();
        match &inner.state {
            SessionState::Authenticated { credential, .. } => {
                Ok((credential.clone(), inner.generation))
            }
            SessionState::Anonymous => Err(Error::NotAuthenticated),
        }
    }

    /// Whether a continuation started under `generation` may still apply.
    pub fn is_current(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        inner.state.is_authenticated() && inner.generation == generation
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.lock().state.profile().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().state.is_authenticated()
    }

    fn read_stored(&self) -> Option<(Credential, UserProfile)> {
        let token = match self.store.get(CREDENTIAL_KEY) {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!("Failed to read persisted credential: {}", error);
                return None;
            }
        };
        let raw_profile = match self.store.get(PROFILE_KEY) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!("Failed to read persisted profile: {}", error);
                return None;
            }
        };
        let (Some(token), Some(raw_profile)) = (token, raw_profile) else {
            return None;
        };

        let credential = Credential::new(token);
        if !credential.is_well_formed() {
            return None;
        }
        match serde_json::from_str::<UserProfile>(&raw_profile) {
            Ok(profile) => Some((credential, profile)),
            Err(error) => {
                tracing::warn!("Discarding malformed persisted profile: {}", error);
                None
            }
        }
    }

    fn write_stored(&self, credential: &Credential, raw_profile: &str) -> StorageResult<()> {
        self.store.set(CREDENTIAL_KEY, credential.expose())?;
        self.store.set(PROFILE_KEY, raw_profile)
    }

    fn clear_stored(&self) -> StorageResult<()> {
        let credential = self.store.remove(CREDENTIAL_KEY);
        let profile = self.store.remove(PROFILE_KEY);
        credential.and(profile)
    }
}
