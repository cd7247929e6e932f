//! Process-wide login session.
//!
//! The token and user are kept in a [`SessionStore`] so that a restarted
//! client can pick them up again. [`Session::init`] reads whatever was
//! persisted and [`Session::end`] wipes it; nothing else touches the store.

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use payloads::{SharedToken, responses::UserInfo};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Could not access the session file")]
    Io(#[from] std::io::Error),
    #[error("The session file is corrupt")]
    Format(#[from] serde_json::Error),
}

/// A logged in user together with the bearer token the backend issued.
#[derive(Debug)]
pub struct StoredSession {
    pub token: SecretString,
    pub user: UserInfo,
}

/// Where a [`Session`] persists itself.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, SessionError>;
    fn save(&self, session: &StoredSession) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Serialized form; the token only leaves its secret wrapper here.
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    user: UserInfo,
}

impl From<&StoredSession> for PersistedSession {
    fn from(session: &StoredSession) -> Self {
        Self {
            token: session.token.expose_secret().to_string(),
            user: session.user.clone(),
        }
    }
}

impl From<PersistedSession> for StoredSession {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            token: SecretString::from(persisted.token),
            user: persisted.user,
        }
    }
}

/// Keeps the session for the lifetime of the process only.
#[derive(Default)]
pub struct MemorySessionStore {
    saved: Mutex<Option<PersistedSession>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(saved.as_ref().map(|persisted| StoredSession {
            token: SecretString::from(persisted.token.clone()),
            user: persisted.user.clone(),
        }))
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(session.into());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Keeps the session in a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let persisted: PersistedSession = serde_json::from_str(&contents)?;
        Ok(Some(persisted.into()))
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(&PersistedSession::from(session))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// The current login, shared with every [`APIClient`](payloads::APIClient)
/// built on the same [`SharedToken`].
pub struct Session {
    store: Arc<dyn SessionStore>,
    token: SharedToken,
    user: RwLock<Option<UserInfo>>,
}

impl Session {
    /// Restore a persisted session, if there is one, and publish its token.
    pub fn init(
        store: Arc<dyn SessionStore>,
        token: SharedToken,
    ) -> Result<Self, SessionError> {
        let user = match store.load()? {
            Some(StoredSession { token: secret, user }) => {
                tracing::info!(user_id = %user.id, "restored session");
                token.set(secret);
                Some(user)
            }
            None => {
                token.clear();
                None
            }
        };
        Ok(Self {
            store,
            token,
            user: RwLock::new(user),
        })
    }

    pub fn establish(
        &self,
        token: SecretString,
        user: UserInfo,
    ) -> Result<(), SessionError> {
        let session = StoredSession { token, user };
        self.store.save(&session)?;
        *self.user.write().unwrap_or_else(PoisonError::into_inner) =
            Some(session.user);
        self.token.set(session.token);
        Ok(())
    }

    /// Log out locally. The in-memory state is cleared even when the store
    /// cannot be.
    pub fn end(&self) -> Result<(), SessionError> {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.token.clear();
        self.store.clear()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_set()
    }
}
