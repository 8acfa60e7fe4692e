//! Session boundary: who is logged in and which bearer token to attach.
//!
//! The dispatch engine and the history store hold an
//! `Arc<dyn SessionProvider>` and query it on every call, so a login or
//! logout takes effect on the very next request.

use std::sync::RwLock;

use crate::types::User;

/// Read-only view of the identity collaborator.
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn current_token(&self) -> Option<String>;
}

/// `(name, value)` of the bearer credential header, if a token is present.
pub fn bearer_header(token: Option<&str>) -> Option<(String, String)> {
    token
        .filter(|t| !t.is_empty())
        .map(|t| ("Authorization".to_string(), format!("Bearer {t}")))
}

#[derive(Debug, Clone)]
struct Credentials {
    user: User,
    token: String,
}

/// In-process session state driven by explicit `login` / `logout` calls.
#[derive(Debug, Default)]
pub struct Session {
    inner: RwLock<Option<Credentials>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&self, user: User, token: impl Into<String>) {
        tracing::debug!(user = %user.email, "session login");
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Credentials {
            user,
            token: token.into(),
        });
    }

    pub fn logout(&self) {
        tracing::debug!("session logout");
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl SessionProvider for Session {
    fn current_user(&self) -> Option<User> {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|c| c.user.clone())
    }

    fn current_token(&self) -> Option<String> {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .map(|c| c.token.clone())
            .filter(|t| !t.is_empty())
    }
}
