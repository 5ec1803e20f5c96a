//! Token provider implementations
//!
//! The bearer token is injected into the clients that need it instead of
//! living in a process-wide holder.

use std::sync::{Arc, RwLock};

use crate::traits::TokenProvider;

/// Fixed token, e.g. read once from the environment
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Settable token shared between the login flow and the clients using it.
/// Clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(token.into());
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

impl TokenProvider for SharedToken {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_ignores_blank() {
        assert_eq!(StaticToken::new(Some("  ".to_string())).token(), None);
        assert_eq!(StaticToken::new(Some("abc".to_string())).token().as_deref(), Some("abc"));
        assert_eq!(StaticToken::default().token(), None);
    }

    #[test]
    fn test_shared_token_clones_see_updates() {
        let holder = SharedToken::new();
        let client_view = holder.clone();
        assert_eq!(client_view.token(), None);

        holder.set("fresh");
        assert_eq!(client_view.token().as_deref(), Some("fresh"));

        holder.clear();
        assert_eq!(client_view.token(), None);
    }
}
