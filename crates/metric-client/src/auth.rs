//! Bearer token issuing for the HTTP transports.

use crate::error::ClientResult;
use crate::request::User;

/// Mints the bearer token sent for a [`User`].
pub trait TokenIssuer: Send + Sync {
    /// Token for `user` acting on behalf of its proxied users.
    fn issue_token(&self, user: &User) -> ClientResult<String>;
}

/// Issues the same pre-minted token for every user.
#[derive(Debug, Clone)]
pub struct StaticTokenIssuer {
    token: String,
}

impl StaticTokenIssuer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenIssuer for StaticTokenIssuer {
    fn issue_token(&self, _user: &User) -> ClientResult<String> {
        Ok(self.token.clone())
    }
}
