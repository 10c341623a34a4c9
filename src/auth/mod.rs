//! Authentication collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::Result;

pub mod local;

pub use local::LocalAuth;

/// Signed-in principal as reported by the auth service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub identity: Identity,
    /// Bearer token accepted by [`AuthProvider::verify`].
    pub token: String,
}

/// Account service. `sign_in`, `sign_up` and `sign_out` drive the single
/// identity reported by [`AuthProvider::on_identity_change`], which is what
/// an embedded [`Session`](crate::Session) follows. Request-scoped callers
/// use `authenticate` and `create_account`, which only hand out tokens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Credentials>;

    async fn sign_out(&self) -> Result<()>;

    /// Checks credentials and issues a token; the current identity is untouched.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Credentials>;

    /// Creates an account and issues a token without signing it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<Credentials>;

    /// Current identity; the receiver observes the state at subscription
    /// time first and every change after it.
    fn on_identity_change(&self) -> watch::Receiver<Option<Identity>>;

    async fn send_password_reset(&self, email: &str) -> Result<()>;

    fn verify(&self, token: &str) -> Result<Identity>;
}
