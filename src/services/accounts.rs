//! Registration, sign-in and profile management.

use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::access;
use crate::auth::Credentials;
use crate::domain::aggregates::{Address, Role, User};
use crate::domain::events::{DomainEvent, UserEvent};
use crate::store::{encode, object, USERS};
use crate::{Result, Storefront, StorefrontError};

pub const NO_ROLE_MESSAGE: &str = "No role assigned. Contact admin.";

pub struct Accounts {
    app: Storefront,
    drives_identity: bool,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    pub password: String,
    #[serde(default, alias = "number")]
    pub mobile: Option<String>,
}

/// Result of a successful registration or login.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub credentials: Credentials,
    pub user: User,
    pub landing: &'static str,
}

impl Accounts {
    /// Sign-in and sign-out move the identity an embedded session follows.
    pub fn new(app: Storefront) -> Self { Self { app, drives_identity: true } }

    /// For request handlers: tokens are issued, the shared identity is left
    /// as it is.
    pub fn detached(app: Storefront) -> Self { Self { app, drives_identity: false } }

    pub async fn register(&self, registration: Registration) -> Result<SignedIn> {
        registration.validate()?;
        let auth = self.app.auth();
        let credentials = if self.drives_identity {
            auth.sign_up(&registration.email, &registration.password).await?
        } else {
            auth.create_account(&registration.email, &registration.password).await?
        };
        let role = if self.app.config().is_bootstrap_admin(&registration.email) { Role::Admin } else { Role::User };
        let uid = credentials.identity.uid.clone();
        let user = User::register(&uid, credentials.identity.email.clone(), registration.name.trim(), registration.mobile, role, Utc::now());
        self.app.store().set(USERS, &uid, encode(&user)?, false).await?;
        tracing::info!(uid = %uid, %role, "user registered");
        self.app.bus().publish(&DomainEvent::User(UserEvent::Registered { user_id: uid, role })).await;
        Ok(SignedIn { credentials, user, landing: access::landing(role) })
    }

    /// Signs in and resolves the role. An identity without a profile
    /// document is signed back out.
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let credentials = if self.drives_identity {
            self.app.auth().sign_in(email, password).await?
        } else {
            self.app.auth().authenticate(email, password).await?
        };
        let user = match self.profile(&credentials.identity.uid).await {
            Ok(user) => user,
            Err(StorefrontError::NotFound(_)) => {
                if self.drives_identity {
                    self.app.auth().sign_out().await?;
                }
                return Err(StorefrontError::Auth(NO_ROLE_MESSAGE.into()));
            }
            Err(e) => return Err(e),
        };
        let landing = access::landing(user.role);
        Ok(SignedIn { credentials, user, landing })
    }

    pub async fn logout(&self) -> Result<()> {
        if !self.drives_identity {
            tracing::debug!("detached logout, shared identity kept");
            return Ok(());
        }
        self.app.auth().sign_out().await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(StorefrontError::validation("Email is required"));
        }
        self.app.auth().send_password_reset(email.trim()).await
    }

    pub async fn profile(&self, uid: &str) -> Result<User> {
        let doc = self
            .app
            .store()
            .get(USERS, uid)
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("{USERS}/{uid}")))?;
        Ok(doc.decode()?)
    }

    /// `None` when the identity has no profile document.
    pub async fn role_of(&self, uid: &str) -> Result<Option<Role>> {
        match self.profile(uid).await {
            Ok(user) => Ok(Some(user.role)),
            Err(StorefrontError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_address(&self, uid: &str, address: Address) -> Result<User> {
        self.app.store().update(USERS, uid, object([("address", encode(&address)?)])).await?;
        tracing::info!(uid, "address updated");
        self.profile(uid).await
    }
}
