//! In-process auth service: argon2 password hashes and HS256 session tokens.

use argon2::Config as ArgonConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use super::{AuthProvider, Credentials, Identity};
use crate::{Result, StorefrontError};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    exp: usize,
}

struct PendingReset {
    email: String,
    issued_at: DateTime<Utc>,
}

#[derive(Clone)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
}

pub struct LocalAuth {
    secret: String,
    session_ttl: Duration,
    // keyed by lowercased email
    accounts: DashMap<String, Account>,
    // reset token -> request, valid for one session lifetime
    resets: DashMap<String, PendingReset>,
    current: watch::Sender<Option<Identity>>,
}

impl LocalAuth {
    pub fn new(secret: impl Into<String>, session_ttl: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self { secret: secret.into(), session_ttl, accounts: DashMap::new(), resets: DashMap::new(), current }
    }

    /// Generates a one-shot reset token for `email`. Delivery is out of band.
    pub fn issue_password_reset(&self, email: &str) -> Result<String> {
        let key = normalize(email);
        if !self.accounts.contains_key(&key) {
            return Err(StorefrontError::Auth("There is no user record corresponding to this email.".into()));
        }
        let now = Utc::now();
        self.resets.retain(|_, reset| !self.reset_expired(reset, now));
        let token = Uuid::new_v4().simple().to_string();
        self.resets.insert(token.clone(), PendingReset { email: key, issued_at: now });
        Ok(token)
    }

    pub fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<()> {
        check_password(new_password)?;
        let email = self
            .resets
            .remove(token)
            .map(|(_, reset)| reset)
            .filter(|reset| !self.reset_expired(reset, Utc::now()))
            .map(|reset| reset.email)
            .ok_or_else(|| StorefrontError::Auth("Invalid or expired reset code.".into()))?;
        let hash = hash_password(new_password)?;
        match self.accounts.get_mut(&email) {
            Some(mut account) => {
                account.password_hash = hash;
                tracing::info!(uid = %account.uid, "password reset");
                Ok(())
            }
            None => Err(StorefrontError::Auth("There is no user record corresponding to this email.".into())),
        }
    }

    fn reset_expired(&self, reset: &PendingReset, now: DateTime<Utc>) -> bool {
        now - reset.issued_at >= self.session_ttl
    }

    fn issue(&self, account: &Account) -> Result<Credentials> {
        let exp = (Utc::now() + self.session_ttl).timestamp().max(0) as usize;
        let claims = Claims { sub: account.uid.clone(), email: account.email.clone(), exp };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| StorefrontError::Auth(format!("Could not issue session token: {e}")))?;
        let identity = Identity { uid: account.uid.clone(), email: account.email.clone() };
        Ok(Credentials { identity, token })
    }

    fn signed_in(&self, credentials: Credentials) -> Credentials {
        self.current.send_replace(Some(credentials.identity.clone()));
        credentials
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials> {
        self.authenticate(email, password).await.map(|c| self.signed_in(c))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Credentials> {
        self.create_account(email, password).await.map(|c| self.signed_in(c))
    }

    async fn sign_out(&self) -> Result<()> {
        self.current.send_replace(None);
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Credentials> {
        let account = self
            .accounts
            .get(&normalize(email))
            .map(|a| a.clone())
            .ok_or_else(|| StorefrontError::Auth("Invalid email or password.".into()))?;
        if !argon2::verify_encoded(&account.password_hash, password.as_bytes()).unwrap_or(false) {
            tracing::info!(uid = %account.uid, "rejected sign-in");
            return Err(StorefrontError::Auth("Invalid email or password.".into()));
        }
        tracing::info!(uid = %account.uid, "signed in");
        self.issue(&account)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Credentials> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(StorefrontError::Auth("The email address is badly formatted.".into()));
        }
        check_password(password)?;
        let account = Account { uid: Uuid::new_v4().simple().to_string(), email: email.to_string(), password_hash: hash_password(password)? };
        match self.accounts.entry(normalize(email)) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StorefrontError::Auth("The email address is already in use by another account.".into()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => { slot.insert(account.clone()); }
        }
        tracing::info!(uid = %account.uid, "account created");
        self.issue(&account)
    }

    fn on_identity_change(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let token = self.issue_password_reset(email)?;
        tracing::info!(email, "password reset requested");
        tracing::debug!(email, token = %token, "password reset token issued");
        Ok(())
    }

    fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &Validation::new(Algorithm::HS256))
            .map_err(|_| StorefrontError::Auth("Invalid token".into()))?;
        Ok(Identity { uid: data.claims.sub, email: data.claims.email })
    }
}

fn normalize(email: &str) -> String { email.trim().to_lowercase() }

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StorefrontError::Auth(format!("Password should be at least {MIN_PASSWORD_LEN} characters")));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    argon2::hash_encoded(password.as_bytes(), &salt, &ArgonConfig::default())
        .map_err(|e| StorefrontError::Auth(format!("Password hashing failed: {e}")))
}
