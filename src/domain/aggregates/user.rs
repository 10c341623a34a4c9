//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StorefrontError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Role { #[default] User, Admin }

impl Role {
    pub fn as_str(&self) -> &'static str { match self { Self::User => "user", Self::Admin => "admin" } }
    pub fn is_admin(&self) -> bool { *self == Self::Admin }
}

impl FromStr for Role {
    type Err = StorefrontError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(StorefrontError::validation(format!("Unknown role: {other}"))),
        }
    }
}

// Unknown stored roles get the least privilege.
impl From<String> for Role { fn from(s: String) -> Self { s.parse().unwrap_or_default() } }
impl From<Role> for &'static str { fn from(r: Role) -> Self { r.as_str() } }

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "pincode", alias = "postalCode", default)]
    pub postal_code: String,
}

/// Profile document in the `users` collection, keyed by auth identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "MobileNumber", alias = "number", default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
}

impl User {
    pub fn register(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>, mobile: Option<String>, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(), email: email.into(), name: name.into(), mobile: mobile.filter(|m| !m.trim().is_empty()),
            role, address: None, created_at: Some(now), email_verified: false,
        }
    }
}
