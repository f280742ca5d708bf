//! User models and account request/response types.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Closed set of account roles. Stored as lowercase TEXT; every mutation path
/// goes through this enum so an unknown role can never reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Regular,
    Author,
    Admin,
    Rider,
    Vendor,
    Suspended,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Author => "author",
            Role::Admin => "admin",
            Role::Rider => "rider",
            Role::Vendor => "vendor",
            Role::Suspended => "suspended",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(Role::Regular),
            "author" => Ok(Role::Author),
            "admin" => Ok(Role::Admin),
            "rider" => Ok(Role::Rider),
            "vendor" => Ok(Role::Vendor),
            "suspended" => Ok(Role::Suspended),
            _ => Err(()),
        }
    }
}

/// Full user row, including the password hash. Only credential checks load
/// this; everything outbound goes through `UserResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub number: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub user_agent: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Authenticated caller attached to the request by the session middleware.
/// Deliberately selected without the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub number: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: String,
}

/// Columns for loading an `AuthUser` projection.
pub const AUTH_USER_COLUMNS: &str =
    "id, name, email, number, bio, photo, role, is_verified, created_at";

/// Sanitized user view returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub number: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub role: Role,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            number: user.number,
            bio: user.bio,
            photo: user.photo,
            role: user.role,
            is_verified: user.is_verified,
        }
    }
}

impl From<AuthUser> for UserResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            number: user.number,
            bio: user.bio,
            photo: user.photo,
            role: user.role,
            is_verified: user.is_verified,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Auth endpoints return the profile plus the freshly issued session token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub number: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRoleRequest {
    pub id: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AutomatedEmailRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub send_to: String,
    #[serde(default)]
    pub reply_to: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
