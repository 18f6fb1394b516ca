// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
///
/// Only reference/display data lives here; credentials and sessions are
/// handled outside this service.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Display name shown on leaderboards.
    pub full_name: String,

    /// Phone number or email used for contacting winners.
    pub contact: String,

    /// User role: 'student' or 'admin'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user reference.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name length must be between 1 and 100 characters."
    ))]
    pub full_name: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Contact length must be between 1 and 100 characters."
    ))]
    pub contact: String,
    /// Defaults to 'student' when omitted.
    pub role: Option<String>,
}
