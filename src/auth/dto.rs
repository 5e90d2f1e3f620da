use serde::{Deserialize, Serialize};

use super::password::MIN_PASSWORD_LEN;
use crate::error::FieldError;
use crate::users::model::User;
use crate::validation::{is_valid_email, Validate};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.username.trim().chars().count() < 3 {
            errors.push(FieldError::new("username", "Username must be at least 3 characters"));
        }
        if !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new("password", "Password must be at least 6 characters"));
        }
        errors
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        errors
    }
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Vec<FieldError> {
        if self.refresh_token.is_empty() {
            vec![FieldError::new("refreshToken", "Refresh token is required")]
        } else {
            Vec::new()
        }
    }
}

/// Returned after register, login or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
}
