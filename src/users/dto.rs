use serde::{Deserialize, Serialize};

use super::model::{Role, User};
use crate::auth::password::MIN_PASSWORD_LEN;
use crate::error::FieldError;
use crate::validation::{is_valid_email, Validate};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(alias = "q")]
    pub search_text: Option<String>,
}

/// Body of `PUT /users/:id`. Blank strings count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.trim().is_empty())
}

impl UpdateUserRequest {
    pub fn username(&self) -> Option<String> {
        present(&self.username).map(|s| s.trim().to_string())
    }

    pub fn email(&self) -> Option<String> {
        present(&self.email).map(|s| s.trim().to_lowercase())
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|s| !s.is_empty())
    }

    pub fn role(&self) -> Option<Role> {
        present(&self.role).and_then(|r| Role::parse(r.trim()))
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.username().is_some_and(|u| u.chars().count() < 3) {
            errors.push(FieldError::new("username", "Username must be at least 3 characters"));
        }
        if self.email().is_some_and(|e| !is_valid_email(&e)) {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }
        if self.password().is_some_and(|p| p.len() < MIN_PASSWORD_LEN) {
            errors.push(FieldError::new("password", "Password must be at least 6 characters"));
        }
        if present(&self.role).is_some() && self.role().is_none() {
            errors.push(FieldError::new("role", "Role must be user or admin"));
        }
        errors
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
    pub page: u64,
    pub page_size: usize,
}
