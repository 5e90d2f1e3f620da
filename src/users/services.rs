use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{UpdateUserRequest, UserListParams, UserPage};
use super::model::User;
use crate::auth::password::hash_password;
use crate::auth::policy::{can_change_role, can_delete_user, can_read, can_write, require_admin};
use crate::auth::principal::Principal;
use crate::error::AppError;
use crate::store::{RecordStore, UserCriteria};
use crate::waste::query::{non_blank, Pagination};

fn not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

pub async fn list(
    store: &dyn RecordStore,
    principal: &Principal,
    params: &UserListParams,
) -> Result<UserPage, AppError> {
    require_admin(principal)?;
    let pagination = Pagination::from_raw(params.page.as_deref(), params.limit.as_deref());
    let criteria = UserCriteria {
        search: non_blank(params.search_text.as_deref()).map(str::to_string),
    };

    let (users, total) = tokio::try_join!(
        store.find_users(&criteria, pagination.as_page()),
        store.count_users(&criteria),
    )?;

    Ok(UserPage {
        page_size: users.len(),
        users,
        total,
        page: pagination.page,
    })
}

/// Ownership is checked before existence for accounts.
pub async fn get(store: &dyn RecordStore, principal: &Principal, raw_id: &str) -> Result<User, AppError> {
    let id = parse_id(raw_id)?;
    if !can_read(principal, id) {
        return Err(AppError::forbidden());
    }
    store.find_user(id).await?.ok_or_else(not_found)
}

/// Applies username, email and password changes. A role change from a
/// principal that may not change roles is dropped without error.
pub async fn update(
    store: &dyn RecordStore,
    principal: &Principal,
    raw_id: &str,
    changes: &UpdateUserRequest,
) -> Result<User, AppError> {
    let id = parse_id(raw_id)?;
    if !can_write(principal, id) {
        return Err(AppError::forbidden());
    }
    let mut user = store.find_user(id).await?.ok_or_else(not_found)?;

    if let Some(username) = changes.username() {
        user.username = username;
    }
    if let Some(email) = changes.email() {
        user.email = email;
    }
    if let Some(password) = changes.password() {
        user.password_hash = hash_password(password)?;
    }
    if let Some(role) = changes.role() {
        if can_change_role(principal) {
            user.role = role;
        } else {
            warn!(user_id = %id, caller = ?principal.id(), "ignoring role change from non-admin");
        }
    }
    user.updated_at = OffsetDateTime::now_utc();

    let user = store.save_user(&user).await?;
    info!(user_id = %user.id, role = user.role.as_str(), "user updated");
    Ok(user)
}

pub async fn delete(store: &dyn RecordStore, principal: &Principal, raw_id: &str) -> Result<(), AppError> {
    if !can_delete_user(principal) {
        return Err(AppError::Authorization("Admin only".into()));
    }
    let id = parse_id(raw_id)?;
    if !store.delete_user(id).await? {
        return Err(not_found());
    }
    info!(user_id = %id, "user deleted");
    Ok(())
}
