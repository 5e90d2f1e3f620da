use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dto::WastePage;
use super::model::{NewWasteLog, WasteLog, WasteLogChanges};
use super::query::{normalize, WasteListParams};
use crate::auth::policy::{can_read, can_write, require_admin};
use crate::auth::principal::Principal;
use crate::error::AppError;
use crate::store::{Page, RecordStore, WasteCriteria};
use crate::users::model::User;

fn not_found() -> AppError {
    AppError::NotFound("Log not found".into())
}

/// Loads a log the caller may touch. Existence is checked before ownership,
/// so a foreign id answers 403 while an unknown id answers 404.
async fn load_authorized(
    store: &dyn RecordStore,
    principal: &Principal,
    raw_id: &str,
    allowed: fn(&Principal, Uuid) -> bool,
) -> Result<WasteLog, AppError> {
    let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
    let log = store.find_waste(id).await?.ok_or_else(not_found)?;
    if !allowed(principal, log.owner_id) {
        warn!(log_id = %id, principal = ?principal, "waste log access denied");
        return Err(AppError::forbidden());
    }
    Ok(log)
}

pub async fn create(
    store: &dyn RecordStore,
    owner: &User,
    new: NewWasteLog,
) -> Result<WasteLog, AppError> {
    let log = store.insert_waste(new.build(owner)).await?;
    info!(log_id = %log.id, owner_id = %log.owner_id, amount = log.amount, "waste logged");
    Ok(log)
}

/// Find and count run as separate store calls and may see different
/// snapshots; `total` is not guaranteed to agree with `logs`.
pub async fn list(
    store: &dyn RecordStore,
    principal: &Principal,
    params: &WasteListParams,
) -> Result<WastePage, AppError> {
    let query = normalize(principal, params);
    debug!(criteria = ?query.criteria, pagination = ?query.pagination, "listing waste logs");

    let (logs, total) = tokio::try_join!(
        store.find_waste_logs(&query.criteria, Some(query.pagination.as_page())),
        store.count_waste_logs(&query.criteria),
    )?;

    Ok(WastePage {
        page_size: logs.len(),
        logs,
        total,
        page: query.pagination.page,
    })
}

pub async fn recent(
    store: &dyn RecordStore,
    principal: &Principal,
    limit: u64,
) -> Result<Vec<WasteLog>, AppError> {
    require_admin(principal)?;
    Ok(store
        .find_waste_logs(&WasteCriteria::default(), Some(Page { skip: 0, limit }))
        .await?)
}

pub async fn get(
    store: &dyn RecordStore,
    principal: &Principal,
    raw_id: &str,
) -> Result<WasteLog, AppError> {
    load_authorized(store, principal, raw_id, can_read).await
}

pub async fn update(
    store: &dyn RecordStore,
    principal: &Principal,
    raw_id: &str,
    changes: WasteLogChanges,
) -> Result<WasteLog, AppError> {
    let mut log = load_authorized(store, principal, raw_id, can_write).await?;
    log.apply(changes);
    let log = store.save_waste(&log).await?;
    info!(log_id = %log.id, "waste log updated");
    Ok(log)
}

pub async fn delete(
    store: &dyn RecordStore,
    principal: &Principal,
    raw_id: &str,
) -> Result<(), AppError> {
    let log = load_authorized(store, principal, raw_id, can_write).await?;
    if !store.delete_waste(log.id).await? {
        return Err(not_found());
    }
    info!(log_id = %log.id, "waste log deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use time::macros::datetime;

    use crate::store::{MemoryStore, StoreError, UserCriteria, WasteTypeTotal};
    use crate::users::model::{NewUser, Role};
    use crate::waste::model::{Category, WasteType};

    async fn seed_user(store: &dyn RecordStore, name: &str, role: Role) -> User {
        store
            .insert_user(
                NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: "x".into(),
                    role,
                }
                .build(),
            )
            .await
            .unwrap()
    }

    fn entry(amount: f64) -> NewWasteLog {
        NewWasteLog {
            waste_type: WasteType::Biodegradable,
            category: Category::Compostable,
            amount,
            date_logged: None,
        }
    }

    #[tokio::test]
    async fn non_admin_listing_only_returns_own_logs() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", Role::User).await;
        let bob = seed_user(&store, "bob", Role::User).await;
        for n in 0..3 {
            create(&store, &alice, entry(n as f64 + 1.0)).await.unwrap();
            create(&store, &bob, entry(n as f64 + 1.0)).await.unwrap();
        }

        let params = WasteListParams {
            owner_id: Some(bob.id.to_string()),
            ..Default::default()
        };
        let page = list(&store, &Principal::from_user(&alice), &params).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.logs.iter().all(|l| l.owner_id == alice.id));
    }

    #[tokio::test]
    async fn admin_listing_spans_every_owner() {
        let store = MemoryStore::new();
        let admin = seed_user(&store, "root", Role::Admin).await;
        let alice = seed_user(&store, "alice", Role::User).await;
        let bob = seed_user(&store, "bob", Role::User).await;
        create(&store, &alice, entry(1.0)).await.unwrap();
        create(&store, &bob, entry(2.0)).await.unwrap();

        let page = list(&store, &Principal::from_user(&admin), &WasteListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.logs.iter().any(|l| l.owner_id == alice.id));
        assert!(page.logs.iter().any(|l| l.owner_id == bob.id));
    }

    #[tokio::test]
    async fn listing_pages_and_reports_page_size() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", Role::User).await;
        for n in 0..7 {
            create(&store, &alice, entry(n as f64 + 1.0)).await.unwrap();
        }
        let params = WasteListParams {
            page: Some("2".into()),
            limit: Some("5".into()),
            ..Default::default()
        };
        let page = list(&store, &Principal::from_user(&alice), &params).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total, 7);
    }

    #[tokio::test]
    async fn range_end_is_inclusive_to_the_millisecond() {
        let store = MemoryStore::new();
        let admin = seed_user(&store, "root", Role::Admin).await;
        let mut inside = entry(1.0);
        inside.date_logged = Some(datetime!(2024-06-30 23:59:59.999 UTC));
        let mut outside = entry(2.0);
        outside.date_logged = Some(datetime!(2024-07-01 0:00 UTC));
        create(&store, &admin, inside).await.unwrap();
        create(&store, &admin, outside).await.unwrap();

        let params = WasteListParams {
            date_to: Some("2024-06-30".into()),
            ..Default::default()
        };
        let page = list(&store, &Principal::from_user(&admin), &params).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.logs[0].amount, 1.0);
    }

    #[tokio::test]
    async fn foreign_log_is_forbidden_and_unknown_log_is_missing() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", Role::User).await;
        let bob = seed_user(&store, "bob", Role::User).await;
        let log = create(&store, &bob, entry(3.0)).await.unwrap();
        let as_alice = Principal::from_user(&alice);

        let err = get(&store, &as_alice, &log.id.to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = get(&store, &as_alice, &Uuid::new_v4().to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = get(&store, &as_alice, "not-an-id").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = delete(&store, &as_alice, &log.id.to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        assert!(store.find_waste(log.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_may_update_and_delete_any_log() {
        let store = MemoryStore::new();
        let admin = Principal::from_user(&seed_user(&store, "root", Role::Admin).await);
        let bob = seed_user(&store, "bob", Role::User).await;
        let log = create(&store, &bob, entry(3.0)).await.unwrap();

        let updated = update(
            &store,
            &admin,
            &log.id.to_string(),
            WasteLogChanges {
                category: Some(Category::Recycle),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.category, Category::Recycle);
        assert_eq!(updated.owner_id, bob.id);

        delete(&store, &admin, &log.id.to_string()).await.unwrap();
        assert!(store.find_waste(log.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_is_admin_only() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", Role::User).await;
        let err = recent(&store, &Principal::from_user(&alice), 10).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    /// Delegates to a memory store but lands one extra write right after each
    /// page is read, the way a concurrent request could.
    struct WriteBetweenFindAndCount {
        inner: MemoryStore,
        owner: User,
    }

    #[async_trait]
    impl RecordStore for WriteBetweenFindAndCount {
        async fn insert_user(&self, user: User) -> Result<User, StoreError> {
            self.inner.insert_user(user).await
        }
        async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.inner.find_user(id).await
        }
        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_user_by_email(email).await
        }
        async fn find_users(&self, c: &UserCriteria, p: Page) -> Result<Vec<User>, StoreError> {
            self.inner.find_users(c, p).await
        }
        async fn count_users(&self, c: &UserCriteria) -> Result<u64, StoreError> {
            self.inner.count_users(c).await
        }
        async fn save_user(&self, user: &User) -> Result<User, StoreError> {
            self.inner.save_user(user).await
        }
        async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.delete_user(id).await
        }
        async fn insert_waste(&self, log: WasteLog) -> Result<WasteLog, StoreError> {
            self.inner.insert_waste(log).await
        }
        async fn find_waste(&self, id: Uuid) -> Result<Option<WasteLog>, StoreError> {
            self.inner.find_waste(id).await
        }
        async fn find_waste_logs(
            &self,
            c: &WasteCriteria,
            p: Option<Page>,
        ) -> Result<Vec<WasteLog>, StoreError> {
            let found = self.inner.find_waste_logs(c, p).await?;
            self.inner.insert_waste(entry(9.0).build(&self.owner)).await?;
            Ok(found)
        }
        async fn count_waste_logs(&self, c: &WasteCriteria) -> Result<u64, StoreError> {
            self.inner.count_waste_logs(c).await
        }
        async fn save_waste(&self, log: &WasteLog) -> Result<WasteLog, StoreError> {
            self.inner.save_waste(log).await
        }
        async fn delete_waste(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.delete_waste(id).await
        }
        async fn waste_totals_by_type(
            &self,
            c: &WasteCriteria,
        ) -> Result<Vec<WasteTypeTotal>, StoreError> {
            self.inner.waste_totals_by_type(c).await
        }
    }

    #[tokio::test]
    async fn total_may_count_writes_the_page_did_not_see() {
        let inner = MemoryStore::new();
        let alice = seed_user(&inner, "alice", Role::User).await;
        create(&inner, &alice, entry(1.0)).await.unwrap();
        let store = Arc::new(WriteBetweenFindAndCount {
            inner,
            owner: alice.clone(),
        });

        let page = list(store.as_ref(), &Principal::from_user(&alice), &WasteListParams::default())
            .await
            .unwrap();
        assert_eq!(page.page_size, 1);
        assert_eq!(page.total, 2);
    }
}
