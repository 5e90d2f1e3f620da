use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Page, RecordStore, StoreError, UserCriteria, WasteCriteria, WasteTypeTotal};
use crate::users::model::User;
use crate::waste::model::{WasteLog, WasteType};

/// Process-local store. Records keep insertion order, which breaks ties when
/// sorting.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    logs: RwLock<Vec<WasteLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, page: Option<Page>) -> Vec<T> {
    match page {
        Some(Page { skip, limit }) => items
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect(),
        None => items,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_users(&self, criteria: &UserCriteria, page: Page) -> Result<Vec<User>, StoreError> {
        let mut matched: Vec<User> = self
            .users
            .read()
            .await
            .iter()
            .filter(|u| criteria.matches(u))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matched, Some(page)))
    }

    async fn count_users(&self, criteria: &UserCriteria) -> Result<u64, StoreError> {
        Ok(self.users.read().await.iter().filter(|u| criteria.matches(u)).count() as u64)
    }

    async fn save_user(&self, user: &User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} vanished before save", user.id)))?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }

    async fn insert_waste(&self, log: WasteLog) -> Result<WasteLog, StoreError> {
        self.logs.write().await.push(log.clone());
        Ok(log)
    }

    async fn find_waste(&self, id: Uuid) -> Result<Option<WasteLog>, StoreError> {
        Ok(self.logs.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn find_waste_logs(
        &self,
        criteria: &WasteCriteria,
        page: Option<Page>,
    ) -> Result<Vec<WasteLog>, StoreError> {
        let mut matched: Vec<WasteLog> = self
            .logs
            .read()
            .await
            .iter()
            .filter(|l| criteria.matches(l))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.date_logged.cmp(&a.date_logged));
        Ok(paginate(matched, page))
    }

    async fn count_waste_logs(&self, criteria: &WasteCriteria) -> Result<u64, StoreError> {
        Ok(self.logs.read().await.iter().filter(|l| criteria.matches(l)).count() as u64)
    }

    async fn save_waste(&self, log: &WasteLog) -> Result<WasteLog, StoreError> {
        let mut logs = self.logs.write().await;
        let slot = logs
            .iter_mut()
            .find(|l| l.id == log.id)
            .ok_or_else(|| StoreError::Corrupt(format!("log {} vanished before save", log.id)))?;
        *slot = log.clone();
        Ok(log.clone())
    }

    async fn delete_waste(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut logs = self.logs.write().await;
        let before = logs.len();
        logs.retain(|l| l.id != id);
        Ok(logs.len() != before)
    }

    async fn waste_totals_by_type(
        &self,
        criteria: &WasteCriteria,
    ) -> Result<Vec<WasteTypeTotal>, StoreError> {
        let mut groups: BTreeMap<WasteType, (f64, u64)> = BTreeMap::new();
        for log in self.logs.read().await.iter().filter(|l| criteria.matches(l)) {
            let entry = groups.entry(log.waste_type).or_insert((0.0, 0));
            entry.0 += log.amount;
            entry.1 += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(waste_type, (total_amount, entries))| WasteTypeTotal {
                waste_type,
                total_amount,
                entries,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::policy::OwnerScope;
    use crate::users::model::{NewUser, Role};
    use crate::waste::model::{Category, NewWasteLog};
    use time::macros::datetime;

    fn user(name: &str) -> User {
        NewUser {
            username: name.into(),
            email: format!("{name}@example.com"),
            password_hash: "x".into(),
            role: Role::User,
        }
        .build()
    }

    fn log(owner: &User, waste_type: WasteType, amount: f64, at: time::OffsetDateTime) -> WasteLog {
        NewWasteLog {
            waste_type,
            category: Category::Trash,
            amount,
            date_logged: Some(at),
        }
        .build(owner)
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(user("alice")).await.unwrap();
        let err = store.insert_user(user("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn logs_come_back_newest_first_and_paged() {
        let store = MemoryStore::new();
        let alice = store.insert_user(user("alice")).await.unwrap();
        for day in 1..=5u8 {
            let at = datetime!(2024-01-01 12:00 UTC).replace_day(day).unwrap();
            store
                .insert_waste(log(&alice, WasteType::Biodegradable, day as f64, at))
                .await
                .unwrap();
        }

        let page = store
            .find_waste_logs(&WasteCriteria::default(), Some(Page { skip: 1, limit: 2 }))
            .await
            .unwrap();
        let amounts: Vec<f64> = page.iter().map(|l| l.amount).collect();
        assert_eq!(amounts, vec![4.0, 3.0]);
        assert_eq!(store.count_waste_logs(&WasteCriteria::default()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn deleting_a_user_keeps_their_logs() {
        let store = MemoryStore::new();
        let alice = store.insert_user(user("alice")).await.unwrap();
        let bob = store.insert_user(user("bob")).await.unwrap();
        let at = datetime!(2024-01-01 12:00 UTC);
        store.insert_waste(log(&alice, WasteType::Hazardous, 1.0, at)).await.unwrap();
        store.insert_waste(log(&bob, WasteType::Hazardous, 2.0, at)).await.unwrap();

        assert!(store.delete_user(alice.id).await.unwrap());
        assert!(!store.delete_user(alice.id).await.unwrap());
        assert!(store.find_user(alice.id).await.unwrap().is_none());

        let remaining = store.find_waste_logs(&WasteCriteria::default(), None).await.unwrap();
        assert_eq!(remaining.len(), 2);
        let orphan = remaining.iter().find(|l| l.owner_id == alice.id).unwrap();
        assert_eq!(orphan.owner_username, "alice");
    }

    #[tokio::test]
    async fn username_search_is_case_insensitive_substring() {
        let store = MemoryStore::new();
        let alice = store.insert_user(user("Alice_W")).await.unwrap();
        let bob = store.insert_user(user("bob")).await.unwrap();
        let at = datetime!(2024-01-01 12:00 UTC);
        store.insert_waste(log(&alice, WasteType::Hazardous, 1.0, at)).await.unwrap();
        store.insert_waste(log(&bob, WasteType::Hazardous, 2.0, at)).await.unwrap();

        let criteria = WasteCriteria {
            owner_username_contains: Some("ICE_w".into()),
            ..Default::default()
        };
        let found = store.find_waste_logs(&criteria, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner_id, alice.id);

        let nobody = WasteCriteria {
            owner: OwnerScope::Nobody,
            ..Default::default()
        };
        assert_eq!(store.count_waste_logs(&nobody).await.unwrap(), 0);
    }
}
