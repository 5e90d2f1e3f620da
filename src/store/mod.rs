//! Persistence boundary. Handlers and the reporting engine only see the
//! `RecordStore` trait; the process picks Postgres or the in-memory store at
//! startup.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::policy::OwnerScope;
use crate::users::model::User;
use crate::waste::model::{WasteLog, WasteType};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Inclusive bounds on `date_logged`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
}

impl DateRange {
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Filters for waste-log queries. String fields are exact matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasteCriteria {
    pub owner: OwnerScope,
    pub category: Option<String>,
    pub waste_type: Option<String>,
    pub date_range: DateRange,
    pub owner_username_contains: Option<String>,
}

impl Default for WasteCriteria {
    fn default() -> Self {
        Self {
            owner: OwnerScope::All,
            category: None,
            waste_type: None,
            date_range: DateRange::default(),
            owner_username_contains: None,
        }
    }
}

impl WasteCriteria {
    pub fn matches(&self, log: &WasteLog) -> bool {
        let owner_ok = match self.owner {
            OwnerScope::All => true,
            OwnerScope::Owner(id) => log.owner_id == id,
            OwnerScope::Nobody => false,
        };
        owner_ok
            && self
                .category
                .as_deref()
                .map_or(true, |c| log.category.as_str() == c)
            && self
                .waste_type
                .as_deref()
                .map_or(true, |t| log.waste_type.as_str() == t)
            && self.date_range.contains(log.date_logged)
            && self
                .owner_username_contains
                .as_deref()
                .map_or(true, |q| contains_ignore_case(&log.owner_username, q))
    }
}

/// Case-insensitive search over username and email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserCriteria {
    pub search: Option<String>,
}

impl UserCriteria {
    pub fn matches(&self, user: &User) -> bool {
        self.search.as_deref().map_or(true, |q| {
            contains_ignore_case(&user.username, q) || contains_ignore_case(&user.email, q)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

/// Sum of `amount` for one waste type, as returned by a grouped aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasteTypeTotal {
    pub waste_type: WasteType,
    pub total_amount: f64,
    pub entries: u64,
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Newest accounts first.
    async fn find_users(&self, criteria: &UserCriteria, page: Page) -> Result<Vec<User>, StoreError>;
    async fn count_users(&self, criteria: &UserCriteria) -> Result<u64, StoreError>;
    async fn save_user(&self, user: &User) -> Result<User, StoreError>;
    /// Removes the account only; its waste logs stay. Returns false when nothing was deleted.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_waste(&self, log: WasteLog) -> Result<WasteLog, StoreError>;
    async fn find_waste(&self, id: Uuid) -> Result<Option<WasteLog>, StoreError>;
    /// Most recently logged first. `page = None` returns every match.
    async fn find_waste_logs(
        &self,
        criteria: &WasteCriteria,
        page: Option<Page>,
    ) -> Result<Vec<WasteLog>, StoreError>;
    async fn count_waste_logs(&self, criteria: &WasteCriteria) -> Result<u64, StoreError>;
    async fn save_waste(&self, log: &WasteLog) -> Result<WasteLog, StoreError>;
    async fn delete_waste(&self, id: Uuid) -> Result<bool, StoreError>;
    /// `amount` summed per waste type over matching logs.
    async fn waste_totals_by_type(
        &self,
        criteria: &WasteCriteria,
    ) -> Result<Vec<WasteTypeTotal>, StoreError>;
}
