use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Page, RecordStore, StoreError, UserCriteria, WasteCriteria, WasteTypeTotal};
use crate::auth::policy::OwnerScope;
use crate::users::model::{Role, User};
use crate::waste::model::{Category, WasteLog, WasteType};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";
const WASTE_COLUMNS: &str = "id, owner_id, owner_username, waste_type, category, amount, \
                             total_weight, date_logged, created_at, updated_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&r.role)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} has role `{}`", r.id, r.role)))?;
        Ok(Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            role,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WasteLogRow {
    id: Uuid,
    owner_id: Uuid,
    owner_username: String,
    waste_type: String,
    category: String,
    amount: f64,
    total_weight: f64,
    date_logged: OffsetDateTime,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<WasteLogRow> for WasteLog {
    type Error = StoreError;

    fn try_from(r: WasteLogRow) -> Result<Self, Self::Error> {
        let waste_type = WasteType::parse(&r.waste_type).ok_or_else(|| {
            StoreError::Corrupt(format!("log {} has waste type `{}`", r.id, r.waste_type))
        })?;
        let category = Category::parse(&r.category).ok_or_else(|| {
            StoreError::Corrupt(format!("log {} has category `{}`", r.id, r.category))
        })?;
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            owner_username: r.owner_username,
            waste_type,
            category,
            amount: r.amount,
            total_weight: r.total_weight,
            date_logged: r.date_logged,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WasteTypeTotalRow {
    waste_type: String,
    total_amount: f64,
    entries: i64,
}

/// Escapes LIKE metacharacters so user text is matched literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_waste_filters(qb: &mut QueryBuilder<'_, Postgres>, c: &WasteCriteria) {
    qb.push(" WHERE TRUE");
    match c.owner {
        OwnerScope::All => {}
        OwnerScope::Owner(id) => {
            qb.push(" AND owner_id = ").push_bind(id);
        }
        OwnerScope::Nobody => {
            qb.push(" AND FALSE");
        }
    }
    if let Some(category) = &c.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(waste_type) = &c.waste_type {
        qb.push(" AND waste_type = ").push_bind(waste_type.clone());
    }
    if let Some(from) = c.date_range.from {
        qb.push(" AND date_logged >= ").push_bind(from);
    }
    if let Some(to) = c.date_range.to {
        qb.push(" AND date_logged <= ").push_bind(to);
    }
    if let Some(text) = &c.owner_username_contains {
        qb.push(" AND owner_username ILIKE ").push_bind(like_pattern(text));
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, c: &UserCriteria) {
    if let Some(search) = &c.search {
        let pattern = like_pattern(search);
        qb.push(" WHERE (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// `LIMIT` and `OFFSET` as Postgres BIGINTs; values past `i64::MAX` saturate.
fn page_bounds(page: Page) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.skip).unwrap_or(i64::MAX),
    )
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    let (limit, offset) = page_bounds(page);
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
}

fn unique_violation(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Conflict("Email already registered".into())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation)?;
        row.try_into()
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_users(&self, criteria: &UserCriteria, page: Page) -> Result<Vec<User>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filters(&mut qb, criteria);
        qb.push(" ORDER BY created_at DESC");
        push_page(&mut qb, page);
        qb.build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn count_users(&self, criteria: &UserCriteria) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut qb, criteria);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn save_user(&self, user: &User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET username = $2, email = $3, password_hash = $4, role = $5, updated_at = $6
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation)?;
        row.try_into()
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        // waste_logs.owner_id is not a foreign key; logs outlive their owner
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_waste(&self, log: WasteLog) -> Result<WasteLog, StoreError> {
        let row = sqlx::query_as::<_, WasteLogRow>(&format!(
            r#"
            INSERT INTO waste_logs (id, owner_id, owner_username, waste_type, category, amount,
                                    total_weight, date_logged, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {WASTE_COLUMNS}
            "#
        ))
        .bind(log.id)
        .bind(log.owner_id)
        .bind(&log.owner_username)
        .bind(log.waste_type.as_str())
        .bind(log.category.as_str())
        .bind(log.amount)
        .bind(log.total_weight)
        .bind(log.date_logged)
        .bind(log.created_at)
        .bind(log.updated_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_waste(&self, id: Uuid) -> Result<Option<WasteLog>, StoreError> {
        sqlx::query_as::<_, WasteLogRow>(&format!(
            "SELECT {WASTE_COLUMNS} FROM waste_logs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(WasteLog::try_from)
        .transpose()
    }

    async fn find_waste_logs(
        &self,
        criteria: &WasteCriteria,
        page: Option<Page>,
    ) -> Result<Vec<WasteLog>, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {WASTE_COLUMNS} FROM waste_logs"));
        push_waste_filters(&mut qb, criteria);
        qb.push(" ORDER BY date_logged DESC");
        if let Some(page) = page {
            push_page(&mut qb, page);
        }
        qb.build_query_as::<WasteLogRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(WasteLog::try_from)
            .collect()
    }

    async fn count_waste_logs(&self, criteria: &WasteCriteria) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM waste_logs");
        push_waste_filters(&mut qb, criteria);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn save_waste(&self, log: &WasteLog) -> Result<WasteLog, StoreError> {
        let row = sqlx::query_as::<_, WasteLogRow>(&format!(
            r#"
            UPDATE waste_logs
               SET waste_type = $2, category = $3, amount = $4, date_logged = $5, updated_at = $6
             WHERE id = $1
            RETURNING {WASTE_COLUMNS}
            "#
        ))
        .bind(log.id)
        .bind(log.waste_type.as_str())
        .bind(log.category.as_str())
        .bind(log.amount)
        .bind(log.date_logged)
        .bind(log.updated_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn delete_waste(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM waste_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn waste_totals_by_type(
        &self,
        criteria: &WasteCriteria,
    ) -> Result<Vec<WasteTypeTotal>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT waste_type, SUM(amount) AS total_amount, COUNT(*) AS entries FROM waste_logs",
        );
        push_waste_filters(&mut qb, criteria);
        qb.push(" GROUP BY waste_type");
        qb.build_query_as::<WasteTypeTotalRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| {
                let waste_type = WasteType::parse(&r.waste_type).ok_or_else(|| {
                    StoreError::Corrupt(format!("unknown waste type `{}`", r.waste_type))
                })?;
                Ok(WasteTypeTotal {
                    waste_type,
                    total_amount: r.total_amount,
                    entries: r.entries as u64,
                })
            })
            .collect()
    }
}
