use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::config::{AdminBootstrap, AppConfig, StoreConfig};
use crate::store::{MemoryStore, PgStore, RecordStore};
use crate::users::model::{NewUser, Role};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.store {
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let pg = PgStore::connect(database_url, *max_connections).await?;
                if let Err(e) = pg.migrate().await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg) as Arc<dyn RecordStore>
            }
            StoreConfig::Memory => {
                warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>
            }
        };

        let state = Self::from_parts(store, config);
        if let Some(admin) = state.config.admin.clone() {
            state.bootstrap_admin(&admin).await?;
        }
        Ok(state)
    }

    pub fn from_parts(store: Arc<dyn RecordStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Empty in-memory state with a fixed JWT secret.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(AppConfig::in_memory("test-secret")),
        )
    }

    /// Creates the configured admin unless an account with that email exists.
    async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> anyhow::Result<()> {
        if self.store.find_user_by_email(&admin.email).await?.is_some() {
            return Ok(());
        }
        let user = NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash: hash_password(&admin.password)?,
            role: Role::Admin,
        }
        .build();
        let user = self.store.insert_user(user).await?;
        info!(user_id = %user.id, email = %user.email, "bootstrap admin created");
        Ok(())
    }
}
