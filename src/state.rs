use std::collections::HashMap;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{broadcast, Mutex};
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::estimation::{GroqEstimator, NutritionEstimator};
use crate::events::DataChanged;
use crate::meals::entry::EntrySession;
use crate::meals::records::RecordLifecycle;
use crate::meals::repo::{MealStore, PgStore, WaterStore};

/// Everything a user does between requests lives here: the in-flight
/// entry draft and the loaded meal collection.
pub struct UserSession {
    pub entry: EntrySession,
    pub records: RecordLifecycle,
}

impl UserSession {
    fn new() -> Self {
        Self {
            entry: EntrySession::new(crate::dates::today()),
            records: RecordLifecycle::new(),
        }
    }
}

/// Per-user session registry. The inner mutex serializes all entry and
/// record mutations for one user, which is what makes double submits
/// and concurrent water taps safe.
#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<UserSession>>>>>,
}

impl Sessions {
    pub async fn for_user(&self, user_id: Uuid) -> Arc<Mutex<UserSession>> {
        let mut map = self.inner.lock().await;
        map.entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserSession::new())))
            .clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub estimator: Arc<dyn NutritionEstimator>,
    pub meals: Arc<dyn MealStore>,
    pub water: Arc<dyn WaterStore>,
    pub sessions: Sessions,
    pub changes: broadcast::Sender<DataChanged>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        info!("database pool ready");

        let store = Arc::new(PgStore::new(db.clone()));
        let estimator = Arc::new(GroqEstimator::new(&config.estimator));
        let (changes, _) = broadcast::channel(64);

        Ok(Self {
            db,
            config: Arc::new(config),
            estimator,
            meals: store.clone(),
            water: store,
            sessions: Sessions::default(),
            changes,
        })
    }

    /// Test state: lazy pool that never connects, unconfigured
    /// estimator.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{EstimatorConfig, JwtConfig};

        let config = AppConfig {
            database_url: "postgres://localhost/unused".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "thoughtforfood".into(),
                audience: "thoughtforfood-users".into(),
                ttl_minutes: 60,
                recovery_ttl_minutes: 30,
            },
            estimator: EstimatorConfig {
                api_key: None,
                base_url: "http://127.0.0.1:1".into(),
                model: "llama-3.3-70b-versatile".into(),
            },
        };

        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let store = Arc::new(PgStore::new(db.clone()));
        let estimator = Arc::new(GroqEstimator::new(&config.estimator));
        let (changes, _) = broadcast::channel(8);

        Self {
            db,
            config: Arc::new(config),
            estimator,
            meals: store.clone(),
            water: store,
            sessions: Sessions::default(),
            changes,
        }
    }
}
