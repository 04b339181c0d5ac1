use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{
    jwt::JwtKeys,
    repo::{PgUserStore, UserStore},
    services::AuthService,
};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the auth service.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;
        Ok(Self::from_parts(&config, Arc::new(PgUserStore::new(pool))))
    }

    pub fn from_parts(config: &AppConfig, users: Arc<dyn UserStore>) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            auth: AuthService::new(users, keys),
        }
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[cfg(test)]
impl AppState {
    pub fn fake() -> (Self, Arc<crate::auth::memory::InMemoryUserStore>) {
        let store = Arc::new(crate::auth::memory::InMemoryUserStore::new());
        let state = Self::from_parts(&AppConfig::for_tests(), store.clone());
        (state, store)
    }
}
