use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::jwt::TokenService;
use crate::config::AppConfig;
use crate::db;
use crate::users::{
    memory::MemoryDirectory,
    repo::{PgUserDirectory, UserDirectory},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn UserDirectory>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let directory = match config.database_url.as_deref() {
            Some(url) => {
                let pool = db::connect(url, config.max_connections).await?;
                // Migrations may be managed outside the service.
                if let Err(e) = db::migrate(&pool).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserDirectory::new(pool)) as Arc<dyn UserDirectory>
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryDirectory::default()) as Arc<dyn UserDirectory>
            }
        };

        let tokens = Arc::new(TokenService::from_config(&config.jwt)?);
        info!(ttl_minutes = tokens.ttl().whole_minutes(), "token service ready");

        Ok(Self::from_parts(config, directory, tokens))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        directory: Arc<dyn UserDirectory>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            config,
            directory,
            tokens,
        }
    }

    /// Memory-backed state holding the two sample users.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            database_url: None,
            max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_minutes: 60,
            },
            seed_sample_data: true,
            host: "127.0.0.1".into(),
            port: 0,
        });
        let directory = Arc::new(MemoryDirectory::default()) as Arc<dyn UserDirectory>;
        crate::users::seed::seed_sample_users(directory.as_ref())
            .await
            .expect("seed sample users");
        let tokens = Arc::new(TokenService::from_config(&config.jwt).expect("test ttl"));
        Self::from_parts(config, directory, tokens)
    }
}
