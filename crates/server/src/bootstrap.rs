use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use craftquote_client::HttpRuleRepository;
use craftquote_core::config::AppConfig;
use craftquote_core::pricing::{DeterministicPricingEngine, PricingEngine};
use craftquote_core::repository::{RepositoryError, RuleRepository};
use craftquote_core::RuleSnapshotCache;
use craftquote_db::repositories::{SqlRuleRepository, SqlTemplateRepository};
use craftquote_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<dyn PricingEngine>,
    pub rules: Arc<SqlRuleRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("rule backend client setup failed: {0}")]
    BackendClient(#[source] RepositoryError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let rules = Arc::new(SqlRuleRepository::new(db_pool.clone()));
    let engine = build_engine(&config, &db_pool, Arc::clone(&rules))
        .map_err(BootstrapError::BackendClient)?;

    Ok(Application { config, db_pool, engine, rules })
}

/// Rule source selection: a configured remote backend wins over the local
/// database; the snapshot cache wraps whichever source is chosen.
fn build_engine(
    config: &AppConfig,
    db_pool: &DbPool,
    sql_rules: Arc<SqlRuleRepository>,
) -> Result<Arc<dyn PricingEngine>, RepositoryError> {
    let rule_source: Arc<dyn RuleRepository> = match &config.backend.base_url {
        Some(_) => {
            info!(
                event_name = "system.bootstrap.rule_source",
                source = "http_backend",
                "pricing rules served by remote backend"
            );
            Arc::new(HttpRuleRepository::from_config(&config.backend)?)
        }
        None => {
            info!(
                event_name = "system.bootstrap.rule_source",
                source = "local_database",
                "pricing rules served by local database"
            );
            sql_rules
        }
    };

    let rule_source: Arc<dyn RuleRepository> = if config.cache.enabled {
        Arc::new(RuleSnapshotCache::new(
            rule_source,
            Duration::from_secs(config.cache.ttl_secs),
        ))
    } else {
        rule_source
    };

    let templates = Arc::new(SqlTemplateRepository::new(db_pool.clone()));
    Ok(Arc::new(DeterministicPricingEngine::new(templates, rule_source)))
}
