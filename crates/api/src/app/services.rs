use std::sync::Arc;

use anyhow::Context;

use backoffice_infra::{AppConfig, BackOffice, BookStore, InMemoryBookStore, PostgresBookStore};

/// Store behind the router. Selected once at startup.
pub type SharedStore = Arc<dyn BookStore>;

/// Everything handlers need, shared through an `Extension`.
pub struct AppServices {
    pub back_office: BackOffice<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, config: &AppConfig) -> Self {
        Self {
            back_office: BackOffice::new(store, config.environment, config.ledger_recent_limit),
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORES is enabled")?;
        let store = PostgresBookStore::connect(url)
            .await
            .context("failed to connect to postgres")?;
        tracing::info!("using postgres book store");
        Arc::new(store)
    } else {
        tracing::info!("using in-memory book store");
        Arc::new(InMemoryBookStore::new())
    };

    Ok(AppServices::new(store, config))
}
