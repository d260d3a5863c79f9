//! Clientele demo entry point
//!
//! Loads configuration from the environment, opens the JSON document store,
//! wires the entity caches into the user service and walks through the
//! cached read and write paths once.

use std::sync::Arc;

use chrono::NaiveDate;
use clientele_core::{
    Client, ClientId, ClienteleConfig, ClienteleError, ClienteleResult, ConfigError, DomainError,
    EntityIdType,
};
use clientele_service::constants::{IMPORTANT_CLIENT, VERY_IMPORTANT_CLIENT};
use clientele_service::{NewUser, UserService};
use clientele_storage::{
    spawn_sweeper, ClientCache, EntityCache, ExpirySweep, JsonFileStore, UserCache,
};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_EMAIL: &str = "demo.user@example.com";

#[tokio::main]
async fn main() -> ClienteleResult<()> {
    init_tracing()?;

    let config = ClienteleConfig::from_env();
    config.validate()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        ttl_secs = config.cache.ttl.as_secs(),
        item_limit = config.cache.item_limit,
        collection_item_limit = config.cache.collection_item_limit,
        "Configuration loaded"
    );

    let store = Arc::new(JsonFileStore::new(&config.db_path));
    tracing::debug!(path = %store.path().display(), "Opened JSON document store");
    let users: UserCache<JsonFileStore> =
        EntityCache::from_settings(Arc::clone(&store), &config.cache)?;
    let clients: ClientCache<JsonFileStore> =
        EntityCache::from_settings(Arc::clone(&store), &config.cache)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = config.cache.sweep_interval.map(|period| {
        let caches: Vec<Arc<dyn ExpirySweep>> = vec![
            Arc::clone(users.records()) as Arc<dyn ExpirySweep>,
            Arc::clone(users.collections()) as Arc<dyn ExpirySweep>,
            Arc::clone(clients.records()) as Arc<dyn ExpirySweep>,
            Arc::clone(clients.collections()) as Arc<dyn ExpirySweep>,
        ];
        spawn_sweeper(caches, period, shutdown_rx)
    });

    let service = UserService::new(users, clients);
    run_demo(&service).await?;

    if let Some(handle) = sweeper {
        tracing::info!("Sweeper running, press Ctrl-C to exit");
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        }
        // The receiver may already be gone if the task ended early.
        let _ = shutdown_tx.send(true);
        match handle.await {
            Ok(purged) => tracing::info!(purged, "Sweeper stopped"),
            Err(e) => tracing::warn!(error = %e, "Sweeper task failed"),
        }
    }

    Ok(())
}

fn init_tracing() -> ClienteleResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| {
            ClienteleError::Config(ConfigError::InvalidValue {
                field: "tracing".to_string(),
                value: "subscriber".to_string(),
                reason: e.to_string(),
            })
        })
}

async fn run_demo(service: &UserService<JsonFileStore, JsonFileStore>) -> ClienteleResult<()> {
    let clients = ensure_clients(service).await?;
    let Some(important) = clients.iter().find(|c| c.name == IMPORTANT_CLIENT) else {
        tracing::warn!(client = IMPORTANT_CLIENT, "Client tier missing, skipping registration");
        return Ok(());
    };

    let request = NewUser {
        firstname: "Demo".to_string(),
        surname: "User".to_string(),
        email: DEMO_EMAIL.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(NaiveDate::MIN),
        client_id: important.id,
    };

    match service.add_user(request).await {
        Ok(user) => tracing::info!(
            user_id = %user.id,
            credit_limit = ?user.credit_limit,
            "Registered demo user"
        ),
        Err(ClienteleError::Domain(DomainError::EmailTaken { email })) => {
            tracing::info!(email = %email, "Demo user already registered")
        }
        Err(e) => return Err(e),
    }

    // Second lookup is served from cache.
    for _ in 0..2 {
        let found = service.get_user_by_email(DEMO_EMAIL).await?;
        tracing::info!(found = found.is_some(), "Looked up demo user by email");
    }
    let all = service.get_all_users().await?;
    tracing::info!(count = all.len(), "Listed users");

    let stats = service.users().record_stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.entry_count,
        hit_rate = stats.hit_rate(),
        "User record cache statistics"
    );
    Ok(())
}

/// Seed one client per tier when the document has none.
async fn ensure_clients(
    service: &UserService<JsonFileStore, JsonFileStore>,
) -> ClienteleResult<Vec<Client>> {
    let existing = service.get_all_clients().await?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let mut seeded = Vec::new();
    for name in [VERY_IMPORTANT_CLIENT, IMPORTANT_CLIENT, "OrdinaryClient"] {
        let client = Client {
            id: ClientId::now_v7(),
            name: name.to_string(),
        };
        seeded.push(service.clients().create(client).await?);
    }
    tracing::info!(count = seeded.len(), "Seeded clients");
    Ok(seeded)
}
