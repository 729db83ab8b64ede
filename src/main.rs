use anyhow::Result;
use car_rental::{config, db, state::AppState};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting car-rental with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    tracing::debug!("Connecting to {}", cfg.database_url);
    let db = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }
    if cfg.auto_migrate {
        db::run_migrations(&db).await?;
    }

    // --- Initialize services ---
    let state = AppState::new(db, cfg.bcrypt_cost);

    if let Some(admin) = &cfg.admin {
        let identity = state
            .accounts
            .ensure_admin(&admin.email, &admin.password, &admin.name)
            .await?;
        tracing::info!(user_id = identity.id, "Administrator account ready: {}", identity.email);
    } else {
        tracing::warn!("No CAR_RENTAL_ADMIN_EMAIL/CAR_RENTAL_ADMIN_PASSWORD set; admin endpoints need an existing admin account");
    }

    let app = car_rental::app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
