use std::{process, sync::Arc};

use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use mnemo::{
    application::{cards::CardService, error::AppError},
    cache::{AggregateStore, CacheConfig, CacheState},
    config,
    infra::{
        health::HealthState,
        http::{ApiState, RouterState, build_router},
        repo::CardRepo,
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    // Startup can fail before telemetry is installed.
    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let settings = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(AggregateStore::new(&cache_config));
    let repo = Arc::new(CardRepo::new());

    let state = RouterState {
        api: ApiState {
            cards: CardService::new(Arc::clone(&repo), Arc::clone(&store)),
        },
        cache: CacheState {
            config: cache_config,
            store,
        },
        health: HealthState { database: repo },
    };

    let router = build_router(state);
    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(mnemo::infra::error::InfraError::from)?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(mnemo::infra::error::InfraError::from)?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(error) => error!(error = %error, "failed to listen for shutdown signal"),
    }
}
