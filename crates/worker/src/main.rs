use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipforge_worker::{Processor, WorkerCommand, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let command = match WorkerCommand::from_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(unknown) => {
            eprintln!("unknown command: {unknown} (expected \"run\" or \"requeue\")");
            std::process::exit(2);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipforge_worker=debug,clipforge_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Cannot connect to the database");
            std::process::exit(1);
        }
    };

    if let Err(e) = clipforge_db::migrate(&pool).await {
        tracing::error!(error = %e, "Migrations failed");
        std::process::exit(1);
    }

    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let processor = Processor::new(pool, &config);

    if command == WorkerCommand::RequeueFailed {
        match processor.requeue_failed().await {
            Ok(requeued) => {
                tracing::info!(requeued, "Requeue sweep finished");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Requeue sweep failed");
                std::process::exit(1);
            }
        }
    }

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    tracing::info!(
        poll_interval_secs = config.poll_interval_secs,
        vram_budget_mb = config.vram_budget_mb,
        "Worker starting",
    );

    let mut interval = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                // Drain the queue before going back to sleep.
                while !token.is_cancelled() {
                    match processor.process_next().await {
                        Ok(Some(_)) => continue,
                        Ok(None) => break,
                        Err(e) => {
                            tracing::error!(error = %e, "Worker iteration failed");
                            break;
                        }
                    }
                }
            }
        }
    }

    tracing::info!("Worker stopped");
}
