use std::sync::Arc;

use taskloom::channels::{ConsoleFrontEnd, FrontEnd};
use taskloom::config::RunnerConfig;
use taskloom::handlers::HandlerRegistry;
use taskloom::store::LibSqlStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = RunnerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🧵 taskloom v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Workers: {}", config.max_workers);

    let store = LibSqlStore::new_local(&config.db_path)
        .await
        .unwrap_or_else(|e| {
            eprintln!(
                "Error: Failed to open database at {}: {}",
                config.db_path.display(),
                e
            );
            std::process::exit(1);
        });

    let registry = Arc::new(HandlerRegistry::with_builtins());
    eprintln!("   Handlers: {}\n", registry.names().join(", "));

    let front_end: Arc<dyn FrontEnd> = Arc::new(ConsoleFrontEnd::stdio(&config));
    let snapshot = taskloom::run_workload(&store, registry, front_end, &config).await?;

    eprintln!("   Saved {} task(s) for next run", snapshot.len());
    Ok(())
}
