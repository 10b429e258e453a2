//! AION — memory-augmented streaming chat server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use aion_server::{build_router, AppState};

fn resolve_data_dir() -> PathBuf {
    std::env::var("AION_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                println!("AION — memory-augmented chat server");
                println!();
                println!("Usage: aion [command]");
                println!();
                println!("Commands:");
                println!("  (none)    Start the server");
                println!("  help      Show this help message");
                println!();
                println!("Environment:");
                println!("  PORT, AION_DATA_DIR, OPENAI_API_KEY, OPENAI_BASE_URL,");
                println!("  ANTHROPIC_API_KEY, ANTHROPIC_BASE_URL, OLLAMA_BASE_URL, OLLAMA_MODEL");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'aion help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = aion_core::AionConfig::from_env(&data_dir)?;
    let port = config.port;

    let embedder = aion_infer::create_embedder(&config.data_paths.models);
    let collection = aion_store::SqliteCollection::open(
        &config.data_paths.chroma_db,
        &config.collection,
        embedder,
    )
    .map_err(|e| anyhow::anyhow!("Failed to open memory collection: {}", e))?;

    let state = Arc::new(AppState::new(config, Arc::new(collection)));

    // Start background memory writer
    if let Some(rx) = state.take_memory_rx() {
        aion_chat::start_memory_writer(state.memory.clone(), rx);
    }

    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("AION server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
