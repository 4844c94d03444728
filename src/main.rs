use std::sync::Arc;

use tokio::sync::Notify;

mod api;
mod client;
mod config;
mod http;
mod logger;
mod routing;
mod server;

use client::HttpProfileClient;

const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real deployments set the variables directly
    dotenvy::dotenv().ok();

    let config_path = config_path_from_args(std::env::args().skip(1))?;
    let cfg = match config::Config::load_from(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[ERROR] Failed to load configuration: {e}");
            return Err(e.into());
        }
    };
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let credentials = cfg.credentials()?;

    let client = match HttpProfileClient::connect(&cfg.upstream, credentials).await {
        Ok(client) => client,
        Err(e) => {
            logger::log_error(&format!("Upstream client initialization failed: {e}"));
            return Err(e.into());
        }
    };
    let state = Arc::new(config::AppState::new(&cfg, Arc::new(client)));

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    // LocalSet for spawn_local per connection
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state, shutdown))
        .await;

    logger::log_info("Server stopped");
    Ok(())
}

/// Parse `--config <path>` / `-c <path>`; anything else is an error
fn config_path_from_args(mut args: impl Iterator<Item = String>) -> Result<String, String> {
    let mut path = DEFAULT_CONFIG_PATH.to_string();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                path = args
                    .next()
                    .ok_or_else(|| format!("{arg} requires a path argument"))?;
            }
            other => {
                if let Some(value) = other.strip_prefix("--config=") {
                    path = value.to_string();
                } else {
                    return Err(format!("Unknown argument: {other}"));
                }
            }
        }
    }
    Ok(path)
}
