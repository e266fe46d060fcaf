use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use webcat::config::{AppState, Config};
use webcat::logger;
use webcat::server::{self, SignalHandler};

const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // 创建 Tokio 运行时，根据 workers 配置设置线程数
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let events = logger::event_log_from_config(&cfg.logging);
    let grace = Duration::from_secs(cfg.performance.shutdown_grace);
    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(AppState::open(cfg, events).await?);

    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;
    let active_connections = Arc::new(AtomicUsize::new(0));

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            server::start_server_loop(
                listener,
                state,
                Arc::clone(&active_connections),
                signals,
            )
            .await;

            let left = server::drain_connections(&active_connections, grace).await;
            if left > 0 {
                logger::log_warning(&format!(
                    "Shutting down with {left} connection(s) still open"
                ));
            }
        })
        .await;

    logger::log_info("Server stopped");
    Ok(())
}
