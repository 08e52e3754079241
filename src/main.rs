use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio::io::BufReader;
use tokio_stream::wrappers::LinesStream;

use powerstats::config::{default_config_path, PowerModel, ServiceConfig};
use powerstats::events::{EventBroker, RawEvent};
use powerstats::ipc::StatsServer;
use powerstats::stats::BatteryStatsService;
use powerstats::{configure_logging, BatteryStatsClient};

#[tokio::main]
async fn main() {
    let config = ServiceConfig::load_from_path(&default_config_path()).unwrap_or_else(|e| {
        eprintln!("Falling back to default configuration: {}", e);
        ServiceConfig::default()
    });
    if let Err(e) = configure_logging(config.log_level, config.log_file.clone(), true) {
        eprintln!("Failed to configure logging: {}", e);
    }

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    match command {
        "serve" => {
            if let Err(e) = serve(config).await {
                eprintln!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        "dump" => {
            let client = BatteryStatsClient::new(config.socket_path.clone());
            println!("{}", client.shell_dump(&args[2..]).await);
        }
        "stats" => {
            let client = BatteryStatsClient::new(config.socket_path.clone());
            for info in client.get_battery_stats().await {
                println!(
                    "uid={} user={} type={} power={:.6} mAh",
                    info.uid,
                    info.user_id,
                    info.consumption_type.name(),
                    info.total_power_mah
                );
            }
        }
        "reset" => {
            let client = BatteryStatsClient::new(config.socket_path.clone());
            client.reset().await;
        }
        _ => print_usage(),
    }
}

/// Run the daemon: serve the stats socket and ingest JSON event lines
/// from stdin
async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;

    let model = match &config.power_model_path {
        Some(path) => PowerModel::load_from_path(path)
            .with_context(|| format!("loading power model from {}", path.display()))?,
        None => PowerModel::default(),
    };

    let service = Arc::new(BatteryStatsService::new(&config, model));
    let mut broker = EventBroker::new();
    let feed = broker.sender();
    broker.start(service.clone());

    // Feed reader: one JSON event per line
    tokio::spawn(async move {
        use tokio::io::AsyncBufReadExt;
        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Event feed read error: {}", e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEvent>(line) {
                Ok(event) => {
                    if feed.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("Skipping malformed event line: {}", e),
            }
        }
        log::info!("Event feed closed");
    });

    StatsServer::new(service, config.socket_path.clone())
        .run()
        .await
        .context("stats server failed")
}

fn print_usage() {
    println!("powerstatsd - battery statistics service");
    println!();
    println!("Usage: powerstatsd [command]");
    println!();
    println!("Commands:");
    println!("  serve    Run the daemon (default); reads JSON events from stdin");
    println!("  stats    Print the accumulated consumption list");
    println!("  dump     Print the shell dump");
    println!("  reset    Zero all accumulated statistics");
}
