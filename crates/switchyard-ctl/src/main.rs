//! switchyard-ctl — command-line interface for the Switchyard gateway.

mod cmd;

use anyhow::{Context, Result};
use switchyard_core::GatewayConfig;
use tracing_subscriber::EnvFilter;

use cmd::announce::cmd_announce;
use cmd::peers::{cmd_health, cmd_peers, cmd_register};
use cmd::supported::cmd_supported;

const DEFAULT_GATEWAY: &str = "http://127.0.0.1:4020";

fn print_usage() {
    println!("Usage: switchyard-ctl [--gateway <url>]... [--interval <secs>] <command>");
    println!();
    println!("Commands:");
    println!("  peers             List the gateway's active peer set");
    println!("  supported         Show kinds aggregated across peers");
    println!("  health            Show registry and sticky-routing counts");
    println!("  register <url>    Register a facilitator peer once");
    println!("  announce <url>    Heartbeat <url> to every gateway until Ctrl-C");
    println!();
    println!("Options:");
    println!("  --gateway <url>    Gateway base URL, repeatable (default: {})", DEFAULT_GATEWAY);
    println!("  --interval <secs>  Heartbeat interval for announce (min 5)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut gateways: Vec<String> = Vec::new();
    let mut interval_secs: Option<u64> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--gateway" => {
                i += 1;
                gateways.push(args.get(i).context("--gateway requires a value")?.clone());
            }
            "--interval" => {
                i += 1;
                interval_secs = Some(
                    args.get(i)
                        .context("--interval requires a value")?
                        .parse()
                        .context("--interval must be a number")?,
                );
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let config = GatewayConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        GatewayConfig::default()
    });
    if gateways.is_empty() {
        gateways = config.heartbeat.gateways.clone();
    }
    if gateways.is_empty() {
        gateways.push(DEFAULT_GATEWAY.to_string());
    }
    let gateway = gateways[0].as_str();

    match remaining.as_slice() {
        ["peers"] | []                 => cmd_peers(gateway).await,
        ["supported"]                  => cmd_supported(gateway).await,
        ["health"]                     => cmd_health(gateway).await,
        ["register", url]              => cmd_register(gateway, url).await,
        ["announce", url]              => {
            let mut heartbeat = config.heartbeat.clone();
            heartbeat.self_url = url.to_string();
            heartbeat.gateways = gateways.clone();
            if let Some(secs) = interval_secs {
                heartbeat.interval_ms = secs.saturating_mul(1000);
            }
            cmd_announce(heartbeat).await
        }
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
