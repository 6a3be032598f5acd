//! Zabbix API command-line client
//!
//! ```text
//! zabbix-rpc version
//! zabbix-rpc call <group> <action> [params-json]
//! ```
//!
//! Connection settings come from `ZABBIX_URL`, `ZABBIX_USER`,
//! `ZABBIX_PASSWORD` and `ZABBIX_TIMEOUT_MS`; `ZABBIX_LOG_DIR` adds a
//! rolling log file.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info};
use zabbix_rpc_client::{logging, Client, ClientConfig};

const USAGE: &str = "usage: zabbix-rpc version | zabbix-rpc call <group> <action> [params-json]";

enum Command {
    Version,
    Call {
        group: String,
        action: String,
        params: Value,
    },
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [cmd] if cmd == "version" => Ok(Command::Version),
        [cmd, group, action] if cmd == "call" => Ok(Command::Call {
            group: group.clone(),
            action: action.clone(),
            params: json!({}),
        }),
        [cmd, group, action, params] if cmd == "call" => Ok(Command::Call {
            group: group.clone(),
            action: action.clone(),
            params: serde_json::from_str(params).context("params must be valid JSON")?,
        }),
        _ => bail!(USAGE),
    }
}

async fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Version => {
            let version = client.version().await.context("Failed to query API version")?;
            println!("{}", version);
        }
        Command::Call {
            group,
            action,
            params,
        } => {
            client.authenticate().await.context("Login failed")?;
            let outcome = client.call(&group, &action, params).await;
            if let Err(e) = client.deauthenticate().await {
                error!("Logout failed: {}", e);
            }

            let collection = outcome.with_context(|| format!("{}.{} failed", group, action))?;
            info!("{}.{} returned {} entries", group, action, collection.len());
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_dir = std::env::var_os("ZABBIX_LOG_DIR").map(PathBuf::from);
    logging::init_logging(log_dir.as_deref())?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = ClientConfig::from_env()?;
    info!("Using Zabbix API at {}", config.url);
    let client = Client::new(config)?;

    run(&client, command).await
}
