// Lists monitored hosts with their interfaces and the latest history of one item.
//
//   ZABBIX_URL=https://zabbix.example.com/api_jsonrpc.php \
//   ZABBIX_USER=Admin ZABBIX_PASSWORD=zabbix \
//   cargo run --example host_inventory -- 23296

use anyhow::Result;
use serde_json::json;
use tracing::info;
use zabbix_rpc_client::{logging, Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging(None)?;

    let client = Client::new(ClientConfig::from_env()?)?;
    info!("API version {}", client.version().await?);

    client.authenticate().await?;

    let hosts = client
        .hosts("get", json!({"output": ["hostid", "host", "status"]}))
        .await?;
    for host in &hosts {
        let hostid = host.get_str("hostid").unwrap_or_default();
        let interfaces = client
            .host_interfaces("get", json!({"hostids": [hostid], "output": ["ip", "port"]}))
            .await?;
        println!(
            "{:<8} {:<32} {} interface(s)",
            hostid,
            host.get_str("host").unwrap_or("?"),
            interfaces.len()
        );
    }

    if let Some(itemid) = std::env::args().nth(1) {
        let history = client
            .history(
                "get",
                json!({
                    "itemids": [itemid],
                    "history": 0,
                    "sortfield": "clock",
                    "sortorder": "DESC",
                    "limit": 10
                }),
            )
            .await?;
        for sample in history {
            println!("{} {} = {}", sample.clock, sample.itemid, sample.value);
        }
    }

    client.deauthenticate().await?;
    Ok(())
}
