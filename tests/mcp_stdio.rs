use std::path::{Path, PathBuf};

use fleetseek::{ClientRecord, FleetDb};
use rmcp::{
    ServiceExt,
    model::CallToolRequestParams,
    service::{Peer, RoleClient},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;

fn setup_fixture(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = FleetDb::open(&data_dir.join("fleet.redb"))?;

    let mut clients: Vec<ClientRecord> = (0..5)
        .map(|n| {
            ClientRecord::new(&format!("C.100000000000000{n}"))
                .with_host(&format!("Host-{n}"), &format!("Host-{n}.example.com"))
                .with_ip(&format!("192.168.0.{n}"))
                .with_mac(&format!("aabbccddee0{n}"))
        })
        .collect();
    clients[0].add_label("common_test_label", "test");
    clients[0].add_label("unique_test_label", "test");
    clients[1].add_label("common_test_label", "test");
    db.batch_put_clients(&clients)?;
    db.set_hunt("H:1A2B3C4D", "demo hunt")?;

    Ok(())
}

async fn call(
    peer: &Peer<RoleClient>,
    tool: &str,
    args: serde_json::Value,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let result = peer
        .call_tool(
            CallToolRequestParams::new(tool.to_string())
                .with_arguments(args.as_object().unwrap().clone()),
        )
        .await?;
    Ok(result.structured_content.expect("structured content"))
}

#[tokio::test]
async fn mcp_stdio_search_roundtrip() -> Result<(), Box<dyn std::error::Error>>
{
    let tempdir = tempfile::tempdir()?;
    setup_fixture(tempdir.path())?;

    let bin = fleetseek_bin()?;
    let transport = TokioChildProcess::new(
        tokio::process::Command::new(bin).configure(|cmd| {
            cmd.arg("mcp").env("FLEETSEEK_DATA_DIR", tempdir.path());
        }),
    )?;

    let client = ().serve(transport).await?;

    let all = call(client.peer(), "fleet_search", json!({ "query": "" })).await?;
    assert_eq!(all.get("resultCount").and_then(|v| v.as_u64()), Some(5));

    let labelled = call(
        client.peer(),
        "fleet_search",
        json!({ "query": "label:common_test_label" }),
    )
    .await?;
    assert_eq!(labelled.get("resultCount").and_then(|v| v.as_u64()), Some(2));

    let hunt =
        call(client.peer(), "fleet_search", json!({ "query": "H:1A2B3C4D" })).await?;
    assert_eq!(hunt.get("kind").and_then(|v| v.as_str()), Some("job"));

    let missing =
        call(client.peer(), "fleet_search", json!({ "query": "H:12345678" })).await?;
    assert_eq!(missing.get("kind").and_then(|v| v.as_str()), Some("clients"));
    assert_eq!(missing.get("resultCount").and_then(|v| v.as_u64()), Some(0));

    let completions = call(
        client.peer(),
        "fleet_complete_label",
        json!({ "prefix": "common_" }),
    )
    .await?;
    assert_eq!(
        completions.get("completions"),
        Some(&json!(["label:common_test_label"]))
    );

    let before = call(
        client.peer(),
        "fleet_search",
        json!({ "query": "label:late_label" }),
    )
    .await?;
    assert_eq!(before.get("resultCount").and_then(|v| v.as_u64()), Some(0));

    call(
        client.peer(),
        "fleet_upsert_client",
        json!({
            "client": {
                "client_id": "C.1000000000000003",
                "hostname": "Host-3",
                "labels": [{ "name": "late_label", "owner": "admin" }],
            }
        }),
    )
    .await?;

    let after = call(
        client.peer(),
        "fleet_search",
        json!({ "query": "label:late_label" }),
    )
    .await?;
    assert_eq!(after.get("resultCount").and_then(|v| v.as_u64()), Some(1));
    let total = call(client.peer(), "fleet_search", json!({ "query": "" })).await?;
    assert_eq!(total.get("resultCount").and_then(|v| v.as_u64()), Some(5));

    let removed = call(
        client.peer(),
        "fleet_remove_client",
        json!({ "clientId": "C.1000000000000003" }),
    )
    .await?;
    assert_eq!(removed.get("removed"), Some(&json!(true)));
    let total = call(client.peer(), "fleet_search", json!({ "query": "" })).await?;
    assert_eq!(total.get("resultCount").and_then(|v| v.as_u64()), Some(4));

    client.cancel().await?;
    Ok(())
}

fn fleetseek_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(bin) = std::env::var("CARGO_BIN_EXE_fleetseek") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("fleetseek");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}
