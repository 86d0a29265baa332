use std::sync::Arc;

use clap::Parser;
use fleetseek::{
    cli::{self, ClientAction, Cli, Command, ConfigAction, HuntAction},
    data_dir::DataDir,
    error,
    fleet_db::FleetDb,
    mcp,
    search::{self, RegistryPolicy},
    snapshot,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default log directives: this crate at the requested level, other targets
/// held at warn so the MCP server stays quiet on stderr.
fn log_directives(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn,fleetseek=warn",
        (false, 0) => "warn,fleetseek=info",
        (false, 1) => "warn,fleetseek=debug",
        // -vv and up opens every target.
        (false, _) => "trace",
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match std::env::var("FLEETSEEK_LOG") {
        Ok(env) => EnvFilter::new(env),
        Err(_) => EnvFilter::new(log_directives(verbose, quiet)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let db = FleetDb::open(&data_dir.fleet_db())?;

    match cli.command {
        Command::Client { action } => match action {
            ClientAction::Import { path } => client_import(&db, &path)?,
            ClientAction::List { glob, json } => {
                client_list(&db, glob.as_deref(), json)?;
            }
            ClientAction::Remove { client_id } => client_remove(&db, &client_id)?,
        },
        Command::Hunt { action } => match action {
            HuntAction::Add {
                hunt_id,
                description,
            } => {
                db.set_hunt(&hunt_id, &description)?;
                println!("Added hunt '{hunt_id}'");
            }
            HuntAction::Remove { hunt_id } => {
                if !db.remove_hunt(&hunt_id)? {
                    return Err(error::Error::NotFound {
                        kind: "hunt",
                        name: hunt_id,
                    });
                }
                println!("Removed hunt '{hunt_id}'");
            }
            HuntAction::List { json } => hunt_list(&db, json)?,
        },
        Command::Search(args) => cmd_search(db, &args)?,
        Command::Complete(args) => cmd_complete(db, &args)?,
        Command::Config { action } => match action {
            ConfigAction::Get { key } => match db.get_setting(&key)? {
                Some(value) => println!("{value}"),
                None => {
                    return Err(error::Error::NotFound {
                        kind: "setting",
                        name: key,
                    });
                }
            },
            ConfigAction::Set { key, value } => {
                if key == RegistryPolicy::SETTING_KEY {
                    value.parse::<RegistryPolicy>()?;
                }
                db.set_setting(&key, &value)?;
                println!("Set {key} = {value}");
            }
        },
        Command::Status(args) => cmd_status(db, &data_dir, args.json)?,
        Command::Mcp => mcp::run_mcp(db)?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn client_import(db: &FleetDb, path: &std::path::Path) -> error::Result<()> {
    let records = snapshot::load_snapshot(path)?;
    db.batch_put_clients(&records)?;
    info!(count = records.len(), path = %path.display(), "imported snapshot");
    println!("Imported {} client(s)", records.len());
    Ok(())
}

fn client_list(
    db: &FleetDb,
    pattern: Option<&str>,
    json: bool,
) -> error::Result<()> {
    let matcher = pattern
        .map(|p| {
            globset::Glob::new(p)
                .map(|g| g.compile_matcher())
                .map_err(|e| {
                    error::Error::Config(format!("invalid glob pattern: {e}"))
                })
        })
        .transpose()?;

    let clients: Vec<_> = db
        .list_clients()?
        .into_iter()
        .filter(|c| {
            matcher.as_ref().is_none_or(|m| {
                m.is_match(&c.client_id) || m.is_match(&c.hostname)
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string(&clients)?);
    } else if clients.is_empty() {
        println!("No clients stored.");
    } else {
        for c in &clients {
            println!("{}\t{}\t{}", c.client_id, c.hostname, c.fqdn);
        }
        println!("\n{} client(s)", clients.len());
    }
    Ok(())
}

fn client_remove(db: &FleetDb, client_id: &str) -> error::Result<()> {
    if !db.remove_client(client_id)? {
        return Err(error::Error::NotFound {
            kind: "client",
            name: client_id.to_string(),
        });
    }
    println!("Removed client '{client_id}'");
    Ok(())
}

fn hunt_list(db: &FleetDb, json: bool) -> error::Result<()> {
    let hunts = db.list_hunts()?;

    if json {
        let items: Vec<_> = hunts
            .iter()
            .map(|(id, desc)| json!({ "huntId": id, "description": desc }))
            .collect();
        println!("{}", serde_json::Value::Array(items));
    } else if hunts.is_empty() {
        println!("No hunts registered.");
    } else {
        for (id, desc) in &hunts {
            println!("{id}\t{desc}");
        }
    }
    Ok(())
}

fn cmd_search(db: FleetDb, args: &cli::SearchArgs) -> error::Result<()> {
    let db = Arc::new(db);
    let service = search::open_service(&db)?;

    let outcome = service.search(&args.query)?;
    let report = search::build_report(&args.query, outcome, &db)?;

    if args.json {
        search::format_json(&report)?;
    } else {
        search::format_human(&report);
    }
    Ok(())
}

fn cmd_complete(db: FleetDb, args: &cli::CompleteArgs) -> error::Result<()> {
    let db = Arc::new(db);
    let service = search::open_service(&db)?;
    let completions = service.complete_label(&args.prefix)?;

    if args.json {
        println!("{}", serde_json::to_string(&completions)?);
    } else {
        for c in &completions {
            println!("{c}");
        }
    }
    Ok(())
}

fn cmd_status(
    db: FleetDb,
    data_dir: &DataDir,
    json: bool,
) -> error::Result<()> {
    let db = Arc::new(db);
    let hunts = db.list_hunts()?.len();
    let stored = db.client_count()?;
    let service = search::open_service(&db)?;
    let stats = service.index().stats()?;

    if json {
        println!(
            "{}",
            json!({
                "dataDir": data_dir.root().display().to_string(),
                "storedClients": stored,
                "clients": stats.clients,
                "hunts": hunts,
                "tokens": stats.tokens,
                "labels": stats.labels,
                "registryPolicy": service.policy().as_str(),
            })
        );
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Stored clients: {stored}");
        println!("Indexed clients: {}", stats.clients);
        println!("Hunts: {hunts}");
        println!("Index tokens: {}", stats.tokens);
        println!("Labels: {}", stats.labels);
        println!("Registry policy: {}", service.policy());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_directives_scope_to_crate() {
        assert_eq!(log_directives(0, false), "warn,fleetseek=info");
        assert_eq!(log_directives(1, false), "warn,fleetseek=debug");
        assert_eq!(log_directives(3, true), "warn,fleetseek=warn");
        assert_eq!(log_directives(2, false), "trace");
    }
}
