//! MyDB - TCP Server

use std::env;

use anyhow::{bail, Context, Result};
use mydb::config::DatabaseConfig;
use mydb::executor::ExecutionEngine;
use mydb::server::{Server, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parse `--port/-p`, `--host`, `--data` and `--memory`
fn parse_args(args: &[String]) -> Result<(ServerConfig, DatabaseConfig)> {
    let mut server = ServerConfig::new();
    let mut database = DatabaseConfig::from_env();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" | "-p" => {
                let port = args.next().context("--port needs a value")?;
                server = server.port(port.parse().context("invalid port")?);
            }
            "--host" => {
                let host = args.next().context("--host needs a value")?;
                server = server.host(host.as_str());
            }
            "--data" => {
                let path = args.next().context("--data needs a path")?;
                database = database.data_file(path);
            }
            "--memory" => database = DatabaseConfig::in_memory(),
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok((server, database))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (server_config, database_config) = parse_args(&args)?;

    info!(
        data_file = ?database_config.data_file,
        "starting MyDB server"
    );
    let engine = ExecutionEngine::open(database_config).context("failed to open database")?;

    let server = Server::new(server_config, engine);
    server.run().await.context("server error")?;
    Ok(())
}
