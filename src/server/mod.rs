//! TCP Server for MyDB
//!
//! One statement per line in, one reply out. All connections share a single
//! [`ExecutionEngine`] behind a mutex, so statements run one at a time.

use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::executor::{ExecutionEngine, Response};
use crate::sql::ast::{Command, DropTableStatement};
use crate::storage::{Row, NULL};

/// Default server port
pub const DEFAULT_PORT: u16 = 7171;

/// Greeting sent to every new connection
const WELCOME: &str = "MyDB Server v0.1.0\nReady for queries.\n";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_connections: 100,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection limit
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// MyDB TCP Server
pub struct Server {
    config: ServerConfig,
    engine: Arc<Mutex<ExecutionEngine>>,
    connections: Arc<Semaphore>,
}

impl Server {
    /// Create a new server around an engine
    pub fn new(config: ServerConfig, engine: ExecutionEngine) -> Self {
        let connections = Arc::new(Semaphore::new(config.max_connections));
        Self {
            config,
            engine: Arc::new(Mutex::new(engine)),
            connections,
        }
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        info!(address = %listener.local_addr()?, "MyDB server listening");
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (mut stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let Ok(permit) = self.connections.clone().try_acquire_owned() else {
                warn!(%peer, "connection limit reached, rejecting");
                stream
                    .write_all(b"Too many connections\n")
                    .await
                    .ok();
                continue;
            };

            info!(%peer, "client connected");
            let engine = self.engine.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, engine).await {
                    warn!(%peer, error = %e, "connection error");
                }
                info!(%peer, "client disconnected");
                drop(permit);
            });
        }
    }
}

/// Read statements from one client until it quits or disconnects
async fn handle_connection(stream: TcpStream, engine: Arc<Mutex<ExecutionEngine>>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut session = Session::new();

    writer.write_all(WELCOME.as_bytes()).await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = {
            let mut engine = engine.lock().await;
            session.handle_line(&mut engine, line)
        };

        match reply {
            Reply::Continue(text) => writer.write_all(text.as_bytes()).await?,
            Reply::Close(text) => {
                writer.write_all(text.as_bytes()).await?;
                break;
            }
        }
        writer.flush().await?;
    }

    Ok(())
}

// ========== Sessions ==========

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// What to send back for one input line
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send the text and keep reading
    Continue(String),
    /// Send the text and close the connection
    Close(String),
}

/// Per-connection state
#[derive(Debug, Default)]
pub struct Session {
    format: OutputFormat,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Handle one line: a dot command or a SQL statement
    pub fn handle_line(&mut self, engine: &mut ExecutionEngine, line: &str) -> Reply {
        if !line.starts_with('.') {
            let response = engine.run(line);
            return Reply::Continue(format_response(&response, self.format));
        }

        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };
        debug!(command, argument, "dot command");

        let text = match (command, argument) {
            (".quit" | ".exit", _) => return Reply::Close("Goodbye!\n".to_string()),
            (".mode", "json") => {
                self.format = OutputFormat::Json;
                "Output mode set to JSON\n".to_string()
            }
            (".mode", "table") => {
                self.format = OutputFormat::Table;
                "Output mode set to Table\n".to_string()
            }
            (".tables", _) => self.list_tables(engine),
            (".table", name) if !name.is_empty() => self.show_table(engine, name),
            (".drop", name) if !name.is_empty() => self.drop_table(engine, name),
            _ => self.error(format!("Unknown command: {}", line)),
        };
        Reply::Continue(text)
    }

    fn list_tables(&self, engine: &ExecutionEngine) -> String {
        let tables = engine.catalog().list_tables();
        match self.format {
            OutputFormat::Json => json_line(json!({ "status": "ok", "tables": tables })),
            OutputFormat::Table if tables.is_empty() => "No tables found.\n".to_string(),
            OutputFormat::Table => format!(
                "Tables:\n{}\n",
                tables
                    .iter()
                    .map(|t| format!("  {}", t))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    fn show_table(&self, engine: &ExecutionEngine, name: &str) -> String {
        let (Some(schema), Ok(rows)) = (engine.catalog().get_schema(name), engine.store().rows(name))
        else {
            return self.not_found(name);
        };

        match self.format {
            OutputFormat::Json => json_line(json!({
                "status": "ok",
                "schema": schema,
                "columns": schema.column_names(),
                "data": rows,
            })),
            OutputFormat::Table => {
                let info = engine.catalog().table_info(name).unwrap_or_default();
                format!("{}\n{}", info, render_table(&schema.column_names(), rows))
            }
        }
    }

    fn drop_table(&self, engine: &mut ExecutionEngine, name: &str) -> String {
        if !engine.catalog().table_exists(name) {
            return self.not_found(name);
        }

        let command = Command::DropTable(DropTableStatement {
            table_name: name.to_string(),
        });
        let response: Response = engine.execute(command).into();
        format_response(&response, self.format)
    }

    fn not_found(&self, name: &str) -> String {
        let message = format!("Table '{}' does not exist", name);
        match self.format {
            OutputFormat::Json => json_line(json!({ "status": "not_found", "message": message })),
            OutputFormat::Table => format!("Not found: {}\n", message),
        }
    }

    fn error(&self, message: String) -> String {
        format_response(&Response::error(message), self.format)
    }
}

// ========== Rendering ==========

fn json_line(value: serde_json::Value) -> String {
    value.to_string() + "\n"
}

/// Render a response envelope for a client
pub fn format_response(response: &Response, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let status = if response.success { "ok" } else { "error" };
        return match serde_json::to_value(response) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.insert("status".to_string(), json!(status));
                json_line(serde_json::Value::Object(map))
            }
            Ok(other) => json_line(other),
            Err(e) => json_line(json!({
                "status": "error",
                "message": format!("Serialization error: {}", e),
            })),
        };
    }

    if !response.success {
        return format!("Error: {}\n", response.message);
    }

    match &response.data {
        Some(rows) => {
            let columns = match &response.columns {
                Some(columns) => columns.clone(),
                None => rows
                    .first()
                    .map(|row| row.keys().cloned().collect())
                    .unwrap_or_default(),
            };
            render_table(&columns, rows)
        }
        None => format!("{}\n", response.message),
    }
}

/// Render rows as an ASCII table followed by a row count
pub fn render_table(columns: &[String], rows: &[Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&NULL).to_string())
                .collect()
        })
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<String>>()
        .join("+");

    let mut output = String::new();
    output.push_str(&format!("+{}+\n", separator));

    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<String>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&format!("+{}+\n", separator));

    for row in &cells {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v, width = *w))
            .collect::<Vec<String>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !cells.is_empty() {
        output.push_str(&format!("+{}+\n", separator));
    }

    output.push_str(&format!("{} row(s) returned\n", cells.len()));
    output
}
