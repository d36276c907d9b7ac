//! MyDB - CLI Client

use std::env;

use anyhow::{bail, Context, Result};
use mydb::config::DatabaseConfig;
use mydb::executor::ExecutionEngine;
use mydb::server::{format_response, OutputFormat};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

/// Print welcome banner
fn print_banner(config: &DatabaseConfig) {
    println!(
        r#"
  __  __       ____  ____
 |  \/  |_   _|  _ \| __ )
 | |\/| | | | | | | |  _ \
 | |  | | |_| | |_| | |_) |
 |_|  |_|\__, |____/|____/
         |___/

 A minimal relational database engine in Rust
 Type '.help' for help, '.quit' to exit
"#
    );
    match &config.data_file {
        Some(path) => println!(" Data file: {}\n", path.display()),
        None => println!(" In-memory database, nothing is saved\n"),
    }
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit              Exit MyDB
  .tables            List all tables
  .schema [table]    Show table schema
  .mode table|json   Set the output format

SQL Commands (end with ';'):
  CREATE TABLE ...   Create a new table
  DROP TABLE ...     Drop a table
  INSERT INTO ...    Insert a row
  SELECT ...         Query data
  UPDATE ...         Update rows
  DELETE FROM ...    Delete rows

Examples:
  CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(100) NOT NULL);
  INSERT INTO users VALUES (1, 'Alice');
  SELECT * FROM users WHERE id = 1 ORDER BY name LIMIT 10;
"#
    );
}

/// Handle special dot commands. Returns false when the REPL should stop.
fn handle_special_command(cmd: &str, engine: &ExecutionEngine, format: &mut OutputFormat) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.as_slice() {
        [".help"] => print_help(),
        [".quit"] | [".exit"] => return false,
        [".tables"] => {
            let tables = engine.catalog().list_tables();
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                println!("Tables:");
                for table in tables {
                    println!("  {}", table);
                }
            }
        }
        [".schema", table_name] => match engine.catalog().table_info(table_name) {
            Ok(info) => println!("{}", info),
            Err(e) => eprintln!("Error: {}", e),
        },
        [".schema"] => {
            for table_name in engine.catalog().list_tables() {
                if let Ok(info) = engine.catalog().table_info(&table_name) {
                    println!("{}", info);
                }
            }
        }
        [".mode", "table"] => *format = OutputFormat::Table,
        [".mode", "json"] => *format = OutputFormat::Json,
        _ => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type '.help' for available commands.");
        }
    }
    true
}

/// Parse `--data <path>` and `--memory`
fn parse_args(args: &[String]) -> Result<DatabaseConfig> {
    let mut config = DatabaseConfig::from_env();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" => {
                let path = args.next().context("--data needs a path")?;
                config = config.data_file(path);
            }
            "--memory" => config = DatabaseConfig::in_memory(),
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok(config)
}

/// Main REPL loop
fn run_repl(mut engine: ExecutionEngine) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut format = OutputFormat::Table;
    let mut input_buffer = String::new();

    loop {
        let prompt = if input_buffer.is_empty() {
            "mydb> "
        } else {
            "...> "
        };

        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let trimmed = line.trim();

        if input_buffer.is_empty() && trimmed.starts_with('.') {
            editor.add_history_entry(trimmed)?;
            if !handle_special_command(trimmed, &engine, &mut format) {
                break;
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');

        // Statements run once they end with a semicolon
        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            editor.add_history_entry(sql.trim())?;
            let response = engine.run(&sql);
            print!("{}", format_response(&response, format));
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = parse_args(&args)?;

    print_banner(&config);
    let engine = ExecutionEngine::open(config).context("failed to open database")?;
    run_repl(engine)
}
