//! polysql CLI - run SQL against any configured connection.

use clap::{Parser, Subcommand, ValueEnum};
use polysql::core::{decode_hex, for_each_detached, ColumnSet};
use polysql::{
    Config, ConnectionHandle, CursorResultSet, DriverCatalog, OutputConfig, OutputFormat, Row,
    SqlError, Statement, Value,
};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "polysql")]
#[command(about = "Run SQL against SQLite, PostgreSQL, MariaDB/MySQL and ODBC connections")]
#[command(version)]
struct Cli {
    /// Path to YAML connection profiles
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connection profile name (defaults to default_connection)
    #[arg(long)]
    connection: Option<String>,

    /// Connection URL, e.g. sqlite::memory: (overrides --connection)
    #[arg(long)]
    url: Option<String>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and print its rows
    Query {
        /// SQL text
        sql: String,

        /// Result protocol used to read the rows
        #[arg(long, value_enum, default_value_t = Mode::Cursor)]
        mode: Mode,

        /// Positional parameter: null, int:N, int64:N, double:X, bool:B, text:S, hex:HEX or bare text
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Named parameter as name=value (same value syntax as --param)
        #[arg(long = "named-param")]
        named_params: Vec<String>,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,

        /// Output format (defaults to the configured output format)
        #[arg(long, value_enum)]
        format: Option<Format>,
    },

    /// Run statements and print affected rows and last insert id
    Exec {
        /// SQL text; may contain several statements
        sql: String,
    },

    /// List compiled-in drivers and their URL schemes
    Drivers,

    /// Test the database connection
    HealthCheck,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Cursor,
    Buffered,
    Callback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), SqlError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(SqlError::Config)?;

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            Some(config)
        }
        None => None,
    };
    let catalog = DriverCatalog::with_builtins();

    match &cli.command {
        Commands::Query {
            sql,
            mode,
            params,
            named_params,
            limit,
            format,
        } => {
            let mut output = config
                .as_ref()
                .map(|c| c.output.clone())
                .unwrap_or_default();
            if let Some(format) = format {
                output.format = (*format).into();
            }

            let conn = open_connection(&cli, config.as_ref(), &catalog)?;
            let mut stmt = conn.prepare(sql)?;
            bind_params(stmt.as_mut(), params, named_params)?;

            let stdout = io::stdout();
            let mut printer = Printer::new(stdout.lock(), output);
            let count = run_query(stmt.as_mut(), *mode, *limit, &mut printer)?;
            debug!(rows = count, mode = ?mode, "Query finished");
        }

        Commands::Exec { sql } => {
            let conn = open_connection(&cli, config.as_ref(), &catalog)?;
            let stats = conn.execute(sql)?;
            println!("Affected rows: {}", stats.affected_rows);
            println!("Last insert id: {}", stats.last_insert_id);
        }

        Commands::Drivers => {
            for (name, schemes) in catalog.drivers() {
                println!("{}: {}", name, schemes.join(", "));
            }
        }

        Commands::HealthCheck => {
            let start = Instant::now();
            let conn = open_connection(&cli, config.as_ref(), &catalog)?;
            println!(
                "Connection OK: {} ({}ms)",
                conn.driver(),
                start.elapsed().as_millis()
            );
        }
    }

    Ok(())
}

/// `--url` wins over profiles; otherwise the named or default profile is opened.
fn open_connection(
    cli: &Cli,
    config: Option<&Config>,
    catalog: &DriverCatalog,
) -> Result<ConnectionHandle, SqlError> {
    if let Some(url) = &cli.url {
        return catalog.require_connection(url);
    }
    match config {
        Some(config) => {
            let profile = config.profile(cli.connection.as_deref())?;
            catalog.open_profile(profile)
        }
        None => Err(SqlError::Config(
            "no connection given: pass --url or --config".into(),
        )),
    }
}

fn bind_params(
    stmt: &mut dyn Statement,
    params: &[String],
    named_params: &[String],
) -> Result<(), SqlError> {
    for (i, text) in params.iter().enumerate() {
        stmt.bind_value(i + 1, &parse_param(text)?)?;
    }
    for text in named_params {
        let (name, value) = text.split_once('=').ok_or_else(|| {
            SqlError::Config(format!("named parameter '{}' is not name=value", text))
        })?;
        stmt.bind_named_value(name, &parse_param(value)?)?;
    }
    Ok(())
}

/// Parse a typed parameter literal.
fn parse_param(text: &str) -> Result<Value, SqlError> {
    let invalid = || SqlError::Config(format!("invalid parameter value '{}'", text));

    if text == "null" {
        return Ok(Value::Null);
    }
    let Some((kind, rest)) = text.split_once(':') else {
        return Ok(Value::from(text));
    };
    match kind {
        "int" => rest.trim().parse().map(Value::Int).map_err(|_| invalid()),
        "int64" => rest.trim().parse().map(Value::Int64).map_err(|_| invalid()),
        "double" => rest.trim().parse().map(Value::Double).map_err(|_| invalid()),
        "bool" => match rest.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        "text" => Ok(Value::from(rest)),
        "hex" => decode_hex(rest).map(Value::Blob).map_err(|_| invalid()),
        _ => Ok(Value::from(text)),
    }
}

/// Read the query's rows through `mode`, printing at most `limit` of them.
fn run_query<W: Write>(
    stmt: &mut dyn Statement,
    mode: Mode,
    limit: Option<usize>,
    printer: &mut Printer<W>,
) -> Result<usize, SqlError> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut printed = 0;

    match mode {
        Mode::Cursor => {
            let mut cursor = stmt.execute()?;
            printer.header(cursor.columns())?;
            let mut rows = cursor.rows();
            while printed < limit {
                let Some(row) = rows.next()? else { break };
                printer.row(row)?;
                printed += 1;
            }
        }
        Mode::Buffered => {
            let result = stmt.execute_buffered()?;
            printer.header(result.columns())?;
            for row in result.rows_slice().iter().take(limit) {
                printer.row(row)?;
                printed += 1;
            }
        }
        Mode::Callback => {
            let mut cursor = stmt.execute()?;
            printer.header(cursor.columns())?;
            if limit > 0 {
                for_each_detached(cursor.as_mut(), &mut |row: &dyn Row| {
                    printer.row(row)?;
                    printed += 1;
                    Ok(if printed >= limit {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    })
                })?;
            }
        }
    }
    Ok(printed)
}

/// Writes rows as separated text with a header line, or as one JSON object
/// per line.
struct Printer<W: Write> {
    out: W,
    output: OutputConfig,
    names: Vec<String>,
}

impl<W: Write> Printer<W> {
    fn new(out: W, output: OutputConfig) -> Self {
        Self {
            out,
            output,
            names: Vec::new(),
        }
    }

    fn header(&mut self, columns: &ColumnSet) -> Result<(), SqlError> {
        self.names = columns.iter().map(|c| c.name.clone()).collect();
        if self.output.format == OutputFormat::Text && !self.names.is_empty() {
            writeln!(self.out, "{}", self.names.join(&self.output.separator))?;
        }
        Ok(())
    }

    fn row(&mut self, row: &dyn Row) -> Result<(), SqlError> {
        let values = row.get_values()?;
        match self.output.format {
            OutputFormat::Text => {
                let cells: Vec<String> = values
                    .iter()
                    .map(|v| {
                        if v.is_null() {
                            self.output.null_text.clone()
                        } else {
                            v.to_string()
                        }
                    })
                    .collect();
                writeln!(self.out, "{}", cells.join(&self.output.separator))?;
            }
            OutputFormat::Json => {
                let object = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let name = self.names.get(i).cloned().unwrap_or_else(|| i.to_string());
                        Ok((name, serde_json::to_value(v).map_err(io::Error::from)?))
                    })
                    .collect::<Result<serde_json::Map<_, _>, SqlError>>()?;
                writeln!(self.out, "{}", serde_json::Value::Object(object))?;
            }
        }
        Ok(())
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_literals() {
        assert_eq!(parse_param("null").unwrap(), Value::Null);
        assert_eq!(parse_param("int:42").unwrap(), Value::Int(42));
        assert_eq!(parse_param("int64:-7").unwrap(), Value::Int64(-7));
        assert_eq!(parse_param("double:1.5").unwrap(), Value::Double(1.5));
        assert_eq!(parse_param("bool:true").unwrap(), Value::Bool(true));
        assert_eq!(parse_param("bool:0").unwrap(), Value::Bool(false));
        assert_eq!(parse_param("text:null").unwrap(), Value::from("null"));
        assert_eq!(parse_param("hex:0102").unwrap(), Value::Blob(vec![1, 2]));
        assert_eq!(parse_param("Alice").unwrap(), Value::from("Alice"));
        assert_eq!(parse_param("a:b").unwrap(), Value::from("a:b"));
    }

    #[test]
    fn test_invalid_params_are_usage_errors() {
        for text in ["int:x", "double:", "bool:maybe", "hex:123"] {
            let err = parse_param(text).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{}", text);
        }
    }

    #[test]
    fn test_compiled_drivers_follow_cli_features() {
        let catalog = DriverCatalog::with_builtins();
        assert_eq!(catalog.has_scheme("sqlite"), cfg!(feature = "sqlite"));
        assert_eq!(catalog.has_scheme("postgresql"), cfg!(feature = "postgres"));
        assert_eq!(catalog.has_scheme("mysql"), cfg!(feature = "mysql"));
        assert_eq!(catalog.has_scheme("odbc"), cfg!(feature = "odbc"));
    }

    #[test]
    fn test_json_printer_rows() {
        let mut out = Vec::new();
        let output = OutputConfig {
            format: OutputFormat::Json,
            ..OutputConfig::default()
        };
        let mut printer = Printer::new(&mut out, output);
        let mut columns = ColumnSet::new();
        columns.add("b", polysql::ValueType::Blob, 0, "", "");
        columns.add("d", polysql::ValueType::Double, 0, "", "");
        columns.add("n", polysql::ValueType::Int, 0, "", "");
        printer.header(&columns).unwrap();
        let row = polysql::GenericRow::from(vec![
            Value::Blob(vec![1, 255]),
            Value::Double(f64::NAN),
            Value::Null,
        ]);
        printer.row(&row).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"b\":\"01ff\",\"d\":null,\"n\":null}\n"
        );
    }

    #[test]
    fn test_text_printer_uses_null_text() {
        let mut out = Vec::new();
        let output = OutputConfig {
            null_text: "-".into(),
            ..OutputConfig::default()
        };
        let mut printer = Printer::new(&mut out, output);
        let mut columns = ColumnSet::new();
        columns.add("id", polysql::ValueType::Int, 0, "", "");
        columns.add("name", polysql::ValueType::String, 0, "", "");
        printer.header(&columns).unwrap();
        let row = polysql::GenericRow::from(vec![Value::Int(1), Value::Null]);
        printer.row(&row).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id | name\n1 | -\n");
    }
}
