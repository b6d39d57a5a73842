//! Binary entry point for the edge index inspection CLI.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use edgeidx::storage::adjacency::{salt, EdgeRowKey, ReadKey};
use edgeidx::storage::props::{self, PropValue};
use edgeidx::storage::{
    EdgeRecord, Graph, GraphOptions, IndexCatalog, IndexKey, MemElementStore, MemStore,
};
use edgeidx::types::{Direction, EdgeId, GraphError, VertexId};

#[derive(Parser, Debug)]
#[command(
    name = "edgeidx",
    version,
    about = "Inspect edge index row keys and run adjacency queries",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(long, global = true, value_name = "FILE", help = "TOML file with graph options")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a hex-encoded row key.
    DecodeKey {
        #[arg(value_name = "HEX")]
        hex: String,
    },
    /// Print the scan-bound read key for a query prefix.
    ReadKey(ReadKeyCmd),
    /// Load edges from CSV and run an adjacency query.
    Query(QueryCmd),
}

#[derive(Args, Debug)]
struct ReadKeyCmd {
    #[arg(long)]
    vertex: u64,

    #[arg(long, value_enum, default_value_t = DirectionArg::Out)]
    direction: DirectionArg,

    #[arg(long)]
    label: Option<String>,

    #[arg(long, requires = "label")]
    key: Option<String>,

    #[arg(long, requires = "key", help = "Value, e.g. 42, str:42, float:1.5, null")]
    value: Option<String>,
}

#[derive(Args, Debug)]
struct QueryCmd {
    #[arg(
        long,
        value_name = "FILE",
        help = "CSV with columns id,src,dst,label,created_at,props (props as k=v;k=v)"
    )]
    edges: PathBuf,

    #[arg(long)]
    vertex: u64,

    #[arg(long, value_enum, default_value_t = DirectionArg::Out)]
    direction: DirectionArg,

    #[arg(long = "label", value_name = "LABEL")]
    labels: Vec<String>,

    #[arg(long, requires = "labels")]
    key: Option<String>,

    #[arg(long, requires = "key", conflicts_with_all = ["from", "to"])]
    value: Option<String>,

    #[arg(long, requires_all = ["key", "to"])]
    from: Option<String>,

    #[arg(long, requires_all = ["key", "from"])]
    to: Option<String>,

    #[arg(long = "index", value_name = "LABEL:KEY", help = "Declare a secondary index")]
    indices: Vec<String>,

    #[arg(long, help = "Print opposite endpoints instead of edges")]
    vertices: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionArg {
    Out,
    In,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Out => Direction::Out,
            DirectionArg::In => Direction::In,
            DirectionArg::Both => Direction::Both,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

#[derive(Serialize)]
struct KeyReport {
    salt: u8,
    owner: VertexId,
    direction: Direction,
    label: String,
    key: String,
    value: PropValue,
    counterpart: VertexId,
    edge: EdgeId,
    primary: bool,
}

#[derive(Deserialize)]
struct CsvEdge {
    id: u64,
    src: u64,
    dst: u64,
    label: String,
    created_at: i64,
    #[serde(default)]
    props: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let opts = match &cli.config {
        Some(path) => GraphOptions::from_toml_file(path)?,
        None => GraphOptions::default(),
    };
    match cli.command {
        Command::DecodeKey { hex } => decode_key(cli.format, &hex),
        Command::ReadKey(cmd) => read_key(cli.format, &cmd),
        Command::Query(cmd) => query(cli.format, opts, &cmd),
    }
}

fn decode_key(format: OutputFormat, text: &str) -> Result<(), CliError> {
    let bytes = hex::decode(text.trim())?;
    let row = EdgeRowKey::decode(&bytes)?;
    let report = KeyReport {
        salt: salt(row.owner),
        primary: row.is_primary(),
        owner: row.owner,
        direction: row.direction,
        label: row.label,
        key: row.key,
        value: row.value,
        counterpart: row.counterpart,
        edge: row.edge,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("salt:        0x{:02x}", report.salt);
            println!("owner:       {}", report.owner);
            println!("direction:   {}", report.direction);
            println!("label:       {}", report.label);
            println!("key:         {}", report.key);
            println!("value:       {}", report.value);
            println!("counterpart: {}", report.counterpart);
            println!("edge:        {}", report.edge);
            println!("primary:     {}", report.primary);
        }
    }
    Ok(())
}

fn read_key(format: OutputFormat, cmd: &ReadKeyCmd) -> Result<(), CliError> {
    let value = cmd
        .value
        .as_deref()
        .map(|raw| props::encode_value(&parse_value(raw)))
        .transpose()?;
    let mut key = ReadKey::vertex(VertexId(cmd.vertex), cmd.direction.into());
    if let Some(label) = &cmd.label {
        key = key.label(label);
    }
    if let Some(prop) = &cmd.key {
        key = key.key(prop);
    }
    if let Some(value) = &value {
        key = key.value(value);
    }
    let encoded = hex::encode(key.encode());
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "read_key": encoded })),
        OutputFormat::Text => println!("{encoded}"),
    }
    Ok(())
}

fn query(format: OutputFormat, opts: GraphOptions, cmd: &QueryCmd) -> Result<(), CliError> {
    let store = Arc::new(MemStore::new());
    let elements = Arc::new(MemElementStore::new());
    let catalog = Arc::new(IndexCatalog::new());
    for spec in &cmd.indices {
        let (label, key) = spec
            .split_once(':')
            .ok_or_else(|| CliError::Usage(format!("index `{spec}` is not LABEL:KEY")))?;
        catalog.declare(IndexKey::edge(label, key));
    }
    let graph = Graph::open(store.clone(), elements.clone(), catalog, opts);

    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(&cmd.edges).map_err(GraphError::from)?);
    let mut loaded = 0usize;
    for row in reader.deserialize::<CsvEdge>() {
        let row = row?;
        elements.add_vertex(VertexId(row.src));
        elements.add_vertex(VertexId(row.dst));
        graph.add_edge(EdgeRecord {
            id: EdgeId(row.id),
            label: row.label,
            out_vertex: VertexId(row.src),
            in_vertex: VertexId(row.dst),
            created_at: row.created_at,
            props: parse_props(&row.props)?,
        })?;
        loaded += 1;
    }
    debug!(edges = loaded, rows = store.len(), "edgeidx.query.loaded");

    let vertex = graph.vertex(VertexId(cmd.vertex));
    let direction: Direction = cmd.direction.into();
    let labels: Vec<&str> = cmd.labels.iter().map(String::as_str).collect();
    let edges = match (&cmd.key, &cmd.value, &cmd.from, &cmd.to) {
        (None, ..) => graph.edges(&vertex, direction, &labels)?,
        (Some(key), Some(value), _, _) => graph.edges_by_value(
            &vertex,
            direction,
            single_label(&labels)?,
            key,
            &parse_value(value),
        )?,
        (Some(key), None, Some(from), Some(to)) => graph.edges_in_range(
            &vertex,
            direction,
            single_label(&labels)?,
            key,
            &parse_value(from),
            &parse_value(to),
        )?,
        (Some(_), None, _, _) => {
            return Err(CliError::Usage(
                "--key needs --value or --from/--to".into(),
            ))
        }
    };
    let mut ids = Vec::new();
    for edge in edges {
        let edge = edge?;
        let id = if cmd.vertices {
            edge.other_end(vertex.id()).map_or(0, |v| v.0)
        } else {
            edge.id().0
        };
        ids.push(id);
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&ids)?),
        OutputFormat::Text => {
            for id in ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn single_label<'a>(labels: &[&'a str]) -> Result<&'a str, CliError> {
    match labels {
        [label] => Ok(*label),
        _ => Err(CliError::Usage(
            "property queries take exactly one --label".into(),
        )),
    }
}

/// Parses `k=v;k=v` into a property bag.
fn parse_props(raw: &str) -> Result<BTreeMap<String, PropValue>, CliError> {
    let mut props = BTreeMap::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Usage(format!("property `{pair}` is not k=v")))?;
        props.insert(key.trim().to_owned(), parse_value(value.trim()));
    }
    Ok(props)
}

/// Typed prefixes (`int:`, `float:`, `str:`, `bool:`, `date:`, `datetime:`)
/// force a type; otherwise integers, floats and booleans are inferred and
/// anything else is a string.
fn parse_value(raw: &str) -> PropValue {
    if raw == "null" {
        return PropValue::Null;
    }
    if let Some((ty, rest)) = raw.split_once(':') {
        let typed = match ty {
            "int" => rest.parse().ok().map(PropValue::Int),
            "float" => rest.parse().ok().map(PropValue::Float),
            "bool" => rest.parse().ok().map(PropValue::Bool),
            "date" => rest.parse().ok().map(PropValue::Date),
            "datetime" => rest.parse().ok().map(PropValue::DateTime),
            "str" => Some(PropValue::Str(rest.to_owned())),
            _ => None,
        };
        if let Some(value) = typed {
            return value;
        }
    }
    if let Ok(v) = raw.parse::<i64>() {
        return PropValue::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return PropValue::Float(v);
    }
    if let Ok(v) = raw.parse::<bool>() {
        return PropValue::Bool(v);
    }
    PropValue::Str(raw.to_owned())
}
