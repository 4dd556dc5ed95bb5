use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use serde_json::Value;
use universql::{BackendQuery, Config, UniversQl};

/// Compile universal query strings and run them over JSON data
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Query string, e.g. '/users{name,age}[sort=-age,limit=5]?(age>=18)'
    query: String,

    /// JSON file holding an array of records ("-" reads stdin)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Adapter to compile with (defaults to the configured default)
    #[arg(short, long)]
    adapter: Option<String>,

    /// Placeholder value; VALUE is parsed as JSON when possible
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Print the translated backend query instead of running it
    #[arg(long)]
    translate: bool,

    /// Print the query in canonical form and exit
    #[arg(long)]
    format: bool,

    /// Config file (defaults to <config dir>/universql/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    for assignment in &cli.set {
        config.set(assignment)?;
    }

    let mut engine = UniversQl::new(&cli.query)?;
    if cli.format {
        println!("{}", engine.query());
        return Ok(());
    }

    let adapter = cli
        .adapter
        .as_deref()
        .or(config.default_adapter.as_deref());

    if cli.translate {
        match engine.translate(adapter, &config.context)? {
            BackendQuery::Text(text) => println!("{}", text),
            BackendQuery::Memory(query) => println!("{:#?}", query),
        }
        return Ok(());
    }

    let path = cli
        .data
        .as_deref()
        .context("--data is required unless --translate or --format is given")?;
    let data = read_data(path)?;
    let result = engine.execute(adapter, &data, &config.context)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_data(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
