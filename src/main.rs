mod logger;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use statshape::{
    Config, CsvSink, Format, LiveRunner, Node, ReplayClient, RowSink, ShapeConfig, StatsResponse,
    UnitStyle,
};
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Shapes saved network-appliance statistics responses into CSV tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level (overridden by STATSHAPE_LOG or RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file; command line flags take precedence
    #[arg(long, global = true, env = "STATSHAPE_CONFIG")]
    config: Option<PathBuf>,

    /// Write CSV to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Response encoding (xml or json), inferred from the extension when omitted
    #[arg(long, global = true, value_parser = parse_format)]
    format: Option<Format>,

    /// Label units for people rather than machines
    #[arg(long = "friendly-units", global = true)]
    friendly_units: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Shape a saved statistics response
    Stats(StatsArgs),
    /// Replay saved live statistics responses as one growing table
    Live(LiveArgs),
}

#[derive(Debug, Args)]
struct StatsArgs {
    /// Saved response document
    response: PathBuf,

    /// Extra percentiles to report, e.g. 25,50,99.9
    #[arg(short, long)]
    percentiles: Option<String>,
}

#[derive(Debug, Args)]
struct LiveArgs {
    /// Saved live responses, in polling order
    #[arg(required = true)]
    responses: Vec<PathBuf>,

    /// Seconds between buckets
    #[arg(long = "update-period")]
    update_period: Option<u64>,

    /// Buckets of history kept per response
    #[arg(long = "history-size")]
    history_size: Option<u64>,

    /// Stop after this many rows
    #[arg(short = 'n', long)]
    iterations: Option<u64>,
}

fn parse_format(raw: &str) -> Result<Format, String> {
    match raw.to_ascii_lowercase().as_str() {
        "xml" => Ok(Format::Xml),
        "json" => Ok(Format::Json),
        _ => Err(format!("unknown format {:?}, expected xml or json", raw)),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if cli.friendly_units {
        config.shape.unit_style = UnitStyle::Friendly;
    }
    match &cli.command {
        Command::Stats(args) => {
            if let Some(percentiles) = &args.percentiles {
                config.shape.percentiles = ShapeConfig::parse_percentiles(percentiles);
            }
        }
        Command::Live(args) => {
            if let Some(update_period) = args.update_period {
                config.live.update_period = update_period;
            }
            if let Some(history_size) = args.history_size {
                config.live.history_size = history_size;
            }
            if args.iterations.is_some() {
                config.live.iterations = args.iterations;
            }
        }
    }
    config.validate()?;
    Ok(config)
}

fn output(path: Option<&PathBuf>) -> Result<CsvSink<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("error creating output file {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    Ok(CsvSink::new(writer))
}

fn run_stats(cli: &Cli, args: &StatsArgs, config: &Config) -> Result<()> {
    let format = cli.format.unwrap_or_else(|| Format::from_path(&args.response));
    let node = Node::from_path(&args.response, format)
        .with_context(|| format!("error reading response {}", args.response.display()))?;
    let response = StatsResponse::from_node(&node, &config.shape)?;
    info!(
        "decoded {} measurement points, {} diagnostics",
        response.points.len(),
        response.diagnostics.len()
    );

    let mut sink = output(cli.output.as_ref())?;
    response.to_csv(&mut sink)?;
    sink.flush()?;
    Ok(())
}

fn run_live(cli: &Cli, args: &LiveArgs, config: &Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let client = ReplayClient::new(args.responses.clone(), cli.format).stop_when_done(shutdown.clone());
    let mut runner = LiveRunner::new(client, config.live.clone(), config.shape.unit_style)
        .with_shutdown(shutdown);

    let mut sink = output(cli.output.as_ref())?;
    let written = runner.run(&mut sink)?;
    sink.flush()?;
    info!("wrote {} live buckets", written);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logging(cli.verbose);

    let config = load_config(&cli)?;
    match &cli.command {
        Command::Stats(args) => run_stats(&cli, args, &config),
        Command::Live(args) => run_live(&cli, args, &config),
    }
}
