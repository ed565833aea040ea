use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scanroute::bootstrap;
use scanroute::config::Configuration;
use scanroute::telemetry::{self, LogFormat};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

/// Event-driven malware scanning and routing for S3 objects
#[derive(Parser, Debug)]
#[command(name = "scanroute", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

/// Arguments shared by every subcommand
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Only log warnings and errors")]
    quiet: bool,

    #[arg(
        long,
        global = true,
        default_value = "text",
        env = "SCANROUTE_LOG_FORMAT",
        help = "Log format: text or json"
    )]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan and route the object named by one object-created event
    ScanEvent {
        #[arg(long, help = "Read the event from FILE instead of stdin")]
        event: Option<PathBuf>,
    },
    /// Refresh signature definitions and publish them to the definitions bucket
    UpdateDefinitions,
    /// Show the effective configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.common.verbose, cli.common.quiet, cli.common.log_format);

    let config = Configuration::load_from(cli.common.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Command::ScanEvent { event } => scan_event(&config, event).await,
        Command::UpdateDefinitions => update_definitions(&config).await,
        Command::Config { json } => {
            display_config(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn scan_event(config: &Configuration, event: Option<PathBuf>) -> Result<ExitCode> {
    let raw = match &event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read event from stdin")?;
            buffer
        }
    };

    // Unparseable JSON is handled like any other malformed event.
    let payload = serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Event is not valid JSON");
        serde_json::Value::Null
    });

    let pipeline = bootstrap::build_pipeline(config)
        .await
        .context("Failed to build scan pipeline")?;
    let ack = pipeline.process_event(&payload).await;

    println!("{}", serde_json::to_string(&ack)?);
    Ok(ExitCode::SUCCESS)
}

async fn update_definitions(config: &Configuration) -> Result<ExitCode> {
    let updater = bootstrap::build_definitions_updater(config).await;
    match updater.run().await {
        Some(ack) => {
            println!("{}", serde_json::to_string(&ack)?);
            if ack.status_code == 200 {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        None => Ok(ExitCode::FAILURE),
    }
}

fn display_config(config: &Configuration, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(config)
            .context("Failed to serialize configuration to JSON")?;
        println!("{json}");
        return Ok(());
    }

    fn show(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or("(unset)")
    }

    println!("Scanroute Configuration:");
    println!("========================");
    println!("Clean bucket: {}", show(&config.clean_bucket));
    println!("Quarantine bucket: {}", show(&config.quarantine_bucket));
    println!("Clean topic: {}", show(&config.clean_topic_arn));
    println!("Infected topic: {}", show(&config.infected_topic_arn));
    println!("clamscan: {}", config.scanner.clamscan_path.display());
    println!("freshclam: {}", config.scanner.freshclam_path.display());
    println!("Signature directory: {}", config.scanner.database_dir.display());
    println!("Refresh timeout: {:?}", config.scanner.refresh_timeout);
    println!("Scan timeout: {:?}", config.scanner.scan_timeout);
    println!("Work directory: {}", config.scanner.work_dir().display());
    println!("Definitions bucket: {}", show(&config.definitions.bucket));
    println!(
        "Definitions source: {} -> {}/",
        config.definitions.source_dir.display(),
        config.definitions.prefix
    );
    println!("Storage endpoint: {}", show(&config.storage.endpoint_url));
    println!("Storage region: {}", show(&config.storage.region));
    Ok(())
}
