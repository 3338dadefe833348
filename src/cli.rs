use std::path::{Path, PathBuf};

mod batches;
mod check;
mod grid;
mod status;
mod terminal;
mod tree;

use anyhow::Context as _;
use batches::Batches;
use bedalloc::{BlockPath, Clock, FixedClock, Moment, Snapshot, SystemClock};
use chrono::{DateTime, Utc};
use check::Check;
use clap::ArgAction;
use grid::Grid;
use status::Status;
use tracing::instrument;
use tree::Tree;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The JSON snapshot of allocations to read
    #[arg(short, long, default_value = "snapshot.json", global = true)]
    snapshot: PathBuf,

    /// The configuration file
    #[arg(short, long, default_value = "beds.toml", global = true)]
    config: PathBuf,

    /// Evaluate as of this instant (RFC 3339) instead of the wall clock
    #[arg(long, value_name = "INSTANT", global = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let context = Context {
            snapshot: self.snapshot,
            config_path: self.config,
            now: self.now,
        };

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&context)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Inputs shared by every subcommand.
#[derive(Debug)]
pub struct Context {
    snapshot: PathBuf,
    config_path: PathBuf,
    now: Option<DateTime<Utc>>,
}

impl Context {
    /// The configuration, or the defaults if no file exists.
    pub fn config(&self) -> anyhow::Result<bedalloc::Config> {
        load_config(&self.config_path)
    }

    /// Reads and normalizes the snapshot file.
    pub fn snapshot(&self) -> anyhow::Result<Snapshot> {
        let json = std::fs::read_to_string(&self.snapshot)
            .with_context(|| format!("Failed to read snapshot {}", self.snapshot.display()))?;
        let snapshot = bedalloc::wire::parse_snapshot(&json, self.clock_now())?;
        tracing::info!(
            allocations = snapshot.allocations().len(),
            blocks = snapshot.blocks().len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// The instant every status in this run is resolved against.
    pub fn moment(&self, config: &bedalloc::Config) -> anyhow::Result<Moment> {
        let zone = config.zone().ok_or_else(|| {
            anyhow::anyhow!(
                "utc_offset_minutes must be less than a day, got {}",
                config.utc_offset_minutes()
            )
        })?;
        Ok(Moment::at(self.clock_now(), zone))
    }

    fn clock_now(&self) -> DateTime<Utc> {
        self.now.map_or_else(|| SystemClock.now(), |now| FixedClock(now).now())
    }
}

fn load_config(path: &Path) -> anyhow::Result<bedalloc::Config> {
    if path.exists() {
        bedalloc::Config::load(path).map_err(|e| anyhow::anyhow!("{e}"))
    } else {
        Ok(bedalloc::Config::default())
    }
}

/// Parse a block path written `location/tent/block`.
fn parse_block_path(s: &str) -> Result<BlockPath, String> {
    let mut parts = s.rsplitn(3, '/');
    let (Some(block), Some(tent), Some(location)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected LOCATION/TENT/BLOCK, got '{s}'"));
    };

    let index = |part: &str, what: &str| {
        let part = part.trim();
        part.strip_prefix(what)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(part)
            .parse::<u32>()
            .map_err(|e| format!("invalid {what} index '{part}': {e}"))
    };

    let location = location.trim();
    if location.is_empty() {
        return Err(format!("missing location in '{s}'"));
    }

    Ok(BlockPath::new(
        location,
        index(tent, "tent")?,
        index(block, "block")?,
    ))
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show bed counts by status (default)
    Status(Status),

    /// Show the location tree with rollup counts
    Tree(Tree),

    /// List reservation batches
    Batches(Batches),

    /// Show the beds of one block
    Grid(Grid),

    /// Check a reservation request against a block
    Check(Check),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(context)?,
            Self::Tree(command) => command.run(context)?,
            Self::Batches(command) => command.run(context)?,
            Self::Grid(command) => command.run(context)?,
            Self::Check(command) => command.run(context)?,
            Self::Config(command) => command.run(&context.config_path)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, config_path: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut config = load_config(config_path)?;

        match self.command {
            ConfigCommand::Show => {
                println!("Configuration:");
                println!(
                    "  utc_offset_minutes: {} ({})",
                    config.utc_offset_minutes(),
                    config
                        .zone()
                        .map_or_else(|| "invalid".warning(), |zone| zone.to_string().dim())
                );
                println!("  largest_batches_first: {}", config.largest_batches_first);
            }
            ConfigCommand::Set { key, value } => {
                match key.as_str() {
                    "utc_offset_minutes" => {
                        let minutes = value
                            .parse::<i32>()
                            .map_err(|_| anyhow::anyhow!("Value must be a whole number of minutes"))?;
                        config.set_utc_offset_minutes(minutes);
                        if config.zone().is_none() {
                            anyhow::bail!("Offset must be less than a day from UTC");
                        }
                    }
                    "largest_batches_first" => {
                        config.largest_batches_first = value
                            .parse::<bool>()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                    }
                    _ => anyhow::bail!(
                        "Unknown configuration key: '{key}'. Expected one of: utc_offset_minutes, \
                         largest_batches_first"
                    ),
                }

                config
                    .save(config_path)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("{}", format!("Set {key} = {value}").success());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("north/1/2", "north", 1, 2; "plain")]
    #[test_case("north/tent-1/block-2", "north", 1, 2; "display form")]
    #[test_case("camp/a/3/4", "camp/a", 3, 4; "slash in location")]
    fn block_paths_parse(input: &str, location: &str, tent: u32, block: u32) {
        assert_eq!(
            parse_block_path(input).unwrap(),
            BlockPath::new(location, tent, block)
        );
    }

    #[test_case("north/1"; "too short")]
    #[test_case("/1/2"; "no location")]
    #[test_case("north/x/2"; "bad tent")]
    fn bad_block_paths_are_rejected(input: &str) {
        assert!(parse_block_path(input).is_err());
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = load_config(&dir.path().join("beds.toml")).unwrap();

        assert_eq!(config, bedalloc::Config::default());
    }

    #[test]
    fn snapshot_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, r#"[{"id": "a", "locationId": "north"}]"#).unwrap();
        let context = Context {
            snapshot: path,
            config_path: dir.path().join("beds.toml"),
            now: Some("2025-11-07T06:30:00Z".parse().unwrap()),
        };

        let snapshot = context.snapshot().unwrap();
        let moment = context.moment(&context.config().unwrap()).unwrap();

        assert_eq!(snapshot.allocations().len(), 1);
        assert_eq!(moment.today().to_string(), "2025-11-07");
    }
}
