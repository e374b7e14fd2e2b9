//! sonify - turn numeric data and text into MIDI
//!
//! Subcommands:
//! - `sonify floats [FILE]` - One sequence of numbers, one track
//! - `sonify matrix [FILE]` - One row per line, one track per row
//! - `sonify text [FILE]` - Words encoded by frequency, one track
//! - `sonify config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sonify::Track;
use sonifyconf::{ConfigSources, FileConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod input;

#[derive(Parser)]
#[command(name = "sonify")]
#[command(about = "Turn numeric data and text into MIDI")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override values from config files and the environment.
#[derive(Args)]
struct Overrides {
    /// Config file (replaces ./sonify.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// MIDI file to write
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Lowest output pitch
    #[arg(long, global = true)]
    min_pitch: Option<u8>,

    /// Highest output pitch
    #[arg(long, global = true)]
    max_pitch: Option<u8>,

    /// Tempo in beats per minute
    #[arg(long, global = true)]
    tempo: Option<u16>,

    /// Insert a divider note after every N notes
    #[arg(long, global = true)]
    interval: Option<usize>,

    /// Drop notes that repeat the previous pitch
    #[arg(long, global = true)]
    skip_duplicates: bool,
}

impl Overrides {
    fn apply(&self, config: &mut FileConfig) {
        let s = &mut config.sonify;
        if let Some(v) = self.min_pitch {
            s.min_pitch = v;
        }
        if let Some(v) = self.max_pitch {
            s.max_pitch = v;
        }
        if let Some(v) = self.tempo {
            s.tempo = v;
        }
        if let Some(v) = self.interval {
            s.interval = Some(v);
        }
        if self.skip_duplicates {
            s.skip_duplicates = true;
        }
        if let Some(path) = &self.output {
            config.output.path = path.clone();
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sonify a single sequence of numbers
    Floats {
        /// Input file, or - for stdin
        input: Option<PathBuf>,
    },

    /// Sonify a matrix, one row per line
    Matrix {
        /// Input file, or - for stdin
        input: Option<PathBuf>,

        /// Average every N rows before sonifying
        #[arg(long)]
        to_mean: Option<usize>,

        /// Collapse to the element-wise minimum row
        #[arg(long)]
        only_min: bool,

        /// Collapse to the element-wise maximum row
        #[arg(long)]
        only_max: bool,
    },

    /// Sonify text by word frequency
    Text {
        /// Input file, or - for stdin
        input: Option<PathBuf>,

        /// Keep stopwords
        #[arg(long)]
        no_stopwords: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = FileConfig::load_with_sources_from(cli.overrides.config.as_deref())
        .context("Failed to load configuration")?;
    cli.overrides.apply(&mut config);

    init_tracing(&config.logging.level);
    log_sources(&sources);

    match cli.command {
        Commands::Floats { input } => {
            let values = input::parse_sequence(&input::read_input(input.as_deref())?)?;
            let track = sonify::sonify_row(&values, &config.sonify)?;
            write(&[track], &config)?;
        }
        Commands::Matrix {
            input,
            to_mean,
            only_min,
            only_max,
        } => {
            if let Some(n) = to_mean {
                config.sonify.to_mean_group_size = n;
            }
            config.sonify.only_min |= only_min;
            config.sonify.only_max |= only_max;

            let rows = input::parse_rows(&input::read_input(input.as_deref())?)?;
            let tracks = sonify::sonify_matrix(&rows, &config.sonify)?;
            write(&tracks, &config)?;
        }
        Commands::Text {
            input,
            no_stopwords,
        } => {
            if no_stopwords {
                config.sonify.stopwords = None;
            }
            let text = input::read_input(input.as_deref())?;
            let track = sonify::sonify_text(&text, &config.sonify)?;
            write(&[track], &config)?;
        }
        Commands::Config => {
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}

fn log_sources(sources: &ConfigSources) {
    for file in &sources.files {
        debug!(path = %file.display(), "loaded config file");
    }
    for var in &sources.env_overrides {
        debug!(var = %var, "config overridden from environment");
    }
}

fn write(tracks: &[Track], config: &FileConfig) -> Result<()> {
    let path: &Path = &config.output.path;
    sonify::write_midi_file(tracks, path, &config.output.midi_params())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let notes: usize = tracks.iter().map(|t| t.notes.len()).sum();
    info!(tracks = tracks.len(), notes, "sonified");
    println!(
        "Wrote {} ({} track{}, {} notes)",
        path.display(),
        tracks.len(),
        if tracks.len() == 1 { "" } else { "s" },
        notes
    );
    Ok(())
}
