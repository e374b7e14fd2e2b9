//! Configuration loading for sonify.
//!
//! Wraps the core [`SonifyConfig`] with the settings only a front end needs
//! (log level, output file) and loads both from layered TOML files plus
//! environment variables.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/sonify/config.toml` (system)
//! 2. `~/.config/sonify/config.toml` (user)
//! 3. `./sonify.toml` (local override), or a path given on the command line
//! 4. Environment variables (`SONIFY_*`, `RUST_LOG`)
//!
//! Only keys present in a file override earlier layers.
//!
//! # Example Config
//!
//! ```toml
//! [pitch]
//! min = 40
//! max = 90
//!
//! [notes]
//! tempo = 100
//! duration = 0.25
//! volume = 90
//!
//! [exceptions.above]
//! value = 30.0
//! duration = 0.5
//! volume = 120
//!
//! [divider]
//! interval = 12
//! pitch = 50
//! duration = 0.5
//! volume = 0
//!
//! [suppress]
//! skip_duplicates = true
//! skip_values = [0.0]
//!
//! [rows]
//! to_mean = 3
//! only_max = false
//!
//! [text]
//! stopwords = false
//!
//! [output]
//! path = "~/sonified.mid"
//! ticks_per_beat = 480
//!
//! [logging]
//! level = "debug"
//! ```

pub mod loader;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};

use serde::{Deserialize, Serialize};
use sonify::{MidiParams, SonifyConfig};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value in environment variable {var}: {message}")]
    Env { var: String, message: String },
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or an EnvFilter
    /// expression). Default: info
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Where and how the MIDI file is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default: ./sonified.mid
    #[serde(default = "OutputConfig::default_path")]
    pub path: PathBuf,

    /// Default: 480
    #[serde(default = "OutputConfig::default_ticks_per_beat")]
    pub ticks_per_beat: u16,

    /// General MIDI program for every track. Default: none
    #[serde(default)]
    pub program: Option<u8>,
}

impl OutputConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("sonified.mid")
    }

    fn default_ticks_per_beat() -> u16 {
        MidiParams::default().ticks_per_beat
    }

    pub fn midi_params(&self) -> MidiParams {
        MidiParams {
            ticks_per_beat: self.ticks_per_beat,
            program: self.program,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            ticks_per_beat: Self::default_ticks_per_beat(),
            program: None,
        }
    }
}

/// Complete sonify configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Sonification options passed to the core.
    #[serde(default)]
    pub sonify: SonifyConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FileConfig {
    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = FileConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources, |var| std::env::var(var).ok())?;

        Ok((config, sources))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> String {
        let s = &self.sonify;
        let mut output = String::new();

        output.push_str("# sonify configuration\n\n");

        output.push_str("[pitch]\n");
        let _ = writeln!(output, "min = {}", s.min_pitch);
        let _ = writeln!(output, "max = {}", s.max_pitch);

        output.push_str("\n[notes]\n");
        let _ = writeln!(output, "tempo = {}", s.tempo);
        let _ = writeln!(output, "duration = {:?}", s.duration);
        let _ = writeln!(output, "volume = {}", s.volume);

        for (name, rule) in [("below", &s.below), ("above", &s.above), ("equal", &s.equal)] {
            if let Some(rule) = rule {
                let _ = writeln!(output, "\n[exceptions.{}]", name);
                let _ = writeln!(output, "value = {:?}", rule.value);
                let _ = writeln!(output, "duration = {:?}", rule.duration);
                let _ = writeln!(output, "volume = {}", rule.volume);
            }
        }

        output.push_str("\n[divider]\n");
        if let Some(interval) = s.interval {
            let _ = writeln!(output, "interval = {}", interval);
        }
        let _ = writeln!(output, "pitch = {}", s.divider.pitch);
        let _ = writeln!(output, "duration = {:?}", s.divider.duration);
        let _ = writeln!(output, "volume = {}", s.divider.volume);

        output.push_str("\n[suppress]\n");
        let _ = writeln!(output, "skip_duplicates = {}", s.skip_duplicates);
        let skip: Vec<String> = s.skip_values.iter().map(|v| format!("{:?}", v)).collect();
        let _ = writeln!(output, "skip_values = [{}]", skip.join(", "));

        output.push_str("\n[rows]\n");
        let _ = writeln!(output, "to_mean = {}", s.to_mean_group_size);
        let _ = writeln!(output, "only_min = {}", s.only_min);
        let _ = writeln!(output, "only_max = {}", s.only_max);

        output.push_str("\n[text]\n");
        match &s.stopwords {
            None => output.push_str("stopwords = false\n"),
            Some(words) if *words == sonify::text::default_stopwords() => {
                output.push_str("stopwords = true\n")
            }
            Some(words) => {
                let quoted: Vec<String> = words.iter().map(|w| format!("{:?}", w)).collect();
                let _ = writeln!(output, "stopwords = [{}]", quoted.join(", "));
            }
        }

        output.push_str("\n[output]\n");
        let _ = writeln!(output, "path = {:?}", self.output.path.display().to_string());
        let _ = writeln!(output, "ticks_per_beat = {}", self.output.ticks_per_beat);
        if let Some(program) = self.output.program {
            let _ = writeln!(output, "program = {}", program);
        }

        output.push_str("\n[logging]\n");
        let _ = writeln!(output, "level = {:?}", self.logging.level);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.sonify.tempo, 120);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output.path, PathBuf::from("sonified.mid"));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = FileConfig::default();
        config.sonify.interval = Some(4);
        config.sonify.above = Some(sonify::ThresholdRule::new(2.5));
        config.sonify.skip_values = vec![1.0, 2.5];
        config.sonify.stopwords = Some(vec!["foo".to_string()]);
        config.output.program = Some(52);

        let rendered = config.to_toml();
        assert!(rendered.contains("[exceptions.above]"));
        assert!(!rendered.contains("[exceptions.below]"));

        let mut reloaded = FileConfig::default();
        loader::apply_toml(&mut reloaded, &rendered, Path::new("rendered.toml")).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_default_stopwords_render_as_true() {
        let rendered = FileConfig::default().to_toml();
        assert!(rendered.contains("stopwords = true"));
    }
}
