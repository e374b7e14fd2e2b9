//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, FileConfig};
use sonify::{Error as SonifyError, ThresholdRule};
use std::env;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    // System config
    let system = PathBuf::from("/etc/sonify/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("sonify/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("sonify.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and apply its keys on top of `config`.
pub fn apply_file(config: &mut FileConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Apply the keys of a TOML document on top of `config`.
///
/// `path` is only used in error messages.
pub fn apply_toml(config: &mut FileConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let reader = TableReader { path };
    let s = &mut config.sonify;

    if let Some(pitch) = reader.section(&table, "pitch")? {
        if let Some(v) = reader.int(pitch, "pitch.min")? {
            s.min_pitch = reader.narrow(v, "pitch.min")?;
        }
        if let Some(v) = reader.int(pitch, "pitch.max")? {
            s.max_pitch = reader.narrow(v, "pitch.max")?;
        }
    }

    if let Some(notes) = reader.section(&table, "notes")? {
        if let Some(v) = reader.int(notes, "notes.tempo")? {
            s.tempo = reader.narrow(v, "notes.tempo")?;
        }
        if let Some(v) = reader.float(notes, "notes.duration")? {
            s.duration = v;
        }
        if let Some(v) = reader.int(notes, "notes.volume")? {
            s.volume = reader.narrow(v, "notes.volume")?;
        }
    }

    if let Some(exceptions) = reader.section(&table, "exceptions")? {
        s.below = reader.threshold(exceptions, "below", s.below)?;
        s.above = reader.threshold(exceptions, "above", s.above)?;
        s.equal = reader.threshold(exceptions, "equal", s.equal)?;
    }

    if let Some(divider) = reader.section(&table, "divider")? {
        if let Some(v) = reader.int(divider, "divider.interval")? {
            if v <= 0 {
                return Err(reader.error(SonifyError::InvalidInterval(v).to_string()));
            }
            s.interval = Some(reader.narrow(v, "divider.interval")?);
        }
        if let Some(v) = reader.int(divider, "divider.pitch")? {
            s.divider.pitch = reader.narrow(v, "divider.pitch")?;
        }
        if let Some(v) = reader.float(divider, "divider.duration")? {
            s.divider.duration = v;
        }
        if let Some(v) = reader.int(divider, "divider.volume")? {
            s.divider.volume = reader.narrow(v, "divider.volume")?;
        }
    }

    if let Some(suppress) = reader.section(&table, "suppress")? {
        if let Some(v) = reader.bool(suppress, "suppress.skip_duplicates")? {
            s.skip_duplicates = v;
        }
        if let Some(values) = reader.array(suppress, "suppress.skip_values")? {
            s.skip_values = values
                .iter()
                .map(|v| reader.as_float(v, "suppress.skip_values"))
                .collect::<Result<Vec<f64>, _>>()?;
        }
    }

    if let Some(rows) = reader.section(&table, "rows")? {
        if let Some(v) = reader.int(rows, "rows.to_mean")? {
            s.to_mean_group_size = reader.narrow(v, "rows.to_mean")?;
        }
        if let Some(v) = reader.bool(rows, "rows.only_min")? {
            s.only_min = v;
        }
        if let Some(v) = reader.bool(rows, "rows.only_max")? {
            s.only_max = v;
        }
    }

    if let Some(text) = reader.section(&table, "text")? {
        match text.get("stopwords") {
            None => {}
            Some(Value::Boolean(false)) => s.stopwords = None,
            Some(Value::Boolean(true)) => s.stopwords = Some(sonify::text::default_stopwords()),
            Some(Value::Array(words)) => {
                let words = words
                    .iter()
                    .map(|w| {
                        w.as_str()
                            .map(str::to_lowercase)
                            .ok_or_else(|| reader.error("text.stopwords must contain strings"))
                    })
                    .collect::<Result<Vec<String>, _>>()?;
                s.stopwords = Some(words);
            }
            Some(_) => {
                return Err(reader.error("text.stopwords must be a boolean or an array of strings"));
            }
        }
    }

    if let Some(output) = reader.section(&table, "output")? {
        if let Some(v) = output.get("path") {
            let path = v
                .as_str()
                .ok_or_else(|| reader.error("output.path must be a string"))?;
            config.output.path = expand_path(path);
        }
        if let Some(v) = reader.int(output, "output.ticks_per_beat")? {
            config.output.ticks_per_beat = reader.narrow(v, "output.ticks_per_beat")?;
        }
        if let Some(v) = reader.int(output, "output.program")? {
            if !(0..=127).contains(&v) {
                return Err(reader.error(format!(
                    "output.program = {} is not a General MIDI program (0-127)",
                    v
                )));
            }
            config.output.program = Some(reader.narrow(v, "output.program")?);
        }
    }

    if let Some(logging) = reader.section(&table, "logging")? {
        if let Some(v) = logging.get("level") {
            config.logging.level = v
                .as_str()
                .ok_or_else(|| reader.error("logging.level must be a string"))?
                .to_string();
        }
    }

    Ok(())
}

/// Typed access to a parsed TOML table, with errors naming the file.
struct TableReader<'a> {
    path: &'a Path,
}

impl<'a> TableReader<'a> {
    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Parse {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn section<'t>(&self, table: &'t Table, name: &str) -> Result<Option<&'t Table>, ConfigError> {
        match table.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_table()
                .map(Some)
                .ok_or_else(|| self.error(format!("[{}] must be a table", name))),
        }
    }

    /// Look up the last dotted segment of `key` in `table`.
    fn get<'t>(&self, table: &'t Table, key: &str) -> Option<&'t Value> {
        let field = key.rsplit('.').next().unwrap_or(key);
        table.get(field)
    }

    fn int(&self, table: &Table, key: &str) -> Result<Option<i64>, ConfigError> {
        self.get(table, key)
            .map(|v| {
                v.as_integer()
                    .ok_or_else(|| self.error(format!("{} must be an integer", key)))
            })
            .transpose()
    }

    fn float(&self, table: &Table, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get(table, key)
            .map(|v| self.as_float(v, key))
            .transpose()
    }

    fn as_float(&self, value: &Value, key: &str) -> Result<f64, ConfigError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(self.error(format!("{} must be a number", key))),
        }
    }

    fn bool(&self, table: &Table, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(table, key)
            .map(|v| {
                v.as_bool()
                    .ok_or_else(|| self.error(format!("{} must be a boolean", key)))
            })
            .transpose()
    }

    fn array<'t>(&self, table: &'t Table, key: &str) -> Result<Option<&'t Vec<Value>>, ConfigError> {
        self.get(table, key)
            .map(|v| {
                v.as_array()
                    .ok_or_else(|| self.error(format!("{} must be an array", key)))
            })
            .transpose()
    }

    fn narrow<T: TryFrom<i64>>(&self, value: i64, key: &str) -> Result<T, ConfigError> {
        T::try_from(value).map_err(|_| self.error(format!("{} = {} is out of range", key, value)))
    }

    /// Merge `[exceptions.<name>]` into an existing rule. A new rule needs a
    /// `value`; an existing one may change just its shape.
    fn threshold(
        &self,
        exceptions: &Table,
        name: &str,
        existing: Option<ThresholdRule>,
    ) -> Result<Option<ThresholdRule>, ConfigError> {
        let Some(section) = self.section(exceptions, name)? else {
            return Ok(existing);
        };
        let key = |field: &str| format!("exceptions.{}.{}", name, field);

        let mut rule = match (self.float(section, &key("value"))?, existing) {
            (Some(value), Some(rule)) => ThresholdRule { value, ..rule },
            (Some(value), None) => ThresholdRule::new(value),
            (None, Some(rule)) => rule,
            (None, None) => return Err(self.error(format!("{} is required", key("value")))),
        };
        if let Some(v) = self.float(section, &key("duration"))? {
            rule.duration = v;
        }
        if let Some(v) = self.int(section, &key("volume"))? {
            rule.volume = self.narrow(v, &key("volume"))?;
        }
        Ok(Some(rule))
    }
}

/// Apply environment variable overrides, reading variables through `lookup`.
pub fn apply_env_overrides<F>(
    config: &mut FileConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    fn parsed<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            var: var.to_string(),
            message: e.to_string(),
        })
    }

    let s = &mut config.sonify;
    if let Some(v) = lookup("SONIFY_MIN_PITCH") {
        s.min_pitch = parsed("SONIFY_MIN_PITCH", &v)?;
        sources.env_overrides.push("SONIFY_MIN_PITCH".to_string());
    }
    if let Some(v) = lookup("SONIFY_MAX_PITCH") {
        s.max_pitch = parsed("SONIFY_MAX_PITCH", &v)?;
        sources.env_overrides.push("SONIFY_MAX_PITCH".to_string());
    }
    if let Some(v) = lookup("SONIFY_TEMPO") {
        s.tempo = parsed("SONIFY_TEMPO", &v)?;
        sources.env_overrides.push("SONIFY_TEMPO".to_string());
    }
    if let Some(v) = lookup("SONIFY_DURATION") {
        s.duration = parsed("SONIFY_DURATION", &v)?;
        sources.env_overrides.push("SONIFY_DURATION".to_string());
    }
    if let Some(v) = lookup("SONIFY_VOLUME") {
        s.volume = parsed("SONIFY_VOLUME", &v)?;
        sources.env_overrides.push("SONIFY_VOLUME".to_string());
    }
    if let Some(v) = lookup("SONIFY_INTERVAL") {
        let interval: usize = parsed("SONIFY_INTERVAL", &v)?;
        s.interval = (interval > 0).then_some(interval);
        sources.env_overrides.push("SONIFY_INTERVAL".to_string());
    }
    if let Some(v) = lookup("SONIFY_OUTPUT") {
        config.output.path = expand_path(&v);
        sources.env_overrides.push("SONIFY_OUTPUT".to_string());
    }
    if let Some(v) = lookup("SONIFY_LOG_LEVEL") {
        config.logging.level = v;
        sources.env_overrides.push("SONIFY_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.logging.level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    Ok(())
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        let (var_name, rest) = stripped.split_once('/').unwrap_or((stripped, ""));
        if let Ok(var_value) = env::var(var_name) {
            return PathBuf::from(var_value).join(rest);
        }
    }
    PathBuf::from(path)
}
