use {
    serde::{Deserialize, Deserializer},
    tracing::Level,
    tracing_subscriber::{EnvFilter, filter::ParseError},
};

/// How log events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    #[default]
    Plain,
    Json,
}

/// Logging setup, usually read from the `[logging]` table of a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    /// `EnvFilter` directives such as `mechanism=debug,optimizer=info`.
    pub filter: String,
    pub format: Format,
    /// Events at or above this level are written to stderr, everything else
    /// to stdout.
    #[serde(deserialize_with = "level")]
    pub stderr_level: Level,
}

impl Config {
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = filter.to_owned();
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Parses the filter directives.
    pub fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        EnvFilter::try_new(&self.filter)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            format: Format::Plain,
            stderr_level: Level::ERROR,
        }
    }
}

fn level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
    let level = String::deserialize(deserializer)?;
    level.parse().map_err(serde::de::Error::custom)
}
