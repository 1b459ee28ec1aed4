//! Generic TOML configuration parsing with file path context.

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::FixtureError;

/// Parse a TOML configuration file into `T`.
///
/// Read failures are reported as [`FixtureError::Io`]; syntax and schema
/// failures as [`FixtureError::ConfigError`]. Both carry the file path.
///
/// ```rust,no_run
/// use fixturegen::config::parse_config;
/// use serde::Deserialize;
/// use std::path::Path;
///
/// #[derive(Deserialize)]
/// struct Settings {
///     template: String,
/// }
///
/// # fn example() -> anyhow::Result<()> {
/// let settings: Settings = parse_config(Path::new("fixturegen.toml"))?;
/// println!("template: {}", settings.template);
/// # Ok(())
/// # }
/// ```
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .map_err(|e| FixtureError::io("read config file", path.display(), &e))?;

    let config: T = toml::from_str(&content)
        .map_err(|e| FixtureError::ConfigError {
            message: format!("{}: {}", path.display(), e.message()),
        })
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}
