//! Configuration for fixture generation.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults (`toml` template, no prefix, `Data` suffix)
//! 2. Global file: `<config dir>/fixturegen/config.toml`
//!    (`~/.config/fixturegen/config.toml` on Linux)
//! 3. Project file: `fixturegen.toml` in the working directory, or the file
//!    given with `--config` / `FIXTUREGEN_CONFIG`
//! 4. Command-line flags
//!
//! ```toml
//! template = "yaml"
//! prefix = "Fx"
//! suffix = "Data"
//! env = ["fixtures", "../shared"]
//! dsn = "file:data/snapshot.json"
//! ```
//!
//! Relative `env` entries and a relative file `dsn` (`file:<path>` or a
//! plain path) are resolved against the directory of the file that lists
//! them. Unknown keys are rejected.
//!
//! The merged result is a [`GenerateOptions`], which is what the generator
//! and handlers read.

mod parser;

pub use parser::parse_config;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::handler::Naming;
use crate::templating::DEFAULT_TEMPLATE;

/// Name of the project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "fixturegen.toml";

/// Contents of one configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Extra directories searched for store modules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
}

impl ConfigFile {
    /// Location of the global configuration file, if the platform has a
    /// configuration directory.
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fixturegen").join("config.toml"))
    }

    /// Load one file, resolving relative `env` entries and a relative file
    /// `dsn` against its directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: Self = parse_config(path)?;
        if let Some(dir) = path.parent() {
            for entry in &mut config.env {
                if entry.is_relative() {
                    *entry = dir.join(&*entry);
                }
            }
            if let Some(dsn) = &mut config.dsn {
                *dsn = resolve_dsn(dsn, dir);
            }
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load a file if it exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.is_file() {
            Self::load_from(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Overlay `other` on top of `self`.
    ///
    /// Set keys of `other` win; a non-empty `env` list replaces this one.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            template: other.template.or(self.template),
            prefix: other.prefix.or(self.prefix),
            suffix: other.suffix.or(self.suffix),
            env: if other.env.is_empty() {
                self.env
            } else {
                other.env
            },
            dsn: other.dsn.or(self.dsn),
        }
    }

    /// Merge the global file and the project file.
    ///
    /// `explicit` must exist when given; otherwise `fixturegen.toml` in
    /// `base_dir` is used if present. A missing global file is skipped.
    pub fn load_layered(
        global: Option<&Path>,
        base_dir: &Path,
        explicit: Option<&Path>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = global
            && let Some(layer) = Self::load_optional(global)?
        {
            config = config.merge(layer);
        }

        let project = match explicit {
            Some(path) => Some(Self::load_from(path)?),
            None => Self::load_optional(&base_dir.join(PROJECT_CONFIG_FILE))?,
        };
        if let Some(layer) = project {
            config = config.merge(layer);
        }

        Ok(config)
    }
}

/// Settings of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    base_dir: PathBuf,
    dsn: Option<String>,
    naming: Naming,
    env: Vec<PathBuf>,
    require_handlers: Vec<String>,
    template: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            dsn: None,
            naming: Naming::default(),
            env: Vec::new(),
            require_handlers: Vec::new(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl GenerateOptions {
    /// Defaults rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with a merged configuration file.
    pub fn from_config(base_dir: impl Into<PathBuf>, config: ConfigFile) -> Self {
        let mut options = Self::new(base_dir);
        if let Some(template) = config.template {
            options.template = template;
        }
        if let Some(prefix) = config.prefix {
            options.naming.prefix = prefix;
        }
        if let Some(suffix) = config.suffix {
            options.naming.suffix = suffix;
        }
        options.env = config.env;
        options.dsn = config.dsn;
        options
    }

    #[must_use]
    pub fn with_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.naming.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.naming.suffix = suffix.into();
        self
    }

    /// Append search directories after the configured ones.
    #[must_use]
    pub fn with_env(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.env.extend(dirs);
        self
    }

    #[must_use]
    pub fn with_required_handlers(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.require_handlers.extend(names);
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Connection string handed to the handler.
    pub fn dsn(&self) -> Option<&str> {
        self.dsn.as_deref()
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn prefix(&self) -> &str {
        &self.naming.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.naming.suffix
    }

    /// Extra search directories, in search order.
    pub fn env(&self) -> &[PathBuf] {
        &self.env
    }

    /// Handlers that must be registered before the run starts.
    pub fn require_handlers(&self) -> &[String] {
        &self.require_handlers
    }

    /// Template name.
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Anchor a relative file DSN at `dir`, keeping any `file:` prefix.
/// DSNs with a URL scheme are returned unchanged.
fn resolve_dsn(dsn: &str, dir: &Path) -> String {
    if dsn.contains("://") {
        return dsn.to_string();
    }
    let (scheme, path) = match dsn.strip_prefix("file:") {
        Some(path) => ("file:", path),
        None => ("", dsn),
    };
    if Path::new(path).is_absolute() {
        dsn.to_string()
    } else {
        format!("{scheme}{}", dir.join(path).display())
    }
}
