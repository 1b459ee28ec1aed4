//! Shared helpers for integration tests.

use assert_cmd::Command;
use fixturegen::test_utils::StoreFixture;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary working directory with an isolated global config directory.
pub struct FixtureProject {
    _temp: TempDir,
    root: PathBuf,
    config_home: PathBuf,
}

impl FixtureProject {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("project");
        let config_home = temp.path().join("config-home");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&config_home).unwrap();
        Self {
            _temp: temp,
            root,
            config_home,
        }
    }

    /// A project containing `shop.json`.
    pub fn with_shop() -> Self {
        let project = Self::new();
        StoreFixture::shop().write_to(&project.root).unwrap();
        project
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `relative` inside the project, creating parents.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write the global configuration file.
    pub fn write_global_config(&self, content: &str) {
        let dir = self.config_home.join("fixturegen");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), content).unwrap();
    }

    /// The `fixture` binary, run in the project with a clean environment.
    pub fn fixture(&self) -> Command {
        let mut cmd = Command::cargo_bin("fixture").unwrap();
        cmd.current_dir(&self.root)
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env("NO_COLOR", "1")
            .env_remove("FIXTUREGEN_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run `fixture` with `args` and return stdout, asserting success.
    pub fn generate(&self, args: &[&str]) -> String {
        let output = self.fixture().args(args).assert().success();
        String::from_utf8_lossy(&output.get_output().stdout).into_owned()
    }
}

/// Class names of the blocks in TOML output, in declaration order.
pub fn toml_blocks(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix('[')?.strip_suffix(']'))
        .filter(|name| !name.contains('.') && *name != "fixture")
        .map(str::to_string)
        .collect()
}
