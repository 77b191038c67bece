//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::infra::bus::INTROSPECTABLE;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".dbusgen/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bus: Bus,
    #[serde(default)]
    pub generator: Generator,
    #[serde(default)]
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bus {
    #[serde(default = "Bus::default_service")]
    pub service: String,
    #[serde(default = "Bus::default_object_path")]
    pub object_path: String,
    #[serde(default = "Bus::default_interface")]
    pub interface: String,
}

impl Bus {
    fn default_service() -> String {
        "com.deepin.menu".into()
    }

    fn default_object_path() -> String {
        "/com/deepin/menu".into()
    }

    fn default_interface() -> String {
        INTROSPECTABLE.into()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            service: Self::default_service(),
            object_path: Self::default_object_path(),
            interface: Self::default_interface(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    /// Binding generator executable, resolved from `PATH` unless absolute.
    #[serde(default = "Generator::default_program")]
    pub program: String,
    #[serde(default = "Generator::default_base_name")]
    pub base_name: String,
    #[serde(default = "Generator::default_output_dir")]
    pub output_dir: String,
}

impl Generator {
    fn default_program() -> String {
        "qdbusxml2cpp".into()
    }

    fn default_base_name() -> String {
        "interface".into()
    }

    fn default_output_dir() -> String {
        ".".into()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            base_name: Self::default_base_name(),
            output_dir: Self::default_output_dir(),
        }
    }
}

/// Interface names excluded from generation unless toggled back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default = "Filter::default_exclude")]
    pub exclude: Vec<String>,
}

impl Filter {
    fn default_exclude() -> Vec<String> {
        vec![
            "org.freedesktop.DBus.Introspectable".into(),
            "org.freedesktop.DBus.Properties".into(),
            "org.freedesktop.DBus.Peer".into(),
            "com.deepin.DBus.LifeManager".into(),
        ]
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            exclude: Self::default_exclude(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    service: Option<String>,
    object_path: Option<String>,
    generator: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            service: env::var("DBUSGEN_SERVICE").ok(),
            object_path: env::var("DBUSGEN_OBJECT_PATH").ok(),
            generator: env::var("DBUSGEN_GENERATOR").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(service: &str, generator: &str) -> Self {
        Self {
            service: Some(service.to_owned()),
            object_path: None,
            generator: Some(generator.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            bus: merge_bus(self.bus, other.bus),
            generator: merge_generator(self.generator, other.generator),
            filter: merge_filter(self.filter, other.filter),
        }
    }
}

fn merge_bus(base: Bus, overlay: Bus) -> Bus {
    Bus {
        service: if overlay.service != Bus::default_service() {
            overlay.service
        } else {
            base.service
        },
        object_path: if overlay.object_path != Bus::default_object_path() {
            overlay.object_path
        } else {
            base.object_path
        },
        interface: if overlay.interface != Bus::default_interface() {
            overlay.interface
        } else {
            base.interface
        },
    }
}

fn merge_generator(base: Generator, overlay: Generator) -> Generator {
    Generator {
        program: if overlay.program != Generator::default_program() {
            overlay.program
        } else {
            base.program
        },
        base_name: if overlay.base_name != Generator::default_base_name() {
            overlay.base_name
        } else {
            base.base_name
        },
        output_dir: if overlay.output_dir != Generator::default_output_dir() {
            overlay.output_dir
        } else {
            base.output_dir
        },
    }
}

fn merge_filter(base: Filter, overlay: Filter) -> Filter {
    let mut exclude: BTreeSet<String> = base.exclude.into_iter().collect();
    exclude.extend(overlay.exclude);

    Filter {
        exclude: exclude.into_iter().collect(),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("dbusgen/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(service) = env.service {
        config.bus.service = service;
    }
    if let Some(object_path) = env.object_path {
        config.bus.object_path = object_path;
    }
    if let Some(generator) = env.generator {
        config.generator.program = generator;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.bus.service, "com.deepin.menu");
        assert_eq!(config.bus.object_path, "/com/deepin/menu");
        assert_eq!(config.bus.interface, "org.freedesktop.DBus.Introspectable");
        assert_eq!(config.generator.program, "qdbusxml2cpp");
        assert!(
            config
                .filter
                .exclude
                .contains(&"org.freedesktop.DBus.Properties".to_string())
        );
        assert_eq!(config.filter.exclude.len(), 4);
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[bus]
service = "com.example.daemon"
[filter]
exclude = ["com.example.Debug"]
"#,
        )?;

        let workspace = temp.path().join("workspace.toml");
        fs::write(
            &workspace,
            r#"
[generator]
base_name = "daemon"
"#,
        )?;

        let config =
            Config::load_with_layers(Some(global), Some(workspace), EnvOverrides::default())?;
        assert_eq!(config.bus.service, "com.example.daemon");
        assert_eq!(config.generator.base_name, "daemon");
        assert!(
            config
                .filter
                .exclude
                .contains(&"com.example.Debug".to_string())
        );
        assert!(
            config
                .filter
                .exclude
                .contains(&"org.freedesktop.DBus.Peer".to_string())
        );
        Ok(())
    }

    #[test]
    fn env_overrides_win_over_files() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let workspace = temp.path().join("config.toml");
        fs::write(
            &workspace,
            r#"
[bus]
service = "com.example.file"
"#,
        )?;

        let env = EnvOverrides::for_tests("com.example.env", "/opt/qt/bin/qdbusxml2cpp");
        let config = Config::load_with_layers(None, Some(workspace), env)?;
        assert_eq!(config.bus.service, "com.example.env");
        assert_eq!(config.generator.program, "/opt/qt/bin/qdbusxml2cpp");
        Ok(())
    }
}
