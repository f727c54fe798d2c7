//! Inventory parser for loading the host descriptor store.
//!
//! This module handles loading the inventory from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, JunosOpsError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::Inventory;

/// Inventory parser.
#[derive(Debug, Default)]
pub struct InventoryParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl InventoryParser {
    /// Creates a new inventory parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads the inventory from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Inventory> {
        let path = path.as_ref();
        info!("Loading inventory from: {}", path.display());

        if !path.exists() {
            return Err(JunosOpsError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            JunosOpsError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses the inventory from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Inventory> {
        debug!("Parsing YAML inventory");

        let inventory: Inventory = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            JunosOpsError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed inventory with {} hosts", inventory.hosts.len());
        Ok(inventory)
    }

    /// Loads the inventory with environment variable overrides.
    ///
    /// `JUNOS_OPS_USER`, `JUNOS_OPS_PASSWORD` and `JUNOS_OPS_SSH_KEY` replace
    /// the corresponding entries of the defaults section.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Inventory> {
        let mut inventory = self.load_file(path)?;
        Self::apply_env_overrides(&mut inventory);
        Ok(inventory)
    }

    /// Applies environment variable overrides to the inventory.
    fn apply_env_overrides(inventory: &mut Inventory) {
        if let Ok(user) = std::env::var("JUNOS_OPS_USER") {
            debug!("Overriding defaults.user from environment");
            inventory.defaults.user = Some(user);
        }

        if let Ok(password) = std::env::var("JUNOS_OPS_PASSWORD") {
            debug!("Overriding defaults.password from environment");
            inventory.defaults.password = Some(password);
        }

        if let Ok(key) = std::env::var("JUNOS_OPS_SSH_KEY") {
            debug!("Overriding defaults.ssh_key from environment");
            inventory.defaults.ssh_key = Some(key);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                JunosOpsError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default inventory file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["junos-ops.yaml", "junos-ops.yml"];

/// Finds the inventory file in the start directory, its parents, or
/// `$XDG_CONFIG_HOME/junos-ops/`.
///
/// # Errors
///
/// Returns an error if no inventory file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found inventory file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = config_dir.join("junos-ops").join(filename);
            if config_path.exists() {
                info!("Found inventory file: {}", config_path.display());
                return Ok(config_path);
            }
        }
    }

    Err(JunosOpsError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

/// Loads set commands from a file, dropping blank lines and `#` comments.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_commands(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashAlgorithm;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_inventory() {
        let yaml = r"
hosts:
  - name: sw1
";
        let parser = InventoryParser::new();
        let inventory = parser.parse_yaml(yaml, None).expect("parse failed");
        assert_eq!(inventory.hosts.len(), 1);
        assert_eq!(inventory.hosts[0].name, "sw1");
        assert!(inventory.defaults.packages.is_empty());
    }

    #[test]
    fn test_parse_full_inventory() {
        let yaml = r#"
defaults:
  user: admin
  ssh_key: ~/.ssh/id_ed25519
  port: 830
  hash_algorithm: md5
  remote_path: /var/tmp
  packages:
    ex2300-24t:
      file: junos-arm-32-22.4R3-S6.5.tgz
      hash: abc123def456
    srx345:
      file: junos-srxsme-15.1X49-D240.tgz
      hash: "0123456789"

hosts:
  - name: sw1
    host: 192.0.2.1
    tags: [tokyo, ex]
  - name: fw1
    host: 192.0.2.2
    tags: [osaka, srx]
    hash_algorithm: sha256
    confirm_timeout: 3
    health_check: "ping count 5 rapid 192.0.2.254"
"#;
        let parser = InventoryParser::new();
        let inventory = parser.parse_yaml(yaml, None).expect("parse failed");
        let hosts = inventory.resolve();

        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].hash_algorithm, HashAlgorithm::Md5);
        assert_eq!(hosts[1].hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(hosts[1].confirm_timeout, Some(3));
        assert!(hosts[1].package_for("SRX345").is_some());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = InventoryParser::new();
        let result = parser.parse_yaml("hosts: [", None);
        assert!(matches!(
            result,
            Err(JunosOpsError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join("junos-ops.yaml"), "hosts: []\n").expect("write");
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");

        let found = find_config_file(&nested).expect("not found");
        assert_eq!(found, temp.path().join("junos-ops.yaml"));
    }

    #[test]
    fn test_load_commands_strips_comments_and_blanks() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("commands.set");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "# ntp servers").expect("write");
        writeln!(file, "set system host-name test").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "   set system ntp server 10.0.0.1   ").expect("write");
        writeln!(file, "  # trailing comment").expect("write");

        let commands = load_commands(&path).expect("load");
        assert_eq!(
            commands,
            vec![
                String::from("set system host-name test"),
                String::from("set system ntp server 10.0.0.1"),
            ]
        );
    }
}
