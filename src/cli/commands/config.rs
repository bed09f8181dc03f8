//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<PathBuf>, settings: &Settings) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                ));
                return Ok(());
            }

            Settings::default().save_to(&config_path)?;
            Output::success(&format!("Created config file: {}", config_path.display()));
            Output::info("Set library.input_dir to your video folder, then run 'vidscribe doctor'.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vidscribe").join("config.toml");

        run_config(&ConfigAction::Init { force: false }, Some(path.clone()), &Settings::default())
            .unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.library.extensions, Settings::default().library.extensions);
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();

        run_config(&ConfigAction::Init { force: false }, Some(path.clone()), &Settings::default())
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("debug"));

        run_config(&ConfigAction::Init { force: true }, Some(path.clone()), &Settings::default())
            .unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("\"debug\""));
    }
}
