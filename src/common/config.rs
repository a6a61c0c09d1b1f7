use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Cache behavior settings, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Paths under this directory are rewritten relative to the working
    /// directory to improve hit rate across machines. Empty disables
    /// relativization.
    pub base_dir: String,
    /// Root of the object store.
    pub cache_dir: String,
    /// Hash sources without running the preprocessor when the argument
    /// vector is known safe.
    pub direct_mode: bool,
    /// Compile the original source a second time instead of the
    /// preprocessed output.
    pub run_second_cpp: bool,
    /// Invoke the compiler with original arguments to produce the
    /// dependency file used for cache keying.
    pub depend_mode: bool,
    /// Extension for preprocessed files. Derived from the source language
    /// when empty.
    pub cpp_extension: String,
    pub sloppiness: Sloppiness,
}

/// Semantic differences the user permits the cache to ignore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sloppiness {
    pub time_macros: bool,
    pub pch_defines: bool,
    pub modules: bool,
    pub clang_index_store: bool,
}

impl Config {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Load config from default locations
    pub fn load_default() -> Result<Self> {
        // Try current directory first
        if Path::new("config.toml").exists() {
            return Self::load("config.toml");
        }

        // Try ~/.config/compcache/config.toml
        if let Some(home) = std::env::var_os("HOME") {
            let config_path = Path::new(&home)
                .join(".config")
                .join("compcache")
                .join("config.toml");
            if config_path.exists() {
                return Self::load(config_path);
            }
        }

        // Return default config
        Ok(Self::default())
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = match std::env::var_os("HOME") {
            Some(home) => Path::new(&home)
                .join(".cache")
                .join("compcache")
                .display()
                .to_string(),
            None => "./compcache-cache".to_string(),
        };
        Config {
            base_dir: String::new(),
            cache_dir,
            direct_mode: true,
            run_second_cpp: true,
            depend_mode: false,
            cpp_extension: String::new(),
            sloppiness: Sloppiness::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.base_dir = "/work".to_string();
        config.run_second_cpp = false;
        config.sloppiness.time_macros = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.base_dir, "/work");
        assert!(!loaded.run_second_cpp);
        assert!(loaded.sloppiness.time_macros);
        assert!(!loaded.sloppiness.pch_defines);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "base_dir = \"/src\"\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.base_dir, "/src");
        assert!(loaded.direct_mode);
        assert!(loaded.run_second_cpp);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "base_dir = [1, 2]\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
