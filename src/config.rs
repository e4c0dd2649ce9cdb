use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::cli::LogFormat;
use crate::cli::args::{ColorMode, ModeArg};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) registry_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) mode: Option<ModeArg>,
    #[serde(default)]
    pub(crate) log_format: Option<LogFormat>,
    #[serde(default)]
    pub(crate) log_level: Option<String>,
    #[serde(default)]
    pub(crate) color: Option<ColorMode>,
}

/// Where the active config came from; reported once logging is up
#[derive(Debug)]
pub(crate) enum ConfigOrigin {
    Default,
    File(PathBuf),
    Invalid { path: PathBuf, error: String },
}

impl Config {
    pub(crate) fn load() -> (Self, ConfigOrigin) {
        let mut origin = ConfigOrigin::Default;

        for path in Self::get_config_paths() {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match toml::from_str::<Config>(&content) {
                    Ok(config) => return (config, ConfigOrigin::File(path)),
                    Err(e) => {
                        // Keep looking; report the first broken file if nothing loads.
                        if matches!(origin, ConfigOrigin::Default) {
                            origin = ConfigOrigin::Invalid {
                                path,
                                error: e.to_string(),
                            };
                        }
                    }
                }
            }
        }

        (Self::default(), origin)
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/ratecard/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("ratecard").join("config.toml"));
        }

        // 2. Platform config dir (~/Library/Application Support on macOS)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("ratecard").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.ratecard.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ratecard.toml"));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let paths = Config::get_config_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("ratecard")));
    }

    #[test]
    fn parses_every_key() {
        let config: Config = toml::from_str(
            r#"
            registry_dir = "/opt/ratecard/registry"
            mode = "lenient"
            log_format = "json"
            log_level = "ratecard=debug"
            color = "never"
            "#,
        )
        .unwrap();
        assert_eq!(config.registry_dir, Some(PathBuf::from("/opt/ratecard/registry")));
        assert_eq!(config.mode, Some(ModeArg::Lenient));
        assert_eq!(config.log_format, Some(LogFormat::Json));
        assert_eq!(config.log_level.as_deref(), Some("ratecard=debug"));
        assert_eq!(config.color, Some(ColorMode::Never));
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        assert!(toml::from_str::<Config>(r#"offline = true"#).is_err());
        assert!(toml::from_str::<Config>(r#"mode = "relaxed""#).is_err());
    }
}
