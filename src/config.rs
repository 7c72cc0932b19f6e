use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub speedtest: SpeedtestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Users allowed to trigger commands. Empty admits everyone.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

/// External program that performs the measurement and prints JSON
#[derive(Debug, Deserialize, Clone)]
pub struct SpeedtestConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for SpeedtestConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
        }
    }
}

fn default_command() -> String {
    "speedtest-cli".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--json".to_string(), "--share".to_string()]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = Config::parse("[telegram]\nbot_token = \"123:abc\"\n").unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert!(config.telegram.allowed_user_ids.is_empty());
        assert_eq!(config.speedtest.command, "speedtest-cli");
        assert_eq!(config.speedtest.args, vec!["--json", "--share"]);
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_token = "t"
            allowed_user_ids = [111, 222]

            [speedtest]
            command = "/usr/local/bin/speedtest-cli"
            args = ["--json", "--secure"]
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.allowed_user_ids, vec![111, 222]);
        assert_eq!(config.speedtest.command, "/usr/local/bin/speedtest-cli");
        assert_eq!(config.speedtest.args, vec!["--json", "--secure"]);
    }

    #[test]
    fn test_partial_speedtest_section() {
        let config =
            Config::parse("[telegram]\nbot_token = \"t\"\n[speedtest]\ncommand = \"st\"\n").unwrap();
        assert_eq!(config.speedtest.command, "st");
        assert_eq!(config.speedtest.args, vec!["--json", "--share"]);
    }

    #[test]
    fn test_missing_token_rejected() {
        assert!(Config::parse("[telegram]\n").is_err());
        assert!(Config::parse("[telegram]\nbot_token = \"  \"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/speedbot.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
