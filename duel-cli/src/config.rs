use anyhow::Context;
use duel_core::LobbyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "duel.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub verbose: bool,
    pub lobby: LobbyConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            verbose: false,
            lobby: LobbyConfig::default(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coinduel")
}

impl CliConfig {
    /// Reads `duel.json` from `data_dir` when present. The directory the
    /// file was found in always wins over a `data_dir` written inside it.
    pub async fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(CONFIG_FILE);

        let mut config = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<CliConfig>(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            CliConfig::default()
        };

        config.data_dir = data_dir.to_path_buf();
        config.lobby.validate()?;
        Ok(config)
    }
}
