//! Player configuration, read once at startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rlhf_pages::{PageKind, PageSettings};
use rlhf_viz::ppo::PpoHyperparams;

use crate::error::{PlayerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub block_size: usize,
    pub lr: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            block_size: 48,
            lr: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Seed for the synthetic PPO batch and its shuffles.
    pub seed: u64,
    /// Page key or route path opened at startup.
    pub start_page: String,
    /// PPO auto-play delay.
    pub tick_speed_ms: u64,
    pub ppo: PpoHyperparams,
    pub reward: RewardConfig,
    /// Pretty-print replies instead of one JSON value per line.
    pub pretty: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            seed: 2026,
            start_page: PageKind::Home.label().to_string(),
            tick_speed_ms: 2000,
            ppo: PpoHyperparams::default(),
            reward: RewardConfig::default(),
            pretty: false,
        }
    }
}

impl PlayerConfig {
    /// Missing file means defaults; an unreadable or malformed file is an
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|source| PlayerError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn start_page(&self) -> Result<PageKind> {
        PageKind::parse(&self.start_page).ok_or_else(|| PlayerError::UnknownPage(self.start_page.clone()))
    }

    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            seed: self.seed,
            ppo: self.ppo,
            ppo_speed_ms: self.tick_speed_ms,
            reward_block_size: self.reward.block_size,
            reward_lr: self.reward.lr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = PlayerConfig::from_json("{}").unwrap();
        assert_eq!(cfg, PlayerConfig::default());
        assert_eq!(cfg.start_page().unwrap(), PageKind::Home);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = PlayerConfig::from_json(
            r#"{"seed": 7, "start_page": "/ppo-visualization", "ppo": {"clip_eps": 0.3}, "reward": {"lr": 0.1}}"#,
        )
        .unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.start_page().unwrap(), PageKind::Ppo);
        assert_eq!(cfg.ppo.clip_eps, 0.3);
        assert_eq!(cfg.ppo.value_coef, 0.5);
        assert_eq!(cfg.reward.block_size, 48);

        let settings = cfg.page_settings();
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.reward_lr, 0.1);
    }

    #[test]
    fn malformed_file_is_an_error_and_missing_file_is_not() {
        let dir = std::env::temp_dir().join(format!("rlhf_player_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("absent.json");
        assert_eq!(PlayerConfig::load(&missing).unwrap(), PlayerConfig::default());

        let bad = dir.join("bad.json");
        fs::write(&bad, "{ seed: ").unwrap();
        assert!(matches!(PlayerConfig::load(&bad), Err(PlayerError::Config { .. })));

        let good = dir.join("good.json");
        fs::write(&good, r#"{"pretty": true}"#).unwrap();
        assert!(PlayerConfig::load(&good).unwrap().pretty);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_start_page_is_reported() {
        let cfg = PlayerConfig {
            start_page: "pong".into(),
            ..PlayerConfig::default()
        };
        assert!(matches!(cfg.start_page(), Err(PlayerError::UnknownPage(_))));
    }
}
