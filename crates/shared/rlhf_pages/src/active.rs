//! Uniform dispatch over the nine pages, for hosts that drive one page at a
//! time.

use core::time::Duration;

use serde::Serialize;

use rlhf_viz::ppo::PpoHyperparams;

use crate::advantage::{AdvantagePage, AdvantageSnapshot};
use crate::catalog::PageKind;
use crate::error::{PageError, Result};
use crate::home::{HomePage, HomeSnapshot};
use crate::log_prob::{LogProbPage, LogProbSnapshot};
use crate::padding_masking::{PaddingMaskingPage, PaddingSnapshot};
use crate::params::ParamSpec;
use crate::ppo_training::{PpoSnapshot, PpoTrainingPage};
use crate::reward_data::{RewardDataPage, RewardDataSnapshot};
use crate::reward_training::{RewardTrainingPage, RewardTrainingSnapshot};
use crate::token_shift::{TokenShiftPage, TokenShiftSnapshot};
use crate::value_model::{ValueModelPage, ValueModelSnapshot};

pub use crate::reward_data::TextField;

/// Initial settings applied when a page is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSettings {
    pub seed: u64,
    pub ppo: PpoHyperparams,
    pub ppo_speed_ms: u64,
    pub reward_block_size: usize,
    pub reward_lr: f64,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            seed: 2026,
            ppo: PpoHyperparams::default(),
            ppo_speed_ms: 2000,
            reward_block_size: 48,
            reward_lr: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageSnapshot {
    Home(HomeSnapshot),
    TokenShift(TokenShiftSnapshot),
    LogProb(LogProbSnapshot),
    ValueModel(ValueModelSnapshot),
    Advantage(AdvantageSnapshot),
    PaddingMasking(PaddingSnapshot),
    Ppo(PpoSnapshot),
    RewardData(RewardDataSnapshot),
    RewardTraining(RewardTrainingSnapshot),
}

#[derive(Debug, Clone)]
pub enum ActivePage {
    Home(HomePage),
    TokenShift(TokenShiftPage),
    LogProb(LogProbPage),
    ValueModel(ValueModelPage),
    Advantage(AdvantagePage),
    PaddingMasking(PaddingMaskingPage),
    Ppo(PpoTrainingPage),
    RewardData(RewardDataPage),
    RewardTraining(RewardTrainingPage),
}

impl ActivePage {
    pub fn open(kind: PageKind, settings: &PageSettings) -> Self {
        match kind {
            PageKind::Home => ActivePage::Home(HomePage::new()),
            PageKind::TokenShift => ActivePage::TokenShift(TokenShiftPage::new()),
            PageKind::LogProb => ActivePage::LogProb(LogProbPage::new()),
            PageKind::ValueModel => ActivePage::ValueModel(ValueModelPage::new()),
            PageKind::Advantage => ActivePage::Advantage(AdvantagePage::new()),
            PageKind::PaddingMasking => ActivePage::PaddingMasking(PaddingMaskingPage::new()),
            PageKind::Ppo => ActivePage::Ppo(PpoTrainingPage::with_settings(
                settings.seed,
                settings.ppo,
                settings.ppo_speed_ms,
            )),
            PageKind::RewardData => ActivePage::RewardData(RewardDataPage::new()),
            PageKind::RewardTraining => ActivePage::RewardTraining(RewardTrainingPage::with_settings(
                settings.reward_block_size as f64,
                settings.reward_lr,
            )),
        }
    }

    pub fn kind(&self) -> PageKind {
        match self {
            ActivePage::Home(_) => PageKind::Home,
            ActivePage::TokenShift(_) => PageKind::TokenShift,
            ActivePage::LogProb(_) => PageKind::LogProb,
            ActivePage::ValueModel(_) => PageKind::ValueModel,
            ActivePage::Advantage(_) => PageKind::Advantage,
            ActivePage::PaddingMasking(_) => PageKind::PaddingMasking,
            ActivePage::Ppo(_) => PageKind::Ppo,
            ActivePage::RewardData(_) => PageKind::RewardData,
            ActivePage::RewardTraining(_) => PageKind::RewardTraining,
        }
    }

    /// Returns whether anything changed.
    pub fn next(&mut self) -> Result<bool> {
        Ok(match self {
            ActivePage::Home(_) | ActivePage::RewardData(_) => false,
            ActivePage::TokenShift(p) => p.next(),
            ActivePage::LogProb(p) => p.next(),
            ActivePage::ValueModel(p) => p.next(),
            ActivePage::Advantage(p) => p.next(),
            ActivePage::PaddingMasking(p) => p.next(),
            ActivePage::Ppo(p) => p.next().is_some(),
            ActivePage::RewardTraining(p) => p.next()?,
        })
    }

    pub fn reset(&mut self) {
        match self {
            ActivePage::Home(_) => {}
            ActivePage::TokenShift(p) => p.reset(),
            ActivePage::LogProb(p) => p.reset(),
            ActivePage::ValueModel(p) => p.reset(),
            ActivePage::Advantage(p) => p.reset(),
            ActivePage::PaddingMasking(p) => p.reset(),
            ActivePage::Ppo(p) => p.reset(),
            ActivePage::RewardData(p) => p.reset(),
            ActivePage::RewardTraining(p) => p.reset(),
        }
    }

    /// Delay until the next `tick`, or `None` when the page is idle.
    pub fn tick_interval(&self) -> Option<Duration> {
        match self {
            ActivePage::Home(_) | ActivePage::LogProb(_) | ActivePage::RewardData(_) => None,
            ActivePage::TokenShift(p) => p.tick_interval(),
            ActivePage::ValueModel(p) => p.tick_interval(),
            ActivePage::Advantage(p) => p.tick_interval(),
            ActivePage::PaddingMasking(p) => p.tick_interval(),
            ActivePage::Ppo(p) => p.tick_interval(),
            ActivePage::RewardTraining(p) => p.tick_interval(),
        }
    }

    pub fn tick(&mut self) -> Result<()> {
        match self {
            ActivePage::Home(_) | ActivePage::LogProb(_) | ActivePage::RewardData(_) => {}
            ActivePage::TokenShift(p) => p.tick(),
            ActivePage::ValueModel(p) => p.tick(),
            ActivePage::Advantage(p) => p.tick(),
            ActivePage::PaddingMasking(p) => p.tick(),
            ActivePage::Ppo(p) => p.tick(),
            ActivePage::RewardTraining(p) => p.tick()?,
        }
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        match self {
            ActivePage::Ppo(p) => p.play(),
            ActivePage::RewardTraining(p) => p.play(),
            other => return Err(PageError::unsupported(other.kind(), "play")),
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        match self {
            ActivePage::Ppo(p) => p.pause(),
            ActivePage::RewardTraining(p) => p.pause(),
            other => return Err(PageError::unsupported(other.kind(), "pause")),
        }
        Ok(())
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            ActivePage::Ppo(p) => p.params(),
            ActivePage::RewardData(p) => p.params(),
            ActivePage::RewardTraining(p) => p.params(),
            _ => &[],
        }
    }

    /// Set a parameter; returns the value actually applied after clamping.
    pub fn set_param(&mut self, key: &str, value: f64) -> Result<f64> {
        match self {
            ActivePage::Ppo(p) => p.set_param(key, value),
            ActivePage::RewardData(p) => p.set_param(key, value),
            ActivePage::RewardTraining(p) => p.set_param(key, value),
            other => Err(PageError::unknown_param(other.kind(), key)),
        }
    }

    pub fn set_text(&mut self, field: TextField, text: String) -> Result<()> {
        match self {
            ActivePage::RewardData(p) => p.set_text(field, text),
            ActivePage::RewardTraining(p) => p.set_text(field, text),
            other => return Err(PageError::unsupported(other.kind(), "text")),
        }
        Ok(())
    }

    pub fn log_prob_mut(&mut self) -> Result<&mut LogProbPage> {
        match self {
            ActivePage::LogProb(p) => Ok(p),
            other => Err(PageError::unsupported(other.kind(), "arch/select")),
        }
    }

    pub fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(match self {
            ActivePage::Home(p) => PageSnapshot::Home(p.snapshot()),
            ActivePage::TokenShift(p) => PageSnapshot::TokenShift(p.snapshot()),
            ActivePage::LogProb(p) => PageSnapshot::LogProb(p.snapshot()?),
            ActivePage::ValueModel(p) => PageSnapshot::ValueModel(p.snapshot()),
            ActivePage::Advantage(p) => PageSnapshot::Advantage(p.snapshot()?),
            ActivePage::PaddingMasking(p) => PageSnapshot::PaddingMasking(p.snapshot()),
            ActivePage::Ppo(p) => PageSnapshot::Ppo(p.snapshot()),
            ActivePage::RewardData(p) => PageSnapshot::RewardData(p.snapshot()),
            ActivePage::RewardTraining(p) => PageSnapshot::RewardTraining(p.snapshot()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_page_opens_and_snapshots() {
        let settings = PageSettings::default();
        for &kind in PageKind::all() {
            let mut page = ActivePage::open(kind, &settings);
            assert_eq!(page.kind(), kind);
            page.next().unwrap();
            page.tick().unwrap();
            page.reset();
            assert!(page.snapshot().is_ok(), "{}", kind.label());
        }
    }

    #[test]
    fn playback_only_on_training_pages() {
        let settings = PageSettings::default();
        let mut ppo = ActivePage::open(PageKind::Ppo, &settings);
        ppo.play().unwrap();
        assert_eq!(ppo.tick_interval(), Some(Duration::from_millis(2000)));
        ppo.pause().unwrap();
        assert!(ppo.tick_interval().is_none());

        let mut adv = ActivePage::open(PageKind::Advantage, &settings);
        assert!(matches!(adv.play(), Err(PageError::Unsupported { .. })));
        assert!(adv.set_param("clip_eps", 0.1).is_err());
        assert!(adv.set_text(TextField::Prompt, "x".into()).is_err());
        assert!(adv.log_prob_mut().is_err());
        assert!(adv.params().is_empty());
    }

    #[test]
    fn settings_reach_the_pages() {
        let settings = PageSettings {
            ppo_speed_ms: 750,
            reward_block_size: 64,
            ..PageSettings::default()
        };
        let ppo = ActivePage::open(PageKind::Ppo, &settings);
        match ppo.snapshot().unwrap() {
            PageSnapshot::Ppo(s) => assert_eq!(s.speed_ms, 750),
            other => panic!("unexpected snapshot {other:?}"),
        }
        let rt = ActivePage::open(PageKind::RewardTraining, &settings);
        match rt.snapshot().unwrap() {
            PageSnapshot::RewardTraining(s) => assert_eq!(s.block_size, 64),
            other => panic!("unexpected snapshot {other:?}"),
        }
    }
}
