//! Page inventory: stable keys, route paths and catalog text.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Home,
    TokenShift,
    LogProb,
    ValueModel,
    Advantage,
    PaddingMasking,
    Ppo,
    RewardData,
    RewardTraining,
}

impl PageKind {
    pub fn label(self) -> &'static str {
        match self {
            PageKind::Home => "home",
            PageKind::TokenShift => "token_shift",
            PageKind::LogProb => "log_prob",
            PageKind::ValueModel => "value_model",
            PageKind::Advantage => "advantage",
            PageKind::PaddingMasking => "padding_masking",
            PageKind::Ppo => "ppo",
            PageKind::RewardData => "reward_data",
            PageKind::RewardTraining => "reward_training",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            PageKind::Home => "/",
            PageKind::TokenShift => "/token-visualization",
            PageKind::LogProb => "/logprob-visualization",
            PageKind::ValueModel => "/valuemodel-visualization",
            PageKind::Advantage => "/advantage-visualization",
            PageKind::PaddingMasking => "/paddingmasking-visualization",
            PageKind::Ppo => "/ppo-visualization",
            PageKind::RewardData => "/rewardmodeldatamodeling-visualization",
            PageKind::RewardTraining => "/rewardmodeltraining",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PageKind::Home => "RLHF Visualizer",
            PageKind::TokenShift => "Token Shifting",
            PageKind::LogProb => "Log Probabilities",
            PageKind::ValueModel => "Value Model",
            PageKind::Advantage => "Advantage",
            PageKind::PaddingMasking => "Padding & Masks",
            PageKind::Ppo => "PPO Training Loop",
            PageKind::RewardData => "Reward Model Data Processing",
            PageKind::RewardTraining => "Reward Model Training",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PageKind::Home => "Catalog of the RLHF walkthroughs.",
            PageKind::TokenShift => "Input–target alignment for LM",
            PageKind::LogProb => "Token log-probs with teacher forcing",
            PageKind::ValueModel => "Predict returns with value head",
            PageKind::Advantage => "Compute A_t (GAE)",
            PageKind::PaddingMasking => "Why padding/masking are needed",
            PageKind::Ppo => "Mini-batching, clipped loss, updates",
            PageKind::RewardData => "Prepare (prompt, chosen, rejected), pad/mask to block size",
            PageKind::RewardTraining => "Pairwise loss −logσ(Δ) and accuracy visualization",
        }
    }

    pub fn all() -> &'static [PageKind] {
        &[
            PageKind::Home,
            PageKind::RewardData,
            PageKind::RewardTraining,
            PageKind::TokenShift,
            PageKind::LogProb,
            PageKind::ValueModel,
            PageKind::Advantage,
            PageKind::PaddingMasking,
            PageKind::Ppo,
        ]
    }

    /// Accepts a label (`ppo`) or a route path (`/ppo-visualization`).
    pub fn parse(name: &str) -> Option<PageKind> {
        let name = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|k| k.label() == name || k.path() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_inventory_is_stable() {
        let all = PageKind::all();
        assert_eq!(all.len(), 9);

        let mut labels: Vec<&'static str> = all.iter().copied().map(PageKind::label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 9);

        let mut paths: Vec<&'static str> = all.iter().copied().map(PageKind::path).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 9);

        for k in all {
            assert!(!k.title().trim().is_empty());
            assert!(!k.description().trim().is_empty());
            assert!(k.path().starts_with('/'));
        }
    }

    #[test]
    fn parse_by_label_or_path() {
        assert_eq!(PageKind::parse("ppo"), Some(PageKind::Ppo));
        assert_eq!(PageKind::parse("/rewardmodeltraining"), Some(PageKind::RewardTraining));
        assert_eq!(PageKind::parse(" /"), Some(PageKind::Home));
        assert_eq!(PageKind::parse("pong"), None);
    }
}
