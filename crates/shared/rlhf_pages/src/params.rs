//! Slider-style parameters exposed by the interactive pages.
//!
//! Values outside the range are clamped, never rejected, and snapped to the
//! slider step so integer parameters (block sizes) stay integral.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSection {
    Clipping,
    LossWeights,
    Playback,
    Data,
    Optimizer,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub section: ParamSection,
    pub description: &'static str,
    pub units: Option<&'static str>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl ParamSpec {
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default;
        }
        let v = value.clamp(self.min, self.max);
        if self.step > 0.0 {
            let snapped = self.min + ((v - self.min) / self.step).round() * self.step;
            snapped.clamp(self.min, self.max)
        } else {
            v
        }
    }
}

pub fn find<'a>(specs: &'a [ParamSpec], key: &str) -> Option<&'a ParamSpec> {
    specs.iter().find(|s| s.key == key)
}

pub const PPO_CLIP_EPS: ParamSpec = ParamSpec {
    key: "clip_eps",
    label: "Clip ε",
    section: ParamSection::Clipping,
    description: "Trust region for the probability ratio: clip(r, 1-ε, 1+ε).",
    units: None,
    min: 0.05,
    max: 0.5,
    step: 0.01,
    default: 0.2,
};

pub const PPO_VALUE_COEF: ParamSpec = ParamSpec {
    key: "value_coef",
    label: "Value coef",
    section: ParamSection::LossWeights,
    description: "Weight of the value loss in the total per-token loss.",
    units: None,
    min: 0.0,
    max: 2.0,
    step: 0.05,
    default: 0.5,
};

pub const PPO_ENTROPY_COEF: ParamSpec = ParamSpec {
    key: "entropy_coef",
    label: "Entropy coef",
    section: ParamSection::LossWeights,
    description: "Weight of the entropy bonus subtracted from the total loss.",
    units: None,
    min: 0.0,
    max: 0.1,
    step: 0.005,
    default: 0.01,
};

pub const PPO_USE_VALUE_CLIP: ParamSpec = ParamSpec {
    key: "use_value_clip",
    label: "Value clipping",
    section: ParamSection::Clipping,
    description: "1 to take the pessimistic max with the clipped value prediction, 0 for plain squared error.",
    units: None,
    min: 0.0,
    max: 1.0,
    step: 1.0,
    default: 1.0,
};

pub const PPO_VALUE_CLIP_RANGE: ParamSpec = ParamSpec {
    key: "value_clip_range",
    label: "Value clip range",
    section: ParamSection::Clipping,
    description: "Half-width of the band around the old value prediction.",
    units: None,
    min: 0.05,
    max: 1.0,
    step: 0.05,
    default: 0.2,
};

pub const PPO_SPEED_MS: ParamSpec = ParamSpec {
    key: "speed_ms",
    label: "Speed",
    section: ParamSection::Playback,
    description: "Delay between automatic steps while playing.",
    units: Some("ms"),
    min: 500.0,
    max: 4000.0,
    step: 250.0,
    default: 2000.0,
};

pub const REWARD_DATA_BLOCK_SIZE: ParamSpec = ParamSpec {
    key: "block_size",
    label: "block_size",
    section: ParamSection::Data,
    description: "Padded length of each prompt+response sequence.",
    units: Some("tokens"),
    min: 8.0,
    max: 128.0,
    step: 1.0,
    default: 32.0,
};

pub const REWARD_TRAINING_BLOCK_SIZE: ParamSpec = ParamSpec {
    key: "block_size",
    label: "block_size",
    section: ParamSection::Data,
    description: "Padded length of each prompt+response sequence.",
    units: Some("tokens"),
    min: 16.0,
    max: 128.0,
    step: 1.0,
    default: 48.0,
};

pub const REWARD_TRAINING_LR: ParamSpec = ParamSpec {
    key: "lr",
    label: "LR",
    section: ParamSection::Optimizer,
    description: "Gradient-descent step size for the reward head weights.",
    units: None,
    min: 0.05,
    max: 1.0,
    step: 0.05,
    default: 0.5,
};

pub const PPO_PARAMS: &[ParamSpec] = &[
    PPO_CLIP_EPS,
    PPO_VALUE_COEF,
    PPO_ENTROPY_COEF,
    PPO_USE_VALUE_CLIP,
    PPO_VALUE_CLIP_RANGE,
    PPO_SPEED_MS,
];

pub const REWARD_DATA_PARAMS: &[ParamSpec] = &[REWARD_DATA_BLOCK_SIZE];

pub const REWARD_TRAINING_PARAMS: &[ParamSpec] = &[REWARD_TRAINING_BLOCK_SIZE, REWARD_TRAINING_LR];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_range_and_step() {
        let block = &REWARD_DATA_PARAMS[0];
        assert_eq!(block.clamp(4.0), 8.0);
        assert_eq!(block.clamp(500.0), 128.0);
        assert_eq!(block.clamp(20.4), 20.0);
        assert_eq!(block.clamp(f64::NAN), 32.0);

        let speed = find(PPO_PARAMS, "speed_ms").unwrap();
        assert_eq!(speed.clamp(1100.0), 1000.0);
        assert_eq!(speed.clamp(100.0), 500.0);
    }

    #[test]
    fn defaults_lie_inside_ranges() {
        for spec in PPO_PARAMS
            .iter()
            .chain(REWARD_DATA_PARAMS)
            .chain(REWARD_TRAINING_PARAMS)
        {
            assert!(spec.min <= spec.default && spec.default <= spec.max, "{}", spec.key);
            assert!((spec.clamp(spec.default) - spec.default).abs() < 1e-9, "{}", spec.key);
        }
    }

    #[test]
    fn keys_are_unique_per_page() {
        for specs in [PPO_PARAMS, REWARD_DATA_PARAMS, REWARD_TRAINING_PARAMS] {
            let mut keys: Vec<&str> = specs.iter().map(|s| s.key).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), specs.len());
        }
    }
}
