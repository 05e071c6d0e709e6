//! Model pricing
//!
//! Per-1k-token prices used to estimate the cost of a run.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelPricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

/// Known models, more specific names first
const PRICING: &[(&str, ModelPricing)] = &[
    (
        "dummy-v0",
        ModelPricing {
            prompt_per_1k: 0.0,
            completion_per_1k: 0.0,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPricing {
            prompt_per_1k: 0.00015,
            completion_per_1k: 0.0006,
        },
    ),
    (
        "gpt-4o",
        ModelPricing {
            prompt_per_1k: 0.005,
            completion_per_1k: 0.015,
        },
    ),
];

/// Look up a model, accepting dated snapshots such as `gpt-4o-mini-2024-07-18`
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    PRICING
        .iter()
        .find(|(name, _)| {
            model == *name
                || model
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('-'))
        })
        .map(|(_, pricing)| *pricing)
}

/// Estimated USD cost, rounded to 6 decimals; unknown models cost nothing
pub fn estimate_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let Some(pricing) = pricing_for(model) else {
        return 0.0;
    };

    let cost = (prompt_tokens as f64 / 1000.0) * pricing.prompt_per_1k
        + (completion_tokens as f64 / 1000.0) * pricing.completion_per_1k;
    round6(cost)
}

pub(crate) fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
