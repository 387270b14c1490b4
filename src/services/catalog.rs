// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward catalog loading and lookup service.

use crate::models::Reward;
use std::fs;
use std::path::Path;

/// Read-only reward catalog loaded at startup.
#[derive(Default, Clone)]
pub struct RewardCatalog {
    rewards: Vec<Reward>,
}

impl RewardCatalog {
    /// Load the catalog from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load the catalog from a JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, CatalogError> {
        let rewards: Vec<Reward> = serde_json::from_str(json_data)
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        for reward in &rewards {
            if reward.points_cost <= 0 {
                return Err(CatalogError::BadCost(reward.id.clone()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for reward in &rewards {
            if !seen.insert(reward.id.as_str()) {
                return Err(CatalogError::DuplicateId(reward.id.clone()));
            }
        }

        tracing::info!(count = rewards.len(), "Loaded reward catalog");
        Ok(Self { rewards })
    }

    /// Look up a reward by ID (active or not).
    pub fn get(&self, reward_id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.id == reward_id)
    }

    /// Rewards currently offered for redemption.
    pub fn active_rewards(&self) -> impl Iterator<Item = &Reward> {
        self.rewards.iter().filter(|r| r.active)
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }
}

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse catalog JSON: {0}")]
    ParseError(String),

    #[error("Reward '{0}' has a non-positive point cost")]
    BadCost(String),

    #[error("Duplicate reward ID '{0}'")]
    DuplicateId(String),
}
