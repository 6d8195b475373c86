//! Static model and role catalogs.
//!
//! Neither catalog is backed by the store - both are deploy-time configuration,
//! safe to share by reference across every request task without locking.

use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A model identifier as sent by clients and as stored on usage rows.
pub type ModelId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub id: ModelId,
    pub display_name: String,
    /// Higher is more capable. Tiers form a strict order used for downgrade selection.
    pub tier: u8,
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
}

/// The four recognized roles. `Business` is the default fallback for any
/// unrecognized or absent role name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Admin,
    Engineer,
    PowerUser,
    Business,
}

impl RoleName {
    pub const DEFAULT: RoleName = RoleName::Business;

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Engineer => "engineer",
            RoleName::PowerUser => "power_user",
            RoleName::Business => "business",
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = std::convert::Infallible;

    /// Unknown role strings fall back to `Business` rather than erroring - the role
    /// catalog is a policy lookup, not a validated input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "admin" => RoleName::Admin,
            "engineer" => RoleName::Engineer,
            "power_user" | "power-user" | "poweruser" => RoleName::PowerUser,
            "business" => RoleName::Business,
            _ => RoleName::Business,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub permitted_models: Vec<ModelId>,
    pub max_tokens_per_request: Option<u32>,
    /// Absent means unlimited.
    pub monthly_token_budget: Option<u64>,
}

pub const MODEL_HAIKU: &str = "claude-haiku-4-20250514";
pub const MODEL_SONNET: &str = "claude-sonnet-4-20250514";
pub const MODEL_OPUS: &str = "claude-opus-4-20250514";

pub static MODEL_CATALOG: Lazy<Vec<ModelDefinition>> = Lazy::new(|| {
    vec![
        ModelDefinition {
            id: MODEL_HAIKU.to_string(),
            display_name: "Claude Haiku 4".to_string(),
            tier: 1,
            input_cost_per_million: 0.80,
            output_cost_per_million: 4.00,
        },
        ModelDefinition {
            id: MODEL_SONNET.to_string(),
            display_name: "Claude Sonnet 4".to_string(),
            tier: 2,
            input_cost_per_million: 3.00,
            output_cost_per_million: 15.00,
        },
        ModelDefinition {
            id: MODEL_OPUS.to_string(),
            display_name: "Claude Opus 4".to_string(),
            tier: 3,
            input_cost_per_million: 15.00,
            output_cost_per_million: 75.00,
        },
    ]
});

static MODEL_INDEX: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    MODEL_CATALOG
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id.clone(), i))
        .collect()
});

pub fn model_by_id(id: &str) -> Option<&'static ModelDefinition> {
    MODEL_INDEX.get(id).map(|&i| &MODEL_CATALOG[i])
}

pub static ROLE_CATALOG: Lazy<HashMap<RoleName, RoleDefinition>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        RoleName::Admin,
        RoleDefinition {
            permitted_models: MODEL_CATALOG.iter().map(|m| m.id.clone()).collect(),
            max_tokens_per_request: None,
            monthly_token_budget: None,
        },
    );
    m.insert(
        RoleName::Engineer,
        RoleDefinition {
            permitted_models: vec![MODEL_SONNET.to_string(), MODEL_OPUS.to_string()],
            max_tokens_per_request: Some(8_192),
            monthly_token_budget: Some(500_000),
        },
    );
    m.insert(
        RoleName::PowerUser,
        RoleDefinition {
            permitted_models: vec![MODEL_HAIKU.to_string(), MODEL_SONNET.to_string()],
            max_tokens_per_request: Some(4_096),
            monthly_token_budget: Some(300_000),
        },
    );
    m.insert(
        RoleName::Business,
        RoleDefinition {
            permitted_models: vec![MODEL_HAIKU.to_string(), MODEL_SONNET.to_string()],
            max_tokens_per_request: Some(2_048),
            monthly_token_budget: Some(200_000),
        },
    );
    m
});

pub fn role_definition(role: RoleName) -> &'static RoleDefinition {
    ROLE_CATALOG
        .get(&role)
        .unwrap_or_else(|| ROLE_CATALOG.get(&RoleName::DEFAULT).expect("default role present"))
}

pub fn monthly_budget(role: RoleName) -> Option<u64> {
    role_definition(role).monthly_token_budget
}
