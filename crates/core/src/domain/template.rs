use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub Uuid);

impl TemplateId {
    /// Fresh id for templates authored locally; the backend keeps the
    /// id it assigned once the template exists.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase blueprint inside a project template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseBlueprint {
    pub name: String,
    pub days: u32,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_percentage: Decimal,
    #[serde(default)]
    pub tasks: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSlot {
    pub role: String,
    #[serde(default = "default_headcount")]
    pub headcount: u32,
}

fn default_headcount() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectTemplate {
    #[serde(default = "TemplateId::generate")]
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub price_min: Option<Decimal>,
    #[serde(default)]
    pub price_max: Option<Decimal>,
    #[serde(default)]
    pub estimated_duration_min: Option<u32>,
    #[serde(default)]
    pub estimated_duration_max: Option<u32>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub phases: Vec<PhaseBlueprint>,
    #[serde(default)]
    pub team: Vec<TeamSlot>,
    #[serde(default)]
    pub is_active: bool,
}

impl ProjectTemplate {
    /// Structural validation applied before a template is created or
    /// updated. Malformed blueprints are reported, never dropped.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "template name must not be empty".to_string(),
            ));
        }

        for (index, phase) in self.phases.iter().enumerate() {
            if phase.name.trim().is_empty() {
                return Err(DomainError::InvariantViolation(format!(
                    "template phase {index} is missing a name"
                )));
            }
            if phase.days == 0 {
                return Err(DomainError::InvariantViolation(format!(
                    "template phase `{}` must last at least one day",
                    phase.name
                )));
            }
        }

        for slot in &self.team {
            if slot.role.trim().is_empty() {
                return Err(DomainError::InvariantViolation(
                    "template team slot is missing a role".to_string(),
                ));
            }
            if slot.headcount == 0 {
                return Err(DomainError::InvariantViolation(format!(
                    "team slot `{}` must have at least one person",
                    slot.role
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if max < min {
                return Err(DomainError::InvariantViolation(
                    "template price_max must not be below price_min".to_string(),
                ));
            }
        }

        Ok(())
    }
}
