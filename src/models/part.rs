use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ParseValueError;

/// Consumable category; toner parts are prorated by remaining toner on return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PartType {
    #[sea_orm(string_value = "general")]
    General,

    #[sea_orm(string_value = "toner")]
    Toner,
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartType::General => write!(f, "general"),
            PartType::Toner => write!(f, "toner"),
        }
    }
}

impl FromStr for PartType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(PartType::General),
            "toner" => Ok(PartType::Toner),
            _ => Err(ParseValueError::new("part type", s)),
        }
    }
}

/// Whether a replacement reached its expected yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Met,
    Shortfall,
}

impl ComplianceStatus {
    pub fn from_yield_met(yield_met: bool) -> Self {
        if yield_met {
            ComplianceStatus::Met
        } else {
            ComplianceStatus::Shortfall
        }
    }
}

impl FromStr for ComplianceStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "met" | "compliant" => Ok(ComplianceStatus::Met),
            "shortfall" | "not_met" | "non_compliant" => Ok(ComplianceStatus::Shortfall),
            _ => Err(ParseValueError::new("compliance status", s)),
        }
    }
}
