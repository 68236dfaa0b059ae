use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ParseValueError;

/// Geographic partition that scopes machines, readings and submission locks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum Branch {
    #[sea_orm(string_value = "JHB")]
    #[serde(rename = "JHB")]
    Jhb,

    #[sea_orm(string_value = "CT")]
    #[serde(rename = "CT")]
    Ct,
}

impl Branch {
    pub const ALL: [Branch; 2] = [Branch::Jhb, Branch::Ct];

    pub fn code(&self) -> &'static str {
        match self {
            Branch::Jhb => "JHB",
            Branch::Ct => "CT",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Branch {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JHB" => Ok(Branch::Jhb),
            "CT" => Ok(Branch::Ct),
            _ => Err(ParseValueError::new("branch", s)),
        }
    }
}

/// Branch scope of a query: every branch, or exactly one.
///
/// Callers historically expressed "all branches" as a missing parameter, an
/// empty string, the literal `"null"` or `"all"`. All of those collapse into
/// [`BranchFilter::All`] when the value crosses the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "scope", content = "branch", rename_all = "snake_case")]
pub enum BranchFilter {
    #[default]
    All,
    Specific(Branch),
}

impl BranchFilter {
    pub fn from_param(raw: Option<&str>) -> Result<Self, ParseValueError> {
        let Some(value) = raw.map(str::trim) else {
            return Ok(BranchFilter::All);
        };

        if value.is_empty()
            || value.eq_ignore_ascii_case("null")
            || value.eq_ignore_ascii_case("all")
        {
            return Ok(BranchFilter::All);
        }

        value.parse().map(BranchFilter::Specific)
    }

    pub fn matches(&self, branch: Branch) -> bool {
        match self {
            BranchFilter::All => true,
            BranchFilter::Specific(b) => *b == branch,
        }
    }
}

impl From<Branch> for BranchFilter {
    fn from(branch: Branch) -> Self {
        BranchFilter::Specific(branch)
    }
}
