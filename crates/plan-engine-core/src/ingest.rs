use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, ValidationError};
use crate::registry::FieldRegistry;
use crate::store::OfficeYearPlan;
use crate::types::{Level, Role};

/// Wire shape delivered by the API client: nested per-month entries for
/// role-scoped fields plus a flat map for office-scoped fields. Month keys
/// are 6-digit `YYYYMM` strings; anything else is rejected outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    pub office: String,
    pub year: i32,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// role → level → field → YYYYMM → value. Flat roles use level key `-`.
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>>,
    /// field → YYYYMM → value.
    #[serde(default)]
    pub office_values: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Parse a `YYYYMM` month key against the plan year, returning the 1-based
/// month number.
pub fn parse_month_key(key: &str, plan_year: i32) -> Result<usize, ValidationError> {
    if key.len() != 6 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::MalformedMonthKey {
            key: key.to_string(),
        });
    }
    let year: i32 = key[..4].parse().map_err(|_| ValidationError::MalformedMonthKey {
        key: key.to_string(),
    })?;
    let month: usize = key[4..].parse().map_err(|_| ValidationError::MalformedMonthKey {
        key: key.to_string(),
    })?;
    if !(1..=12).contains(&month) {
        return Err(ValidationError::MalformedMonthKey {
            key: key.to_string(),
        });
    }
    if year != plan_year {
        return Err(ValidationError::YearMismatch {
            key: key.to_string(),
            plan_year,
        });
    }
    Ok(month)
}

/// Build a plan from a wire document. Every entry passes through the
/// store's validation and sanitize boundary; the first rejection aborts the
/// whole ingestion. The returned plan is Dirty until recalculated.
pub fn build_plan(
    doc: &PlanDocument,
    registry: &FieldRegistry,
) -> Result<OfficeYearPlan, PlanError> {
    let mut plan = OfficeYearPlan::new(&doc.office, doc.year);
    for role in &doc.roles {
        plan.add_role(role.clone());
    }

    for (role_name, levels) in &doc.values {
        if plan.role_id(role_name).is_none() {
            return Err(PlanError::Validation(ValidationError::UnknownRole {
                role: role_name.clone(),
            }));
        }
        for (level_key, fields) in levels {
            let level = parse_level_key(role_name, level_key)?;
            for (field, months) in fields {
                for (key, raw) in months {
                    let month = parse_month_key(key, doc.year)?;
                    plan.set_input(registry, role_name, level, field, month, *raw)?;
                }
            }
        }
    }

    for (field, months) in &doc.office_values {
        for (key, raw) in months {
            let month = parse_month_key(key, doc.year)?;
            plan.set_office_input(registry, field, month, *raw)?;
        }
    }

    Ok(plan)
}

fn parse_level_key(role: &str, key: &str) -> Result<Option<Level>, ValidationError> {
    if key == "-" {
        return Ok(None);
    }
    Level::parse(key)
        .map(Some)
        .ok_or_else(|| ValidationError::UnknownLevel {
            role: role.to_string(),
            level: key.to_string(),
        })
}
