use serde::{Deserialize, Serialize};

use crate::aggregate::aggregate_levels_to_role;
use crate::error::{PlanError, ValidationError};
use crate::registry::FieldRegistry;
use crate::store::OfficeYearPlan;
use crate::types::{Aggregation, FieldId, FieldScope, MonthlyValue};

/// Grouping depth of a projected display row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    OfficeTotal,
    Role,
    Level,
}

/// One flat display row. The UI layer renders these in order; the engine
/// owns grouping and roll-up, the UI owns everything visual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRow {
    pub field: String,
    pub label: String,
    pub kind: RowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub indent: u8,
    pub values: MonthlyValue,
}

/// Project the requested fields into a flat ordered row list: office total
/// first, then per role a roll-up row followed by its level rows. Rows
/// reflect the last committed recompute; callers recalculate first.
pub fn project_rows(
    plan: &OfficeYearPlan,
    registry: &FieldRegistry,
    fields: &[&str],
) -> Result<Vec<PlanRow>, PlanError> {
    let mut rows = Vec::new();

    for field in fields {
        let def = registry
            .get(field)
            .ok_or_else(|| ValidationError::UnknownField {
                field: field.to_string(),
            })?;
        let field_id = registry.id_of(field).unwrap_or(FieldId(0));

        if def.scope == FieldScope::Office {
            rows.push(PlanRow {
                field: def.id.clone(),
                label: def.label.clone(),
                kind: RowKind::OfficeTotal,
                role: None,
                level: None,
                indent: 0,
                values: plan.office_value_by_name(registry, field),
            });
            continue;
        }

        let aggregatable = def.aggregation != Aggregation::None;
        if aggregatable {
            rows.push(PlanRow {
                field: def.id.clone(),
                label: def.label.clone(),
                kind: RowKind::OfficeTotal,
                role: None,
                level: None,
                indent: 0,
                values: plan.office_value_by_name(registry, field),
            });
        }

        for (role_id, role) in plan.roles() {
            let levels: Vec<_> = plan
                .level_slots(role_id)
                .iter()
                .enumerate()
                .filter(|(_, level)| registry.is_applicable(field, role, **level))
                .map(|(idx, level)| (idx, *level))
                .collect();
            if levels.is_empty() {
                continue;
            }

            if role.leveled {
                if aggregatable {
                    rows.push(PlanRow {
                        field: def.id.clone(),
                        label: role.name.clone(),
                        kind: RowKind::Role,
                        role: Some(role.name.clone()),
                        level: None,
                        indent: 1,
                        values: aggregate_levels_to_role(plan, registry, role_id, field)?,
                    });
                }
                for (level_idx, level) in levels {
                    let level_name = level.map(|l| l.to_string());
                    rows.push(PlanRow {
                        field: def.id.clone(),
                        label: level_name.clone().unwrap_or_else(|| "-".into()),
                        kind: RowKind::Level,
                        role: Some(role.name.clone()),
                        level: level_name,
                        indent: 2,
                        values: plan.leaf_value(role_id, level_idx, field_id),
                    });
                }
            } else {
                // A flat role's single implicit leaf is its role row.
                rows.push(PlanRow {
                    field: def.id.clone(),
                    label: role.name.clone(),
                    kind: RowKind::Role,
                    role: Some(role.name.clone()),
                    level: None,
                    indent: 1,
                    values: plan.leaf_value(role_id, 0, field_id),
                });
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::recalculate;
    use crate::registry::standard_registry;
    use crate::types::{Level, Role};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn computed_plan() -> (FieldRegistry, OfficeYearPlan) {
        let reg = standard_registry();
        let mut plan = OfficeYearPlan::new("Stockholm", 2025);
        plan.add_role(Role::leveled("Consultant", true));
        plan.add_role(Role::flat("Operations", false));
        plan.set_input(&reg, "Consultant", Some(Level::A), "fte", 1, 5.0)
            .unwrap();
        plan.set_input(&reg, "Operations", None, "fte", 1, 2.0)
            .unwrap();
        recalculate(&mut plan, &reg).unwrap();
        (reg, plan)
    }

    #[test]
    fn rows_are_ordered_office_then_role_then_level() {
        let (reg, plan) = computed_plan();
        let rows = project_rows(&plan, &reg, &["fte"]).unwrap();

        assert_eq!(rows[0].kind, RowKind::OfficeTotal);
        assert_eq!(rows[0].values.months[0], dec!(7));
        assert_eq!(rows[1].kind, RowKind::Role);
        assert_eq!(rows[1].role.as_deref(), Some("Consultant"));
        assert_eq!(rows[2].kind, RowKind::Level);
        assert_eq!(rows[2].level.as_deref(), Some("A"));
        // 1 office + 1 role + 8 levels + 1 flat role
        assert_eq!(rows.len(), 11);
        assert_eq!(rows.last().unwrap().role.as_deref(), Some("Operations"));
        assert_eq!(rows.last().unwrap().kind, RowKind::Role);
    }

    #[test]
    fn office_scoped_fields_project_a_single_row() {
        let (reg, plan) = computed_plan();
        let rows = project_rows(&plan, &reg, &["ebitda"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::OfficeTotal);
        assert_eq!(rows[0].label, "EBITDA");
    }

    #[test]
    fn billable_only_fields_skip_non_billable_roles() {
        let (reg, plan) = computed_plan();
        let rows = project_rows(&plan, &reg, &["utr"]).unwrap();
        assert!(rows.iter().all(|r| r.role.as_deref() != Some("Operations")));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (reg, plan) = computed_plan();
        let err = project_rows(&plan, &reg, &["bogus"]).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Validation(ValidationError::UnknownField { .. })
        ));
    }
}
