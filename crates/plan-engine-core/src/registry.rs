use std::collections::HashMap;

use rust_decimal_macros::dec;

use crate::error::{EvaluationError, RegistryError};
use crate::types::{
    Aggregation, FieldDef, FieldId, FieldKind, FieldScope, Formula, Level, Role, ValueKind,
};

/// Catalogue of every plannable and derived field. Constructed once at
/// startup and passed by reference into the store and the calculator;
/// there is no global registry instance.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldDef>,
    index: HashMap<String, FieldId>,
    presence: Option<FieldId>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        FieldRegistry::default()
    }

    /// Register a field definition. Ids are interned in registration order.
    pub fn register(&mut self, def: FieldDef) -> Result<FieldId, RegistryError> {
        if self.index.contains_key(&def.id) {
            return Err(RegistryError::DuplicateField { field: def.id });
        }
        let id = FieldId(self.fields.len() as u16);
        self.index.insert(def.id.clone(), id);
        self.fields.push(def);
        Ok(id)
    }

    /// Designate the headcount field used by Average/WeightedAverage
    /// aggregation to decide whether a (role, level) contributes in a given
    /// month. Returns the resolved id, or None if the field is unregistered.
    pub fn set_presence_field(&mut self, id: &str) -> Option<FieldId> {
        let fid = self.id_of(id)?;
        self.presence = Some(fid);
        Some(fid)
    }

    pub fn presence_field(&self) -> Option<FieldId> {
        self.presence
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id_of(&self, id: &str) -> Option<FieldId> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&FieldDef> {
        self.id_of(id).map(|fid| self.def(fid))
    }

    pub fn def(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldDef)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, def)| (FieldId(i as u16), def))
    }

    /// Ids of every `Calculated` field, in registration order.
    pub fn calculated_fields(&self) -> Vec<FieldId> {
        self.iter()
            .filter(|(_, def)| def.kind == FieldKind::Calculated)
            .map(|(id, _)| id)
            .collect()
    }

    /// Applicability of a field to a (role, level) pair. Deny-lists are
    /// evaluated first, then allow-lists, then the billable gate. A flat
    /// role's single implicit level is off the ladder, so level lists do
    /// not apply to it.
    pub fn is_applicable(&self, field: &str, role: &Role, level: Option<Level>) -> bool {
        let Some(def) = self.get(field) else {
            return false;
        };
        let level = if role.leveled { level } else { None };

        if def.roles_deny.iter().any(|r| r == &role.name) {
            return false;
        }
        if let Some(l) = level {
            if def.levels_deny.contains(&l) {
                return false;
            }
        }
        if let Some(allow) = &def.roles_allow {
            if !allow.iter().any(|r| r == &role.name) {
                return false;
            }
        }
        if let (Some(l), Some(allow)) = (level, &def.levels_allow) {
            if !allow.contains(&l) {
                return false;
            }
        }
        if def.billable_only && !role.billable {
            return false;
        }
        true
    }

    /// Topologically sort the requested fields together with their
    /// transitive `Calculated` dependencies, dependencies first. Each field
    /// appears at most once, so one evaluation pass never recomputes an
    /// already-resolved value.
    pub fn resolve_evaluation_order(
        &self,
        roots: &[&str],
    ) -> Result<Vec<FieldId>, EvaluationError> {
        let mut order = Vec::new();
        let mut state: HashMap<FieldId, VisitState> = HashMap::new();
        let mut stack: Vec<FieldId> = Vec::new();

        for root in roots {
            let id = self
                .id_of(root)
                .ok_or_else(|| EvaluationError::UnknownDependency {
                    field: root.to_string(),
                    dependency: root.to_string(),
                })?;
            self.visit(id, &mut state, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: FieldId,
        state: &mut HashMap<FieldId, VisitState>,
        stack: &mut Vec<FieldId>,
        order: &mut Vec<FieldId>,
    ) -> Result<(), EvaluationError> {
        match state.get(&id) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                // Cycle: report the path from the first occurrence back to id.
                let start = stack.iter().position(|f| *f == id).unwrap_or(0);
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .map(|f| self.def(*f).id.clone())
                    .collect();
                path.push(self.def(id).id.clone());
                return Err(EvaluationError::Cycle { path });
            }
            None => {}
        }

        state.insert(id, VisitState::InProgress);
        stack.push(id);

        let def = self.def(id);
        if def.kind == FieldKind::Calculated {
            for dep in def.dependencies() {
                let dep_id =
                    self.id_of(dep)
                        .ok_or_else(|| EvaluationError::UnknownDependency {
                            field: def.id.clone(),
                            dependency: dep.to_string(),
                        })?;
                // Only Calculated dependencies need ordering; inputs are
                // always ready.
                if self.def(dep_id).kind == FieldKind::Calculated {
                    self.visit(dep_id, state, stack, order)?;
                }
            }
        }

        stack.pop();
        state.insert(id, VisitState::Done);
        order.push(id);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// The production field catalogue: recruitment/churn/FTE planning, pricing
/// and utilization for billable roles, salary and overhead costs, and the
/// office-level P&L chain up to EBITDA margin.
pub fn standard_registry() -> FieldRegistry {
    let mut reg = FieldRegistry::new();

    let inputs = [
        FieldDef::input(
            "recruitment",
            "Recruitment",
            ValueKind::Count,
            FieldScope::RoleLevel,
            Aggregation::Sum,
        ),
        FieldDef::input(
            "churn",
            "Churn",
            ValueKind::Count,
            FieldScope::RoleLevel,
            Aggregation::Sum,
        ),
        FieldDef::input(
            "fte",
            "FTE",
            ValueKind::Count,
            FieldScope::RoleLevel,
            Aggregation::Sum,
        ),
        FieldDef::input(
            "average_price_hour",
            "Average price / hour",
            ValueKind::Rate,
            FieldScope::RoleLevel,
            Aggregation::WeightedAverage {
                weight: "fte".to_string(),
            },
        )
        .billable_only(),
        FieldDef::input(
            "utr",
            "Utilization rate",
            ValueKind::Rate,
            FieldScope::RoleLevel,
            Aggregation::WeightedAverage {
                weight: "fte".to_string(),
            },
        )
        .billable_only()
        .with_bounds(dec!(0), dec!(1)),
        FieldDef::input(
            "monthly_hours",
            "Monthly hours",
            ValueKind::Hours,
            FieldScope::RoleLevel,
            Aggregation::Average,
        ),
        FieldDef::input(
            "monthly_salary",
            "Monthly salary",
            ValueKind::Currency,
            FieldScope::RoleLevel,
            Aggregation::WeightedAverage {
                weight: "fte".to_string(),
            },
        ),
        FieldDef::input(
            "other_revenue",
            "Other revenue",
            ValueKind::Currency,
            FieldScope::Office,
            Aggregation::None,
        ),
        FieldDef::input(
            "overhead_costs",
            "Overhead costs",
            ValueKind::Currency,
            FieldScope::Office,
            Aggregation::None,
        ),
    ];

    let calculated = [
        FieldDef::calculated(
            "net_headcount_change",
            "Net headcount change",
            ValueKind::Count,
            FieldScope::RoleLevel,
            Aggregation::Sum,
            Formula::Difference {
                plus: "recruitment".to_string(),
                minus: "churn".to_string(),
            },
        ),
        FieldDef::calculated(
            "invoiced_time",
            "Invoiced time",
            ValueKind::Hours,
            FieldScope::RoleLevel,
            Aggregation::Average,
            Formula::Product(vec!["utr".to_string(), "monthly_hours".to_string()]),
        )
        .billable_only(),
        FieldDef::calculated(
            "net_sales",
            "Net sales",
            ValueKind::Currency,
            FieldScope::RoleLevel,
            Aggregation::Sum,
            Formula::Product(vec![
                "invoiced_time".to_string(),
                "average_price_hour".to_string(),
                "fte".to_string(),
            ]),
        )
        .billable_only(),
        FieldDef::calculated(
            "salary_costs",
            "Salary costs",
            ValueKind::Currency,
            FieldScope::RoleLevel,
            Aggregation::Sum,
            Formula::Product(vec!["monthly_salary".to_string(), "fte".to_string()]),
        ),
        FieldDef::calculated(
            "total_revenue",
            "Total revenue",
            ValueKind::Currency,
            FieldScope::Office,
            Aggregation::None,
            Formula::Sum(vec!["net_sales".to_string(), "other_revenue".to_string()]),
        ),
        FieldDef::calculated(
            "total_costs",
            "Total costs",
            ValueKind::Currency,
            FieldScope::Office,
            Aggregation::None,
            Formula::Sum(vec![
                "salary_costs".to_string(),
                "overhead_costs".to_string(),
            ]),
        ),
        FieldDef::calculated(
            "ebitda",
            "EBITDA",
            ValueKind::Currency,
            FieldScope::Office,
            Aggregation::None,
            Formula::Difference {
                plus: "total_revenue".to_string(),
                minus: "total_costs".to_string(),
            },
        ),
        FieldDef::calculated(
            "ebitda_margin",
            "EBITDA margin",
            ValueKind::Ratio,
            FieldScope::Office,
            Aggregation::None,
            Formula::Ratio {
                numerator: "ebitda".to_string(),
                denominator: "total_revenue".to_string(),
            },
        ),
    ];

    for def in inputs.into_iter().chain(calculated) {
        // Ids are distinct literals; duplicate registration cannot happen here.
        let _ = reg.register(def);
    }
    let _ = reg.set_presence_field("fte");
    reg
}
