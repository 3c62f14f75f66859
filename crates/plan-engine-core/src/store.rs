use std::collections::HashMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::registry::FieldRegistry;
use crate::types::{FieldId, FieldKind, FieldScope, Level, MonthlyValue, Role, RoleId, MONTHS};

/// Recompute status of a plan. Mutations move it to Dirty; a successful
/// aggregation + evaluation pass moves it back to Clean. There is no
/// observable in-between state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Clean,
    Dirty,
}

/// Coerce a raw boundary value into the tree's domain: non-finite input and
/// negative input both become zero. Every number entering the store passes
/// through here, so "unset", NaN and negative raw values collapse to the
/// same documented default in exactly one place.
pub fn sanitize(raw: f64) -> Decimal {
    if !raw.is_finite() {
        return Decimal::ZERO;
    }
    let d = Decimal::from_f64(raw).unwrap_or(Decimal::ZERO);
    d.max(Decimal::ZERO)
}

#[derive(Debug, Clone)]
struct RoleSlot {
    role: Role,
    levels: Vec<Option<Level>>,
    /// values[level_idx][field_idx]
    values: Vec<Vec<Option<MonthlyValue>>>,
}

/// The root aggregate: one in-memory plan per (office, year) pair. Leaf
/// values are stored per (role, level, field); office-scoped values in a
/// flat field-indexed table. All storage is indexed by interned ids, so
/// lookups are total and panic-free; unset cells read as all-zero.
#[derive(Debug, Clone)]
pub struct OfficeYearPlan {
    office: String,
    year: i32,
    roles: Vec<RoleSlot>,
    role_index: HashMap<String, RoleId>,
    office_values: Vec<Option<MonthlyValue>>,
    state: PlanState,
}

impl OfficeYearPlan {
    /// Create an empty Clean plan for one planning session.
    pub fn new(office: &str, year: i32) -> Self {
        OfficeYearPlan {
            office: office.to_string(),
            year,
            roles: Vec::new(),
            role_index: HashMap::new(),
            office_values: Vec::new(),
            state: PlanState::Clean,
        }
    }

    pub fn office(&self) -> &str {
        &self.office
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    /// Add a role to the tree, returning its interned id. Re-adding a role
    /// with a name already present returns the existing id unchanged.
    pub fn add_role(&mut self, role: Role) -> RoleId {
        if let Some(id) = self.role_index.get(&role.name) {
            return *id;
        }
        let id = RoleId(self.roles.len() as u16);
        let levels = role.level_slots();
        let values = vec![Vec::new(); levels.len()];
        self.role_index.insert(role.name.clone(), id);
        self.roles.push(RoleSlot {
            role,
            levels,
            values,
        });
        id
    }

    pub fn role_id(&self, name: &str) -> Option<RoleId> {
        self.role_index.get(name).copied()
    }

    pub fn role(&self, id: RoleId) -> &Role {
        &self.roles[id.0 as usize].role
    }

    pub fn roles(&self) -> impl Iterator<Item = (RoleId, &Role)> {
        self.roles
            .iter()
            .enumerate()
            .map(|(i, slot)| (RoleId(i as u16), &slot.role))
    }

    /// Level slots of a role; flat roles expose the single implicit `None`.
    pub fn level_slots(&self, id: RoleId) -> &[Option<Level>] {
        &self.roles[id.0 as usize].levels
    }

    /// Set one month of an input field at a (role, level) leaf. The raw
    /// value is sanitized first; bounds are then checked against the
    /// sanitized value. Any rejection leaves the store unchanged.
    pub fn set_input(
        &mut self,
        registry: &FieldRegistry,
        role: &str,
        level: Option<Level>,
        field: &str,
        month: usize,
        raw: f64,
    ) -> Result<(), ValidationError> {
        if month < 1 || month > MONTHS {
            return Err(ValidationError::MonthOutOfRange { month });
        }
        let def = registry
            .get(field)
            .ok_or_else(|| ValidationError::UnknownField {
                field: field.to_string(),
            })?;
        if def.kind != FieldKind::Input {
            return Err(ValidationError::NotInput {
                field: field.to_string(),
            });
        }
        let role_id = self
            .role_id(role)
            .ok_or_else(|| ValidationError::UnknownRole {
                role: role.to_string(),
            })?;
        let level_idx = self.resolve_level(role_id, level)?;
        let role_def = self.role(role_id);

        if !registry.is_applicable(field, role_def, level) {
            return Err(ValidationError::NotApplicable {
                field: field.to_string(),
                role: role.to_string(),
                level: level.map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
            });
        }

        let value = sanitize(raw);
        if let Some(bounds) = def.bounds {
            if !bounds.contains(value) {
                return Err(ValidationError::OutOfBounds {
                    field: field.to_string(),
                    month,
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }

        let field_id = registry.id_of(field).unwrap_or(FieldId(0));
        let aggregation = def.aggregation.clone();
        let existing = self.ensure_leaf_slot(role_id, level_idx, field_id);
        let mut months = existing.map(|v| v.months).unwrap_or([Decimal::ZERO; MONTHS]);
        months[month - 1] = value;
        let updated = MonthlyValue::totalled(months, &aggregation);
        self.roles[role_id.0 as usize].values[level_idx][field_id.0 as usize] = Some(updated);
        self.state = PlanState::Dirty;
        Ok(())
    }

    /// Set one month of an office-scoped input field.
    pub fn set_office_input(
        &mut self,
        registry: &FieldRegistry,
        field: &str,
        month: usize,
        raw: f64,
    ) -> Result<(), ValidationError> {
        if month < 1 || month > MONTHS {
            return Err(ValidationError::MonthOutOfRange { month });
        }
        let def = registry
            .get(field)
            .ok_or_else(|| ValidationError::UnknownField {
                field: field.to_string(),
            })?;
        if def.kind != FieldKind::Input {
            return Err(ValidationError::NotInput {
                field: field.to_string(),
            });
        }
        if def.scope != FieldScope::Office {
            return Err(ValidationError::NotApplicable {
                field: field.to_string(),
                role: "office".to_string(),
                level: "-".to_string(),
            });
        }

        let value = sanitize(raw);
        if let Some(bounds) = def.bounds {
            if !bounds.contains(value) {
                return Err(ValidationError::OutOfBounds {
                    field: field.to_string(),
                    month,
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }

        let field_id = registry.id_of(field).unwrap_or(FieldId(0));
        let idx = field_id.0 as usize;
        if self.office_values.len() <= idx {
            self.office_values.resize(idx + 1, None);
        }
        let mut months = self.office_values[idx]
            .map(|v| v.months)
            .unwrap_or([Decimal::ZERO; MONTHS]);
        months[month - 1] = value;
        self.office_values[idx] = Some(MonthlyValue::totalled(months, &def.aggregation));
        self.state = PlanState::Dirty;
        Ok(())
    }

    /// Leaf value by interned ids; all-zero default when never set.
    pub fn leaf_value(&self, role: RoleId, level_idx: usize, field: FieldId) -> MonthlyValue {
        self.roles
            .get(role.0 as usize)
            .and_then(|slot| slot.values.get(level_idx))
            .and_then(|fields| fields.get(field.0 as usize))
            .and_then(|v| *v)
            .unwrap_or(MonthlyValue::ZERO)
    }

    /// Named leaf lookup: total over every selector, all-zero default for
    /// anything unknown or unset.
    pub fn get_value(
        &self,
        registry: &FieldRegistry,
        role: &str,
        level: Option<Level>,
        field: &str,
    ) -> MonthlyValue {
        let Some(role_id) = self.role_id(role) else {
            return MonthlyValue::ZERO;
        };
        let Some(field_id) = registry.id_of(field) else {
            return MonthlyValue::ZERO;
        };
        let Ok(level_idx) = self.resolve_level(role_id, level) else {
            return MonthlyValue::ZERO;
        };
        self.leaf_value(role_id, level_idx, field_id)
    }

    /// Office-level value by interned id; all-zero default when never set.
    pub fn office_value(&self, field: FieldId) -> MonthlyValue {
        self.office_values
            .get(field.0 as usize)
            .and_then(|v| *v)
            .unwrap_or(MonthlyValue::ZERO)
    }

    pub fn office_value_by_name(&self, registry: &FieldRegistry, field: &str) -> MonthlyValue {
        registry
            .id_of(field)
            .map(|id| self.office_value(id))
            .unwrap_or(MonthlyValue::ZERO)
    }

    /// Map a requested level to this role's slot index. Flat roles always
    /// use their single implicit slot, whatever level was asked about.
    pub fn resolve_level(
        &self,
        role: RoleId,
        level: Option<Level>,
    ) -> Result<usize, ValidationError> {
        let slot = &self.roles[role.0 as usize];
        if !slot.role.leveled {
            return Ok(0);
        }
        match level {
            Some(l) => slot
                .levels
                .iter()
                .position(|s| *s == Some(l))
                .ok_or_else(|| ValidationError::UnknownLevel {
                    role: slot.role.name.clone(),
                    level: l.to_string(),
                }),
            None => Err(ValidationError::UnknownLevel {
                role: slot.role.name.clone(),
                level: "-".to_string(),
            }),
        }
    }

    /// Grow the leaf table to cover `field` and return the current value.
    fn ensure_leaf_slot(
        &mut self,
        role: RoleId,
        level_idx: usize,
        field: FieldId,
    ) -> Option<MonthlyValue> {
        let fields = &mut self.roles[role.0 as usize].values[level_idx];
        let idx = field.0 as usize;
        if fields.len() <= idx {
            fields.resize(idx + 1, None);
        }
        fields[idx]
    }

    /// Commit a computed leaf value (derived-field pass). Does not touch
    /// the dirty flag; the evaluator owns the state transition.
    pub(crate) fn commit_leaf(
        &mut self,
        role: RoleId,
        level_idx: usize,
        field: FieldId,
        value: MonthlyValue,
    ) {
        let fields = &mut self.roles[role.0 as usize].values[level_idx];
        let idx = field.0 as usize;
        if fields.len() <= idx {
            fields.resize(idx + 1, None);
        }
        fields[idx] = Some(value);
    }

    /// Commit a computed office-level value (roll-up or derived field).
    pub(crate) fn commit_office(&mut self, field: FieldId, value: MonthlyValue) {
        let idx = field.0 as usize;
        if self.office_values.len() <= idx {
            self.office_values.resize(idx + 1, None);
        }
        self.office_values[idx] = Some(value);
    }

    pub(crate) fn mark_clean(&mut self) {
        self.state = PlanState::Clean;
    }
}
