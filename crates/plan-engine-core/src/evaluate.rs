use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::aggregate::aggregate_with;
use crate::error::{EvaluationError, PlanError};
use crate::registry::FieldRegistry;
use crate::store::OfficeYearPlan;
use crate::types::{
    Aggregation, FieldDef, FieldId, FieldKind, FieldScope, Formula, MonthlyValue, RoleId, MONTHS,
};

/// Run the full recompute pass: every `Calculated` field is evaluated in
/// dependency order, every aggregatable role-scoped field is rolled up to
/// the office level, and the plan transitions Dirty → Clean. On error the
/// plan keeps its previous committed values and stays Dirty.
pub fn recalculate(plan: &mut OfficeYearPlan, registry: &FieldRegistry) -> Result<(), PlanError> {
    let roots: Vec<String> = registry
        .calculated_fields()
        .iter()
        .map(|f| registry.def(*f).id.clone())
        .collect();
    let root_refs: Vec<&str> = roots.iter().map(String::as_str).collect();
    evaluate(plan, registry, &root_refs)
}

/// Evaluate the requested `Calculated` fields (plus their transitive
/// dependencies). Nothing is committed unless the whole pass succeeds.
pub fn evaluate(
    plan: &mut OfficeYearPlan,
    registry: &FieldRegistry,
    fields: &[&str],
) -> Result<(), PlanError> {
    let order = registry.resolve_evaluation_order(fields)?;

    let mut leaf_scratch: HashMap<(RoleId, usize, FieldId), MonthlyValue> = HashMap::new();
    let mut office_scratch: HashMap<FieldId, MonthlyValue> = HashMap::new();
    let mut done: HashSet<FieldId> = HashSet::new();

    // Per-leaf calculated fields, dependencies first.
    for fid in order
        .iter()
        .filter(|f| registry.def(**f).kind == FieldKind::Calculated)
    {
        let def = registry.def(*fid);
        if def.scope == FieldScope::Office {
            continue;
        }
        let leaves: Vec<(RoleId, usize)> = plan
            .roles()
            .flat_map(|(role_id, role)| {
                plan.level_slots(role_id)
                    .iter()
                    .enumerate()
                    .filter(|(_, level)| registry.is_applicable(&def.id, role, **level))
                    .map(move |(idx, _)| (role_id, idx))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (role_id, level_idx) in leaves {
            let value = eval_formula(def, |dep| {
                leaf_dep(
                    registry, plan, &leaf_scratch, &done, def, dep, role_id, level_idx,
                )
            })?;
            leaf_scratch.insert((role_id, level_idx, *fid), value);
        }
        done.insert(*fid);
    }

    // Roll every aggregatable role-scoped field up to the office, reading
    // freshly evaluated leaves where the field is calculated.
    {
        let overlay = |r: RoleId, l: usize, f: FieldId| {
            leaf_scratch
                .get(&(r, l, f))
                .copied()
                .unwrap_or_else(|| plan.leaf_value(r, l, f))
        };
        for (fid, def) in registry.iter() {
            if def.scope == FieldScope::Office || def.aggregation == Aggregation::None {
                continue;
            }
            let rolled = aggregate_with(plan, registry, &def.id, None, &overlay)?;
            office_scratch.insert(fid, rolled);
        }
    }

    // Office-level calculated fields, dependencies first.
    for fid in order
        .iter()
        .filter(|f| registry.def(**f).kind == FieldKind::Calculated)
    {
        let def = registry.def(*fid);
        if def.scope != FieldScope::Office {
            continue;
        }
        let value = eval_formula(def, |dep| {
            office_dep(registry, plan, &office_scratch, def, dep)
        })?;
        office_scratch.insert(*fid, value);
    }

    // Commit atomically, then expose the Clean snapshot.
    for ((role_id, level_idx, field), value) in leaf_scratch {
        plan.commit_leaf(role_id, level_idx, field, value);
    }
    for (field, value) in office_scratch {
        plan.commit_office(field, value);
    }
    plan.mark_clean();
    Ok(())
}

/// Resolve one dependency of a per-leaf formula.
#[allow(clippy::too_many_arguments)]
fn leaf_dep(
    registry: &FieldRegistry,
    plan: &OfficeYearPlan,
    scratch: &HashMap<(RoleId, usize, FieldId), MonthlyValue>,
    done: &HashSet<FieldId>,
    field: &FieldDef,
    dep: &str,
    role_id: RoleId,
    level_idx: usize,
) -> Result<MonthlyValue, EvaluationError> {
    let dep_id = registry
        .id_of(dep)
        .ok_or_else(|| EvaluationError::UnknownDependency {
            field: field.id.clone(),
            dependency: dep.to_string(),
        })?;
    if registry.def(dep_id).kind == FieldKind::Calculated {
        if !done.contains(&dep_id) {
            return Err(EvaluationError::DependencyNotReady {
                field: field.id.clone(),
                dependency: dep.to_string(),
            });
        }
        // Resolved this pass; a leaf the dependency does not apply to
        // contributes its stored (zero) value.
        return Ok(scratch
            .get(&(role_id, level_idx, dep_id))
            .copied()
            .unwrap_or(MonthlyValue::ZERO));
    }
    Ok(plan.leaf_value(role_id, level_idx, dep_id))
}

/// Resolve one dependency of an office-level formula: a roll-up or an
/// earlier office value. A role-scoped dependency that never rolled up is
/// an engine-ordering defect, not a zero.
fn office_dep(
    registry: &FieldRegistry,
    plan: &OfficeYearPlan,
    scratch: &HashMap<FieldId, MonthlyValue>,
    field: &FieldDef,
    dep: &str,
) -> Result<MonthlyValue, EvaluationError> {
    let dep_id = registry
        .id_of(dep)
        .ok_or_else(|| EvaluationError::UnknownDependency {
            field: field.id.clone(),
            dependency: dep.to_string(),
        })?;
    if let Some(v) = scratch.get(&dep_id) {
        return Ok(*v);
    }
    let dep_def = registry.def(dep_id);
    if dep_def.scope == FieldScope::Office && dep_def.kind == FieldKind::Input {
        return Ok(plan.office_value(dep_id));
    }
    Err(EvaluationError::DependencyNotReady {
        field: field.id.clone(),
        dependency: dep.to_string(),
    })
}

/// Interpret a field's formula over already-resolved dependency values.
fn eval_formula<F>(def: &FieldDef, mut resolve: F) -> Result<MonthlyValue, EvaluationError>
where
    F: FnMut(&str) -> Result<MonthlyValue, EvaluationError>,
{
    let formula = match &def.formula {
        Some(f) => f,
        // A Calculated field without a formula yields zero; the registry
        // constructors make this unreachable in practice.
        None => return Ok(MonthlyValue::ZERO),
    };

    match formula {
        Formula::Sum(terms) => {
            let mut months = [Decimal::ZERO; MONTHS];
            for term in terms {
                let v = resolve(term)?;
                for m in 0..MONTHS {
                    months[m] += v.months[m];
                }
            }
            Ok(MonthlyValue::totalled(months, &def.aggregation))
        }
        Formula::Difference { plus, minus } => {
            let p = resolve(plus)?;
            let n = resolve(minus)?;
            let mut months = [Decimal::ZERO; MONTHS];
            for m in 0..MONTHS {
                months[m] = p.months[m] - n.months[m];
            }
            Ok(MonthlyValue::totalled(months, &def.aggregation))
        }
        Formula::Product(terms) => {
            let mut months = [Decimal::ONE; MONTHS];
            for term in terms {
                let v = resolve(term)?;
                for m in 0..MONTHS {
                    months[m] *= v.months[m];
                }
            }
            Ok(MonthlyValue::totalled(months, &def.aggregation))
        }
        Formula::Ratio {
            numerator,
            denominator,
        } => {
            let num = resolve(numerator)?;
            let den = resolve(denominator)?;
            let mut months = [Decimal::ZERO; MONTHS];
            for m in 0..MONTHS {
                months[m] = safe_ratio(num.months[m], den.months[m]);
            }
            // The yearly slot is the ratio of totals, not a sum of ratios.
            Ok(MonthlyValue {
                months,
                total: safe_ratio(num.total, den.total),
            })
        }
    }
}

/// Division defined as zero when the denominator is zero. Decimal carries
/// no NaN or infinity, so this is the only divide guard the engine needs.
pub(crate) fn safe_ratio(num: Decimal, den: Decimal) -> Decimal {
    if den.is_zero() {
        Decimal::ZERO
    } else {
        num / den
    }
}
