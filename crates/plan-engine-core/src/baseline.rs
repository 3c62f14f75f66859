use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, ValidationError};
use crate::evaluate::safe_ratio;
use crate::registry::FieldRegistry;
use crate::store::OfficeYearPlan;
use crate::types::{MonthlyValue, MONTHS};

/// `current − baseline` plus the relative change, per month slot. The
/// percentage is defined as zero where the baseline is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaPair {
    pub absolute_delta: MonthlyValue,
    pub percent_delta: MonthlyValue,
}

/// Compare one computed value against its baseline counterpart.
pub fn baseline_delta(current: &MonthlyValue, baseline: &MonthlyValue) -> DeltaPair {
    let mut abs = [Decimal::ZERO; MONTHS];
    let mut pct = [Decimal::ZERO; MONTHS];
    for m in 0..MONTHS {
        abs[m] = current.months[m] - baseline.months[m];
        pct[m] = safe_ratio(abs[m], baseline.months[m]);
    }
    let abs_total = current.total - baseline.total;
    DeltaPair {
        absolute_delta: MonthlyValue {
            months: abs,
            total: abs_total,
        },
        percent_delta: MonthlyValue {
            months: pct,
            total: safe_ratio(abs_total, baseline.total),
        },
    }
}

/// One KPI compared against a reference snapshot of the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiComparison {
    pub field: String,
    pub current: MonthlyValue,
    pub baseline: MonthlyValue,
    #[serde(flatten)]
    pub delta: DeltaPair,
}

/// Compare the named office-level fields of two recomputed plans. Both
/// plans are read as-is; callers recalculate them first.
pub fn compare_office(
    current: &OfficeYearPlan,
    baseline: &OfficeYearPlan,
    registry: &FieldRegistry,
    fields: &[&str],
) -> Result<Vec<KpiComparison>, PlanError> {
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        if registry.get(field).is_none() {
            return Err(PlanError::Validation(ValidationError::UnknownField {
                field: field.to_string(),
            }));
        }
        let cur = current.office_value_by_name(registry, field);
        let base = baseline.office_value_by_name(registry, field);
        out.push(KpiComparison {
            field: field.to_string(),
            current: cur,
            baseline: base,
            delta: baseline_delta(&cur, &base),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::recalculate;
    use crate::registry::standard_registry;
    use crate::types::{Level, Role};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn delta_pair_carries_absolute_and_relative_change() {
        let current = MonthlyValue::constant(dec!(120));
        let baseline = MonthlyValue::constant(dec!(100));
        let delta = baseline_delta(&current, &baseline);
        assert_eq!(delta.absolute_delta.months[0], dec!(20));
        assert_eq!(delta.percent_delta.months[0], dec!(0.2));
        assert_eq!(delta.absolute_delta.total, dec!(240));
        assert_eq!(delta.percent_delta.total, dec!(0.2));
    }

    #[test]
    fn zero_baseline_yields_zero_percent_not_infinity() {
        let current = MonthlyValue::constant(dec!(50));
        let baseline = MonthlyValue::ZERO;
        let delta = baseline_delta(&current, &baseline);
        assert_eq!(delta.absolute_delta.months[0], dec!(50));
        assert_eq!(delta.percent_delta.months[0], dec!(0));
        assert_eq!(delta.percent_delta.total, dec!(0));
    }

    #[test]
    fn compare_office_pairs_current_with_baseline_plan() {
        let reg = standard_registry();
        let mut current = OfficeYearPlan::new("Stockholm", 2025);
        current.add_role(Role::leveled("Consultant", true));
        current
            .set_input(&reg, "Consultant", Some(Level::A), "recruitment", 1, 6.0)
            .unwrap();
        recalculate(&mut current, &reg).unwrap();

        let mut base = OfficeYearPlan::new("Stockholm", 2024);
        base.add_role(Role::leveled("Consultant", true));
        base.set_input(&reg, "Consultant", Some(Level::A), "recruitment", 1, 4.0)
            .unwrap();
        recalculate(&mut base, &reg).unwrap();

        let cmp = compare_office(&current, &base, &reg, &["recruitment"]).unwrap();
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp[0].delta.absolute_delta.months[0], dec!(2));
        assert_eq!(cmp[0].delta.percent_delta.months[0], dec!(0.5));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let reg = standard_registry();
        let a = OfficeYearPlan::new("Stockholm", 2025);
        let b = OfficeYearPlan::new("Stockholm", 2024);
        let err = compare_office(&a, &b, &reg, &["nonsense"]).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Validation(ValidationError::UnknownField { .. })
        ));
    }
}
