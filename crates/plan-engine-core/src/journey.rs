use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, ValidationError};
use crate::evaluate::safe_ratio;
use crate::registry::FieldRegistry;
use crate::store::OfficeYearPlan;
use crate::types::{Level, MonthlyValue, MONTHS};

/// Fixed seniority groupings used for the seniority-mix KPI. The
/// assignment is a business rule, not per-office configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Journey {
    Journey1,
    Journey2,
    Journey3,
    Journey4,
}

impl Journey {
    pub const ALL: [Journey; 4] = [
        Journey::Journey1,
        Journey::Journey2,
        Journey::Journey3,
        Journey::Journey4,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Journey::Journey1 => "Journey 1",
            Journey::Journey2 => "Journey 2",
            Journey::Journey3 => "Journey 3",
            Journey::Journey4 => "Journey 4",
        }
    }

    /// Static journey assignment per seniority level.
    pub fn of(level: Level) -> Journey {
        match level {
            Level::A | Level::AC | Level::C => Journey::Journey1,
            Level::SrC | Level::AM => Journey::Journey2,
            Level::M | Level::SrM => Journey::Journey3,
            Level::PiP => Journey::Journey4,
        }
    }
}

/// One journey bucket's headcount and its share of the total, per month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyShare {
    pub journey: Journey,
    pub fte: MonthlyValue,
    /// Bucket FTE ÷ total FTE; zero for months with no headcount at all.
    pub share: MonthlyValue,
}

/// Seniority-mix distribution across the four journeys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyMix {
    pub buckets: Vec<JourneyShare>,
}

/// Distribute leveled headcount over the journey buckets. Flat roles carry
/// no seniority level and do not participate in the mix.
pub fn journey_mix(
    plan: &OfficeYearPlan,
    registry: &FieldRegistry,
) -> Result<JourneyMix, PlanError> {
    let fte = registry
        .presence_field()
        .or_else(|| registry.id_of("fte"))
        .ok_or_else(|| {
            PlanError::Validation(ValidationError::UnknownField {
                field: "fte".to_string(),
            })
        })?;

    let mut bucket_months = [[Decimal::ZERO; MONTHS]; 4];
    for (role_id, role) in plan.roles() {
        if !role.leveled {
            continue;
        }
        for (level_idx, level) in plan.level_slots(role_id).iter().enumerate() {
            let Some(level) = level else { continue };
            let bucket = Journey::ALL
                .iter()
                .position(|j| *j == Journey::of(*level))
                .unwrap_or(0);
            let v = plan.leaf_value(role_id, level_idx, fte);
            for m in 0..MONTHS {
                bucket_months[bucket][m] += v.months[m];
            }
        }
    }

    let mut total_months = [Decimal::ZERO; MONTHS];
    for bucket in &bucket_months {
        for m in 0..MONTHS {
            total_months[m] += bucket[m];
        }
    }
    let grand_total: Decimal = total_months.iter().copied().sum();

    let buckets = Journey::ALL
        .iter()
        .zip(bucket_months)
        .map(|(journey, months)| {
            let fte = MonthlyValue::summed(months);
            let mut share = [Decimal::ZERO; MONTHS];
            for m in 0..MONTHS {
                share[m] = safe_ratio(months[m], total_months[m]);
            }
            JourneyShare {
                journey: *journey,
                share: MonthlyValue {
                    months: share,
                    total: safe_ratio(fte.total, grand_total),
                },
                fte,
            }
        })
        .collect();

    Ok(JourneyMix { buckets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::standard_registry;
    use crate::types::Role;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn journey_assignment_follows_the_fixed_table() {
        assert_eq!(Journey::of(Level::A), Journey::Journey1);
        assert_eq!(Journey::of(Level::AC), Journey::Journey1);
        assert_eq!(Journey::of(Level::C), Journey::Journey1);
        assert_eq!(Journey::of(Level::SrC), Journey::Journey2);
        assert_eq!(Journey::of(Level::AM), Journey::Journey2);
        assert_eq!(Journey::of(Level::M), Journey::Journey3);
        assert_eq!(Journey::of(Level::SrM), Journey::Journey3);
        assert_eq!(Journey::of(Level::PiP), Journey::Journey4);
    }

    #[test]
    fn shares_partition_the_headcount() {
        let reg = standard_registry();
        let mut plan = OfficeYearPlan::new("Stockholm", 2025);
        plan.add_role(Role::leveled("Consultant", true));
        plan.set_input(&reg, "Consultant", Some(Level::A), "fte", 1, 2.0)
            .unwrap();
        plan.set_input(&reg, "Consultant", Some(Level::SrC), "fte", 1, 1.0)
            .unwrap();
        plan.set_input(&reg, "Consultant", Some(Level::PiP), "fte", 1, 1.0)
            .unwrap();

        let mix = journey_mix(&plan, &reg).unwrap();
        assert_eq!(mix.buckets[0].share.months[0], dec!(0.5));
        assert_eq!(mix.buckets[1].share.months[0], dec!(0.25));
        assert_eq!(mix.buckets[2].share.months[0], dec!(0));
        assert_eq!(mix.buckets[3].share.months[0], dec!(0.25));
    }

    #[test]
    fn empty_months_have_zero_shares_not_nan() {
        let reg = standard_registry();
        let mut plan = OfficeYearPlan::new("Stockholm", 2025);
        plan.add_role(Role::leveled("Consultant", true));

        let mix = journey_mix(&plan, &reg).unwrap();
        for bucket in &mix.buckets {
            assert!(bucket.share.is_zero());
            assert!(bucket.fte.is_zero());
        }
    }

    #[test]
    fn flat_roles_do_not_enter_the_mix() {
        let reg = standard_registry();
        let mut plan = OfficeYearPlan::new("Stockholm", 2025);
        plan.add_role(Role::leveled("Consultant", true));
        plan.add_role(Role::flat("Operations", false));
        plan.set_input(&reg, "Consultant", Some(Level::M), "fte", 1, 4.0)
            .unwrap();
        plan.set_input(&reg, "Operations", None, "fte", 1, 6.0)
            .unwrap();

        let mix = journey_mix(&plan, &reg).unwrap();
        // Journey 3 holds the full leveled headcount; Operations is ignored.
        assert_eq!(mix.buckets[2].fte.months[0], dec!(4));
        assert_eq!(mix.buckets[2].share.months[0], dec!(1));
    }
}
