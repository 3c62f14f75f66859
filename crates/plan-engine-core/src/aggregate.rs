use rust_decimal::Decimal;

use crate::error::AggregationError;
use crate::registry::FieldRegistry;
use crate::store::OfficeYearPlan;
use crate::types::{Aggregation, FieldId, FieldScope, MonthlyValue, RoleId, MONTHS};

/// Leaf accessor used during a recompute pass so freshly evaluated (but not
/// yet committed) calculated values can participate in roll-ups.
pub(crate) type LeafLookup<'a> = dyn Fn(RoleId, usize, FieldId) -> MonthlyValue + 'a;

/// Roll a role-scoped field up to the office level using the field's
/// declared aggregation method. Pure over the committed store state.
pub fn aggregate_role_to_office(
    plan: &OfficeYearPlan,
    registry: &FieldRegistry,
    field: &str,
) -> Result<MonthlyValue, AggregationError> {
    aggregate_with(plan, registry, field, None, &|r, l, f| {
        plan.leaf_value(r, l, f)
    })
}

/// Roll one role's levels up to a role total. Used by the row projector for
/// the intermediate grouping rows.
pub fn aggregate_levels_to_role(
    plan: &OfficeYearPlan,
    registry: &FieldRegistry,
    role: RoleId,
    field: &str,
) -> Result<MonthlyValue, AggregationError> {
    aggregate_with(plan, registry, field, Some(role), &|r, l, f| {
        plan.leaf_value(r, l, f)
    })
}

pub(crate) fn aggregate_with(
    plan: &OfficeYearPlan,
    registry: &FieldRegistry,
    field: &str,
    only_role: Option<RoleId>,
    lookup: &LeafLookup<'_>,
) -> Result<MonthlyValue, AggregationError> {
    let def = registry
        .get(field)
        .ok_or_else(|| AggregationError::UnknownField {
            field: field.to_string(),
        })?;
    if def.scope == FieldScope::Office {
        return Err(AggregationError::WrongScope {
            field: field.to_string(),
            scope: def.scope.as_str().to_string(),
        });
    }
    let field_id = registry.id_of(field).unwrap_or(FieldId(0));

    // Applicable leaves, in role/level insertion order.
    let mut leaves: Vec<(RoleId, usize)> = Vec::new();
    for (role_id, role) in plan.roles() {
        if only_role.is_some_and(|r| r != role_id) {
            continue;
        }
        for (level_idx, level) in plan.level_slots(role_id).iter().enumerate() {
            if registry.is_applicable(field, role, *level) {
                leaves.push((role_id, level_idx));
            }
        }
    }

    match &def.aggregation {
        Aggregation::None => Err(AggregationError::NotAggregatable {
            field: field.to_string(),
        }),
        Aggregation::Sum => {
            let mut months = [Decimal::ZERO; MONTHS];
            for (role_id, level_idx) in &leaves {
                let v = lookup(*role_id, *level_idx, field_id);
                for m in 0..MONTHS {
                    months[m] += v.months[m];
                }
            }
            Ok(MonthlyValue::summed(months))
        }
        Aggregation::Average => {
            // A contributor is absent in a month when its headcount is zero
            // there; absent leaves are excluded, not averaged in as zero.
            let presence = registry.presence_field();
            let mut months = [Decimal::ZERO; MONTHS];
            for m in 0..MONTHS {
                let mut sum = Decimal::ZERO;
                let mut count = Decimal::ZERO;
                for (role_id, level_idx) in &leaves {
                    if let Some(p) = presence {
                        if lookup(*role_id, *level_idx, p).months[m] <= Decimal::ZERO {
                            continue;
                        }
                    }
                    sum += lookup(*role_id, *level_idx, field_id).months[m];
                    count += Decimal::ONE;
                }
                if count > Decimal::ZERO {
                    months[m] = sum / count;
                }
            }
            Ok(MonthlyValue::averaged(months))
        }
        Aggregation::WeightedAverage { weight } => {
            let weight_id =
                registry
                    .id_of(weight)
                    .ok_or_else(|| AggregationError::MissingWeight {
                        field: field.to_string(),
                        weight: weight.clone(),
                    })?;
            let mut months = [Decimal::ZERO; MONTHS];
            let mut year_num = Decimal::ZERO;
            let mut year_den = Decimal::ZERO;
            for m in 0..MONTHS {
                let mut num = Decimal::ZERO;
                let mut den = Decimal::ZERO;
                for (role_id, level_idx) in &leaves {
                    let w = lookup(*role_id, *level_idx, weight_id).months[m];
                    if w <= Decimal::ZERO {
                        continue;
                    }
                    let v = lookup(*role_id, *level_idx, field_id).months[m];
                    num += v * w;
                    den += w;
                }
                if den > Decimal::ZERO {
                    months[m] = num / den;
                }
                year_num += num;
                year_den += den;
            }
            let total = if year_den > Decimal::ZERO {
                year_num / year_den
            } else {
                Decimal::ZERO
            };
            Ok(MonthlyValue { months, total })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::standard_registry;
    use crate::types::{Aggregation, FieldDef, Level, Role, ValueKind};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal_macros::dec;

    fn two_role_plan() -> (FieldRegistry, OfficeYearPlan) {
        let reg = standard_registry();
        let mut plan = OfficeYearPlan::new("Oslo", 2025);
        plan.add_role(Role::leveled("Consultant", true));
        plan.add_role(Role::flat("Operations", false));
        (reg, plan)
    }

    #[test]
    fn sum_aggregation_adds_every_applicable_leaf() {
        let (reg, mut plan) = two_role_plan();
        plan.set_input(&reg, "Consultant", Some(Level::A), "fte", 1, 4.0)
            .unwrap();
        plan.set_input(&reg, "Consultant", Some(Level::C), "fte", 1, 6.0)
            .unwrap();
        plan.set_input(&reg, "Operations", None, "fte", 1, 2.0)
            .unwrap();

        let total = aggregate_role_to_office(&plan, &reg, "fte").unwrap();
        assert_eq!(total.months[0], dec!(12));
        assert_eq!(total.total, dec!(12));
    }

    #[test]
    fn sum_invariant_holds_for_randomized_fixtures() {
        let (reg, mut plan) = two_role_plan();
        let mut rng = StdRng::seed_from_u64(42);

        let mut expected = [dec!(0); MONTHS];
        for level in [Level::A, Level::AC, Level::SrC, Level::M, Level::PiP] {
            for month in 1..=MONTHS {
                let v: u32 = rng.gen_range(0..40);
                plan.set_input(
                    &reg,
                    "Consultant",
                    Some(level),
                    "recruitment",
                    month,
                    f64::from(v),
                )
                .unwrap();
                expected[month - 1] += Decimal::from(v);
            }
        }
        for month in 1..=MONTHS {
            let v: u32 = rng.gen_range(0..10);
            plan.set_input(&reg, "Operations", None, "recruitment", month, f64::from(v))
                .unwrap();
            expected[month - 1] += Decimal::from(v);
        }

        let rolled = aggregate_role_to_office(&plan, &reg, "recruitment").unwrap();
        assert_eq!(rolled.months, expected);
        assert_eq!(rolled.total, expected.iter().copied().sum::<Decimal>());
    }

    #[test]
    fn average_excludes_leaves_with_zero_headcount() {
        let (reg, mut plan) = two_role_plan();
        // Two consultant levels bill 160h and 140h, but only A has headcount.
        plan.set_input(&reg, "Consultant", Some(Level::A), "fte", 1, 10.0)
            .unwrap();
        plan.set_input(
            &reg,
            "Consultant",
            Some(Level::A),
            "monthly_hours",
            1,
            160.0,
        )
        .unwrap();
        plan.set_input(
            &reg,
            "Consultant",
            Some(Level::C),
            "monthly_hours",
            1,
            140.0,
        )
        .unwrap();

        let avg = aggregate_role_to_office(&plan, &reg, "monthly_hours").unwrap();
        // C is absent (zero fte), so the mean is 160, not 150 and not diluted
        // by the other empty levels.
        assert_eq!(avg.months[0], dec!(160));
    }

    #[test]
    fn weighted_average_uses_headcount_weights() {
        let (reg, mut plan) = two_role_plan();
        plan.set_input(&reg, "Consultant", Some(Level::A), "fte", 1, 3.0)
            .unwrap();
        plan.set_input(&reg, "Consultant", Some(Level::M), "fte", 1, 1.0)
            .unwrap();
        plan.set_input(
            &reg,
            "Consultant",
            Some(Level::A),
            "average_price_hour",
            1,
            100.0,
        )
        .unwrap();
        plan.set_input(
            &reg,
            "Consultant",
            Some(Level::M),
            "average_price_hour",
            1,
            200.0,
        )
        .unwrap();

        let price = aggregate_role_to_office(&plan, &reg, "average_price_hour").unwrap();
        // (3*100 + 1*200) / 4 = 125
        assert_eq!(price.months[0], dec!(125));
    }

    #[test]
    fn weighted_average_with_zero_total_weight_is_zero() {
        let (reg, mut plan) = two_role_plan();
        plan.set_input(
            &reg,
            "Consultant",
            Some(Level::A),
            "average_price_hour",
            1,
            100.0,
        )
        .unwrap();
        // No fte anywhere: every month's weight sum is zero.
        let price = aggregate_role_to_office(&plan, &reg, "average_price_hour").unwrap();
        assert!(price.is_zero());
    }

    #[test]
    fn aggregation_is_deterministic_across_runs() {
        let (reg, mut plan) = two_role_plan();
        plan.set_input(&reg, "Consultant", Some(Level::A), "fte", 5, 7.0)
            .unwrap();
        let first = aggregate_role_to_office(&plan, &reg, "fte").unwrap();
        let second = aggregate_role_to_office(&plan, &reg, "fte").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_field_fails_fast() {
        let (reg, plan) = two_role_plan();
        let err = aggregate_role_to_office(&plan, &reg, "no_such_field").unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnknownField {
                field: "no_such_field".to_string()
            }
        );
    }

    #[test]
    fn office_scoped_field_cannot_be_rolled_up() {
        let (reg, plan) = two_role_plan();
        let err = aggregate_role_to_office(&plan, &reg, "overhead_costs").unwrap_err();
        assert!(matches!(err, AggregationError::WrongScope { .. }));
    }

    #[test]
    fn non_aggregatable_field_is_a_contract_violation() {
        let mut reg = standard_registry();
        reg.register(FieldDef::input(
            "office_rank",
            "Office rank",
            ValueKind::Count,
            crate::types::FieldScope::RoleLevel,
            Aggregation::None,
        ))
        .unwrap();
        let plan = OfficeYearPlan::new("Oslo", 2025);
        let err = aggregate_role_to_office(&plan, &reg, "office_rank").unwrap_err();
        assert_eq!(
            err,
            AggregationError::NotAggregatable {
                field: "office_rank".to_string()
            }
        );
    }
}
