use plan_engine_core::baseline::compare_office;
use plan_engine_core::evaluate::recalculate;
use plan_engine_core::ingest::{build_plan, PlanDocument};
use plan_engine_core::journey::journey_mix;
use plan_engine_core::projection::{project_rows, RowKind};
use plan_engine_core::registry::standard_registry;
use plan_engine_core::store::PlanState;
use plan_engine_core::{PlanError, ValidationError};
use rust_decimal_macros::dec;
use serde_json::json;

// ===========================================================================
// End-to-end plan tests: wire document -> ingestion -> recompute -> outputs.
// One office, two roles (leveled billable consultants, flat operations),
// constant monthly inputs so every derived figure is checkable by hand.
// ===========================================================================

fn months(v: f64) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for m in 1..=12 {
        map.insert(format!("2025{:02}", m), json!(v));
    }
    serde_json::Value::Object(map)
}

fn sample_document() -> PlanDocument {
    serde_json::from_value(json!({
        "office": "Stockholm",
        "year": 2025,
        "roles": [
            { "name": "Consultant", "billable": true, "leveled": true },
            { "name": "Operations", "billable": false, "leveled": false }
        ],
        "values": {
            "Consultant": {
                "A": {
                    "fte": months(10.0),
                    "utr": months(0.8),
                    "monthly_hours": months(160.0),
                    "average_price_hour": months(100.0),
                    "monthly_salary": months(4000.0),
                    "recruitment": { "202501": 2 }
                },
                "M": {
                    "fte": months(5.0),
                    "utr": months(0.6),
                    "monthly_hours": months(160.0),
                    "average_price_hour": months(150.0),
                    "monthly_salary": months(8000.0)
                }
            },
            "Operations": {
                "-": {
                    "fte": months(2.0),
                    "monthly_hours": months(160.0),
                    "monthly_salary": months(3000.0)
                }
            }
        },
        "office_values": {
            "other_revenue": months(10000.0),
            "overhead_costs": months(50000.0)
        }
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_ingestion_then_recompute_yields_clean_plan() {
    let reg = standard_registry();
    let mut plan = build_plan(&sample_document(), &reg).unwrap();
    assert_eq!(plan.state(), PlanState::Dirty);
    recalculate(&mut plan, &reg).unwrap();
    assert_eq!(plan.state(), PlanState::Clean);
}

#[test]
fn test_office_pnl_chain() {
    let reg = standard_registry();
    let mut plan = build_plan(&sample_document(), &reg).unwrap();
    recalculate(&mut plan, &reg).unwrap();

    // net_sales: A = (0.8*160)*100*10 = 128,000; M = (0.6*160)*150*5 = 72,000
    let sales = plan.office_value_by_name(&reg, "net_sales");
    assert_eq!(sales.months[0], dec!(200000));
    assert_eq!(sales.total, dec!(2400000));

    // revenue = 200,000 + 10,000; costs = (40,000 + 40,000 + 6,000) + 50,000
    let revenue = plan.office_value_by_name(&reg, "total_revenue");
    let costs = plan.office_value_by_name(&reg, "total_costs");
    let ebitda = plan.office_value_by_name(&reg, "ebitda");
    assert_eq!(revenue.months[0], dec!(210000));
    assert_eq!(costs.months[0], dec!(136000));
    assert_eq!(ebitda.months[0], dec!(74000));
    assert_eq!(ebitda.total, dec!(888000));

    let margin = plan.office_value_by_name(&reg, "ebitda_margin");
    assert_eq!(margin.months[0], dec!(74000) / dec!(210000));
    assert_eq!(margin.total, dec!(888000) / dec!(2520000));
}

#[test]
fn test_headcount_rollups() {
    let reg = standard_registry();
    let mut plan = build_plan(&sample_document(), &reg).unwrap();
    recalculate(&mut plan, &reg).unwrap();

    // 10 + 5 consultants plus 2 operations, every month
    let fte = plan.office_value_by_name(&reg, "fte");
    assert_eq!(fte.months[0], dec!(17));
    assert_eq!(fte.total, dec!(204));

    // Recruitment only in January at level A, no churn anywhere
    let change = plan.office_value_by_name(&reg, "net_headcount_change");
    assert_eq!(change.months[0], dec!(2));
    assert_eq!(change.months[1], dec!(0));
    assert_eq!(change.total, dec!(2));
}

#[test]
fn test_weighted_average_price_rollup() {
    let reg = standard_registry();
    let mut plan = build_plan(&sample_document(), &reg).unwrap();
    recalculate(&mut plan, &reg).unwrap();

    // (10*100 + 5*150) / 15; operations carry no price and no weight
    let price = plan.office_value_by_name(&reg, "average_price_hour");
    assert_eq!(price.months[0], dec!(1750) / dec!(15));
}

// ---------------------------------------------------------------------------
// Projections and journey mix
// ---------------------------------------------------------------------------

#[test]
fn test_row_projection_groups_office_role_level() {
    let reg = standard_registry();
    let mut plan = build_plan(&sample_document(), &reg).unwrap();
    recalculate(&mut plan, &reg).unwrap();

    let rows = project_rows(&plan, &reg, &["net_sales"]).unwrap();
    assert_eq!(rows[0].kind, RowKind::OfficeTotal);
    assert_eq!(rows[0].values.months[0], dec!(200000));
    assert_eq!(rows[1].kind, RowKind::Role);
    assert_eq!(rows[1].role.as_deref(), Some("Consultant"));
    assert_eq!(rows[1].values.months[0], dec!(200000));
    // Operations is not billable, so net_sales projects no row for it.
    assert!(rows.iter().all(|r| r.role.as_deref() != Some("Operations")));
}

#[test]
fn test_journey_mix_covers_leveled_headcount_only() {
    let reg = standard_registry();
    let mut plan = build_plan(&sample_document(), &reg).unwrap();
    recalculate(&mut plan, &reg).unwrap();

    let mix = journey_mix(&plan, &reg).unwrap();
    // A sits in journey 1, M in journey 3; flat operations never enter.
    assert_eq!(mix.buckets[0].fte.months[0], dec!(10));
    assert_eq!(mix.buckets[2].fte.months[0], dec!(5));
    assert_eq!(mix.buckets[0].share.months[0], dec!(10) / dec!(15));
    assert_eq!(mix.buckets[1].share.months[0], dec!(0));
    assert_eq!(mix.buckets[3].share.months[0], dec!(0));
}

// ---------------------------------------------------------------------------
// Baseline comparison
// ---------------------------------------------------------------------------

#[test]
fn test_baseline_deltas_for_kpis() {
    let reg = standard_registry();
    let mut current = build_plan(&sample_document(), &reg).unwrap();
    recalculate(&mut current, &reg).unwrap();

    // Baseline: same office with two fewer A-level consultants.
    let mut doc = sample_document();
    doc.values
        .get_mut("Consultant")
        .unwrap()
        .get_mut("A")
        .unwrap()
        .insert("fte".to_string(), serde_json::from_value(months(8.0)).unwrap());
    let mut baseline = build_plan(&doc, &reg).unwrap();
    recalculate(&mut baseline, &reg).unwrap();

    let cmp = compare_office(&current, &baseline, &reg, &["net_sales", "fte"]).unwrap();
    assert_eq!(cmp.len(), 2);

    // net_sales baseline: A = 128 * 100 * 8 = 102,400; office 174,400
    let sales = &cmp[0];
    assert_eq!(sales.field, "net_sales");
    assert_eq!(sales.baseline.months[0], dec!(174400));
    assert_eq!(sales.delta.absolute_delta.months[0], dec!(25600));

    let fte = &cmp[1];
    assert_eq!(fte.delta.absolute_delta.months[0], dec!(2));
    assert_eq!(fte.delta.percent_delta.months[0], dec!(2) / dec!(15));
}

// ---------------------------------------------------------------------------
// Rejection paths through the wire boundary
// ---------------------------------------------------------------------------

#[test]
fn test_month_key_from_wrong_year_aborts_ingestion() {
    let reg = standard_registry();
    let mut doc = sample_document();
    doc.office_values
        .get_mut("other_revenue")
        .unwrap()
        .insert("202601".to_string(), 1.0);
    let err = build_plan(&doc, &reg).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Validation(ValidationError::YearMismatch { .. })
    ));
}

#[test]
fn test_non_billable_role_cannot_carry_price_inputs() {
    let reg = standard_registry();
    let mut doc = sample_document();
    doc.values
        .get_mut("Operations")
        .unwrap()
        .get_mut("-")
        .unwrap()
        .insert(
            "utr".to_string(),
            serde_json::from_value(json!({ "202501": 0.5 })).unwrap(),
        );
    let err = build_plan(&doc, &reg).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Validation(ValidationError::NotApplicable { .. })
    ));
}
