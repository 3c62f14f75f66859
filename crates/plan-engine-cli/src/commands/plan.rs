use clap::Args;
use serde_json::{json, Value};

use plan_engine_core::aggregate;
use plan_engine_core::baseline::compare_office;
use plan_engine_core::evaluate::recalculate;
use plan_engine_core::journey::journey_mix;
use plan_engine_core::projection::project_rows;
use plan_engine_core::registry::{standard_registry, FieldRegistry};
use plan_engine_core::store::OfficeYearPlan;
use plan_engine_core::types::{Aggregation, FieldScope};
use plan_engine_core::ingest::build_plan;

use crate::input;

/// Fields shown by the `kpis` subcommand, in display order.
const KPI_FIELDS: [&str; 7] = [
    "fte",
    "net_headcount_change",
    "net_sales",
    "total_revenue",
    "total_costs",
    "ebitda",
    "ebitda_margin",
];

/// Arguments for a full recompute
#[derive(Args)]
pub struct RecalcArgs {
    /// Path to a plan document (JSON or YAML); omit to read JSON from stdin
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the KPI summary
#[derive(Args)]
pub struct KpisArgs {
    /// Path to a plan document (JSON or YAML); omit to read JSON from stdin
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a baseline plan document for delta computation
    #[arg(long)]
    pub baseline: Option<String>,
}

/// Arguments for row projection
#[derive(Args)]
pub struct RowsArgs {
    /// Path to a plan document (JSON or YAML); omit to read JSON from stdin
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated field ids to project (default: all registered fields)
    #[arg(long)]
    pub fields: Option<String>,
}

/// Arguments for the journey mix
#[derive(Args)]
pub struct JourneysArgs {
    /// Path to a plan document (JSON or YAML); omit to read JSON from stdin
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the field catalogue
#[derive(Args)]
pub struct FieldsArgs {}

/// Load, ingest and recompute a plan document.
fn computed_plan(
    path: &Option<String>,
    registry: &FieldRegistry,
) -> Result<OfficeYearPlan, Box<dyn std::error::Error>> {
    let doc = input::load_document(path)?;
    let mut plan = build_plan(&doc, registry)?;
    recalculate(&mut plan, registry)?;
    Ok(plan)
}

pub fn run_recalc(args: RecalcArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = standard_registry();
    let plan = computed_plan(&args.input, &registry)?;

    let mut fields = serde_json::Map::new();
    for (id, def) in registry.iter() {
        let has_office_value =
            def.scope == FieldScope::Office || def.aggregation != Aggregation::None;
        if has_office_value {
            fields.insert(def.id.clone(), serde_json::to_value(plan.office_value(id))?);
        }
    }

    Ok(json!({
        "office": plan.office(),
        "year": plan.year(),
        "result": fields,
    }))
}

pub fn run_kpis(args: KpisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = standard_registry();
    let plan = computed_plan(&args.input, &registry)?;

    let mut kpis = serde_json::Map::new();
    for field in KPI_FIELDS {
        kpis.insert(
            field.to_string(),
            serde_json::to_value(plan.office_value_by_name(&registry, field))?,
        );
    }

    let mut out = json!({
        "office": plan.office(),
        "year": plan.year(),
        "result": kpis,
    });

    if let Some(baseline_path) = &args.baseline {
        let baseline = computed_plan(&Some(baseline_path.clone()), &registry)?;
        let deltas = compare_office(&plan, &baseline, &registry, &KPI_FIELDS)?;
        out["baseline"] = json!({
            "office": baseline.office(),
            "year": baseline.year(),
        });
        out["baseline_deltas"] = serde_json::to_value(deltas)?;
    }

    Ok(out)
}

pub fn run_rows(args: RowsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = standard_registry();
    let plan = computed_plan(&args.input, &registry)?;

    let requested: Vec<String> = match &args.fields {
        Some(list) => list.split(',').map(|f| f.trim().to_string()).collect(),
        None => registry.iter().map(|(_, def)| def.id.clone()).collect(),
    };
    let refs: Vec<&str> = requested.iter().map(String::as_str).collect();
    let rows = project_rows(&plan, &registry, &refs)?;

    Ok(json!({
        "office": plan.office(),
        "year": plan.year(),
        "results": serde_json::to_value(rows)?,
    }))
}

pub fn run_journeys(args: JourneysArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = standard_registry();
    let plan = computed_plan(&args.input, &registry)?;
    let mix = journey_mix(&plan, &registry)?;

    // Sanity echo of the office FTE the shares were computed from.
    let fte = aggregate::aggregate_role_to_office(&plan, &registry, "fte")?;

    Ok(json!({
        "office": plan.office(),
        "year": plan.year(),
        "total_fte": serde_json::to_value(fte)?,
        "results": serde_json::to_value(mix.buckets)?,
    }))
}

pub fn run_fields(_args: FieldsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = standard_registry();
    let defs: Vec<Value> = registry
        .iter()
        .map(|(_, def)| serde_json::to_value(def))
        .collect::<Result<_, _>>()?;
    Ok(json!({ "results": defs }))
}
