use napi::Result as NapiResult;
use napi_derive::napi;

use plan_engine_core::baseline::compare_office;
use plan_engine_core::evaluate::recalculate;
use plan_engine_core::ingest::{build_plan, PlanDocument};
use plan_engine_core::journey::journey_mix;
use plan_engine_core::projection::project_rows;
use plan_engine_core::registry::{standard_registry, FieldRegistry};
use plan_engine_core::store::OfficeYearPlan;
use plan_engine_core::types::{Aggregation, FieldScope};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse, ingest and recompute a plan document.
fn computed_plan(doc_json: &str, registry: &FieldRegistry) -> NapiResult<OfficeYearPlan> {
    let doc: PlanDocument = serde_json::from_str(doc_json).map_err(to_napi_error)?;
    let mut plan = build_plan(&doc, registry).map_err(to_napi_error)?;
    recalculate(&mut plan, registry).map_err(to_napi_error)?;
    Ok(plan)
}

/// Recompute a plan and return every office-level field as JSON.
#[napi]
pub fn recalc_plan(doc_json: String) -> NapiResult<String> {
    let registry = standard_registry();
    let plan = computed_plan(&doc_json, &registry)?;

    let mut fields = serde_json::Map::new();
    for (id, def) in registry.iter() {
        if def.scope == FieldScope::Office || def.aggregation != Aggregation::None {
            fields.insert(
                def.id.clone(),
                serde_json::to_value(plan.office_value(id)).map_err(to_napi_error)?,
            );
        }
    }
    serde_json::to_string(&fields).map_err(to_napi_error)
}

/// KPI summary; pass a baseline document for delta-vs-baseline pairs.
#[napi]
pub fn plan_kpis(doc_json: String, baseline_json: Option<String>) -> NapiResult<String> {
    const KPI_FIELDS: [&str; 7] = [
        "fte",
        "net_headcount_change",
        "net_sales",
        "total_revenue",
        "total_costs",
        "ebitda",
        "ebitda_margin",
    ];

    let registry = standard_registry();
    let plan = computed_plan(&doc_json, &registry)?;

    let mut kpis = serde_json::Map::new();
    for field in KPI_FIELDS {
        kpis.insert(
            field.to_string(),
            serde_json::to_value(plan.office_value_by_name(&registry, field))
                .map_err(to_napi_error)?,
        );
    }
    let mut out = serde_json::json!({ "kpis": kpis });

    if let Some(baseline_json) = baseline_json {
        let baseline = computed_plan(&baseline_json, &registry)?;
        let deltas =
            compare_office(&plan, &baseline, &registry, &KPI_FIELDS).map_err(to_napi_error)?;
        out["baseline_deltas"] = serde_json::to_value(deltas).map_err(to_napi_error)?;
    }

    serde_json::to_string(&out).map_err(to_napi_error)
}

/// Flat display rows for the requested fields (comma-separated), or for
/// every registered field when none are named.
#[napi]
pub fn plan_rows(doc_json: String, fields: Option<String>) -> NapiResult<String> {
    let registry = standard_registry();
    let plan = computed_plan(&doc_json, &registry)?;

    let requested: Vec<String> = match fields {
        Some(list) => list.split(',').map(|f| f.trim().to_string()).collect(),
        None => registry.iter().map(|(_, def)| def.id.clone()).collect(),
    };
    let refs: Vec<&str> = requested.iter().map(String::as_str).collect();
    let rows = project_rows(&plan, &registry, &refs).map_err(to_napi_error)?;
    serde_json::to_string(&rows).map_err(to_napi_error)
}

/// Monthly seniority-journey distribution.
#[napi]
pub fn plan_journey_mix(doc_json: String) -> NapiResult<String> {
    let registry = standard_registry();
    let plan = computed_plan(&doc_json, &registry)?;
    let mix = journey_mix(&plan, &registry).map_err(to_napi_error)?;
    serde_json::to_string(&mix.buckets).map_err(to_napi_error)
}

/// The standard field catalogue as JSON.
#[napi]
pub fn field_catalog() -> NapiResult<String> {
    let registry = standard_registry();
    let defs: Vec<_> = registry.iter().map(|(_, def)| def).collect();
    serde_json::to_string(&defs).map_err(to_napi_error)
}
