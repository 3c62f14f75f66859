use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known KPI fields in order of priority, then
/// fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "ebitda",
        "ebitda_margin",
        "net_sales",
        "total_revenue",
        "total_costs",
        "net_headcount_change",
        "fte",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((_, val)) = map.iter().next() {
            println!("{}", format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

/// Monthly records collapse to their yearly total.
fn format_minimal(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("total")
            .map(format_minimal)
            .unwrap_or_else(|| v.to_string()),
        other => other.to_string(),
    }
}
