use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_monthly_table(result);
            } else if let Some(Value::Array(results)) = map.get("results") {
                print_array_table(results);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

/// Field-per-row table: twelve month columns plus the yearly total when the
/// values are monthly records, a plain Field/Value table otherwise.
fn print_monthly_table(result: &Value) {
    let Value::Object(map) = result else {
        print_flat_object(result);
        return;
    };

    let monthly = map.values().all(is_monthly_value);
    let mut builder = Builder::default();

    if monthly {
        let mut header = vec!["Field".to_string()];
        for m in 1..=12 {
            header.push(format!("M{:02}", m));
        }
        header.push("Total".to_string());
        builder.push_record(header);

        for (key, val) in map {
            let mut record = vec![key.clone()];
            if let Some(Value::Array(months)) = val.get("months") {
                for m in months {
                    record.push(format_value(m));
                }
            }
            record.push(val.get("total").map(format_value).unwrap_or_default());
            builder.push_record(record);
        }
    } else {
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
    }

    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        return;
    }
    let Some(first) = arr.first().and_then(|v| v.as_object()) else {
        for v in arr {
            println!("{}", format_value(v));
        }
        return;
    };

    let keys: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(keys.clone());
    for item in arr {
        let record: Vec<String> = keys
            .iter()
            .map(|k| item.get(k).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", value);
    }
}

fn is_monthly_value(v: &Value) -> bool {
    v.get("months").is_some_and(Value::is_array) && v.get("total").is_some()
}

/// Compact cell rendering; monthly records collapse to their yearly total.
fn format_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(_) if is_monthly_value(v) => {
            v.get("total").map(format_value).unwrap_or_default()
        }
        other => other.to_string(),
    }
}
