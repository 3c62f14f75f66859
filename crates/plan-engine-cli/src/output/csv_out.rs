use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                write_monthly_csv(&mut wtr, result);
            } else if let Some(Value::Array(results)) = map.get("results") {
                write_array_csv(&mut wtr, results);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

/// One row per field: twelve month columns plus the yearly total.
fn write_monthly_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &serde_json::Map<String, Value>) {
    let mut header = vec!["field".to_string()];
    for m in 1..=12 {
        header.push(format!("m{:02}", m));
    }
    header.push("total".to_string());
    let _ = wtr.write_record(&header);

    for (key, val) in result {
        let mut record = vec![key.clone()];
        if let Some(Value::Array(months)) = val.get("months") {
            for m in months {
                record.push(format_csv_value(m));
            }
        } else {
            record.extend(std::iter::repeat(String::new()).take(12));
        }
        record.push(val.get("total").map(format_csv_value).unwrap_or_default());
        let _ = wtr.write_record(&record);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }
    let Some(first) = arr.first().and_then(|v| v.as_object()) else {
        for v in arr {
            let _ = wtr.write_record([&format_csv_value(v)]);
        }
        return;
    };

    let keys: Vec<String> = first.keys().cloned().collect();
    let _ = wtr.write_record(&keys);
    for item in arr {
        let record: Vec<String> = keys
            .iter()
            .map(|k| item.get(k).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}

fn format_csv_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => map
            .get("total")
            .map(format_csv_value)
            .unwrap_or_else(|| v.to_string()),
        other => other.to_string(),
    }
}
