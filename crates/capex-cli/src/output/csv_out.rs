use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Estimates are written as one row per cost line item, schedules as one
/// row per construction year, everything else as field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                if let Some(Value::Array(sections)) = result.get("sections") {
                    write_sections(&mut wtr, sections);
                } else if let Some(Value::Array(years)) = result.get("years") {
                    write_array_csv(&mut wtr, years);
                } else if let Some(Value::Object(estimate)) = result.get("estimate") {
                    write_fields(&mut wtr, estimate);
                } else {
                    write_fields(&mut wtr, result);
                }
            }
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_sections(wtr: &mut StdoutWriter<'_>, sections: &[Value]) {
    let _ = wtr.write_record([
        "id",
        "name",
        "construction",
        "equipment",
        "installation",
        "other",
        "total",
        "share_of_total",
        "remark",
    ]);
    for section in sections {
        write_section_row(wtr, section);
    }
}

fn write_section_row(wtr: &mut StdoutWriter<'_>, item: &Value) {
    let Value::Object(map) = item else {
        return;
    };
    let field = |key: &str| map.get(key).map(format_csv_value).unwrap_or_default();
    let component = |key: &str| {
        map.get("components")
            .and_then(|c| c.get(key))
            .map(format_csv_value)
            .unwrap_or_default()
    };
    let _ = wtr.write_record([
        field("id"),
        field("name"),
        component("construction"),
        component("equipment"),
        component("installation"),
        component("other"),
        field("total"),
        field("share_of_total"),
        field("remark"),
    ]);
    if let Some(Value::Array(children)) = map.get("children") {
        for child in children {
            write_section_row(wtr, child);
        }
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
