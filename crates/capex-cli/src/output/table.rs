use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

const SECTION_HEADERS: [&str; 8] = [
    "Id",
    "Name",
    "Construction",
    "Equipment",
    "Installation",
    "Other",
    "Total",
    "Share",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) if res_map.contains_key("estimate") => {
            if let Some(Value::Object(estimate)) = res_map.get("estimate") {
                print_flat_object(estimate);
            }
            if let Some(Value::Array(sections)) = res_map.get("sections") {
                println!("\nCost sections:");
                print_sections(sections);
            }
            if let Some(Value::Object(schedule)) = res_map.get("loan_schedule") {
                print_schedule(schedule);
            }
            if let Some(Value::Object(adjustment)) = res_map.get("adjustment") {
                println!("\nTarget adjustment:");
                print_nested_object(adjustment, "items");
            }
        }
        Value::Object(res_map) if res_map.contains_key("years") => {
            print_schedule(res_map);
        }
        Value::Object(res_map) => print_flat_object(res_map),
        _ => print_flat_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

/// Scalars as a field table, then the array under `rows_key` as its own table.
fn print_nested_object(map: &Map<String, Value>, rows_key: &str) {
    let scalars: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| k.as_str() != rows_key)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    print_flat_object(&scalars);
    if let Some(Value::Array(rows)) = map.get(rows_key) {
        print_array_table(rows);
    }
}

fn print_schedule(schedule: &Map<String, Value>) {
    println!("\nLoan schedule:");
    print_nested_object(schedule, "years");
}

fn print_sections(sections: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(SECTION_HEADERS);
    for section in sections {
        push_section_rows(&mut builder, section, 0);
    }
    println!("{}", Table::from(builder));
}

fn push_section_rows(builder: &mut Builder, item: &Value, depth: usize) {
    let Value::Object(map) = item else {
        return;
    };
    let field = |key: &str| map.get(key).map(format_value).unwrap_or_default();
    let component = |key: &str| {
        map.get("components")
            .and_then(|c| c.get(key))
            .map(format_value)
            .unwrap_or_default()
    };
    let name = format!("{}{}", "  ".repeat(depth), field("name"));
    builder.push_record([
        field("id"),
        name,
        component("construction"),
        component("equipment"),
        component("installation"),
        component("other"),
        field("total"),
        field("share_of_total"),
    ]);
    if let Some(Value::Array(children)) = map.get("children") {
        for child in children {
            push_section_rows(builder, child, depth + 1);
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
