use serde_json::Value;

/// Key answer fields, most specific first.
const PRIORITY_KEYS: [&str; 6] = [
    "total_investment",
    "fee",
    "total_interest",
    "construction_interest",
    "building_investment",
    "applied",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    // Sectioned estimates keep their headline numbers one level down.
    let headline = result_obj.get("estimate").unwrap_or(result_obj);

    if let Value::Object(map) = headline {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(headline));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
