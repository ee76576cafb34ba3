use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Distribution reports get a summary table followed by one row per tier
/// and one row per payee; anything else is printed as field/value pairs.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Some(dist) = envelope.get("distribution") {
        print_flat_object(dist);
    }

    match (result.get("summary"), result.get("by_tier")) {
        (Some(summary), Some(Value::Array(tiers))) => {
            print_flat_object(summary);
            print_tiers(tiers);
            print_payees(tiers);
            print_warnings(result.get("warnings"));
        }
        _ => print_flat_object(result),
    }

    print_warnings(envelope.get("warnings"));

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_tiers(tiers: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(["Priority", "Tier", "Type", "Amount", "Unattributed"]);
    for tier in tiers {
        builder.push_record([
            field(tier, "priority"),
            field(tier, "tier_name"),
            field(tier, "tier_type"),
            field(tier, "total_amount"),
            field(tier, "unattributed"),
        ]);
    }
    println!("\n{}", Table::from(builder));
}

fn print_payees(tiers: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(["Tier", "Payee", "Kind", "Amount"]);
    let mut rows = 0;
    for tier in tiers {
        let name = field(tier, "tier_name");
        if let Some(Value::Array(investors)) = tier.get("investors") {
            for inv in investors {
                builder.push_record([
                    name.clone(),
                    field(inv, "name"),
                    "investor".to_string(),
                    field(inv, "amount"),
                ]);
                rows += 1;
            }
        }
        if let Some(Value::Array(entities)) = tier.get("entities") {
            for ent in entities {
                builder.push_record([
                    name.clone(),
                    field(ent, "name"),
                    "entity".to_string(),
                    field(ent, "amount"),
                ]);
                rows += 1;
            }
        }
    }
    if rows > 0 {
        println!("\n{}", Table::from(builder));
    }
}

fn print_warnings(warnings: Option<&Value>) {
    if let Some(Value::Array(warnings)) = warnings {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                println!("  - {}", format_value(w));
            }
        }
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
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

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(format_value).unwrap_or_default()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
