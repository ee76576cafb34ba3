use rust_decimal::Decimal;
use serde_json::Value;
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// A distribution report becomes one row per payee per tier, which is what
/// gets pasted into payment runs. Other results are field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => match result.get("by_tier") {
                Some(Value::Array(tiers)) => write_payee_rows(&mut wtr, tiers),
                _ => write_pairs(&mut wtr, result),
            },
            None => write_pairs(&mut wtr, value),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_payee_rows(wtr: &mut StdoutWriter<'_>, tiers: &[Value]) {
    let _ = wtr.write_record(["priority", "tier_name", "payee_kind", "payee_id", "name", "amount"]);
    for tier in tiers {
        let priority = field(tier, "priority");
        let name = field(tier, "tier_name");
        if let Some(Value::Array(investors)) = tier.get("investors") {
            for inv in investors {
                let _ = wtr.write_record([
                    priority.as_str(),
                    name.as_str(),
                    "investor",
                    &field(inv, "user_id"),
                    &field(inv, "name"),
                    &field(inv, "amount"),
                ]);
            }
        }
        if let Some(Value::Array(entities)) = tier.get("entities") {
            for ent in entities {
                let _ = wtr.write_record([
                    priority.as_str(),
                    name.as_str(),
                    "entity",
                    &field(ent, "entity_id"),
                    &field(ent, "name"),
                    &field(ent, "amount"),
                ]);
            }
        }
        let unattributed = field(tier, "unattributed");
        let is_zero = unattributed
            .parse::<Decimal>()
            .map(|d| d.is_zero())
            .unwrap_or(true);
        if !is_zero {
            let _ = wtr.write_record([
                priority.as_str(),
                name.as_str(),
                "unattributed",
                "",
                "",
                unattributed.as_str(),
            ]);
        }
    }
}

fn write_pairs(wtr: &mut StdoutWriter<'_>, value: &Value) {
    let _ = wtr.write_record(["field", "value"]);
    if let Value::Object(map) = value {
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
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

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(format_csv_value).unwrap_or_default()
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
