use std::io::IsTerminal;

use binrpc_codec::{Record, StructItem, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    method: &'a str,
    cookie: String,
    records: Vec<serde_json::Value>,
}

pub fn print_reply(method: &str, cookie: u32, records: &[Record], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                method,
                cookie: format!("{cookie:#010x}"),
                records: records.iter().map(|r| value_to_json(&r.value)).collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => println!("{}", reply_table(records)),
        OutputFormat::Pretty => print!("{}", pretty(records)),
    }
}

/// Structs become arrays of single-key objects so member order and
/// duplicate keys survive.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(n) => json!(n),
        Value::Str(text) => json!(text),
        Value::Double(d) => json!(d),
        Value::Struct(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| json!({ (item.key.clone()): value_to_json(&item.value.value) }))
                .collect(),
        ),
    }
}

fn reply_table(records: &[Record]) -> Table {
    let mut rows = Vec::new();
    for (index, record) in records.iter().enumerate() {
        flatten(&format!("[{index}]"), &record.value, &mut rows);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["PATH", "TYPE", "VALUE"]);
    for row in rows {
        table.add_row(row);
    }
    table
}

fn flatten(path: &str, value: &Value, rows: &mut Vec<Vec<String>>) {
    match value {
        Value::Struct(items) if !items.is_empty() => {
            for StructItem { key, value } in items {
                flatten(&format!("{path}.{key}"), &value.value, rows);
            }
        }
        other => rows.push(vec![
            path.to_string(),
            other.record_type().name().to_string(),
            scalar_text(other),
        ]),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Str(text) => text.clone(),
        Value::Double(d) => format!("{d:.3}"),
        Value::Struct(_) => "{}".to_string(),
    }
}

fn pretty(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        pretty_value(&record.value, 0, &mut out);
    }
    out
}

fn pretty_value(value: &Value, indent: usize, out: &mut String) {
    let pad = "\t".repeat(indent);
    match value {
        Value::Struct(items) => {
            out.push_str(&format!("{pad}{{\n"));
            for item in items {
                match &item.value.value {
                    Value::Struct(_) => {
                        out.push_str(&format!("{pad}\t{}:\n", item.key));
                        pretty_value(&item.value.value, indent + 2, out);
                    }
                    scalar => {
                        out.push_str(&format!("{pad}\t{}: {}\n", item.key, scalar_text(scalar)));
                    }
                }
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        scalar => out.push_str(&format!("{pad}{}\n", scalar_text(scalar))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Record {
        Record::new(vec![
            StructItem::new("current", 2),
            StructItem::new("current", 3),
            StructItem::new("rpl", vec![StructItem::new("6xx", 0)]),
        ])
    }

    #[test]
    fn json_keeps_duplicate_struct_keys() {
        let json = value_to_json(&stats().value);
        assert_eq!(
            json,
            json!([{ "current": 2 }, { "current": 3 }, { "rpl": [{ "6xx": 0 }] }])
        );
    }

    #[test]
    fn json_scalars() {
        assert_eq!(value_to_json(&Value::from("up")), json!("up"));
        assert_eq!(value_to_json(&Value::from(0.5)), json!(0.5));
    }

    #[test]
    fn table_flattens_nested_paths() {
        let mut rows = Vec::new();
        flatten("[0]", &stats().value, &mut rows);
        let paths: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(paths, ["[0].current", "[0].current", "[0].rpl.6xx"]);
        assert_eq!(rows[0][1], "int");
    }

    #[test]
    fn pretty_indents_members() {
        let text = pretty(&[Record::new("ok"), stats()]);
        assert_eq!(
            text,
            "ok\n{\n\tcurrent: 2\n\tcurrent: 3\n\trpl:\n\t\t{\n\t\t\t6xx: 0\n\t\t}\n}\n"
        );
    }
}
