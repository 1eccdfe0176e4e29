//! Decoding of BigQuery's wire row format.
//!
//! The REST API returns rows as positional `f`/`v` cells with every scalar
//! rendered as a string; the schema drives reassembly into plain JSON
//! objects keyed by column name. Types the dashboard does not consume
//! numerically (NUMERIC, TIMESTAMP, DATE, ...) pass through as the API
//! returned them.

use serde::Deserialize;
use serde_json::Value;
use sightline_common::models::Row;

#[derive(Debug, Clone, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<TableFieldSchema>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

/// Reassemble positional cells into name-keyed rows.
pub fn convert_rows(schema: &TableSchema, rows: Vec<TableRow>) -> Vec<Row> {
    rows.into_iter()
        .map(|row| convert_row(&schema.fields, row))
        .collect()
}

fn convert_row(fields: &[TableFieldSchema], row: TableRow) -> Row {
    let mut out = Row::new();
    for (field, cell) in fields.iter().zip(row.f.into_iter()) {
        out.insert(field.name.clone(), decode_cell(field, cell.v));
    }
    out
}

fn decode_cell(field: &TableFieldSchema, v: Value) -> Value {
    if field.mode.as_deref() == Some("REPEATED") {
        // REPEATED cells arrive as [{"v": ...}, ...]
        match v {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| {
                        let inner = match item {
                            Value::Object(mut m) => m.remove("v").unwrap_or(Value::Null),
                            other => other,
                        };
                        decode_scalar(field, inner)
                    })
                    .collect(),
            ),
            Value::Null => Value::Null,
            other => other,
        }
    } else {
        decode_scalar(field, v)
    }
}

fn decode_scalar(field: &TableFieldSchema, v: Value) -> Value {
    if v.is_null() {
        return Value::Null;
    }

    match field.field_type.as_str() {
        "RECORD" | "STRUCT" => {
            // Nested cells arrive as {"f": [...]}
            let nested = field.fields.as_deref().unwrap_or(&[]);
            match serde_json::from_value::<TableRow>(v) {
                Ok(row) => Value::Object(convert_row(nested, row)),
                Err(_) => Value::Null,
            }
        }
        "INTEGER" | "INT64" => v
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or(v),
        "FLOAT" | "FLOAT64" => v
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .map(Value::from)
            .unwrap_or(v),
        "BOOLEAN" | "BOOL" => v
            .as_str()
            .and_then(|s| s.parse::<bool>().ok())
            .map(Value::from)
            .unwrap_or(v),
        _ => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(fields: Value) -> TableSchema {
        serde_json::from_value(json!({ "fields": fields })).unwrap()
    }

    fn rows(raw: Value) -> Vec<TableRow> {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_scalar_decoding() {
        let schema = schema(json!([
            { "name": "user_pseudo_id", "type": "STRING" },
            { "name": "event_count", "type": "INTEGER" },
            { "name": "engaged", "type": "BOOLEAN" }
        ]));
        let rows = rows(json!([
            { "f": [ { "v": "1234.5678" }, { "v": "42" }, { "v": "true" } ] }
        ]));

        let decoded = convert_rows(&schema, rows);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0]["user_pseudo_id"], "1234.5678");
        assert_eq!(decoded[0]["event_count"], 42);
        assert_eq!(decoded[0]["engaged"], true);
    }

    #[test]
    fn test_record_decoding() {
        // GA4 geo struct as BigQuery serializes it
        let schema = schema(json!([
            {
                "name": "geo",
                "type": "RECORD",
                "fields": [
                    { "name": "city", "type": "STRING" },
                    { "name": "country", "type": "STRING" }
                ]
            }
        ]));
        let rows = rows(json!([
            { "f": [ { "v": { "f": [ { "v": "Cape Town" }, { "v": "South Africa" } ] } } ] }
        ]));

        let decoded = convert_rows(&schema, rows);
        assert_eq!(decoded[0]["geo"]["city"], "Cape Town");
        assert_eq!(decoded[0]["geo"]["country"], "South Africa");
    }

    #[test]
    fn test_repeated_record_decoding() {
        // GA4 event_params: REPEATED RECORD of key + typed value struct
        let schema = schema(json!([
            {
                "name": "event_params",
                "type": "RECORD",
                "mode": "REPEATED",
                "fields": [
                    { "name": "key", "type": "STRING" },
                    {
                        "name": "value",
                        "type": "RECORD",
                        "fields": [ { "name": "int_value", "type": "INTEGER" } ]
                    }
                ]
            }
        ]));
        let rows = rows(json!([
            { "f": [ { "v": [
                { "v": { "f": [ { "v": "engagement_time_msec" }, { "v": { "f": [ { "v": "1500" } ] } } ] } }
            ] } ] }
        ]));

        let decoded = convert_rows(&schema, rows);
        let params = decoded[0]["event_params"].as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["key"], "engagement_time_msec");
        assert_eq!(params[0]["value"]["int_value"], 1500);
    }

    #[test]
    fn test_null_and_passthrough() {
        let schema = schema(json!([
            { "name": "user_id", "type": "STRING" },
            { "name": "last_updated_date", "type": "DATE" }
        ]));
        let rows = rows(json!([
            { "f": [ { "v": null }, { "v": "2024-01-15" } ] }
        ]));

        let decoded = convert_rows(&schema, rows);
        assert_eq!(decoded[0]["user_id"], Value::Null);
        assert_eq!(decoded[0]["last_updated_date"], "2024-01-15");
    }

    #[test]
    fn test_unparseable_integer_passes_through() {
        let schema = schema(json!([{ "name": "n", "type": "INTEGER" }]));
        let rows = rows(json!([{ "f": [ { "v": "not-a-number" } ] }]));

        let decoded = convert_rows(&schema, rows);
        assert_eq!(decoded[0]["n"], "not-a-number");
    }
}
