//! Lead export to CSV and JSON.
//!
//! Export is a pure projection: the same leads and field list always yield
//! the same bytes.

use leadscout_shared::{Lead, LeadScoutError, Result};
use serde_json::{Map, Value};

/// Fields written when no explicit list is given.
pub const DEFAULT_FIELDS: [&str; 13] = [
    "first_name",
    "last_name",
    "email",
    "phone",
    "job_title",
    "company",
    "company_website",
    "industry",
    "location",
    "quality_score",
    "quality_tier",
    "status",
    "source",
];

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(LeadScoutError::validation(format!(
                "unsupported export format '{other}': expected csv or json"
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

/// Serialize `leads` in `format`, keeping only `fields` when given.
///
/// CSV falls back to [`DEFAULT_FIELDS`] and renders unknown fields empty.
/// JSON without `fields` keeps every field.
pub fn export_leads(leads: &[Lead], format: ExportFormat, fields: Option<&[String]>) -> Result<String> {
    let records = leads
        .iter()
        .map(lead_record)
        .collect::<Result<Vec<_>>>()?;

    match format {
        ExportFormat::Csv => {
            let fields: Vec<&str> = match fields {
                Some(f) if !f.is_empty() => f.iter().map(String::as_str).collect(),
                _ => DEFAULT_FIELDS.to_vec(),
            };
            Ok(to_csv(&records, &fields))
        }
        ExportFormat::Json => {
            let projected: Vec<Value> = records
                .into_iter()
                .map(|record| match fields {
                    Some(f) if !f.is_empty() => Value::Object(
                        record
                            .into_iter()
                            .filter(|(k, _)| f.iter().any(|want| want == k))
                            .collect(),
                    ),
                    _ => Value::Object(record),
                })
                .collect();
            serde_json::to_string_pretty(&projected)
                .map_err(|e| LeadScoutError::Export(e.to_string()))
        }
    }
}

fn lead_record(lead: &Lead) -> Result<Map<String, Value>> {
    match serde_json::to_value(lead) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LeadScoutError::Export("lead did not serialize to an object".into())),
        Err(e) => Err(LeadScoutError::Export(e.to_string())),
    }
}

fn to_csv(records: &[Map<String, Value>], fields: &[&str]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    write_row(&mut out, fields.iter().map(|f| f.to_string()));
    for record in records {
        write_row(
            &mut out,
            fields
                .iter()
                .map(|f| record.get(*f).map(cell_text).unwrap_or_default()),
        );
    }
    out
}

fn write_row(out: &mut String, cells: impl Iterator<Item = String>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(&cell));
    }
    out.push_str("\r\n");
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
