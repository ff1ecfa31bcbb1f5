// src/transform/mod.rs

use serde_json::Value;
use tracing::warn;

use crate::error::PipelineError;

pub mod recode;

/// Where the record array lives in the decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Object with an array of objects under the named key (Treasury).
    DataKey(&'static str),
    /// Top-level array of arrays whose first element is a header row (Census).
    HeaderRows,
}

#[derive(Debug, Clone, Copy)]
pub enum SourceField {
    Key(&'static str),
    Index(usize),
}

impl SourceField {
    fn describe(&self) -> String {
        match self {
            SourceField::Key(key) => (*key).to_string(),
            SourceField::Index(idx) => format!("[{idx}]"),
        }
    }
}

/// One projected column: where it comes from and what the output calls it.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub source: SourceField,
    pub output: &'static str,
}

/// Rewrite one output field through a static lookup table after projection.
#[derive(Debug, Clone, Copy)]
pub struct Recode {
    /// Output field whose value gets rewritten.
    pub field: &'static str,
    pub lookup: fn(&str) -> Option<&'static str>,
}

/// Per-dataset declaration of payload shape, projected fields (in output
/// order) and an optional category recode.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub shape: PayloadShape,
    pub fields: Vec<FieldMapping>,
    pub recode: Option<Recode>,
}

impl FieldSpec {
    /// Output column names, in declared order.
    pub fn headers(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.output).collect()
    }
}

/// One flat output row. Values are aligned with the field spec's declared
/// output fields, so every record written to one file has an identical
/// field set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub values: Vec<String>,
}

/// Project the decoded payload into flat records per `spec`.
///
/// Only configured fields are kept; everything else in the payload is
/// dropped. Pure: no I/O, no shared mutable state.
pub fn project_records(payload: &Value, spec: &FieldSpec) -> Result<Vec<Record>, PipelineError> {
    let mut records = match spec.shape {
        PayloadShape::DataKey(key) => {
            let rows = payload.get(key).and_then(Value::as_array).ok_or_else(|| {
                PipelineError::SchemaMismatch {
                    field: key.to_string(),
                    row: 0,
                }
            })?;
            rows.iter()
                .enumerate()
                .map(|(row, element)| project_element(element, spec, row))
                .collect::<Result<Vec<_>, _>>()?
        }
        PayloadShape::HeaderRows => {
            let rows = payload
                .as_array()
                .ok_or_else(|| PipelineError::SchemaMismatch {
                    field: "<top-level array>".to_string(),
                    row: 0,
                })?;
            rows.iter()
                .enumerate()
                .skip(1)
                .map(|(row, element)| project_element(element, spec, row))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    if let Some(recode) = &spec.recode {
        apply_recode(&mut records, spec, recode);
    }
    Ok(records)
}

fn project_element(element: &Value, spec: &FieldSpec, row: usize) -> Result<Record, PipelineError> {
    let mut values = Vec::with_capacity(spec.fields.len());
    for mapping in &spec.fields {
        let value = match mapping.source {
            SourceField::Key(key) => element.get(key),
            SourceField::Index(idx) => element.get(idx),
        }
        .ok_or_else(|| PipelineError::SchemaMismatch {
            field: mapping.source.describe(),
            row,
        })?;
        values.push(scalar_to_string(value));
    }
    Ok(Record { values })
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn apply_recode(records: &mut [Record], spec: &FieldSpec, recode: &Recode) {
    let Some(pos) = spec.fields.iter().position(|f| f.output == recode.field) else {
        warn!(field = recode.field, "recode field not in field spec");
        return;
    };
    for record in records.iter_mut() {
        let code = record.values[pos].as_str();
        match (recode.lookup)(code) {
            Some(label) => record.values[pos] = label.to_string(),
            None => warn!(code, field = recode.field, "unmapped category code; passing through"),
        }
    }
}
