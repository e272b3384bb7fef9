//! Structured-text transformers: JSON, YAML and CSV.
//!
//! Textual payloads keep their representation: a text payload converts to
//! text and a bytes payload converts to bytes. JSON is always emitted in
//! compact form with object keys in document order.

use serde_json::{Map, Value};

use super::{read_text, TransformOptions, Transformer};
use crate::resource::Resource;
use crate::{Result, UssrError};

fn json_to_yaml(text: &str) -> Result<String> {
    let value: Value = serde_json::from_str(text).map_err(|e| UssrError::decode("json", e))?;
    serde_yaml::to_string(&value).map_err(|e| UssrError::decode("json", e))
}

fn yaml_to_json(text: &str) -> Result<String> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| UssrError::decode("yaml", e))?;
    serde_json::to_string(&value).map_err(|e| UssrError::decode("yaml", e))
}

/// Converts a JSON payload to YAML
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonToYaml;

impl Transformer for JsonToYaml {
    fn content_type(&self) -> &str {
        "yaml"
    }

    fn source_type(&self) -> Option<&str> {
        Some("json")
    }

    fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let (text, repr) = read_text(resource, "json")?;
        let yaml = json_to_yaml(text)?;
        resource.payload = repr.wrap(yaml);
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let (text, repr) = read_text(resource, "yaml")?;
        let json = yaml_to_json(text)?;
        resource.payload = repr.wrap(json);
        Ok(())
    }
}

/// Converts a YAML payload to JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlToJson;

impl Transformer for YamlToJson {
    fn content_type(&self) -> &str {
        "json"
    }

    fn source_type(&self) -> Option<&str> {
        Some("yaml")
    }

    fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let (text, repr) = read_text(resource, "yaml")?;
        let json = yaml_to_json(text)?;
        resource.payload = repr.wrap(json);
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let (text, repr) = read_text(resource, "json")?;
        let yaml = json_to_yaml(text)?;
        resource.payload = repr.wrap(yaml);
        Ok(())
    }
}

/// Converts CSV with a header row into a JSON array of objects
///
/// Every field becomes a string value keyed by its column header. The inverse
/// takes its header from the keys of the first object; `null` becomes an
/// empty field and other non-string values are written as their JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvToJson;

impl CsvToJson {
    fn csv_to_rows(data: &[u8]) -> Result<Vec<Value>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data);
        let headers = reader
            .headers()
            .map_err(|e| UssrError::decode("csv", e))?
            .clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| UssrError::decode("csv", e))?;
            let row: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
                .collect();
            rows.push(Value::Object(row));
        }
        Ok(rows)
    }

    fn rows_to_csv(rows: &[Value]) -> Result<String> {
        let Some(first) = rows.first() else {
            return Ok(String::new());
        };
        let headers: Vec<String> = first
            .as_object()
            .ok_or_else(|| UssrError::decode("json", "expected an array of objects"))?
            .keys()
            .cloned()
            .collect();

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(&headers)
            .map_err(|e| UssrError::decode("json", e))?;

        for row in rows {
            let object = row
                .as_object()
                .ok_or_else(|| UssrError::decode("json", "expected an array of objects"))?;
            let record: Vec<String> = headers
                .iter()
                .map(|header| match object.get(header) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(field)) => field.clone(),
                    Some(other) => other.to_string(),
                })
                .collect();
            writer
                .write_record(&record)
                .map_err(|e| UssrError::decode("json", e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| UssrError::decode("json", e.error()))?;
        String::from_utf8(bytes).map_err(|e| UssrError::decode("json", e))
    }
}

impl Transformer for CsvToJson {
    fn content_type(&self) -> &str {
        "json"
    }

    fn source_type(&self) -> Option<&str> {
        Some("csv")
    }

    fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let (text, repr) = read_text(resource, "csv")?;
        let rows = Self::csv_to_rows(text.as_bytes())?;
        let json = serde_json::to_string(&rows).map_err(|e| UssrError::decode("csv", e))?;
        resource.payload = repr.wrap(json);
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let (text, repr) = read_text(resource, "json")?;
        let value: Value = serde_json::from_str(text).map_err(|e| UssrError::decode("json", e))?;
        let rows = value
            .as_array()
            .ok_or_else(|| UssrError::decode("json", "expected an array of objects"))?;
        let csv = Self::rows_to_csv(rows)?;
        resource.payload = repr.wrap(csv);
        Ok(())
    }
}
