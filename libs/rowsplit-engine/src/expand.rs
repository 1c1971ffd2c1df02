use std::sync::Arc;

use rowsplit_api::columns::{COMPONENT_INDEX, DATA_COLUMN, MESSAGE_FLOW_ID};
use rowsplit_api::record::RawRecord;
use rowsplit_api::value::{Row, Value};

use crate::document::{AggregatedEventDocument, EventRecord, Field};
use crate::error::EngineError;
use crate::payload::PayloadIndex;

/// How one output column is resolved, decided once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolve {
    /// The event's position within its record.
    ComponentIndex,
    /// The document's message flow id.
    MessageFlowId,
    /// The event field of that exact name, with payload fallback.
    Field(String),
}

impl Resolve {
    fn classify(column: &str) -> Self {
        if column.eq_ignore_ascii_case(COMPONENT_INDEX) {
            Resolve::ComponentIndex
        } else if column.eq_ignore_ascii_case(MESSAGE_FLOW_ID) {
            Resolve::MessageFlowId
        } else {
            Resolve::Field(column.to_string())
        }
    }
}

/// Expands one raw record into the rows of its aggregated events.
///
/// Cheap to clone; the column plan is shared read-only across partitions.
#[derive(Debug, Clone)]
pub struct EventExpander {
    plan: Arc<[Resolve]>,
    data_column: Arc<str>,
}

impl EventExpander {
    pub fn new(output_columns: &[String]) -> Self {
        Self::with_data_column(output_columns, DATA_COLUMN)
    }

    pub fn with_data_column(output_columns: &[String], data_column: &str) -> Self {
        Self {
            plan: output_columns.iter().map(|c| Resolve::classify(c)).collect(),
            data_column: Arc::from(data_column),
        }
    }

    /// Row width.
    pub fn width(&self) -> usize {
        self.plan.len()
    }

    pub fn data_column(&self) -> &str {
        &self.data_column
    }

    /// Produce the rows of `record`, one per event, in event order.
    ///
    /// A record without a data column yields a single all-null row.
    pub fn expand(&self, record: &RawRecord) -> Result<Vec<Row>, EngineError> {
        let Some(data) = record.get(&self.data_column) else {
            return Ok(vec![Row::nulls(self.width())]);
        };

        let doc = AggregatedEventDocument::from_column(data)?;
        let index = match doc.payloads.as_deref() {
            Some(payloads) => PayloadIndex::build(payloads),
            None => PayloadIndex::empty(),
        };

        tracing::trace!(
            flow = %doc.message_flow_id,
            events = doc.events.len(),
            payload_refs = index.len(),
            "expanding record"
        );

        Ok(doc
            .events
            .iter()
            .enumerate()
            .map(|(j, event)| self.resolve_row(j, event, &doc.message_flow_id, &index))
            .collect())
    }

    fn resolve_row(
        &self,
        event_index: usize,
        event: &EventRecord,
        message_flow_id: &str,
        index: &PayloadIndex<'_>,
    ) -> Row {
        let values = self
            .plan
            .iter()
            .map(|resolve| match resolve {
                Resolve::ComponentIndex => Value::Int(event_index as i64),
                Resolve::MessageFlowId => Value::Str(message_flow_id.to_string()),
                Resolve::Field(name) => match event.field(name) {
                    Field::Absent => Value::Null,
                    Field::Value(v) if !v.eq_ignore_ascii_case("null") => Value::Str(v.into_owned()),
                    Field::Null | Field::Value(_) => index
                        .get(event_index, name)
                        .map_or(Value::Null, |p| Value::Str(p.to_string())),
                },
            })
            .collect();
        Row(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record(doc: serde_json::Value) -> RawRecord {
        RawRecord::new().with(DATA_COLUMN, doc.to_string())
    }

    #[test]
    fn payload_fills_literal_null() {
        let expander = EventExpander::new(&columns(&["componentIndex", "messageFlowId", "severity"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F1",
                "events": [{"severity": "null"}],
                "payloads": [{"payload": "HIGH", "events": [{"eventIndex": 0, "attribute": "severity"}]}],
            })))
            .unwrap();
        assert_eq!(rows, vec![Row(vec![Value::Int(0), "F1".into(), "HIGH".into()])]);
    }

    #[test]
    fn missing_data_column_yields_one_null_row() {
        let expander = EventExpander::new(&columns(&["a", "componentIndex", "messageFlowId"]));
        let rows = expander.expand(&RawRecord::new().with("other", "x")).unwrap();
        assert_eq!(rows, vec![Row::nulls(3)]);

        let rows = expander
            .expand(&RawRecord::new().with(DATA_COLUMN, serde_json::Value::Null))
            .unwrap();
        assert_eq!(rows, vec![Row::nulls(3)]);
    }

    #[test]
    fn one_row_per_event_in_order() {
        let expander = EventExpander::new(&columns(&["COMPONENTINDEX", "name", "MessageFlowID"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F9",
                "events": [{"name": "a"}, {"name": "b"}, {"name": "c"}],
            })))
            .unwrap();
        assert_eq!(rows.len(), 3);
        for (j, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), 3);
            assert_eq!(row.0[0], Value::Int(j as i64));
            assert_eq!(row.0[2], Value::Str("F9".into()));
        }
        let names: Vec<_> = rows.iter().map(|r| r.0[1].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn present_value_never_consults_payloads() {
        let expander = EventExpander::new(&columns(&["severity"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F",
                "events": [{"severity": "LOW"}],
                "payloads": [{"payload": "HIGH", "events": [{"eventIndex": 0, "attribute": "severity"}]}],
            })))
            .unwrap();
        assert_eq!(rows[0].0, vec![Value::Str("LOW".into())]);
    }

    #[test]
    fn absent_field_never_consults_payloads() {
        let expander = EventExpander::new(&columns(&["severity"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F",
                "events": [{"other": "x"}],
                "payloads": [{"payload": "HIGH", "events": [{"eventIndex": 0, "attribute": "severity"}]}],
            })))
            .unwrap();
        assert_eq!(rows[0].0, vec![Value::Null]);
    }

    #[test]
    fn json_null_and_any_case_null_use_payloads() {
        let expander = EventExpander::new(&columns(&["a", "b", "c"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F",
                "events": [{"a": null, "b": "NuLL", "c": "null"}],
                "payloads": [{"payload": "P", "events": [
                    {"eventIndex": 0, "attribute": "a"},
                    {"eventIndex": 0, "attribute": "b"},
                ]}],
            })))
            .unwrap();
        assert_eq!(rows[0].0, vec!["P".into(), "P".into(), Value::Null]);
    }

    #[test]
    fn payload_lookup_is_per_event() {
        let expander = EventExpander::new(&columns(&["body"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F",
                "events": [{"body": "null"}, {"body": "null"}],
                "payloads": [{"payload": "B1", "events": [{"eventIndex": 1, "attribute": "body"}]}],
            })))
            .unwrap();
        assert_eq!(rows[0].0, vec![Value::Null]);
        assert_eq!(rows[1].0, vec![Value::Str("B1".into())]);
    }

    #[test]
    fn later_payload_ref_wins() {
        let expander = EventExpander::new(&columns(&["a"]));
        let rows = expander
            .expand(&record(json!({
                "messageFlowId": "F",
                "events": [{"a": "null"}],
                "payloads": [
                    {"payload": "old", "events": [{"eventIndex": 0, "attribute": "a"}]},
                    {"payload": "new", "events": [{"eventIndex": 0, "attribute": "a"}]},
                ],
            })))
            .unwrap();
        assert_eq!(rows[0].0, vec![Value::Str("new".into())]);
    }

    #[test]
    fn field_names_match_exactly() {
        let expander = EventExpander::new(&columns(&["Host"]));
        let rows = expander
            .expand(&record(json!({"messageFlowId": "F", "events": [{"host": "a"}]})))
            .unwrap();
        assert_eq!(rows[0].0, vec![Value::Null]);
    }

    #[test]
    fn non_string_fields_are_stringified() {
        let expander = EventExpander::new(&columns(&["n", "b"]));
        let rows = expander
            .expand(&record(json!({"messageFlowId": "F", "events": [{"n": 12, "b": true}]})))
            .unwrap();
        assert_eq!(rows[0].0, vec!["12".into(), "true".into()]);
    }

    #[test]
    fn empty_events_yield_no_rows() {
        let expander = EventExpander::new(&columns(&["a"]));
        let rows = expander
            .expand(&record(json!({"messageFlowId": "F", "events": []})))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn malformed_document_fails() {
        let expander = EventExpander::new(&columns(&["a"]));
        let err = expander
            .expand(&RawRecord::new().with(DATA_COLUMN, "{not json"))
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedDocument { .. }));
    }

    #[test]
    fn custom_data_column() {
        let expander = EventExpander::with_data_column(&columns(&["a"]), "payload");
        let rows = expander
            .expand(&RawRecord::new().with(
                "payload",
                json!({"messageFlowId": "F", "events": [{"a": "1"}, {"a": "2"}]}).to_string(),
            ))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(expander.data_column(), "payload");
    }
}
