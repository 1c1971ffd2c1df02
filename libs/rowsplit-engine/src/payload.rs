use std::collections::HashMap;

use crate::document::PayloadEntry;

/// `(event index, attribute) → value` lookup over a document's payload table.
///
/// Borrows from the parsed document; built once per record.
#[derive(Debug, Default)]
pub struct PayloadIndex<'a> {
    by_event: HashMap<usize, HashMap<&'a str, &'a str>>,
}

impl<'a> PayloadIndex<'a> {
    /// Index every ref of every entry.
    ///
    /// When two refs target the same `(event index, attribute)`, the later
    /// one wins.
    pub fn build(payloads: &'a [PayloadEntry]) -> Self {
        let mut by_event: HashMap<usize, HashMap<&'a str, &'a str>> = HashMap::new();
        for entry in payloads {
            for r in &entry.refs {
                by_event
                    .entry(r.event_index)
                    .or_default()
                    .insert(r.attribute.as_str(), entry.value.as_str());
            }
        }
        Self { by_event }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, event_index: usize, attribute: &str) -> Option<&'a str> {
        self.by_event
            .get(&event_index)
            .and_then(|attrs| attrs.get(attribute))
            .copied()
    }

    /// Number of distinct `(event index, attribute)` pairs.
    pub fn len(&self) -> usize {
        self.by_event.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_event.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PayloadRef;

    fn entry(value: &str, refs: &[(usize, &str)]) -> PayloadEntry {
        PayloadEntry {
            value: value.to_string(),
            refs: refs
                .iter()
                .map(|(i, a)| PayloadRef { event_index: *i, attribute: a.to_string() })
                .collect(),
        }
    }

    #[test]
    fn shared_value_is_indexed_for_every_ref() {
        let payloads = vec![entry("BIG", &[(0, "body"), (2, "body"), (2, "header")])];
        let index = PayloadIndex::build(&payloads);
        assert_eq!(index.get(0, "body"), Some("BIG"));
        assert_eq!(index.get(2, "body"), Some("BIG"));
        assert_eq!(index.get(2, "header"), Some("BIG"));
        assert_eq!(index.get(1, "body"), None);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn later_ref_wins() {
        let payloads = vec![entry("first", &[(0, "a")]), entry("second", &[(0, "a")])];
        let index = PayloadIndex::build(&payloads);
        assert_eq!(index.get(0, "a"), Some("second"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn attribute_lookup_is_exact() {
        let payloads = vec![entry("v", &[(0, "Severity")])];
        let index = PayloadIndex::build(&payloads);
        assert_eq!(index.get(0, "severity"), None);
    }

    #[test]
    fn empty_table() {
        let index = PayloadIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.get(0, "a"), None);
        assert!(PayloadIndex::empty().is_empty());
    }
}
