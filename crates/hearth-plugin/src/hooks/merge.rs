//! Merging of per-plugin hook results for `invoke_all`.
//!
//! The aggregate starts as an empty mapping. Mapping results are merged
//! key by key, later plugins overwriting earlier keys. The first
//! non-mapping result turns the aggregate into a sequence for good:
//! arrays are concatenated, any other value is appended, and a mapping
//! arriving after the switch is appended as one element.
//!
//! When the switch happens, a non-empty accumulated mapping becomes the
//! first element of the sequence, so `{a:1}`, `{b:2}`, `[3,4]` merge to
//! `[{a:1,b:2},3,4]`.

use serde_json::{Map, Value};

#[derive(Debug)]
enum Aggregate {
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
}

/// Accumulates hook results in dispatch order.
#[derive(Debug)]
pub struct ResultMerger {
    aggregate: Aggregate,
}

impl Default for ResultMerger {
    fn default() -> Self {
        Self {
            aggregate: Aggregate::Mapping(Map::new()),
        }
    }
}

impl ResultMerger {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one plugin's result into the aggregate.
    pub fn push(&mut self, result: Value) {
        match &mut self.aggregate {
            Aggregate::Mapping(map) => match result {
                Value::Object(entries) => map.extend(entries),
                other => {
                    let mut sequence = Vec::new();
                    if !map.is_empty() {
                        sequence.push(Value::Object(std::mem::take(map)));
                    }
                    append(&mut sequence, other);
                    self.aggregate = Aggregate::Sequence(sequence);
                }
            },
            Aggregate::Sequence(sequence) => append(sequence, result),
        }
    }

    /// Whether the aggregate has turned into a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self.aggregate, Aggregate::Sequence(_))
    }

    /// The merged value.
    pub fn finish(self) -> Value {
        match self.aggregate {
            Aggregate::Mapping(map) => Value::Object(map),
            Aggregate::Sequence(sequence) => Value::Array(sequence),
        }
    }
}

fn append(sequence: &mut Vec<Value>, value: Value) {
    match value {
        Value::Array(items) => sequence.extend(items),
        other => sequence.push(other),
    }
}

impl FromIterator<Value> for ResultMerger {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut merger = Self::new();
        for value in iter {
            merger.push(value);
        }
        merger
    }
}
