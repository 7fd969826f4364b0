//! Field-level description of how two states differ.

use std::fmt::Debug;

use serde::Serialize;
use serde_json::Value;

/// Lists every path at which `actual` differs from `expected`.
///
/// States are compared through their serialized form. If serialization
/// fails, or hides the difference, both values are printed in full.
pub(crate) fn state_diff<S: Serialize + Debug>(expected: &S, actual: &S) -> String {
    let mut lines = Vec::new();
    if let (Ok(expected), Ok(actual)) = (serde_json::to_value(expected), serde_json::to_value(actual)) {
        collect("$", &expected, &actual, &mut lines);
    }
    if lines.is_empty() {
        return format!("  expected: {expected:#?}\n  actual: {actual:#?}");
    }
    lines.join("\n")
}

fn collect(path: &str, expected: &Value, actual: &Value, lines: &mut Vec<String>) {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            let mut keys: Vec<&String> = expected.keys().chain(actual.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let path = format!("{path}.{key}");
                match (expected.get(key), actual.get(key)) {
                    (Some(e), Some(a)) => collect(&path, e, a, lines),
                    (Some(e), None) => lines.push(format!("  {path}: expected {e}, actual <absent>")),
                    (None, Some(a)) => lines.push(format!("  {path}: expected <absent>, actual {a}")),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(expected), Value::Array(actual)) => {
            for index in 0..expected.len().max(actual.len()) {
                let path = format!("{path}[{index}]");
                match (expected.get(index), actual.get(index)) {
                    (Some(e), Some(a)) => collect(&path, e, a, lines),
                    (Some(e), None) => lines.push(format!("  {path}: expected {e}, actual <absent>")),
                    (None, Some(a)) => lines.push(format!("  {path}: expected <absent>, actual {a}")),
                    (None, None) => {}
                }
            }
        }
        (e, a) if e != a => lines.push(format!("  {path}: expected {e}, actual {a}")),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Todo {
        title: &'static str,
        done: bool,
    }

    #[derive(Debug, Serialize)]
    struct Todos {
        count: u32,
        items: Vec<Todo>,
    }

    #[test]
    fn names_each_differing_path() {
        let expected = Todos {
            count: 2,
            items: vec![Todo { title: "milk", done: true }],
        };
        let actual = Todos {
            count: 1,
            items: vec![
                Todo { title: "milk", done: false },
                Todo { title: "eggs", done: false },
            ],
        };

        let diff = state_diff(&expected, &actual);
        assert!(diff.contains("$.count: expected 2, actual 1"), "{diff}");
        assert!(diff.contains("$.items[0].done: expected true, actual false"), "{diff}");
        assert!(diff.contains("$.items[1]: expected <absent>"), "{diff}");
        assert!(!diff.contains("$.items[0].title"), "{diff}");
    }

    #[derive(Debug)]
    #[allow(dead_code)] // read only through the derived Debug impl
    struct Opaque(u8);

    impl Serialize for Opaque {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_unit()
        }
    }

    #[test]
    fn falls_back_to_debug_when_serialized_forms_match() {
        let diff = state_diff(&Opaque(1), &Opaque(2));
        assert!(diff.contains("Opaque(\n    1,\n)") || diff.contains("Opaque(1)"), "{diff}");
        assert!(diff.contains("actual"), "{diff}");
    }
}
