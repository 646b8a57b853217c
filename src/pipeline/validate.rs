use serde_json::Value;
use tracing::warn;

use crate::domain::{DiagnosticIssue, DiagnosticKind, RawSkillEntry};
use crate::error::{NormalizerError, Result};

/// Screen typed entries before aggregation. Entries with `frequency <= 0`
/// are rejected with a diagnostic; the rest of the batch proceeds.
pub fn screen(entries: &[RawSkillEntry]) -> (Vec<RawSkillEntry>, Vec<DiagnosticIssue>) {
    let mut valid = Vec::with_capacity(entries.len());
    let mut issues = Vec::new();

    for entry in entries {
        if entry.frequency <= 0 {
            warn!(
                skill = %entry.skill,
                frequency = entry.frequency,
                "Rejecting entry with non-positive frequency"
            );
            issues.push(DiagnosticIssue {
                kind: DiagnosticKind::InvalidFrequency,
                skill: Some(entry.skill.clone()),
                detail: format!("frequency {} is not >= 1", entry.frequency),
            });
        } else {
            valid.push(entry.clone());
        }
    }

    (valid, issues)
}

/// Parse a loose input document into typed entries.
///
/// Accepts the boundary format (a JSON array of `{"skill", "frequency"}`
/// objects) and, for drop-in compatibility with the upstream extraction
/// stage, a plain `{"<skill>": <frequency>}` object. Malformed entries are
/// rejected individually; only a document of the wrong overall shape is a
/// hard error.
pub fn parse_document(document: &Value) -> Result<(Vec<RawSkillEntry>, Vec<DiagnosticIssue>)> {
    match document {
        Value::Array(items) => Ok(parse_entry_array(items)),
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            let mut issues = Vec::new();
            for (skill, value) in map {
                match value.as_i64() {
                    Some(frequency) => entries.push(RawSkillEntry::new(skill.clone(), frequency)),
                    None => issues.push(DiagnosticIssue {
                        kind: DiagnosticKind::MalformedEntry,
                        skill: Some(skill.clone()),
                        detail: format!("frequency '{}' is not an integer", value),
                    }),
                }
            }
            Ok((entries, issues))
        }
        other => Err(NormalizerError::InvalidInput(format!(
            "expected a JSON array or object, got {}",
            json_type_name(other)
        ))),
    }
}

fn parse_entry_array(items: &[Value]) -> (Vec<RawSkillEntry>, Vec<DiagnosticIssue>) {
    let mut entries = Vec::with_capacity(items.len());
    let mut issues = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let object = match item.as_object() {
            Some(object) => object,
            None => {
                issues.push(DiagnosticIssue {
                    kind: DiagnosticKind::MalformedEntry,
                    skill: None,
                    detail: format!("entry {} is not an object", index),
                });
                continue;
            }
        };

        let skill = object.get("skill").and_then(Value::as_str);
        let frequency = object.get("frequency").and_then(Value::as_i64);
        match (skill, frequency) {
            (Some(skill), Some(frequency)) => {
                entries.push(RawSkillEntry::new(skill, frequency));
            }
            (None, _) => issues.push(DiagnosticIssue {
                kind: DiagnosticKind::MalformedEntry,
                skill: None,
                detail: format!("entry {} has a missing or non-string 'skill' field", index),
            }),
            (Some(skill), None) => issues.push(DiagnosticIssue {
                kind: DiagnosticKind::MalformedEntry,
                skill: Some(skill.to_string()),
                detail: format!(
                    "entry {} has a missing or non-integer 'frequency' field",
                    index
                ),
            }),
        }
    }

    (entries, issues)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_screen_rejects_non_positive_frequencies() {
        let entries = vec![
            RawSkillEntry::new("Docker", 0),
            RawSkillEntry::new("SQL", 5),
            RawSkillEntry::new("Git", -2),
        ];

        let (valid, issues) = screen(&entries);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].skill, "SQL");
        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|i| i.kind == DiagnosticKind::InvalidFrequency));
        assert_eq!(issues[0].skill.as_deref(), Some("Docker"));
    }

    #[test]
    fn test_parse_array_document() {
        let document = json!([
            {"skill": "SQL", "frequency": 10},
            {"skill": 42, "frequency": 3},
            {"skill": "Docker", "frequency": "many"},
            "not an object"
        ]);

        let (entries, issues) = parse_document(&document).unwrap();
        assert_eq!(entries, vec![RawSkillEntry::new("SQL", 10)]);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.kind == DiagnosticKind::MalformedEntry));
    }

    #[test]
    fn test_parse_object_document() {
        let document = json!({"SQL": 10, "Power BI": 3, "Docker": 1.5});

        let (entries, issues) = parse_document(&document).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&RawSkillEntry::new("SQL", 10)));
        assert!(entries.contains(&RawSkillEntry::new("Power BI", 3)));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].skill.as_deref(), Some("Docker"));
    }

    #[test]
    fn test_wrong_document_shape_is_a_hard_error() {
        let result = parse_document(&json!("just a string"));
        assert!(matches!(result, Err(NormalizerError::InvalidInput(_))));
    }
}
