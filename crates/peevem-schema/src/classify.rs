//! # Event Classification
//!
//! Resolves which schema identifier, if any, should validate a given event
//! record. Classification is a short-circuiting decision list: exact
//! event-type rules first, then a generic rule for any record carrying a
//! non-empty `event` field, then no match.
//!
//! The rule table is declarative and ordered. The built-in PEEVEM table is
//! produced by [`ClassifierRules::standard`]; deployments with their own
//! event vocabulary supply a JSON rule file via
//! [`ClassifierRules::from_reader`].

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::registry::SchemaRegistry;

/// Error while loading or resolving a classifier rule table.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The rule file could not be read.
    #[error("cannot read rule file '{path}': {reason}")]
    FileUnreadable {
        /// Path to the rule file.
        path: String,
        /// Reason the file could not be read.
        reason: String,
    },

    /// The rule document is not valid JSON or has the wrong shape.
    #[error("invalid rule document: {0}")]
    InvalidRules(#[from] serde_json::Error),

    /// A rule names a schema the registry cannot resolve.
    #[error("rule for event type(s) {event_types:?} targets unknown schema '{schema_id}'")]
    UnknownSchema {
        /// Event types the rule covers.
        event_types: Vec<String>,
        /// The unresolvable target.
        schema_id: String,
    },
}

/// One classification rule: a set of exact event-type strings mapped to a
/// schema identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Event-type strings this rule matches exactly.
    pub event_types: Vec<String>,
    /// Identifier of the schema to validate matching events against.
    pub schema_id: String,
}

/// An ordered classification table with a generic fallback.
///
/// Rules are evaluated in order; the first rule whose `event_types`
/// contains the record's `event` value wins. Records with a non-empty
/// `event` field that no rule matches fall through to `generic_schema_id`;
/// records without one classify to nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Exact-match rules, evaluated in order.
    pub rules: Vec<Rule>,
    /// Schema identifier for the generic "has an event field" fallback.
    pub generic_schema_id: String,
}

impl ClassifierRules {
    /// The built-in PEEVEM table: bookmark and contact events map to their
    /// dedicated schemas, anything else with an `event` field maps to the
    /// generic event schema.
    ///
    /// Short names are resolved to full identifiers through the registry's
    /// substring lookup, so the table works whether schemas declare full
    /// `$id` URIs or fall back to filename keys.
    pub fn standard(registry: &SchemaRegistry) -> Result<Self, ClassifierError> {
        let resolve = |name: &str, event_types: &[&str]| -> Result<String, ClassifierError> {
            registry
                .find_by_event_type(name)
                .map(str::to_string)
                .ok_or_else(|| ClassifierError::UnknownSchema {
                    event_types: event_types.iter().map(|s| s.to_string()).collect(),
                    schema_id: name.to_string(),
                })
        };

        Ok(ClassifierRules {
            rules: vec![
                Rule {
                    event_types: vec!["bookmark".to_string()],
                    schema_id: resolve("bookmark", &["bookmark"])?,
                },
                Rule {
                    event_types: vec![
                        "contact_created".to_string(),
                        "contact_updated".to_string(),
                    ],
                    schema_id: resolve("contact", &["contact_created", "contact_updated"])?,
                },
            ],
            generic_schema_id: resolve("event", &[])?,
        })
    }

    /// Deserialize a rule table from a JSON document, preserving rule
    /// order.
    pub fn from_reader(reader: impl Read) -> Result<Self, ClassifierError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a rule table from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ClassifierError::FileUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Verify that every schema identifier the table names resolves in the
    /// given registry.
    pub fn resolve_against(&self, registry: &SchemaRegistry) -> Result<(), ClassifierError> {
        for rule in &self.rules {
            if registry.get(&rule.schema_id).is_none() {
                return Err(ClassifierError::UnknownSchema {
                    event_types: rule.event_types.clone(),
                    schema_id: rule.schema_id.clone(),
                });
            }
        }
        if registry.get(&self.generic_schema_id).is_none() {
            return Err(ClassifierError::UnknownSchema {
                event_types: Vec::new(),
                schema_id: self.generic_schema_id.clone(),
            });
        }
        Ok(())
    }

    /// Classify an event record to a schema identifier.
    ///
    /// Returns `None` when the record has no `event` field (or an empty
    /// one); such records are validated against the core schema only.
    pub fn classify(&self, event: &Value) -> Option<&str> {
        let event_type = event.get("event").and_then(|v| v.as_str())?;
        if event_type.is_empty() {
            return None;
        }

        for rule in &self.rules {
            if rule.event_types.iter().any(|t| t == event_type) {
                return Some(&rule.schema_id);
            }
        }
        Some(&self.generic_schema_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> ClassifierRules {
        ClassifierRules {
            rules: vec![
                Rule {
                    event_types: vec!["bookmark".to_string()],
                    schema_id: "https://peevem.org/schemas/bookmark".to_string(),
                },
                Rule {
                    event_types: vec![
                        "contact_created".to_string(),
                        "contact_updated".to_string(),
                    ],
                    schema_id: "https://peevem.org/schemas/contact".to_string(),
                },
            ],
            generic_schema_id: "https://peevem.org/schemas/event".to_string(),
        }
    }

    #[test]
    fn test_bookmark_resolves_to_bookmark_schema() {
        let rules = table();
        assert_eq!(
            rules.classify(&json!({ "event": "bookmark" })),
            Some("https://peevem.org/schemas/bookmark")
        );
    }

    #[test]
    fn test_contact_variants_resolve_to_contact_schema() {
        let rules = table();
        assert_eq!(
            rules.classify(&json!({ "event": "contact_created" })),
            Some("https://peevem.org/schemas/contact")
        );
        assert_eq!(
            rules.classify(&json!({ "event": "contact_updated" })),
            Some("https://peevem.org/schemas/contact")
        );
    }

    #[test]
    fn test_unknown_event_type_falls_back_to_generic() {
        let rules = table();
        assert_eq!(
            rules.classify(&json!({ "event": "something_else" })),
            Some("https://peevem.org/schemas/event")
        );
    }

    #[test]
    fn test_missing_or_empty_event_field_resolves_to_none() {
        let rules = table();
        assert_eq!(rules.classify(&json!({})), None);
        assert_eq!(rules.classify(&json!({ "event": "" })), None);
        // Non-string event values classify to nothing as well.
        assert_eq!(rules.classify(&json!({ "event": 42 })), None);
    }

    #[test]
    fn test_earlier_rule_wins() {
        let mut rules = table();
        rules.rules.push(Rule {
            event_types: vec!["bookmark".to_string()],
            schema_id: "https://peevem.org/schemas/other".to_string(),
        });
        assert_eq!(
            rules.classify(&json!({ "event": "bookmark" })),
            Some("https://peevem.org/schemas/bookmark")
        );
    }

    #[test]
    fn test_rule_table_round_trips_through_json() {
        let rules = table();
        let encoded = serde_json::to_string(&rules).unwrap();
        let decoded = ClassifierRules::from_reader(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.rules.len(), 2);
        assert_eq!(
            decoded.classify(&json!({ "event": "contact_updated" })),
            Some("https://peevem.org/schemas/contact")
        );
    }
}
