//! Per-session conversation context
//!
//! An insertion-ordered key/value store shared by every node of one session.
//! Entries are never removed.

use crate::extract::{Intent, Modality};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;

/// Well-known context keys
pub mod keys {
    /// First utterance of the current pass through Start
    pub const USER_INPUT: &str = "user_input";
    pub const INTENT: &str = "intent";
    /// Latest raw answer to the date/time question; overwritten on retry
    pub const DATETIME_INPUT: &str = "datetime_input";
    /// Validated appointment time, only written after a successful parse
    pub const DATETIME: &str = "datetime";
    /// Latest raw answer to the modality question; overwritten on retry
    pub const MODE_INPUT: &str = "mode_input";
    /// Validated modality
    pub const MODE: &str = "mode";
}

/// A value stored in the context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    Text(String),
    Intent(Intent),
    DateTime(NaiveDateTime),
    Modality(Modality),
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<Intent> for ContextValue {
    fn from(value: Intent) -> Self {
        ContextValue::Intent(value)
    }
}

impl From<NaiveDateTime> for ContextValue {
    fn from(value: NaiveDateTime) -> Self {
        ContextValue::DateTime(value)
    }
}

impl From<Modality> for ContextValue {
    fn from(value: Modality) -> Self {
        ContextValue::Modality(value)
    }
}

/// Mutable state of one conversation session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationContext {
    entries: IndexMap<String, ContextValue>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ContextValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn intent(&self, key: &str) -> Option<Intent> {
        match self.get(key)? {
            ContextValue::Intent(i) => Some(*i),
            _ => None,
        }
    }

    pub fn datetime(&self, key: &str) -> Option<NaiveDateTime> {
        match self.get(key)? {
            ContextValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn modality(&self, key: &str) -> Option<Modality> {
        match self.get(key)? {
            ContextValue::Modality(m) => Some(*m),
            _ => None,
        }
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_set_get_has() {
        let mut ctx = ConversationContext::new();
        assert!(ctx.is_empty());
        assert!(!ctx.has(keys::USER_INPUT));

        ctx.set(keys::USER_INPUT, "hello");
        ctx.set(keys::INTENT, Intent::General);

        assert!(ctx.has(keys::USER_INPUT));
        assert_eq!(ctx.text(keys::USER_INPUT), Some("hello"));
        assert_eq!(ctx.intent(keys::INTENT), Some(Intent::General));
        assert_eq!(ctx.get(keys::MODE), None);
    }

    #[test]
    fn test_typed_getters_reject_other_variants() {
        let mut ctx = ConversationContext::new();
        ctx.set(keys::MODE, Modality::Virtual);

        assert_eq!(ctx.modality(keys::MODE), Some(Modality::Virtual));
        assert_eq!(ctx.text(keys::MODE), None);
        assert_eq!(ctx.datetime(keys::MODE), None);
    }

    #[test]
    fn test_overwrite_keeps_insertion_order() {
        let mut ctx = ConversationContext::new();
        ctx.set(keys::DATETIME_INPUT, "whenever");
        ctx.set(keys::USER_INPUT, "book");
        ctx.set(keys::DATETIME_INPUT, "tomorrow");

        assert_eq!(ctx.keys().count(), 2);
        assert_eq!(ctx.text(keys::DATETIME_INPUT), Some("tomorrow"));
        assert_eq!(
            ctx.keys().collect::<Vec<_>>(),
            vec![keys::DATETIME_INPUT, keys::USER_INPUT]
        );
    }

    #[test]
    fn test_datetime_values() {
        let dt = NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut ctx = ConversationContext::new();
        ctx.set(keys::DATETIME, dt);
        assert_eq!(ctx.datetime(keys::DATETIME), Some(dt));
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let dt = NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut ctx = ConversationContext::new();
        ctx.set(keys::USER_INPUT, "book a call");
        ctx.set(keys::INTENT, Intent::Appointment);
        ctx.set(keys::DATETIME, dt);
        ctx.set(keys::MODE, Modality::Telephonic);

        assert_eq!(
            serde_json::to_string(&ctx).unwrap(),
            r#"{"user_input":"book a call","intent":"appointment","datetime":"2026-10-15T10:00:00","mode":"telephonic"}"#
        );
    }
}
