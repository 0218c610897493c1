//! Extraction utilities
//!
//! Pure functions mapping a raw user utterance to typed, optional values.
//! Nothing here touches the conversation context.

mod datetime;

pub use datetime::{extract_datetime, extract_datetime_at, format_datetime};

use serde::Serialize;
use std::fmt;

/// Words that mark an utterance as an appointment request
const APPOINTMENT_KEYWORDS: &[&str] = &["book", "schedule", "meeting", "appointment", "call"];

/// Modality keyword sets, checked in order. The first set with a hit wins.
const MODALITY_KEYWORDS: &[(Modality, &[&str])] = &[
    (Modality::Virtual, &["virtual", "online", "video"]),
    (Modality::Telephonic, &["phone", "call", "telephonic"]),
];

/// What the user wants from the session, decided from their first utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Appointment,
    General,
}

/// How the appointment takes place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Virtual,
    Telephonic,
}

impl Modality {
    /// Capitalized name used in user-facing messages
    pub fn display_name(self) -> &'static str {
        match self {
            Modality::Virtual => "Virtual",
            Modality::Telephonic => "Telephonic",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Classify an utterance by case-insensitive substring match.
///
/// Any appointment keyword yields [`Intent::Appointment`]; everything else is
/// [`Intent::General`].
pub fn classify_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();
    if APPOINTMENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Appointment
    } else {
        Intent::General
    }
}

/// Find an appointment modality keyword in the text.
///
/// When keywords from both sets are present, [`Modality::Virtual`] wins
/// because its set is checked first.
pub fn extract_modality(text: &str) -> Option<Modality> {
    let lower = text.to_lowercase();
    MODALITY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(modality, _)| *modality)
}
