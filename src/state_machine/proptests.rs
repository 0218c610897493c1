//! Property-based tests for the dialogue nodes
//!
//! These tests verify key invariants hold across arbitrary user input.

use super::nodes::{AskAppointmentModeNode, AskDateTimeNode, StartNode};
use super::*;
use crate::extract::{classify_intent, extract_modality, Intent, Modality};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 14)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Lowercase chatter built from letters that cannot spell any keyword,
/// weekday, month, or relative day
fn arb_filler() -> impl Strategy<Value = String> {
    "[ghijkqvxz ]{0,30}"
}

fn arb_appointment_keyword() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("book"),
        Just("schedule"),
        Just("meeting"),
        Just("appointment"),
        Just("call"),
    ]
}

fn arb_virtual_keyword() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("virtual"), Just("online"), Just("video")]
}

fn arb_telephonic_keyword() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("phone"), Just("call"), Just("telephonic")]
}

/// Capitalise some letters to exercise case folding
fn arb_casing(word: &'static str) -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_keyword_anywhere_means_appointment(
        before in arb_filler(),
        keyword in arb_appointment_keyword().prop_flat_map(arb_casing),
        after in arb_filler(),
    ) {
        let text = format!("{before}{keyword}{after}");
        prop_assert_eq!(classify_intent(&text), Intent::Appointment);
    }

    #[test]
    fn prop_no_keyword_means_general(text in arb_filler()) {
        prop_assert_eq!(classify_intent(&text), Intent::General);
        prop_assert_eq!(extract_modality(&text), None);
    }

    #[test]
    fn prop_virtual_wins_ties(
        v in arb_virtual_keyword(),
        t in arb_telephonic_keyword(),
        filler in arb_filler(),
        virtual_first in any::<bool>(),
    ) {
        let text = if virtual_first {
            format!("{v} {filler} {t}")
        } else {
            format!("{t} {filler} {v}")
        };
        prop_assert_eq!(extract_modality(&text), Some(Modality::Virtual));
    }

    #[test]
    fn prop_telephonic_alone(t in arb_telephonic_keyword(), filler in arb_filler()) {
        let text = format!("{filler} {t}");
        prop_assert_eq!(extract_modality(&text), Some(Modality::Telephonic));
    }

    /// Start records the reply and routes exactly by its intent
    #[test]
    fn prop_start_routes_by_intent(text in "[a-z ]{0,40}") {
        let mut ctx = ConversationContext::new();
        let step = StartNode
            .step(Phase::Asked, NodeEvent::Reply(text.clone()), &mut ctx, now())
            .unwrap();

        let expected = match classify_intent(&text) {
            Intent::Appointment => NodeId::AskDateTime,
            Intent::General => NodeId::GeneralQuery,
        };
        prop_assert_eq!(step, NodeStep::goto(expected));
        prop_assert_eq!(ctx.text(keys::USER_INPUT), Some(text.as_str()));
    }

    /// However many unusable answers arrive, the date node keeps looping
    /// on itself and never records a validated time
    #[test]
    fn prop_invalid_dates_never_advance(
        replies in proptest::collection::vec(arb_filler(), 1..8),
    ) {
        let node = AskDateTimeNode;
        let mut ctx = ConversationContext::new();

        let step = node
            .step(Phase::Asked, NodeEvent::Reply(replies[0].clone()), &mut ctx, now())
            .unwrap();
        prop_assert_eq!(step.outcome.clone(), Outcome::AwaitReply {
            prompt: nodes::DATETIME_CLARIFICATION.to_string(),
            phase: Phase::Clarifying,
        });

        for reply in &replies[1..] {
            let step = node
                .step(Phase::Clarifying, NodeEvent::Reply(reply.clone()), &mut ctx, now())
                .unwrap();
            prop_assert_eq!(step, NodeStep::goto(NodeId::AskDateTime));

            let step = node.step(Phase::Entered, NodeEvent::Enter, &mut ctx, now()).unwrap();
            prop_assert_eq!(step, NodeStep::ask(nodes::DATETIME_CLARIFICATION, Phase::Clarifying));
            prop_assert!(!ctx.has(keys::DATETIME));
            prop_assert_eq!(ctx.text(keys::DATETIME_INPUT), Some(reply.as_str()));
        }
    }

    /// The first answer is always acknowledged, accepted or not
    #[test]
    fn prop_mode_node_is_never_silent_on_first_answer(text in "[a-z ]{0,30}") {
        let mut ctx = ConversationContext::new();
        let step = AskAppointmentModeNode
            .step(Phase::Asked, NodeEvent::Reply(text.clone()), &mut ctx, now())
            .unwrap();

        prop_assert_eq!(step.outbound_count(), 1);
        prop_assert_eq!(ctx.has(keys::MODE), extract_modality(&text).is_some());
    }
}
