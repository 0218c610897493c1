//! The appointment-booking node set
//!
//! ```text
//! Start --appointment--> AskDateTime --ok--> AskAppointmentMode --ok--> CompleteBooking --> End
//!   |  ^                    |  ^                  |  ^
//!   |  |                    +--+ retry            +--+ retry
//!   +--+-- general --> GeneralQuery
//! ```

use super::context::{keys, ConversationContext};
use super::node::{DialogueNode, Next, NodeError, NodeEvent, NodeId, NodeStep, Phase};
use crate::extract::{
    classify_intent, extract_datetime_at, extract_modality, format_datetime, Intent,
};
use chrono::NaiveDateTime;

pub const GREETING: &str = "Hello! How can I help you today?";
pub const GENERAL_QUERY_TEMPLATE: &str = "Answer this general query concisely: ";
pub const COMPLETION_APOLOGY: &str =
    "Sorry, I couldn't answer that right now. Please try again.";
pub const DATETIME_QUESTION: &str =
    "Please provide your preferred date and time for the appointment.";
pub const DATETIME_CLARIFICATION: &str =
    "Sorry, I didn't catch a valid date/time. Could you please specify again?";
pub const MODE_QUESTION: &str = "Would you prefer the appointment to be Virtual or Telephonic?";
pub const MODE_CLARIFICATION: &str =
    "Please specify if you want the appointment to be Virtual or Telephonic.";
pub const FAREWELL: &str = "Have a great day!";

/// A retryable completion failure is retried once before giving up
const MAX_COMPLETION_ATTEMPTS: u32 = 2;

/// Greets the user and routes on the intent of their first utterance
pub struct StartNode;

impl DialogueNode for StartNode {
    fn id(&self) -> NodeId {
        NodeId::Start
    }

    fn targets(&self) -> &'static [NodeId] {
        &[NodeId::AskDateTime, NodeId::GeneralQuery]
    }

    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        _now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError> {
        match (phase, event) {
            (Phase::Entered, NodeEvent::Enter) => Ok(NodeStep::ask(GREETING, Phase::Asked)),
            (Phase::Asked, NodeEvent::Reply(text)) => {
                let intent = classify_intent(&text);
                ctx.set(keys::USER_INPUT, text);
                ctx.set(keys::INTENT, intent);
                tracing::debug!(?intent, "Classified opening utterance");

                Ok(NodeStep::goto(match intent {
                    Intent::Appointment => NodeId::AskDateTime,
                    Intent::General => NodeId::GeneralQuery,
                }))
            }
            (phase, event) => Err(NodeError::unexpected(self.id(), phase, &event)),
        }
    }
}

/// Answers a free-form question through the completion service, then
/// returns to Start. There is no way out of this loop except ending the
/// process.
pub struct GeneralQueryNode;

impl GeneralQueryNode {
    fn prompt(ctx: &ConversationContext) -> Result<String, NodeError> {
        let question = ctx.text(keys::USER_INPUT).ok_or(NodeError::MissingContext {
            node: NodeId::GeneralQuery,
            key: keys::USER_INPUT,
        })?;
        Ok(format!("{GENERAL_QUERY_TEMPLATE}{question}"))
    }
}

impl DialogueNode for GeneralQueryNode {
    fn id(&self) -> NodeId {
        NodeId::GeneralQuery
    }

    fn targets(&self) -> &'static [NodeId] {
        &[NodeId::Start]
    }

    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        _now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError> {
        match (phase, event) {
            (Phase::Entered, NodeEvent::Enter) => Ok(NodeStep::complete(
                Self::prompt(ctx)?,
                Phase::Completing { attempt: 1 },
            )),
            (Phase::Completing { .. }, NodeEvent::Completion(answer)) => {
                Ok(NodeStep::goto(NodeId::Start).with_message(answer))
            }
            (Phase::Completing { attempt }, NodeEvent::CompletionFailed { message, retryable })
                if retryable && attempt < MAX_COMPLETION_ATTEMPTS =>
            {
                tracing::warn!(attempt, error = %message, "Retrying completion");
                Ok(NodeStep::complete(
                    Self::prompt(ctx)?,
                    Phase::Completing {
                        attempt: attempt + 1,
                    },
                ))
            }
            (Phase::Completing { attempt }, NodeEvent::CompletionFailed { message, .. }) => {
                tracing::error!(attempt, error = %message, "Giving up on completion");
                Ok(NodeStep::goto(NodeId::Start).with_message(COMPLETION_APOLOGY))
            }
            (phase, event) => Err(NodeError::unexpected(self.id(), phase, &event)),
        }
    }
}

/// The question side of a two-phase slot: ask if no raw answer is stored,
/// validate, then either advance or clarify and loop back to the same node.
struct SlotQuestion {
    node: NodeId,
    raw_key: &'static str,
    question: &'static str,
    clarification: &'static str,
}

impl SlotQuestion {
    fn step<T>(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        parse: impl Fn(&str) -> Option<T>,
        accept: impl FnOnce(T, &mut ConversationContext) -> NodeStep,
    ) -> Result<NodeStep, NodeError> {
        match (phase, event) {
            (Phase::Entered, NodeEvent::Enter) => {
                let Some(parsed) = ctx.text(self.raw_key).map(&parse) else {
                    return Ok(NodeStep::ask(self.question, Phase::Asked));
                };
                Ok(self.evaluate(parsed, ctx, accept))
            }
            (Phase::Asked, NodeEvent::Reply(text)) => {
                let parsed = parse(&text);
                ctx.set(self.raw_key, text);
                Ok(self.evaluate(parsed, ctx, accept))
            }
            (Phase::Clarifying, NodeEvent::Reply(text)) => {
                // Re-entering the node validates the new answer
                ctx.set(self.raw_key, text);
                Ok(NodeStep::goto(self.node))
            }
            (phase, event) => Err(NodeError::unexpected(self.node, phase, &event)),
        }
    }

    fn evaluate<T>(
        &self,
        parsed: Option<T>,
        ctx: &mut ConversationContext,
        accept: impl FnOnce(T, &mut ConversationContext) -> NodeStep,
    ) -> NodeStep {
        match parsed {
            Some(value) => accept(value, ctx),
            None => {
                tracing::info!(node = %self.node, "Reply not understood, asking again");
                NodeStep::ask(self.clarification, Phase::Clarifying)
            }
        }
    }
}

const DATETIME_SLOT: SlotQuestion = SlotQuestion {
    node: NodeId::AskDateTime,
    raw_key: keys::DATETIME_INPUT,
    question: DATETIME_QUESTION,
    clarification: DATETIME_CLARIFICATION,
};

const MODE_SLOT: SlotQuestion = SlotQuestion {
    node: NodeId::AskAppointmentMode,
    raw_key: keys::MODE_INPUT,
    question: MODE_QUESTION,
    clarification: MODE_CLARIFICATION,
};

/// Collects a future appointment time
pub struct AskDateTimeNode;

impl DialogueNode for AskDateTimeNode {
    fn id(&self) -> NodeId {
        NodeId::AskDateTime
    }

    fn targets(&self) -> &'static [NodeId] {
        &[NodeId::AskDateTime, NodeId::AskAppointmentMode]
    }

    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError> {
        DATETIME_SLOT.step(
            phase,
            event,
            ctx,
            |raw| extract_datetime_at(raw, now),
            |dt, ctx| {
                ctx.set(keys::DATETIME, dt);
                NodeStep::goto(NodeId::AskAppointmentMode).with_message(format!(
                    "Got it, you want to schedule for {}.",
                    format_datetime(&dt)
                ))
            },
        )
    }
}

/// Collects virtual vs. telephonic
pub struct AskAppointmentModeNode;

impl DialogueNode for AskAppointmentModeNode {
    fn id(&self) -> NodeId {
        NodeId::AskAppointmentMode
    }

    fn targets(&self) -> &'static [NodeId] {
        &[NodeId::AskAppointmentMode, NodeId::CompleteBooking]
    }

    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        _now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError> {
        MODE_SLOT.step(phase, event, ctx, extract_modality, |mode, ctx| {
            ctx.set(keys::MODE, mode);
            NodeStep::goto(NodeId::CompleteBooking)
                .with_message(format!("Great! You chose {mode} mode."))
        })
    }
}

/// Confirms the booking from the validated slots
pub struct CompleteBookingNode;

impl DialogueNode for CompleteBookingNode {
    fn id(&self) -> NodeId {
        NodeId::CompleteBooking
    }

    fn targets(&self) -> &'static [NodeId] {
        &[NodeId::End]
    }

    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        _now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError> {
        match (phase, event) {
            (Phase::Entered, NodeEvent::Enter) => {
                let dt = ctx.datetime(keys::DATETIME).ok_or(NodeError::MissingContext {
                    node: self.id(),
                    key: keys::DATETIME,
                })?;
                let mode = ctx.modality(keys::MODE).ok_or(NodeError::MissingContext {
                    node: self.id(),
                    key: keys::MODE,
                })?;

                tracing::info!(at = %dt, %mode, "Appointment booked");
                Ok(NodeStep::goto(NodeId::End).with_message(format!(
                    "Your appointment is booked for {} in {mode} mode. Thank you!",
                    format_datetime(&dt)
                )))
            }
            (phase, event) => Err(NodeError::unexpected(self.id(), phase, &event)),
        }
    }
}

/// Says goodbye and ends the session
pub struct EndNode;

impl DialogueNode for EndNode {
    fn id(&self) -> NodeId {
        NodeId::End
    }

    fn targets(&self) -> &'static [NodeId] {
        &[]
    }

    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        _ctx: &mut ConversationContext,
        _now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError> {
        match (phase, event) {
            (Phase::Entered, NodeEvent::Enter) => {
                Ok(NodeStep::finish(Next::Terminate).with_message(FAREWELL))
            }
            (phase, event) => Err(NodeError::unexpected(self.id(), phase, &event)),
        }
    }
}
