//! Stage Transition Validator
//!
//! Decides whether a deal may move to a requested stage and who may move it.
//! Pure and synchronous: persistence happens in `deal_store`.
//!
//! ```text
//! INQUIRY -> OFFER -> NEGOTIATION -> DUE_DILIGENCE -> CLOSING -> COMPLETED
//!    \          \          \               \             \
//!     +----------+----------+---------------+-------------+--> CANCELLED
//! ```

use crate::entities::deals::{self, DealStage};
use crate::error::{PipelineError, PipelineResult};

/// Stages reachable from `stage` in one step. Terminal stages have none.
pub fn allowed_successors(stage: DealStage) -> &'static [DealStage] {
    match stage {
        DealStage::Inquiry => &[DealStage::Offer, DealStage::Cancelled],
        DealStage::Offer => &[DealStage::Negotiation, DealStage::Cancelled],
        DealStage::Negotiation => &[DealStage::DueDiligence, DealStage::Cancelled],
        DealStage::DueDiligence => &[DealStage::Closing, DealStage::Cancelled],
        DealStage::Closing => &[DealStage::Completed, DealStage::Cancelled],
        DealStage::Completed | DealStage::Cancelled => &[],
    }
}

pub fn can_transition(from: DealStage, to: DealStage) -> bool {
    allowed_successors(from).contains(&to)
}

/// An approved stage change and the timeline entry describing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: DealStage,
    pub to: DealStage,
    /// e.g. "Stage changed to Due Diligence"
    pub title: String,
    pub details: String,
}

/// Check that `actor_id` may move `deal` to `target`.
///
/// Participation is checked before legality, so outsiders learn nothing about
/// the deal's current stage.
pub fn request_transition(
    deal: &deals::Model,
    target: DealStage,
    actor_id: i32,
    notes: Option<&str>,
) -> PipelineResult<TransitionOutcome> {
    if !deal.is_participant(actor_id) {
        return Err(PipelineError::Forbidden(
            "Only the buyer or seller can update this deal".to_string(),
        ));
    }

    if !can_transition(deal.stage, target) {
        return Err(invalid_transition(deal.stage, Some(target)));
    }

    let mut details = format!("Previous stage: {}", deal.stage.label());
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        details.push_str("\nNotes: ");
        details.push_str(notes);
    }

    Ok(TransitionOutcome {
        from: deal.stage,
        to: target,
        title: format!("Stage changed to {}", target.label()),
        details,
    })
}

/// Build the `InvalidTransition` error for `from`, listing what is allowed instead.
/// `target` is `None` for updates that carry no stage (offer or notes only).
pub fn invalid_transition(from: DealStage, target: Option<DealStage>) -> PipelineError {
    let allowed: Vec<String> = allowed_successors(from)
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

    let message = match target {
        _ if from.is_terminal() => format!("Deal is {} and can no longer be changed", from),
        Some(to) => format!(
            "Cannot move deal from {} to {}; allowed: {}",
            from,
            to,
            allowed.join(", ")
        ),
        None => format!("Deal at stage {} cannot be updated", from),
    };

    PipelineError::InvalidTransition { message, allowed }
}
