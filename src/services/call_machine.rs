//! ScheduledCall status rules
//!
//! PENDING -> CONFIRMED | COMPLETED | CANCELLED
//! CONFIRMED -> COMPLETED | CANCELLED
//! COMPLETED and CANCELLED are final.

use crate::entities::scheduled_calls::{self, CallStatus};
use crate::error::{PipelineError, PipelineResult};

pub fn allowed_call_successors(status: CallStatus) -> &'static [CallStatus] {
    match status {
        CallStatus::Pending => &[CallStatus::Confirmed, CallStatus::Completed, CallStatus::Cancelled],
        CallStatus::Confirmed => &[CallStatus::Completed, CallStatus::Cancelled],
        CallStatus::Completed | CallStatus::Cancelled => &[],
    }
}

/// Check that `actor_id` may move `call` to `target`
pub fn request_call_transition(
    call: &scheduled_calls::Model,
    target: CallStatus,
    actor_id: i32,
) -> PipelineResult<()> {
    if !call.is_participant(actor_id) {
        return Err(PipelineError::Forbidden(
            "Only the scheduler or receiver can update this call".to_string(),
        ));
    }

    if call.status.is_terminal() {
        return Err(PipelineError::InvalidState(format!(
            "Call is already {}",
            call.status
        )));
    }

    let allowed = allowed_call_successors(call.status);
    if !allowed.contains(&target) {
        return Err(PipelineError::InvalidTransition {
            message: format!("Cannot move call from {} to {}", call.status, target),
            allowed: allowed.iter().map(|s| s.as_str().to_string()).collect(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn call_with(status: CallStatus) -> scheduled_calls::Model {
        let now = Utc::now().fixed_offset();
        scheduled_calls::Model {
            id: 1,
            scheduler_id: 10,
            receiver_id: 20,
            deal_id: None,
            title: "Intro call".to_string(),
            notes: None,
            scheduled_at: now,
            duration_minutes: 30,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pending_can_confirm_complete_or_cancel() {
        let call = call_with(CallStatus::Pending);
        for target in [CallStatus::Confirmed, CallStatus::Completed, CallStatus::Cancelled] {
            assert!(request_call_transition(&call, target, 20).is_ok());
        }
        assert!(matches!(
            request_call_transition(&call, CallStatus::Pending, 10),
            Err(PipelineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_confirmed_cannot_go_back() {
        let call = call_with(CallStatus::Confirmed);
        match request_call_transition(&call, CallStatus::Pending, 10) {
            Err(PipelineError::InvalidTransition { allowed, .. }) => {
                assert_eq!(allowed, vec!["COMPLETED".to_string(), "CANCELLED".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_terminal_call_is_invalid_state() {
        for status in [CallStatus::Completed, CallStatus::Cancelled] {
            let call = call_with(status);
            assert!(matches!(
                request_call_transition(&call, CallStatus::Confirmed, 10),
                Err(PipelineError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn test_outsider_is_forbidden() {
        let call = call_with(CallStatus::Pending);
        assert!(matches!(
            request_call_transition(&call, CallStatus::Confirmed, 99),
            Err(PipelineError::Forbidden(_))
        ));
    }
}
