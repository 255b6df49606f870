use serde::Serialize;

use crate::common::errors::Error;
use crate::common::{PollOutput, PollState, CREATE_COMPLETE, CREATE_IN_PROGRESS};

/// Which way the decision step sends an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Polling,
    Done,
}

/// Only the exact sentinel keeps the loop going.
pub fn route(status: &str) -> Route {
    if status == CREATE_IN_PROGRESS {
        Route::Polling
    } else {
        Route::Done
    }
}

/// How a terminal status should be read. Never affects routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StackOutcome {
    Complete,
    Failed,
    Unrecognized,
}

impl StackOutcome {
    pub fn classify(status: &str) -> Self {
        if status == CREATE_COMPLETE {
            StackOutcome::Complete
        } else if status.ends_with("_FAILED") || status.contains("ROLLBACK") || status.starts_with("DELETE_") {
            StackOutcome::Failed
        } else {
            StackOutcome::Unrecognized
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStatus {
    pub outcome: StackOutcome,
    /// The last poll payload, unmodified.
    pub payload: PollOutput,
}

impl FinalStatus {
    pub fn status(&self) -> &str {
        self.payload.status().unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == StackOutcome::Complete
    }

    /// Strict reading: anything but a completed stack is an error.
    pub fn into_result(self) -> Result<FinalStatus, Error> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::UnsuccessfulStatus {
                stack_name: self.payload.state.stack_name.clone(),
                status: self.status().to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Polling(PollState),
    Done(FinalStatus),
}

impl Phase {
    pub fn advance(output: PollOutput) -> Result<Phase, Error> {
        let Some(status) = output.status().map(str::to_string) else {
            return Err(Error::MissingStackStatus(output.state.stack_name));
        };

        Ok(match route(&status) {
            Route::Polling => Phase::Polling(output.state),
            Route::Done => Phase::Done(FinalStatus {
                outcome: StackOutcome::classify(&status),
                payload: output,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn poll_output(status: &str) -> PollOutput {
        serde_json::from_value(json!({
            "stackName": "demo",
            "waitSeconds": 30,
            "Stacks": [{ "StackName": "demo", "StackStatus": status }]
        }))
        .unwrap()
    }

    #[test]
    fn only_exact_sentinel_keeps_polling() {
        assert_eq!(route("CREATE_IN_PROGRESS"), Route::Polling);

        for status in [
            "CREATE_COMPLETE",
            "CREATE_FAILED",
            "ROLLBACK_IN_PROGRESS",
            "create_in_progress",
            "CREATE_IN_PROGRESS ",
            "",
            "SOMETHING_NEW",
        ] {
            assert_eq!(route(status), Route::Done, "{:?}", status);
        }
    }

    #[test]
    fn routing_is_stable_for_unchanged_status() {
        let first = Phase::advance(poll_output("CREATE_IN_PROGRESS")).unwrap();
        for _ in 0..3 {
            assert_eq!(Phase::advance(poll_output("CREATE_IN_PROGRESS")).unwrap(), first);
        }
    }

    #[test]
    fn in_progress_loops_back_with_same_state() {
        match Phase::advance(poll_output("CREATE_IN_PROGRESS")).unwrap() {
            Phase::Polling(state) => {
                assert_eq!(state.stack_name, "demo");
                assert_eq!(state.wait_seconds, 30);
            }
            other => panic!("expected polling, got {:?}", other),
        }
    }

    #[test]
    fn complete_finishes_with_payload_verbatim() {
        let output = poll_output("CREATE_COMPLETE");

        match Phase::advance(output.clone()).unwrap() {
            Phase::Done(final_status) => {
                assert_eq!(final_status.payload, output);
                assert_eq!(final_status.outcome, StackOutcome::Complete);
                assert!(final_status.into_result().is_ok());
            }
            other => panic!("expected done, got {:?}", other),
        }
    }

    #[test]
    fn failed_status_exits_the_loop_but_is_flagged() {
        match Phase::advance(poll_output("CREATE_FAILED")).unwrap() {
            Phase::Done(final_status) => {
                assert_eq!(final_status.outcome, StackOutcome::Failed);
                assert!(!final_status.is_success());
                assert!(matches!(
                    final_status.into_result(),
                    Err(Error::UnsuccessfulStatus { status, .. }) if status == "CREATE_FAILED"
                ));
            }
            other => panic!("expected done, got {:?}", other),
        }
    }

    #[test]
    fn classifies_terminal_statuses() {
        assert_eq!(StackOutcome::classify("CREATE_COMPLETE"), StackOutcome::Complete);
        assert_eq!(StackOutcome::classify("ROLLBACK_COMPLETE"), StackOutcome::Failed);
        assert_eq!(StackOutcome::classify("ROLLBACK_IN_PROGRESS"), StackOutcome::Failed);
        assert_eq!(StackOutcome::classify("DELETE_COMPLETE"), StackOutcome::Failed);
        assert_eq!(StackOutcome::classify("REVIEW_IN_PROGRESS"), StackOutcome::Unrecognized);
    }

    #[test]
    fn empty_stack_list_is_an_error() {
        let output: PollOutput = serde_json::from_value(json!({
            "stackName": "demo",
            "waitSeconds": 30,
            "Stacks": []
        }))
        .unwrap();

        assert!(matches!(Phase::advance(output), Err(Error::MissingStackStatus(_))));
    }
}
