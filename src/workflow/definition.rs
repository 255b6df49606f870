//! Amazon States Language rendering of the provisioning workflow.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::common::errors::Error;
use crate::common::{CREATE_COMPLETE, CREATE_IN_PROGRESS, WORKFLOW_TIMEOUT_SECONDS_DEFAULT};

pub const LAMBDA_INVOKE_RESOURCE: &str = "arn:aws:states:::lambda:invoke";
pub const STATUS_PATH: &str = "$.Stacks[0].StackStatus";
pub const WAIT_SECONDS_PATH: &str = "$.waitSeconds";

pub const SUBMIT_STATE: &str = "submitCreateStackTask";
pub const WAIT_STATE: &str = "waitX";
pub const POLL_STATE: &str = "getCreateStackStatusTask";
pub const DECIDE_STATE: &str = "stackCreateComplete";
pub const FINAL_STATE: &str = "finalStatus";
pub const FAILED_STATE: &str = "stackCreateFailed";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceRule {
    pub variable: String,
    pub string_equals: String,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum State {
    #[serde(rename_all = "PascalCase")]
    Task {
        resource: String,
        parameters: Value,
        output_path: String,
        next: String,
    },
    #[serde(rename_all = "PascalCase")]
    Wait { seconds_path: String, next: String },
    #[serde(rename_all = "PascalCase")]
    Choice {
        choices: Vec<ChoiceRule>,
        default: String,
    },
    #[serde(rename_all = "PascalCase")]
    Pass { end: bool },
    #[serde(rename_all = "PascalCase")]
    Fail { error: String, cause: String },
}

impl State {
    fn lambda_invoke(function_arn: &str, next: &str) -> Self {
        State::Task {
            resource: LAMBDA_INVOKE_RESOURCE.into(),
            parameters: json!({
                "FunctionName": function_arn,
                "Payload.$": "$",
            }),
            output_path: "$.Payload".into(),
            next: next.into(),
        }
    }

    fn transitions(&self) -> Vec<&str> {
        match self {
            State::Task { next, .. } | State::Wait { next, .. } => vec![next.as_str()],
            State::Choice { choices, default } => choices
                .iter()
                .map(|rule| rule.next.as_str())
                .chain(std::iter::once(default.as_str()))
                .collect(),
            State::Pass { .. } | State::Fail { .. } => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachineDefinition {
    pub comment: String,
    pub start_at: String,
    pub timeout_seconds: u64,
    pub states: BTreeMap<String, State>,
}

impl StateMachineDefinition {
    /// Every transition must land on a declared state.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.states.contains_key(&self.start_at) {
            return Err(Error::InvalidDefinition(format!("unknown start state {}", self.start_at)));
        }
        for (name, state) in &self.states {
            for next in state.transitions() {
                if !self.states.contains_key(next) {
                    return Err(Error::InvalidDefinition(format!("{} points at unknown state {}", name, next)));
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct DefinitionBuilder {
    submit_function_arn: String,
    poll_function_arn: String,
    timeout: Duration,
    fail_on_unsuccessful: bool,
}

impl DefinitionBuilder {
    pub fn new(submit_function_arn: impl Into<String>, poll_function_arn: impl Into<String>) -> Self {
        Self {
            submit_function_arn: submit_function_arn.into(),
            poll_function_arn: poll_function_arn.into(),
            timeout: Duration::from_secs(WORKFLOW_TIMEOUT_SECONDS_DEFAULT),
            fail_on_unsuccessful: false,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Route every terminal status other than CREATE_COMPLETE to a Fail state.
    pub fn fail_on_unsuccessful(mut self, strict: bool) -> Self {
        self.fail_on_unsuccessful = strict;
        self
    }

    pub fn build(self) -> StateMachineDefinition {
        let mut states = BTreeMap::new();
        states.insert(SUBMIT_STATE.to_string(), State::lambda_invoke(&self.submit_function_arn, WAIT_STATE));
        states.insert(
            WAIT_STATE.to_string(),
            State::Wait {
                seconds_path: WAIT_SECONDS_PATH.into(),
                next: POLL_STATE.into(),
            },
        );
        states.insert(POLL_STATE.to_string(), State::lambda_invoke(&self.poll_function_arn, DECIDE_STATE));

        let mut choices = vec![ChoiceRule {
            variable: STATUS_PATH.into(),
            string_equals: CREATE_IN_PROGRESS.into(),
            next: WAIT_STATE.into(),
        }];
        let default = if self.fail_on_unsuccessful {
            choices.push(ChoiceRule {
                variable: STATUS_PATH.into(),
                string_equals: CREATE_COMPLETE.into(),
                next: FINAL_STATE.into(),
            });
            states.insert(
                FAILED_STATE.to_string(),
                State::Fail {
                    error: "StackCreateFailed".into(),
                    cause: "Stack left CREATE_IN_PROGRESS without reaching CREATE_COMPLETE".into(),
                },
            );
            FAILED_STATE
        } else {
            FINAL_STATE
        };
        states.insert(
            DECIDE_STATE.to_string(),
            State::Choice {
                choices,
                default: default.into(),
            },
        );
        states.insert(FINAL_STATE.to_string(), State::Pass { end: true });

        StateMachineDefinition {
            comment: "Create a CloudFormation stack and poll until it leaves CREATE_IN_PROGRESS".into(),
            start_at: SUBMIT_STATE.into(),
            timeout_seconds: self.timeout.as_secs(),
            states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMIT_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:submitCreateStack";
    const POLL_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:getCreateStackStatus";

    #[test]
    fn renders_polling_loop() {
        let definition = DefinitionBuilder::new(SUBMIT_ARN, POLL_ARN).build();
        definition.validate().unwrap();

        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value["StartAt"], SUBMIT_STATE);
        assert_eq!(value["TimeoutSeconds"], 1800);

        let states = &value["States"];
        assert_eq!(states[SUBMIT_STATE]["Type"], "Task");
        assert_eq!(states[SUBMIT_STATE]["Resource"], LAMBDA_INVOKE_RESOURCE);
        assert_eq!(states[SUBMIT_STATE]["Parameters"]["FunctionName"], SUBMIT_ARN);
        assert_eq!(states[SUBMIT_STATE]["OutputPath"], "$.Payload");
        assert_eq!(states[WAIT_STATE]["SecondsPath"], WAIT_SECONDS_PATH);
        assert_eq!(states[POLL_STATE]["Parameters"]["FunctionName"], POLL_ARN);

        let decide = &states[DECIDE_STATE];
        assert_eq!(decide["Type"], "Choice");
        assert_eq!(decide["Choices"][0]["Variable"], STATUS_PATH);
        assert_eq!(decide["Choices"][0]["StringEquals"], CREATE_IN_PROGRESS);
        assert_eq!(decide["Choices"][0]["Next"], WAIT_STATE);
        assert_eq!(decide["Default"], FINAL_STATE);
        assert_eq!(states[FINAL_STATE], json!({ "Type": "Pass", "End": true }));
        assert!(states.get(FAILED_STATE).is_none());
    }

    #[test]
    fn strict_mode_routes_failures_to_fail_state() {
        let definition = DefinitionBuilder::new(SUBMIT_ARN, POLL_ARN)
            .timeout(Duration::from_secs(600))
            .fail_on_unsuccessful(true)
            .build();
        definition.validate().unwrap();

        assert_eq!(definition.timeout_seconds, 600);
        match &definition.states[DECIDE_STATE] {
            State::Choice { choices, default } => {
                assert_eq!(choices.len(), 2);
                assert_eq!(choices[1].string_equals, CREATE_COMPLETE);
                assert_eq!(choices[1].next, FINAL_STATE);
                assert_eq!(default, FAILED_STATE);
            }
            other => panic!("expected choice, got {:?}", other),
        }
        assert!(matches!(definition.states[FAILED_STATE], State::Fail { .. }));
    }

    #[test]
    fn dangling_transition_is_rejected() {
        let mut definition = DefinitionBuilder::new(SUBMIT_ARN, POLL_ARN).build();
        definition.states.remove(WAIT_STATE);

        assert!(definition.validate().is_err());
    }
}
