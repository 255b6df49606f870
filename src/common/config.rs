use std::str::FromStr;
use std::time::Duration;

use crate::common::errors::Error;
use crate::common::{WAIT_SECONDS_DEFAULT, WORKFLOW_TIMEOUT_SECONDS_DEFAULT};

pub const CLOUDFORMATION_ROLE_ARN: &str = "CLOUDFORMATION_ROLE_ARN";
pub const WAIT_SECONDS: &str = "WAIT_SECONDS";
pub const STATE_MACHINE_ARN: &str = "STATE_MACHINE_ARN";
pub const WORKFLOW_TIMEOUT_SECONDS: &str = "WORKFLOW_TIMEOUT_SECONDS";
pub const FAIL_ON_UNSUCCESSFUL_STATUS: &str = "FAIL_ON_UNSUCCESSFUL_STATUS";
pub const SUBMIT_FUNCTION_ARN: &str = "SUBMIT_FUNCTION_ARN";
pub const POLL_FUNCTION_ARN: &str = "POLL_FUNCTION_ARN";

/// Reads variables from the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, Error> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingConfig(name)),
    }
}

fn parsed_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|err: T::Err| Error::InvalidConfig {
            name,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitConfig {
    /// Service role handed to CloudFormation with `iam:PassRole`.
    pub role_arn: String,
    pub wait_seconds: u64,
}

impl SubmitConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let role_arn = required(&lookup, CLOUDFORMATION_ROLE_ARN)?;
        let wait_seconds = parsed_or(&lookup, WAIT_SECONDS, WAIT_SECONDS_DEFAULT)?;
        if wait_seconds == 0 {
            return Err(Error::InvalidConfig {
                name: WAIT_SECONDS,
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            role_arn,
            wait_seconds,
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontDoorConfig {
    pub state_machine_arn: String,
}

impl FrontDoorConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        Ok(Self {
            state_machine_arn: required(&lookup, STATE_MACHINE_ARN)?,
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Ceiling for the whole execution, not for a single step.
    pub timeout: Duration,
    pub fail_on_unsuccessful: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(WORKFLOW_TIMEOUT_SECONDS_DEFAULT),
            fail_on_unsuccessful: false,
        }
    }
}

impl WorkflowConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let timeout_seconds = parsed_or(&lookup, WORKFLOW_TIMEOUT_SECONDS, WORKFLOW_TIMEOUT_SECONDS_DEFAULT)?;
        if timeout_seconds == 0 {
            return Err(Error::InvalidConfig {
                name: WORKFLOW_TIMEOUT_SECONDS,
                reason: "must be at least 1".into(),
            });
        }
        let fail_on_unsuccessful = parsed_or(&lookup, FAIL_ON_UNSUCCESSFUL_STATUS, false)?;

        Ok(Self {
            timeout: Duration::from_secs(timeout_seconds),
            fail_on_unsuccessful,
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }
}

/// Everything `synth` needs to render the workflow and its roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    pub submit_function_arn: String,
    pub poll_function_arn: String,
    pub role_arn: String,
    pub state_machine_arn: String,
    pub workflow: WorkflowConfig,
}

impl SynthConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        Ok(Self {
            submit_function_arn: required(&lookup, SUBMIT_FUNCTION_ARN)?,
            poll_function_arn: required(&lookup, POLL_FUNCTION_ARN)?,
            role_arn: required(&lookup, CLOUDFORMATION_ROLE_ARN)?,
            state_machine_arn: required(&lookup, STATE_MACHINE_ARN)?,
            workflow: WorkflowConfig::from_lookup(&lookup)?,
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }
}
