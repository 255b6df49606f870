pub mod cloudformation;
pub mod step_functions;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::errors::Error;
use crate::common::{DescribeStacksPayload, TemplateSource};

pub use cloudformation::CloudFormationControlPlane;
pub use step_functions::StepFunctionsStarter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStackInput {
    pub stack_name: String,
    pub template: TemplateSource,
    pub parameters: BTreeMap<String, String>,
    pub role_arn: String,
}

/// Stack operations used by the workflow functions.
#[async_trait]
pub trait StackControlPlane: Send + Sync {
    /// Returns the stack id when the control plane reports one.
    async fn create_stack(&self, input: CreateStackInput) -> Result<Option<String>, Error>;

    async fn describe_stack(&self, stack_name: &str) -> Result<DescribeStacksPayload, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStarted {
    pub execution_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

/// Starts executions of a single, fixed workflow.
#[async_trait]
pub trait ExecutionStarter: Send + Sync {
    async fn start_execution(&self, name: &str, input: String) -> Result<ExecutionStarted, Error>;
}
