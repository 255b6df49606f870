use async_trait::async_trait;
use aws_sdk_sfn::primitives::DateTimeFormat;
use tracing::info;

use crate::common::errors::Error;
use crate::control_plane::{ExecutionStarted, ExecutionStarter};
use crate::permissions::Action;

#[derive(Debug, Clone)]
pub struct StepFunctionsStarter {
    client: aws_sdk_sfn::Client,
    state_machine_arn: String,
}

impl StepFunctionsStarter {
    pub fn new(client: aws_sdk_sfn::Client, state_machine_arn: impl Into<String>) -> Self {
        Self {
            client,
            state_machine_arn: state_machine_arn.into(),
        }
    }
}

#[async_trait]
impl ExecutionStarter for StepFunctionsStarter {
    async fn start_execution(&self, name: &str, input: String) -> Result<ExecutionStarted, Error> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(&self.state_machine_arn)
            .name(name)
            .input(input)
            .send()
            .await
            .map_err(|err| Error::control_plane(Action::StartExecution, err))?;

        info!("Execution started: {}", output.execution_arn());
        Ok(ExecutionStarted {
            execution_arn: output.execution_arn().to_string(),
            start_date: output.start_date().fmt(DateTimeFormat::DateTime).ok(),
        })
    }
}
