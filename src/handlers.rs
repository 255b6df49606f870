use lambda_http::{Request as LambdaRequest, Response as LambdaResponse};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::common::config::SubmitConfig;
use crate::common::errors::Error;
use crate::common::utils::{extract_request, json_response, text_response};
use crate::common::{PollOutput, PollState, StackRequest};
use crate::control_plane::{CreateStackInput, ExecutionStarted, ExecutionStarter, StackControlPlane};

/// Issues CreateStack and hands the first wait interval to the workflow.
#[tracing::instrument(skip(control_plane, config), fields(stack_name = %request.stack_name))]
pub async fn submit_create_stack<C>(
    control_plane: &C,
    config: &SubmitConfig,
    request: StackRequest,
) -> Result<PollState, Error>
where
    C: StackControlPlane + ?Sized,
{
    request.validate()?;
    if let Some(role_arn) = &request.role_arn {
        if *role_arn != config.role_arn {
            warn!("Rejecting request for role {}", role_arn);
            return Err(Error::InvalidRequest(format!(
                "role {} may not be passed to CloudFormation",
                role_arn
            )));
        }
    }

    let template = request.template()?;
    info!("Submitting create-stack");
    let stack_id = control_plane
        .create_stack(CreateStackInput {
            stack_name: request.stack_name.clone(),
            template,
            parameters: request.parameters,
            role_arn: config.role_arn.clone(),
        })
        .await?;

    Ok(PollState {
        stack_name: request.stack_name,
        wait_seconds: config.wait_seconds,
        stack_id,
    })
}

/// Describes the stack, carrying the poll state forward for the next wait.
#[tracing::instrument(skip(control_plane), fields(stack_name = %state.stack_name))]
pub async fn get_create_stack_status<C>(control_plane: &C, state: PollState) -> Result<PollOutput, Error>
where
    C: StackControlPlane + ?Sized,
{
    let describe = control_plane.describe_stack(&state.stack_name).await?;
    match describe.status() {
        Some(status) => info!("Stack status: {}", status),
        None => {
            error!("No stack in describe-stacks response");
            return Err(Error::MissingStackStatus(state.stack_name));
        }
    }

    Ok(PollOutput { state, describe })
}

pub async fn start_execution<S>(starter: &S, request: StackRequest) -> Result<ExecutionStarted, Error>
where
    S: ExecutionStarter + ?Sized,
{
    request.validate()?;
    let name = Uuid::new_v4().to_string();
    let input = serde_json::to_string(&request)?;

    info!("Starting execution {} for stack {}", name, request.stack_name);
    starter.start_execution(&name, input).await
}

/// API Gateway entry point: one request starts one workflow execution.
#[tracing::instrument(skip(request, starter))]
pub async fn process_request<S>(request: LambdaRequest, starter: &S) -> Result<LambdaResponse<String>, Error>
where
    S: ExecutionStarter + ?Sized,
{
    let request = extract_request::<StackRequest>(request)?;

    match start_execution(starter, request).await {
        Ok(started) => json_response(200, &started),
        Err(err) if err.is_client_error() => {
            error!("Rejected request: {}", err);
            Err(Error::HttpError(text_response(400, err.to_string())?))
        }
        Err(err) => Err(err),
    }
}
