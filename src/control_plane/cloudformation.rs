use async_trait::async_trait;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::primitives::{DateTime, DateTimeFormat};
use aws_sdk_cloudformation::types::{Parameter, Stack};
use tracing::{error, info};

use crate::common::errors::Error;
use crate::common::{DescribeStacksPayload, StackDescription, StackOutputValue, TemplateSource};
use crate::control_plane::{CreateStackInput, StackControlPlane};
use crate::permissions::Action;

const ALREADY_EXISTS_CODE: &str = "AlreadyExistsException";
const VALIDATION_ERROR_CODE: &str = "ValidationError";

#[derive(Debug, Clone)]
pub struct CloudFormationControlPlane {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationControlPlane {
    pub fn new(client: aws_sdk_cloudformation::Client) -> Self {
        Self { client }
    }
}

fn format_time(time: &DateTime) -> Option<String> {
    time.fmt(DateTimeFormat::DateTime).ok()
}

fn describe(stack: &Stack) -> Result<StackDescription, Error> {
    let stack_name = stack.stack_name().unwrap_or_default().to_string();
    let Some(stack_status) = stack.stack_status() else {
        return Err(Error::MissingStackStatus(stack_name));
    };

    Ok(StackDescription {
        stack_id: stack.stack_id().map(str::to_string),
        stack_status: stack_status.as_str().to_string(),
        stack_status_reason: stack.stack_status_reason().map(str::to_string),
        creation_time: stack.creation_time().and_then(format_time),
        last_updated_time: stack.last_updated_time().and_then(format_time),
        role_arn: stack.role_arn().map(str::to_string),
        outputs: stack
            .outputs()
            .iter()
            .map(|output| StackOutputValue {
                output_key: output.output_key().map(str::to_string),
                output_value: output.output_value().map(str::to_string),
                description: output.description().map(str::to_string),
            })
            .collect(),
        stack_name,
    })
}

/// Typed error for a rejected CreateStack, if the code has one.
fn create_stack_rejection(code: Option<&str>, stack_name: &str) -> Option<Error> {
    match code {
        Some(ALREADY_EXISTS_CODE) => Some(Error::StackAlreadyExists(stack_name.to_string())),
        _ => None,
    }
}

/// Typed error for a rejected DescribeStacks, if the code has one.
fn describe_stacks_rejection(code: Option<&str>, message: Option<&str>, stack_name: &str) -> Option<Error> {
    match (code, message) {
        (Some(VALIDATION_ERROR_CODE), Some(message)) if message.contains("does not exist") => {
            Some(Error::StackNotFound(stack_name.to_string()))
        }
        _ => None,
    }
}

#[async_trait]
impl StackControlPlane for CloudFormationControlPlane {
    async fn create_stack(&self, input: CreateStackInput) -> Result<Option<String>, Error> {
        let parameters = input
            .parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect::<Vec<_>>();

        let mut request = self
            .client
            .create_stack()
            .stack_name(&input.stack_name)
            .role_arn(&input.role_arn)
            .set_parameters(Some(parameters));
        request = match &input.template {
            TemplateSource::Body(body) => request.template_body(body),
            TemplateSource::Url(url) => request.template_url(url),
        };

        let output = match request.send().await {
            Ok(output) => output,
            Err(err) => {
                if let Some(rejection) = create_stack_rejection(err.code(), &input.stack_name) {
                    error!("Create-stack rejected: {}", rejection);
                    return Err(rejection);
                }
                return Err(Error::control_plane(Action::CreateStack, err));
            }
        };

        info!("Create requested: {:?}", output.stack_id());
        Ok(output.stack_id().map(str::to_string))
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<DescribeStacksPayload, Error> {
        let output = match self.client.describe_stacks().stack_name(stack_name).send().await {
            Ok(output) => output,
            Err(err) => {
                if let Some(rejection) = describe_stacks_rejection(err.code(), err.message(), stack_name) {
                    return Err(rejection);
                }
                return Err(Error::control_plane(Action::DescribeStacks, err));
            }
        };

        Ok(DescribeStacksPayload {
            stacks: output.stacks().iter().map(describe).collect::<Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudformation::types::{Output, StackStatus};

    #[test]
    fn describes_stack_in_native_shape() {
        let stack = Stack::builder()
            .stack_id("arn:aws:cloudformation:us-east-1:123456789012:stack/demo/1")
            .stack_name("demo")
            .stack_status(StackStatus::CreateInProgress)
            .creation_time(DateTime::from_secs(0))
            .role_arn("arn:aws:iam::123456789012:role/provision")
            .outputs(
                Output::builder()
                    .output_key("BucketName")
                    .output_value("demo-bucket")
                    .build(),
            )
            .build();

        let description = describe(&stack).unwrap();
        assert_eq!(description.stack_name, "demo");
        assert_eq!(description.stack_status, "CREATE_IN_PROGRESS");
        assert_eq!(description.creation_time.as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(description.last_updated_time, None);
        assert_eq!(description.outputs[0].output_value.as_deref(), Some("demo-bucket"));

        let payload = DescribeStacksPayload {
            stacks: vec![description],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["Stacks"][0]["StackStatus"], "CREATE_IN_PROGRESS");
        assert_eq!(value["Stacks"][0]["RoleARN"], "arn:aws:iam::123456789012:role/provision");
    }

    #[test]
    fn missing_status_is_an_error() {
        let stack = Stack::builder().stack_name("demo").build();

        assert!(matches!(describe(&stack), Err(Error::MissingStackStatus(name)) if name == "demo"));
    }

    #[test]
    fn maps_create_stack_rejections() {
        assert!(matches!(
            create_stack_rejection(Some("AlreadyExistsException"), "demo"),
            Some(Error::StackAlreadyExists(name)) if name == "demo"
        ));
        assert!(create_stack_rejection(Some("InsufficientCapabilitiesException"), "demo").is_none());
        assert!(create_stack_rejection(None, "demo").is_none());
    }

    #[test]
    fn maps_describe_stacks_rejections() {
        assert!(matches!(
            describe_stacks_rejection(Some("ValidationError"), Some("Stack with id demo does not exist"), "demo"),
            Some(Error::StackNotFound(name)) if name == "demo"
        ));
        assert!(describe_stacks_rejection(Some("ValidationError"), Some("1 validation error detected"), "demo").is_none());
        assert!(describe_stacks_rejection(Some("Throttling"), Some("Rate exceeded"), "demo").is_none());
    }
}
