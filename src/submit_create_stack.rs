use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error as LambdaError, LambdaEvent};

use stack_provisioner::common::config::SubmitConfig;
use stack_provisioner::common::utils::init_tracing;
use stack_provisioner::common::StackRequest;
use stack_provisioner::control_plane::CloudFormationControlPlane;
use stack_provisioner::handlers::submit_create_stack;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    init_tracing();

    let config = SubmitConfig::from_env()?;
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let control_plane = CloudFormationControlPlane::new(aws_sdk_cloudformation::Client::new(&aws_config));

    let control_plane = &control_plane;
    let config = &config;
    run(service_fn(move |event: LambdaEvent<StackRequest>| async move {
        submit_create_stack(control_plane, config, event.payload)
            .await
            .map_err(LambdaError::from)
    }))
    .await
}
