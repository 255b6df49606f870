use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error as LambdaError, LambdaEvent};

use stack_provisioner::common::utils::init_tracing;
use stack_provisioner::common::PollState;
use stack_provisioner::control_plane::CloudFormationControlPlane;
use stack_provisioner::handlers::get_create_stack_status;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    init_tracing();

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let control_plane = CloudFormationControlPlane::new(aws_sdk_cloudformation::Client::new(&aws_config));

    let control_plane = &control_plane;
    run(service_fn(move |event: LambdaEvent<PollState>| async move {
        get_create_stack_status(control_plane, event.payload)
            .await
            .map_err(LambdaError::from)
    }))
    .await
}
