use aws_config::BehaviorVersion;
use lambda_http::{run, service_fn, Error as LambdaError, Request as LambdaRequest};
use tracing::error;

use stack_provisioner::common::config::FrontDoorConfig;
use stack_provisioner::common::errors::Error;
use stack_provisioner::common::utils::init_tracing;
use stack_provisioner::control_plane::StepFunctionsStarter;
use stack_provisioner::handlers::process_request;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    init_tracing();

    let config = FrontDoorConfig::from_env()?;
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let starter = StepFunctionsStarter::new(aws_sdk_sfn::Client::new(&aws_config), config.state_machine_arn);

    let starter = &starter;
    run(service_fn(move |request: LambdaRequest| async move {
        let result = process_request(request, starter).await;

        match result {
            Ok(val) => Ok(val),
            Err(Error::HttpError(val)) => Ok(val),
            Err(err) => {
                error!("Failed to start execution: {}", err);
                Err(LambdaError::from(err))
            }
        }
    }))
    .await
}
