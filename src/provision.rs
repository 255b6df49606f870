use std::fs;
use std::process::ExitCode;

use aws_config::BehaviorVersion;
use tracing::{error, info};

use stack_provisioner::common::config::{SubmitConfig, WorkflowConfig};
use stack_provisioner::common::errors::Error;
use stack_provisioner::common::utils::init_tracing;
use stack_provisioner::common::StackRequest;
use stack_provisioner::control_plane::CloudFormationControlPlane;
use stack_provisioner::workflow::Workflow;

async fn provision(request_path: &str) -> Result<(), Error> {
    let body = fs::read_to_string(request_path)
        .map_err(|err| Error::InvalidRequest(format!("cannot read {}: {}", request_path, err)))?;
    let request: StackRequest = serde_json::from_str(&body)?;

    let submit = SubmitConfig::from_env()?;
    let config = WorkflowConfig::from_env()?;
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let control_plane = CloudFormationControlPlane::new(aws_sdk_cloudformation::Client::new(&aws_config));

    let final_status = Workflow::new(&control_plane, submit, config).run(request).await?;
    info!("Finished with {:?}", final_status.outcome);
    println!("{}", serde_json::to_string_pretty(&final_status.payload)?);

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let Some(request_path) = std::env::args().nth(1) else {
        eprintln!("Usage: provision <path_to_stack_request.json>");
        return ExitCode::from(2);
    };

    match provision(&request_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Provisioning failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
