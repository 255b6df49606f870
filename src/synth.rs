use std::process::ExitCode;

use serde_json::json;
use tracing::error;

use stack_provisioner::common::config::SynthConfig;
use stack_provisioner::common::errors::Error;
use stack_provisioner::common::utils::init_tracing;
use stack_provisioner::permissions::{trust_policy, Role, CLOUDFORMATION_SERVICE};
use stack_provisioner::workflow::DefinitionBuilder;

fn synth() -> Result<serde_json::Value, Error> {
    let config = SynthConfig::from_env()?;

    let definition = DefinitionBuilder::new(&config.submit_function_arn, &config.poll_function_arn)
        .timeout(config.workflow.timeout)
        .fail_on_unsuccessful(config.workflow.fail_on_unsuccessful)
        .build();
    definition.validate()?;

    let mut roles = serde_json::Map::new();
    for role in Role::ALL {
        let policy = role.policy(&config.role_arn, &config.state_machine_arn);
        policy.ensure_least_privilege(role.allowed_actions())?;
        roles.insert(role.name().to_string(), serde_json::to_value(policy)?);
    }

    let state_machine = serde_json::to_value(&definition)?;
    Ok(json!({
        "stateMachine": state_machine,
        "cloudformationTrustPolicy": trust_policy(CLOUDFORMATION_SERVICE),
        "rolePolicies": roles,
    }))
}

fn main() -> ExitCode {
    init_tracing();

    match synth().and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Synth failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
