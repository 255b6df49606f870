use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::common::config::{SubmitConfig, WorkflowConfig};
use crate::common::errors::Error;
use crate::common::StackRequest;
use crate::control_plane::StackControlPlane;
use crate::handlers::{get_create_stack_status, submit_create_stack};
use crate::workflow::machine::{FinalStatus, Phase};

/// Runs Submit -> Wait -> Poll -> Decide in-process, against one control plane.
pub struct Workflow<'a, C: ?Sized> {
    control_plane: &'a C,
    submit: SubmitConfig,
    config: WorkflowConfig,
}

impl<'a, C> Workflow<'a, C>
where
    C: StackControlPlane + ?Sized,
{
    pub fn new(control_plane: &'a C, submit: SubmitConfig, config: WorkflowConfig) -> Self {
        Self {
            control_plane,
            submit,
            config,
        }
    }

    pub async fn run(&self, request: StackRequest) -> Result<FinalStatus, Error> {
        let ceiling = self.config.timeout;
        let final_status = match timeout(ceiling, self.drive(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Workflow exceeded its {}s ceiling", ceiling.as_secs());
                return Err(Error::Timeout(ceiling));
            }
        };

        if !final_status.is_success() {
            warn!(
                "Stack {} left the loop with {} ({:?})",
                final_status.payload.state.stack_name,
                final_status.status(),
                final_status.outcome
            );
            if self.config.fail_on_unsuccessful {
                return final_status.into_result();
            }
        }

        Ok(final_status)
    }

    async fn drive(&self, request: StackRequest) -> Result<FinalStatus, Error> {
        let mut state = submit_create_stack(self.control_plane, &self.submit, request).await?;
        let mut polls = 0u32;

        loop {
            sleep(Duration::from_secs(state.wait_seconds)).await;

            let output = get_create_stack_status(self.control_plane, state).await?;
            polls += 1;
            match Phase::advance(output)? {
                Phase::Polling(next) => state = next,
                Phase::Done(final_status) => {
                    info!("Stack finished with {} after {} polls", final_status.status(), polls);
                    return Ok(final_status);
                }
            }
        }
    }
}
