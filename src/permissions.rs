//! IAM policy documents for every role the workflow uses.
//!
//! Each role is granted exactly the action it exists for. `PassRole` is only
//! ever granted on the CloudFormation service role and only towards the
//! CloudFormation service principal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::common::errors::Error;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const CLOUDFORMATION_SERVICE: &str = "cloudformation.amazonaws.com";
pub const PASSED_TO_SERVICE_KEY: &str = "iam:PassedToService";
const ANY_RESOURCE: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    CreateStack,
    DescribeStacks,
    PassRole,
    StartExecution,
    CreateBucket,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateStack => "cloudformation:CreateStack",
            Action::DescribeStacks => "cloudformation:DescribeStacks",
            Action::PassRole => "iam:PassRole",
            Action::StartExecution => "states:StartExecution",
            Action::CreateBucket => "s3:CreateBucket",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

/// operator -> condition key -> value
pub type Condition = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    pub action: Vec<Action>,
    pub resource: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PolicyStatement {
    pub fn allow(action: Action, resource: impl Into<String>) -> Self {
        Self {
            effect: Effect::Allow,
            action: vec![action],
            resource: vec![resource.into()],
            condition: None,
        }
    }

    pub fn with_condition(mut self, operator: &str, key: &str, value: &str) -> Self {
        self.condition
            .get_or_insert_with(BTreeMap::new)
            .entry(operator.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    fn restricts_passed_to_service(&self) -> bool {
        self.condition
            .as_ref()
            .map(|condition| {
                condition
                    .values()
                    .any(|keys| keys.contains_key(PASSED_TO_SERVICE_KEY))
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statement,
        }
    }

    pub fn actions(&self) -> BTreeSet<Action> {
        self.statement
            .iter()
            .flat_map(|statement| statement.action.iter().copied())
            .collect()
    }

    /// Fails if the document grants anything outside `allowed`, or passes a
    /// role without naming the service it may be passed to.
    pub fn ensure_least_privilege(&self, allowed: &[Action]) -> Result<(), Error> {
        for statement in &self.statement {
            if statement.action.len() != 1 {
                return Err(Error::PolicyViolation(format!(
                    "statement grants {} actions, expected exactly one",
                    statement.action.len()
                )));
            }
            for action in &statement.action {
                if !allowed.contains(action) {
                    return Err(Error::PolicyViolation(format!("{} is not allowed", action)));
                }
                if *action == Action::PassRole {
                    if statement.resource.iter().any(|r| r == ANY_RESOURCE) {
                        return Err(Error::PolicyViolation(
                            "iam:PassRole must name the role it passes".into(),
                        ));
                    }
                    if !statement.restricts_passed_to_service() {
                        return Err(Error::PolicyViolation(format!(
                            "iam:PassRole without a {} condition",
                            PASSED_TO_SERVICE_KEY
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Trust policy letting `service` assume a role.
pub fn trust_policy(service: &str) -> serde_json::Value {
    serde_json::json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole",
        }],
    })
}

/// Permissions CloudFormation itself receives while creating the stack.
pub fn cloudformation_service_policy() -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement::allow(Action::CreateBucket, ANY_RESOURCE)])
}

pub fn submit_policy(cloudformation_role_arn: &str) -> PolicyDocument {
    PolicyDocument::new(vec![
        PolicyStatement::allow(Action::CreateStack, ANY_RESOURCE),
        PolicyStatement::allow(Action::PassRole, cloudformation_role_arn).with_condition(
            "StringEqualsIfExists",
            PASSED_TO_SERVICE_KEY,
            CLOUDFORMATION_SERVICE,
        ),
    ])
}

pub fn poll_policy() -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement::allow(Action::DescribeStacks, ANY_RESOURCE)])
}

pub fn start_execution_policy(state_machine_arn: &str) -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement::allow(Action::StartExecution, state_machine_arn)])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    CloudFormationService,
    Submit,
    Poll,
    FrontDoor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::CloudFormationService, Role::Submit, Role::Poll, Role::FrontDoor];

    pub fn name(&self) -> &'static str {
        match self {
            Role::CloudFormationService => "cloudformationServiceRole",
            Role::Submit => "submitCreateStackRole",
            Role::Poll => "getCreateStackStatusRole",
            Role::FrontDoor => "sfnStartExecutionRole",
        }
    }

    pub fn allowed_actions(&self) -> &'static [Action] {
        match self {
            Role::CloudFormationService => &[Action::CreateBucket],
            Role::Submit => &[Action::CreateStack, Action::PassRole],
            Role::Poll => &[Action::DescribeStacks],
            Role::FrontDoor => &[Action::StartExecution],
        }
    }

    pub fn policy(&self, cloudformation_role_arn: &str, state_machine_arn: &str) -> PolicyDocument {
        match self {
            Role::CloudFormationService => cloudformation_service_policy(),
            Role::Submit => submit_policy(cloudformation_role_arn),
            Role::Poll => poll_policy(),
            Role::FrontDoor => start_execution_policy(state_machine_arn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/provision";
    const STATE_MACHINE_ARN: &str = "arn:aws:states:us-east-1:123456789012:stateMachine:provision";

    #[test]
    fn every_role_is_least_privilege() {
        for role in Role::ALL {
            let policy = role.policy(ROLE_ARN, STATE_MACHINE_ARN);
            policy.ensure_least_privilege(role.allowed_actions()).unwrap();
            assert_eq!(
                policy.actions(),
                role.allowed_actions().iter().copied().collect::<BTreeSet<_>>(),
                "{}",
                role.name()
            );
        }
    }

    #[test]
    fn broadened_policy_is_rejected() {
        let mut policy = poll_policy();
        policy
            .statement
            .push(PolicyStatement::allow(Action::CreateStack, ANY_RESOURCE));

        assert!(matches!(
            policy.ensure_least_privilege(Role::Poll.allowed_actions()),
            Err(Error::PolicyViolation(_))
        ));
    }

    #[test]
    fn multi_action_statement_is_rejected() {
        let mut statement = PolicyStatement::allow(Action::CreateStack, ANY_RESOURCE);
        statement.action.push(Action::PassRole);
        let policy = PolicyDocument::new(vec![statement]);

        assert!(policy
            .ensure_least_privilege(Role::Submit.allowed_actions())
            .is_err());
    }

    #[test]
    fn pass_role_needs_scoped_resource_and_condition() {
        let unconditioned = PolicyDocument::new(vec![PolicyStatement::allow(Action::PassRole, ROLE_ARN)]);
        assert!(unconditioned
            .ensure_least_privilege(Role::Submit.allowed_actions())
            .is_err());

        let wildcard = PolicyDocument::new(vec![PolicyStatement::allow(Action::PassRole, ANY_RESOURCE)
            .with_condition("StringEquals", PASSED_TO_SERVICE_KEY, CLOUDFORMATION_SERVICE)]);
        assert!(wildcard
            .ensure_least_privilege(Role::Submit.allowed_actions())
            .is_err());
    }

    #[test]
    fn submit_policy_renders_iam_json() {
        let value = serde_json::to_value(submit_policy(ROLE_ARN)).unwrap();

        assert_eq!(value["Version"], POLICY_VERSION);
        assert_eq!(value["Statement"][0]["Action"][0], "cloudformation:CreateStack");
        assert!(value["Statement"][0].get("Condition").is_none());
        assert_eq!(value["Statement"][1]["Effect"], "Allow");
        assert_eq!(value["Statement"][1]["Resource"][0], ROLE_ARN);
        assert_eq!(
            value["Statement"][1]["Condition"]["StringEqualsIfExists"][PASSED_TO_SERVICE_KEY],
            CLOUDFORMATION_SERVICE
        );
    }

    #[test]
    fn front_door_is_scoped_to_one_state_machine() {
        let policy = start_execution_policy(STATE_MACHINE_ARN);
        assert_eq!(policy.statement[0].resource, vec![STATE_MACHINE_ARN.to_string()]);
    }
}
