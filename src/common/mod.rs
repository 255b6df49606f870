pub mod config;
pub mod errors;
pub mod utils;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::errors::Error;

/// Status the control plane reports while a stack is still being created.
pub const CREATE_IN_PROGRESS: &str = "CREATE_IN_PROGRESS";
pub const CREATE_COMPLETE: &str = "CREATE_COMPLETE";

pub const WAIT_SECONDS_DEFAULT: u64 = 30;
pub const WORKFLOW_TIMEOUT_SECONDS_DEFAULT: u64 = 30 * 60;

const STACK_NAME_MAX_LEN: usize = 128;

// The provisioning role may only create buckets, so the fallback template does exactly that.
pub const DEFAULT_TEMPLATE_BODY: &str = r#"{
  "AWSTemplateFormatVersion": "2010-09-09",
  "Resources": {
    "Bucket": {
      "Type": "AWS::S3::Bucket"
    }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Body(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackRequest {
    pub stack_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

impl StackRequest {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template_body: None,
            template_url: None,
            parameters: BTreeMap::new(),
            role_arn: None,
        }
    }

    /// Checks everything that can be checked without calling the control plane.
    pub fn validate(&self) -> Result<(), Error> {
        validate_stack_name(&self.stack_name)?;
        self.template()?;
        Ok(())
    }

    pub fn template(&self) -> Result<TemplateSource, Error> {
        match (&self.template_body, &self.template_url) {
            (Some(_), Some(_)) => Err(Error::InvalidRequest(
                "templateBody and templateUrl are mutually exclusive".into(),
            )),
            (Some(body), None) => Ok(TemplateSource::Body(body.clone())),
            (None, Some(url)) => Ok(TemplateSource::Url(url.clone())),
            (None, None) => Ok(TemplateSource::Body(DEFAULT_TEMPLATE_BODY.into())),
        }
    }
}

pub fn validate_stack_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic()
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
                && name.len() <= STACK_NAME_MAX_LEN
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!("invalid stack name: {:?}", name)))
    }
}

fn default_wait_seconds() -> u64 {
    WAIT_SECONDS_DEFAULT
}

/// State carried between the Wait and Poll steps of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollState {
    pub stack_name: String,
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackOutputValue {
    pub output_key: Option<String>,
    pub output_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    #[serde(default)]
    pub stack_name: String,
    pub stack_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<String>,
    #[serde(default, rename = "RoleARN", skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<StackOutputValue>,
}

/// The describe-stacks response shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeStacksPayload {
    pub stacks: Vec<StackDescription>,
}

impl DescribeStacksPayload {
    /// `Stacks[0].StackStatus`
    pub fn status(&self) -> Option<&str> {
        self.stacks.first().map(|stack| stack.stack_status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutput {
    #[serde(flatten)]
    pub state: PollState,
    #[serde(flatten)]
    pub describe: DescribeStacksPayload,
}

impl PollOutput {
    pub fn status(&self) -> Option<&str> {
        self.describe.status()
    }
}
