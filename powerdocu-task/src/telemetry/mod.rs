//! Failure telemetry.
//!
//! When a run fails, one reliability record is handed to the agent. Newer
//! agents (2.120 and later) accept `telemetry.publish` commands carrying a
//! JSON payload; older ones only understand issues, so the record is
//! downgraded to a `task.logissue` line.
//!
//! Reporting is best effort. A reporter may fail, but the pipeline never lets
//! that failure change the outcome of the run.

use crate::config::AgentContext;
use crate::errors::TaskError;
use crate::host::{escape_data, escape_property, TaskHost};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Telemetry area the records are filed under.
pub const TELEMETRY_AREA: &str = "PowerDocu";

/// Feature name of failure records.
pub const RELIABILITY_FEATURE: &str = "reliability";

/// Oldest agent version that accepts `telemetry.publish`.
pub const MIN_PUBLISH_AGENT_VERSION: (u32, u32) = (2, 120);

/// One failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Issue category, `error` for failed runs.
    pub issue_type: String,
    /// Serialized description of the failure.
    pub error_message: String,
}

impl TelemetryRecord {
    /// Creates a record for a failed run.
    #[must_use]
    pub fn error(err: &TaskError) -> Self {
        let error_message =
            serde_json::to_string(&err.to_dict()).unwrap_or_else(|_| err.to_string());
        Self {
            issue_type: "error".to_string(),
            error_message,
        }
    }
}

/// Properties attached to every published record.
#[must_use]
pub fn default_properties(agent: &AgentContext, task_version: &str) -> Map<String, Value> {
    let var = |name: &str| agent.variable(name).unwrap_or_default().to_string();

    let host_type = var("System.HostType").to_lowercase();
    let is_release = host_type == "release";

    let definition_name = if is_release {
        var("Release.DefinitionName")
    } else {
        var("Build.DefinitionName")
    };
    let process_id = if is_release {
        var("Release.ReleaseId")
    } else {
        var("Build.BuildId")
    };
    let process_url = if is_release {
        var("Release.ReleaseWebUrl")
    } else {
        format!(
            "{}{}/_build?buildId={}",
            var("System.TeamFoundationServerUri"),
            var("System.TeamProject"),
            var("Build.BuildId")
        )
    };

    let mut props = Map::new();
    props.insert("hostType".into(), Value::String(host_type));
    props.insert(
        "definitionName".into(),
        Value::String(format!("[NonEmail:{definition_name}]")),
    );
    props.insert("processId".into(), Value::String(process_id));
    props.insert("processUrl".into(), Value::String(process_url));
    props.insert("taskDisplayName".into(), Value::String(var("Task.DisplayName")));
    props.insert("jobid".into(), Value::String(var("System.JobId")));
    props.insert("agentVersion".into(), Value::String(var("Agent.Version")));
    props.insert("agentOS".into(), Value::String(var("Agent.OS")));
    props.insert("agentName".into(), Value::String(var("Agent.Name")));
    props.insert("version".into(), Value::String(task_version.to_string()));
    props
}

/// Sends failure records somewhere.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetryReporter: Send + Sync {
    /// Reports one record.
    fn report(&self, record: &TelemetryRecord) -> Result<(), TaskError>;
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTelemetry;

impl TelemetryReporter for NoOpTelemetry {
    fn report(&self, _record: &TelemetryRecord) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Reports records as agent logging commands.
pub struct VsoTelemetryReporter {
    host: Arc<dyn TaskHost>,
    agent: AgentContext,
    task_version: String,
}

impl VsoTelemetryReporter {
    /// Creates a reporter writing through `host`.
    pub fn new(host: Arc<dyn TaskHost>, agent: AgentContext, task_version: impl Into<String>) -> Self {
        Self {
            host,
            agent,
            task_version: task_version.into(),
        }
    }

    /// Whether the agent accepts `telemetry.publish`.
    #[must_use]
    pub fn supports_publish(&self) -> bool {
        self.agent.agent_version_parts() >= MIN_PUBLISH_AGENT_VERSION
    }

    /// Renders the logging command for `record`.
    pub fn format_command(&self, record: &TelemetryRecord) -> Result<String, TaskError> {
        if self.supports_publish() {
            let mut payload = default_properties(&self.agent, &self.task_version);
            match serde_json::to_value(record)? {
                Value::Object(fields) => payload.extend(fields),
                other => {
                    return Err(TaskError::Telemetry(format!(
                        "record serialized to {other} instead of an object"
                    )))
                }
            }
            let json = serde_json::to_string(&Value::Object(payload))?;

            Ok(format!(
                "##vso[telemetry.publish area={TELEMETRY_AREA};feature={RELIABILITY_FEATURE}]{}",
                escape_data(&json)
            ))
        } else {
            let task_id = format!(
                "{TELEMETRY_AREA}-{}",
                serde_json::to_string(&self.task_version)?
            );
            Ok(format!(
                "##vso[task.logissue type=error;code={};agentVersion={};taskId={};]{}",
                escape_property(&record.issue_type),
                escape_property(self.agent.agent_version().unwrap_or_default()),
                escape_property(&task_id),
                escape_data(&record.error_message)
            ))
        }
    }
}

impl std::fmt::Debug for VsoTelemetryReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VsoTelemetryReporter")
            .field("agent", &self.agent)
            .field("task_version", &self.task_version)
            .finish_non_exhaustive()
    }
}

impl TelemetryReporter for VsoTelemetryReporter {
    fn report(&self, record: &TelemetryRecord) -> Result<(), TaskError> {
        let command = self.format_command(record)?;
        tracing::debug!(issue_type = %record.issue_type, "Publishing telemetry");
        self.host.emit_command(&command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExecutionError;
    use crate::testing::CollectingHost;
    use pretty_assertions::assert_eq;

    fn build_agent(version: &str) -> AgentContext {
        AgentContext::default()
            .with_variable("Agent.Version", version)
            .with_variable("System.HostType", "Build")
            .with_variable("Build.DefinitionName", "docs-ci")
            .with_variable("Build.BuildId", "42")
            .with_variable("System.TeamFoundationServerUri", "https://dev.azure.com/org/")
            .with_variable("System.TeamProject", "Flows")
            .with_variable("System.JobId", "job-1")
    }

    fn record() -> TelemetryRecord {
        TelemetryRecord::error(&ExecutionError::NonZeroExit { code: 2 }.into())
    }

    #[test]
    fn test_record_carries_serialized_error() {
        let record = record();
        assert_eq!(record.issue_type, "error");

        let message: Value = serde_json::from_str(&record.error_message).unwrap();
        assert_eq!(message["kind"], "ExecutionError");
        assert_eq!(message["exitCode"], 2);
    }

    #[test]
    fn test_default_properties_for_build() {
        let props = default_properties(&build_agent("3.220.0"), "1.0.0");

        assert_eq!(props["hostType"], "build");
        assert_eq!(props["definitionName"], "[NonEmail:docs-ci]");
        assert_eq!(props["processId"], "42");
        assert_eq!(
            props["processUrl"],
            "https://dev.azure.com/org/Flows/_build?buildId=42"
        );
        assert_eq!(props["version"], "1.0.0");
    }

    #[test]
    fn test_default_properties_for_release() {
        let agent = AgentContext::default()
            .with_variable("System.HostType", "release")
            .with_variable("Release.DefinitionName", "docs-cd")
            .with_variable("Release.ReleaseId", "7")
            .with_variable("Release.ReleaseWebUrl", "https://dev.azure.com/org/_release?releaseId=7");

        let props = default_properties(&agent, "1.0.0");
        assert_eq!(props["definitionName"], "[NonEmail:docs-cd]");
        assert_eq!(props["processId"], "7");
        assert_eq!(
            props["processUrl"],
            "https://dev.azure.com/org/_release?releaseId=7"
        );
    }

    #[test]
    fn test_modern_agent_publishes() {
        let host = Arc::new(CollectingHost::new());
        let reporter = VsoTelemetryReporter::new(host.clone(), build_agent("2.120.1"), "1.0.0");

        reporter.report(&record()).unwrap();

        let commands = host.commands();
        assert_eq!(commands.len(), 1);
        let prefix = "##vso[telemetry.publish area=PowerDocu;feature=reliability]";
        assert!(commands[0].starts_with(prefix));

        let payload: Value = serde_json::from_str(&commands[0][prefix.len()..]).unwrap();
        assert_eq!(payload["issueType"], "error");
        assert_eq!(payload["jobid"], "job-1");
        assert!(payload["errorMessage"].as_str().unwrap().contains("exitCode"));
    }

    #[test]
    fn test_old_agent_logs_issue() {
        let host = Arc::new(CollectingHost::new());
        let reporter = VsoTelemetryReporter::new(host.clone(), build_agent("2.119.9"), "1.0.0");
        assert!(!reporter.supports_publish());

        reporter.report(&record()).unwrap();

        let commands = host.commands();
        assert!(commands[0].starts_with(
            "##vso[task.logissue type=error;code=error;agentVersion=2.119.9;taskId=PowerDocu-\"1.0.0\";]"
        ));
    }

    #[test]
    fn test_missing_agent_version_is_old_agent() {
        let reporter = VsoTelemetryReporter::new(
            Arc::new(CollectingHost::new()),
            AgentContext::default(),
            "1.0.0",
        );
        assert!(!reporter.supports_publish());
    }
}
