//! Progress events emitted by the extraction orchestrator.
//!
//! Events are transient: they exist for one extraction run and are only
//! persisted insofar as they are relayed over the streaming channel.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// One state of the extraction run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Initialize,
    BasicInfo,
    Skills,
    Experience,
    Education,
    ProjectsCerts,
    Finalize,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Initialize => "initialize",
            Step::BasicInfo => "basic_info",
            Step::Skills => "skills",
            Step::Experience => "experience",
            Step::Education => "education",
            Step::ProjectsCerts => "projects_certs",
            Step::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Starting,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl ProgressEvent {
    fn new(step: Step, status: StepStatus, data: Option<Value>, error: Option<String>) -> Self {
        Self {
            step,
            status,
            data,
            error,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }

    pub fn starting(step: Step) -> Self {
        Self::new(step, StepStatus::Starting, None, None)
    }

    /// Informational update; never a state change.
    pub fn processing(step: Step, message: &str) -> Self {
        Self::new(
            step,
            StepStatus::Processing,
            Some(json!({ "message": message })),
            None,
        )
    }

    pub fn completed(step: Step, data: Option<Value>) -> Self {
        Self::new(step, StepStatus::Completed, data, None)
    }

    pub fn error(step: Step, message: String) -> Self {
        Self::new(step, StepStatus::Error, None, Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serializes_snake_case() {
        let json = serde_json::to_value(Step::ProjectsCerts).unwrap();
        assert_eq!(json, "projects_certs");
        assert_eq!(Step::BasicInfo.as_str(), "basic_info");
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::error(Step::Skills, "Query timed out".to_string());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["step"], "skills");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "Query timed out");
        assert!(json.get("data").is_none());
        assert!(json["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_processing_event_carries_message() {
        let event = ProgressEvent::processing(Step::BasicInfo, "Querying model");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["message"], "Querying model");
        assert!(json.get("error").is_none());
    }
}
