//! Wire-level event contract shared by the orchestrator and the WebSocket
//! layer. Server events are internally tagged by `event`; payload fields are
//! camelCase to match the browser client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::synthesizer::DEFAULT_CONFIDENCE;
use crate::agents::{Agent, AgentRole, AgentStatus, RoleResult};

/// Event emitted by a running task. Every event names its task; within one
/// task the emission order is the observable contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TaskEvent {
    TaskStarted {
        task_id: Uuid,
        agents: Vec<Agent>,
        request: String,
    },
    AgentUpdated {
        task_id: Uuid,
        agent: Agent,
    },
    AgentProgress {
        task_id: Uuid,
        agent_id: Uuid,
        progress: u8,
    },
    TaskCompleted {
        task_id: Uuid,
        result: AggregatedReport,
    },
    TaskError {
        task_id: Uuid,
        error: String,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> Uuid {
        match self {
            TaskEvent::TaskStarted { task_id, .. }
            | TaskEvent::AgentUpdated { task_id, .. }
            | TaskEvent::AgentProgress { task_id, .. }
            | TaskEvent::TaskCompleted { task_id, .. }
            | TaskEvent::TaskError { task_id, .. } => *task_id,
        }
    }

    /// Whether this event ends its task's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::TaskCompleted { .. } | TaskEvent::TaskError { .. })
    }
}

/// Messages a connected client may send over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    SubmitTask {
        request: String,
        #[serde(default)]
        chat_id: Option<Uuid>,
    },
}

/// Final aggregation of all agent results for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedReport {
    pub summary: String,
    pub key_insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<RoleResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_report: Option<RoleResult>,
    pub agents: Vec<AgentSummary>,
    pub completed_at: DateTime<Utc>,
}

/// Compact per-agent projection carried inside the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: Uuid,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub confidence: f64,
}

impl AggregatedReport {
    /// Build the final report from the completed agent list. Designated roles
    /// contribute designated fields; agents without a result contribute the
    /// default confidence.
    pub fn from_agents(agents: &[Agent]) -> Self {
        let find = |role: AgentRole| {
            agents
                .iter()
                .find(|a| a.role == role)
                .and_then(|a| a.result.clone())
        };

        let summary = match find(AgentRole::Summarizer) {
            Some(RoleResult::Summarizer { summary, .. }) => summary,
            _ => "Analysis completed successfully".to_string(),
        };

        let key_insights = match find(AgentRole::FinancialAnalyst) {
            Some(RoleResult::FinancialAnalyst { insights, .. }) => insights,
            _ => Vec::new(),
        };

        AggregatedReport {
            summary,
            key_insights,
            chart_data: find(AgentRole::ChartGenerator),
            detailed_report: find(AgentRole::ReportGenerator),
            agents: agents
                .iter()
                .map(|a| AgentSummary {
                    id: a.id,
                    role: a.role,
                    status: a.status,
                    confidence: a
                        .result
                        .as_ref()
                        .map(RoleResult::confidence)
                        .unwrap_or(DEFAULT_CONFIDENCE),
                })
                .collect(),
            completed_at: Utc::now(),
        }
    }
}
