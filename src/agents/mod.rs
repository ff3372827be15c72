//! Agent System
//!
//! This module contains the task-processing pipeline that powers the
//! business analysis assistant:
//!
//! - **Task Planner**: maps a free-text request to an ordered list of agent roles
//! - **Result Synthesizer**: merges structured datasets with generated narrative
//! - **Task Orchestrator**: drives each agent through its lifecycle and
//!   aggregates the final report
//!
//! ## Pipeline Overview
//!
//! ```text
//! User Request
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Planner   │  → Resolves agent roles
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Orchestrator│  → Runs agents sequentially, emits progress events
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Synthesizer │  → Structured data + narrative per role
//! └─────────────┘
//!      │
//!      ▼
//!  Aggregated Report
//! ```

pub mod orchestrator;
pub mod planner;
pub mod synthesizer;

// Re-export main components
pub use orchestrator::{OrchestratorContext, TaskOrchestrator};
pub use planner::TaskPlanner;
pub use synthesizer::{ResultSynthesizer, RoleResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed set of agent kinds a task can be planned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    DataCollector,
    FinancialAnalyst,
    DataAnalyst,
    Summarizer,
    ChartGenerator,
    ReportGenerator,
    GeneralAnalyst,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::DataCollector => "data-collector",
            AgentRole::FinancialAnalyst => "financial-analyst",
            AgentRole::DataAnalyst => "data-analyst",
            AgentRole::Summarizer => "summarizer",
            AgentRole::ChartGenerator => "chart-generator",
            AgentRole::ReportGenerator => "report-generator",
            AgentRole::GeneralAnalyst => "general-analyst",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-agent lifecycle. Errored is terminal and only reached when the
/// orchestration itself fails while this agent is running; a narrative
/// backend failure degrades the result instead of erroring the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Errored,
}

/// One planned unit of work within a task. Mutated only by the orchestrator
/// driving that task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RoleResult>,
}

impl Agent {
    pub fn new(role: AgentRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            status: AgentStatus::Pending,
            progress: 0,
            result: None,
        }
    }
}
