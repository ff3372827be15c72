//! Task Orchestrator
//!
//! Drives one task: plans agents, runs them sequentially through the
//! pending -> running -> completed lifecycle, and emits every state change
//! into an event sink. The sink is a plain channel; transport (WebSocket
//! fan-out, persistence) is layered on by the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::data::BusinessDataset;
use crate::events::{AggregatedReport, TaskEvent};
use crate::llm::NarrativeClient;
use crate::types::{AppError, AppResult};

use super::{Agent, AgentStatus, ResultSynthesizer, TaskPlanner};

/// Progress is emitted in steps of 10 from 0 to 100 inclusive.
const PROGRESS_STEPS: u8 = 10;

/// Shared collaborators for running tasks.
#[derive(Clone)]
pub struct OrchestratorContext {
    pub dataset: Arc<BusinessDataset>,
    pub narrative: Arc<NarrativeClient>,
    pub events: mpsc::UnboundedSender<TaskEvent>,
    /// Delay between progress steps; zero disables waiting.
    pub step_delay: Duration,
}

pub struct TaskOrchestrator {
    ctx: OrchestratorContext,
    task_id: Uuid,
}

impl TaskOrchestrator {
    pub fn new(ctx: OrchestratorContext) -> Self {
        Self { ctx, task_id: Uuid::new_v4() }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Run a task to completion. Emits task-started, the full per-agent
    /// lifecycle, and exactly one terminal event. The error branch also
    /// returns the failure to the caller.
    pub async fn run(
        &self,
        request: &str,
        doc_context: Option<&str>,
    ) -> AppResult<AggregatedReport> {
        let mut agents: Vec<Agent> = TaskPlanner::plan(request)
            .into_iter()
            .map(Agent::new)
            .collect();

        tracing::info!(
            task_id = %self.task_id,
            agents = agents.len(),
            "Task started"
        );

        self.emit(TaskEvent::TaskStarted {
            task_id: self.task_id,
            agents: agents.clone(),
            request: request.to_string(),
        })?;

        for index in 0..agents.len() {
            if let Err(e) = self.run_agent(&mut agents[index], request, doc_context).await {
                agents[index].status = AgentStatus::Errored;
                // Best effort: the failure may be the closed channel itself.
                let _ = self.emit(TaskEvent::AgentUpdated {
                    task_id: self.task_id,
                    agent: agents[index].clone(),
                });
                let _ = self.emit(TaskEvent::TaskError {
                    task_id: self.task_id,
                    error: e.to_string(),
                });
                tracing::error!(task_id = %self.task_id, error = %e, "Task failed");
                return Err(e);
            }
        }

        let report = AggregatedReport::from_agents(&agents);
        self.emit(TaskEvent::TaskCompleted {
            task_id: self.task_id,
            result: report.clone(),
        })?;
        tracing::info!(task_id = %self.task_id, "Task completed");

        Ok(report)
    }

    async fn run_agent(
        &self,
        agent: &mut Agent,
        request: &str,
        doc_context: Option<&str>,
    ) -> AppResult<()> {
        agent.status = AgentStatus::Running;
        self.emit(TaskEvent::AgentUpdated {
            task_id: self.task_id,
            agent: agent.clone(),
        })?;

        for step in 0..=PROGRESS_STEPS {
            agent.progress = step * (100 / PROGRESS_STEPS);
            self.emit(TaskEvent::AgentProgress {
                task_id: self.task_id,
                agent_id: agent.id,
                progress: agent.progress,
            })?;
            if !self.ctx.step_delay.is_zero() {
                tokio::time::sleep(self.ctx.step_delay).await;
            }
        }

        let result = ResultSynthesizer::synthesize(
            agent.role,
            request,
            &self.ctx.dataset,
            &self.ctx.narrative,
            doc_context,
        )
        .await;

        agent.result = Some(result);
        agent.status = AgentStatus::Completed;
        agent.progress = 100;
        self.emit(TaskEvent::AgentUpdated {
            task_id: self.task_id,
            agent: agent.clone(),
        })?;

        Ok(())
    }

    fn emit(&self, event: TaskEvent) -> AppResult<()> {
        self.ctx
            .events
            .send(event)
            .map_err(|_| AppError::ChannelClosed("task event sink".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRole;
    use crate::llm::{Availability, NarrativeBackend};
    use async_trait::async_trait;

    struct StaticBackend;

    #[async_trait]
    impl NarrativeBackend for StaticBackend {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            Ok("generated narrative".to_string())
        }

        async fn check_availability(&self) -> Availability {
            Availability { available: true, models: vec![], error: None }
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            Ok(vec![])
        }
    }

    fn test_context() -> (OrchestratorContext, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = OrchestratorContext {
            dataset: Arc::new(BusinessDataset::default()),
            narrative: Arc::new(NarrativeClient::new(Box::new(StaticBackend))),
            events: tx,
            step_delay: Duration::ZERO,
        };
        (ctx, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TaskEvent>) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn emits_full_lifecycle_in_order() {
        let (ctx, mut rx) = test_context();
        let orchestrator = TaskOrchestrator::new(ctx);
        let report = orchestrator.run("hello there", None).await.unwrap();

        // Default plan: general-analyst + report-generator.
        assert_eq!(report.agents.len(), 2);

        let events = drain(&mut rx);
        let mut iter = events.iter();

        let TaskEvent::TaskStarted { task_id, agents, request } = iter.next().unwrap() else {
            panic!("first event must be task-started");
        };
        assert_eq!(*task_id, orchestrator.task_id());
        assert_eq!(request, "hello there");
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].role, AgentRole::GeneralAnalyst);
        assert!(agents.iter().all(|a| a.status == AgentStatus::Pending));

        for expected in [AgentRole::GeneralAnalyst, AgentRole::ReportGenerator] {
            let TaskEvent::AgentUpdated { agent, .. } = iter.next().unwrap() else {
                panic!("expected running agent-updated for {expected}");
            };
            assert_eq!(agent.role, expected);
            assert_eq!(agent.status, AgentStatus::Running);

            for step in 0..=10u8 {
                let TaskEvent::AgentProgress { agent_id, progress, .. } = iter.next().unwrap()
                else {
                    panic!("expected agent-progress at step {step}");
                };
                assert_eq!(*agent_id, agent.id);
                assert_eq!(*progress, step * 10);
            }

            let TaskEvent::AgentUpdated { agent: done, .. } = iter.next().unwrap() else {
                panic!("expected completed agent-updated for {expected}");
            };
            assert_eq!(done.status, AgentStatus::Completed);
            assert_eq!(done.progress, 100);
            assert!(done.result.is_some());
        }

        let last = iter.next().unwrap();
        assert!(matches!(last, TaskEvent::TaskCompleted { .. }));
        assert!(iter.next().is_none(), "exactly one terminal event");
    }

    #[tokio::test]
    async fn every_event_carries_the_task_id() {
        let (ctx, mut rx) = test_context();
        let orchestrator = TaskOrchestrator::new(ctx);
        orchestrator.run("summarize financial data", None).await.unwrap();

        for event in drain(&mut rx) {
            assert_eq!(event.task_id(), orchestrator.task_id());
        }
    }

    #[tokio::test]
    async fn closed_sink_fails_the_task() {
        let (ctx, rx) = test_context();
        drop(rx);
        let orchestrator = TaskOrchestrator::new(ctx);
        let err = orchestrator.run("hello", None).await.unwrap_err();
        assert!(matches!(err, AppError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn report_reflects_planned_agents() {
        let (ctx, mut rx) = test_context();
        let orchestrator = TaskOrchestrator::new(ctx);
        let report = orchestrator
            .run("Summarize the financial data with a chart", None)
            .await
            .unwrap();

        let roles: Vec<AgentRole> = report.agents.iter().map(|a| a.role).collect();
        assert_eq!(
            roles,
            vec![
                AgentRole::Summarizer,
                AgentRole::DataAnalyst,
                AgentRole::ChartGenerator,
                AgentRole::FinancialAnalyst,
                AgentRole::DataCollector,
            ]
        );
        assert!(report.agents.iter().all(|a| a.status == AgentStatus::Completed));
        assert!(report.agents.iter().all(|a| a.confidence > 0.0));
        drain(&mut rx);
    }
}
