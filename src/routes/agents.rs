//! Static catalog of the agent roles the planner can schedule.

use axum::{routing::get, Json, Router};

use crate::models::AgentDescriptor;

const CATALOG: &[AgentDescriptor] = &[
    AgentDescriptor {
        id: "data-collector",
        name: "Data Collector",
        description: "Gathers and processes raw data from various sources",
        capabilities: &["data extraction", "data cleaning", "source validation"],
    },
    AgentDescriptor {
        id: "financial-analyst",
        name: "Financial Analyst",
        description: "Analyzes financial data and identifies trends",
        capabilities: &["trend analysis", "financial modeling", "risk assessment"],
    },
    AgentDescriptor {
        id: "data-analyst",
        name: "Data Analyst",
        description: "Performs statistical analysis and identifies patterns",
        capabilities: &["statistical analysis", "pattern recognition", "data visualization"],
    },
    AgentDescriptor {
        id: "summarizer",
        name: "Summarizer",
        description: "Creates concise summaries of complex information",
        capabilities: &["text summarization", "key point extraction", "content synthesis"],
    },
    AgentDescriptor {
        id: "chart-generator",
        name: "Chart Generator",
        description: "Creates visualizations and charts from data",
        capabilities: &["chart creation", "data visualization", "graph design"],
    },
    AgentDescriptor {
        id: "report-generator",
        name: "Report Generator",
        description: "Generates structured reports and documentation",
        capabilities: &["report writing", "document formatting", "content organization"],
    },
    AgentDescriptor {
        id: "general-analyst",
        name: "General Analyst",
        description: "Handles general analysis tasks",
        capabilities: &["comprehensive analysis", "research", "recommendations"],
    },
];

pub fn router() -> Router {
    Router::new().route("/api/agents", get(list_agents))
}

async fn list_agents() -> Json<&'static [AgentDescriptor]> {
    Json(CATALOG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRole;

    #[test]
    fn catalog_covers_every_plannable_role() {
        let roles = [
            AgentRole::DataCollector,
            AgentRole::FinancialAnalyst,
            AgentRole::DataAnalyst,
            AgentRole::Summarizer,
            AgentRole::ChartGenerator,
            AgentRole::ReportGenerator,
            AgentRole::GeneralAnalyst,
        ];
        for role in roles {
            assert!(
                CATALOG.iter().any(|d| d.id == role.as_str()),
                "missing catalog entry for {role}"
            );
        }
        assert_eq!(CATALOG.len(), roles.len());
    }
}
