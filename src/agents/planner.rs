//! Task Planner
//!
//! Pure keyword-based mapping from a request to an ordered list of agent
//! roles. Runs no I/O and always yields at least one role.

use super::AgentRole;

pub struct TaskPlanner;

impl TaskPlanner {
    /// Resolve the agent roles for a request. Keyword families are tested in
    /// a fixed priority order; roles are de-duplicated preserving first-seen
    /// order. A request with no recognized keywords (including empty input)
    /// plans the default pair.
    pub fn plan(request: &str) -> Vec<AgentRole> {
        let lower = request.to_lowercase();
        let mut roles: Vec<AgentRole> = Vec::new();

        let mut push = |role: AgentRole, roles: &mut Vec<AgentRole>| {
            if !roles.contains(&role) {
                roles.push(role);
            }
        };

        if lower.contains("summarize") || lower.contains("summary") {
            push(AgentRole::Summarizer, &mut roles);
        }

        if lower.contains("chart") || lower.contains("graph") || lower.contains("visualize") {
            push(AgentRole::DataAnalyst, &mut roles);
            push(AgentRole::ChartGenerator, &mut roles);
        }

        if lower.contains("financial") || lower.contains("quarter") || lower.contains("trend") {
            push(AgentRole::FinancialAnalyst, &mut roles);
        }

        if lower.contains("data") || lower.contains("report") {
            push(AgentRole::DataCollector, &mut roles);
        }

        if roles.is_empty() {
            roles.push(AgentRole::GeneralAnalyst);
            roles.push(AgentRole::ReportGenerator);
        }

        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn plan_matches_keyword_families_in_order() {
        assert_eq!(
            TaskPlanner::plan("Summarize the last 3 quarters' financial trends and create a chart"),
            vec![
                AgentRole::Summarizer,
                AgentRole::DataAnalyst,
                AgentRole::ChartGenerator,
                AgentRole::FinancialAnalyst,
            ]
        );
    }

    #[test]
    fn sales_report_request_plans_data_collector_only() {
        // "report" hits the data/report family; no chart keyword is present.
        assert_eq!(
            TaskPlanner::plan("Create a report on sales performance by region"),
            vec![AgentRole::DataCollector]
        );
    }

    #[test]
    fn unrecognized_request_plans_default_pair() {
        assert_eq!(
            TaskPlanner::plan("hello there"),
            vec![AgentRole::GeneralAnalyst, AgentRole::ReportGenerator]
        );
    }

    #[test]
    fn empty_and_whitespace_requests_plan_default_pair() {
        assert_eq!(
            TaskPlanner::plan(""),
            vec![AgentRole::GeneralAnalyst, AgentRole::ReportGenerator]
        );
        assert_eq!(
            TaskPlanner::plan("   \t  "),
            vec![AgentRole::GeneralAnalyst, AgentRole::ReportGenerator]
        );
    }

    #[test]
    fn plan_is_deterministic_and_duplicate_free() {
        let requests = [
            "summarize financial data with a chart",
            "visualize the graph chart",
            "quarterly report with data",
            "",
        ];
        for request in requests {
            let first = TaskPlanner::plan(request);
            let second = TaskPlanner::plan(request);
            assert_eq!(first, second);
            assert!(!first.is_empty());
            let unique: HashSet<_> = first.iter().collect();
            assert_eq!(unique.len(), first.len(), "duplicates for {request:?}");
        }
    }
}
