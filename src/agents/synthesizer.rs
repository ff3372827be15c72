//! Result Synthesizer
//!
//! Per agent role, selects the relevant structured-data subset, asks the
//! narrative client for free text, and merges both into one role-specific
//! result. A narrative failure degrades the result to structured data only;
//! it is never surfaced as a task-level error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::data::{self, metrics, BusinessDataset, Topic};
use crate::llm::{NarrativeClient, NarrativeContext};

use super::AgentRole;

/// Default confidence applied when a payload does not define its own.
pub const DEFAULT_CONFIDENCE: f64 = 0.80;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub revenue: String,
    pub expenses: String,
    pub profit: String,
}

/// The output of synthesizing one agent's work, keyed by role. Every variant
/// carries a confidence in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RoleResult {
    DataCollector {
        data_points: usize,
        sources: Vec<String>,
        time_range: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<String>,
        confidence: f64,
    },
    FinancialAnalyst {
        trends: Trends,
        insights: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<String>,
        confidence: f64,
    },
    DataAnalyst {
        metrics: BTreeMap<String, String>,
        patterns: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<String>,
        confidence: f64,
    },
    Summarizer {
        summary: String,
        key_points: Vec<String>,
        confidence: f64,
    },
    ChartGenerator {
        chart_type: String,
        data: Vec<serde_json::Value>,
        insights: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        confidence: f64,
    },
    ReportGenerator {
        sections: Vec<ReportSection>,
        format: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ollama_analysis: Option<String>,
        confidence: f64,
    },
    GeneralAnalyst {
        analysis: String,
        recommendations: Vec<String>,
        confidence: f64,
    },
    Generic {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<String>,
        confidence: f64,
    },
}

impl RoleResult {
    pub fn generic(message: impl Into<String>) -> Self {
        RoleResult::Generic {
            message: message.into(),
            analysis: None,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            RoleResult::DataCollector { confidence, .. }
            | RoleResult::FinancialAnalyst { confidence, .. }
            | RoleResult::DataAnalyst { confidence, .. }
            | RoleResult::Summarizer { confidence, .. }
            | RoleResult::ChartGenerator { confidence, .. }
            | RoleResult::ReportGenerator { confidence, .. }
            | RoleResult::GeneralAnalyst { confidence, .. }
            | RoleResult::Generic { confidence, .. } => *confidence,
        }
    }

    /// Merge narrative text into the designated field for this result's role,
    /// preserving all structured fields.
    pub fn merge_narrative(mut self, text: String) -> Self {
        match &mut self {
            RoleResult::Summarizer { summary, .. } => *summary = text,
            RoleResult::FinancialAnalyst { analysis, .. }
            | RoleResult::DataAnalyst { analysis, .. }
            | RoleResult::DataCollector { analysis, .. }
            | RoleResult::Generic { analysis, .. } => *analysis = Some(text),
            RoleResult::GeneralAnalyst { analysis, .. } => *analysis = text,
            RoleResult::ChartGenerator { description, .. } => *description = Some(text),
            RoleResult::ReportGenerator { ollama_analysis, .. } => *ollama_analysis = Some(text),
        }
        self
    }
}

pub struct ResultSynthesizer;

impl ResultSynthesizer {
    /// Synthesize a role's result: classify the request topic, build the
    /// structured payload, then merge narrative text when the generator
    /// succeeds. Generator failures keep the structured payload unchanged.
    pub async fn synthesize(
        role: AgentRole,
        request: &str,
        dataset: &BusinessDataset,
        narrative: &NarrativeClient,
        doc_context: Option<&str>,
    ) -> RoleResult {
        let topic = data::classify_topic(request, dataset);
        let structured = Self::structured_payload(role, topic, dataset);

        let context = NarrativeContext { dataset, doc_context };
        match narrative.generate(request, &context, role).await {
            Ok(text) => structured.merge_narrative(text),
            Err(e) => {
                warn!(role = %role, error = %e, "Narrative generation failed, returning structured data only");
                structured
            }
        }
    }

    /// Build the role-specific structured payload for a topic. Falls through
    /// to the general payload when the chosen topic's data is degenerate, and
    /// finally to the hard-coded default.
    pub fn structured_payload(role: AgentRole, topic: Topic, dataset: &BusinessDataset) -> RoleResult {
        match topic {
            Topic::Financial => Self::financial_payload(role, dataset),
            Topic::Customer => Self::customer_payload(role, dataset),
            Topic::Sales => Self::sales_payload(role, dataset),
            Topic::Engagement => Self::engagement_payload(role, dataset),
            Topic::General => Self::general_payload(role, dataset),
            Topic::Default => Self::default_payload(role),
        }
    }

    fn financial_payload(role: AgentRole, dataset: &BusinessDataset) -> RoleResult {
        let financials = &dataset.financials;
        let (Some(first), Some(last)) = (financials.first(), financials.last()) else {
            return Self::general_payload(role, dataset);
        };

        let revenue_growth = metrics::revenue_growth(financials).unwrap_or(0.0);
        let profit_growth = metrics::profit_growth(financials).unwrap_or(0.0);
        let expense_growth = metrics::expense_growth(financials).unwrap_or(0.0);
        let total_revenue: f64 = financials.iter().map(|q| q.revenue).sum();
        let total_profit: f64 = financials.iter().map(|q| q.profit).sum();
        let avg_quarterly_growth =
            metrics::round1(revenue_growth / financials.len() as f64 * 0.75);

        match role {
            AgentRole::DataCollector => RoleResult::DataCollector {
                // revenue, profit and expenses per quarter
                data_points: financials.len() * 3,
                sources: financials
                    .iter()
                    .map(|q| format!("{} Financial Report", q.quarter))
                    .collect(),
                time_range: format!("{} to {}", first.quarter, last.quarter),
                analysis: None,
                confidence: 0.95,
            },
            AgentRole::FinancialAnalyst => RoleResult::FinancialAnalyst {
                trends: Trends {
                    revenue: metrics::format_signed_pct(revenue_growth),
                    expenses: metrics::format_signed_pct(expense_growth),
                    profit: metrics::format_signed_pct(profit_growth),
                },
                insights: financial_insights(financials, revenue_growth, profit_growth),
                analysis: None,
                confidence: 0.88,
            },
            AgentRole::DataAnalyst => {
                let mut m = BTreeMap::new();
                m.insert("totalRevenue".to_string(), format!("${:.1}k", total_revenue / 1000.0));
                m.insert("totalProfit".to_string(), format!("${:.1}k", total_profit / 1000.0));
                m.insert("avgQuarterlyGrowth".to_string(), format!("{avg_quarterly_growth}%"));
                m.insert(
                    "volatility".to_string(),
                    metrics::volatility_bucket(financials).to_string(),
                );
                RoleResult::DataAnalyst {
                    metrics: m,
                    patterns: revenue_patterns(financials),
                    analysis: None,
                    confidence: 0.92,
                }
            }
            AgentRole::Summarizer => RoleResult::Summarizer {
                summary: format!(
                    "Financial performance from {} to {} shows {} with revenue {} by {}% and profits {} by {}%. \
                     The company has {} while {} market position.",
                    first.quarter,
                    last.quarter,
                    if revenue_growth > 0.0 { "growth" } else { "decline" },
                    if revenue_growth > 0.0 { "increasing" } else { "decreasing" },
                    revenue_growth.abs(),
                    if profit_growth > 0.0 { "growing" } else { "declining" },
                    profit_growth.abs(),
                    if expense_growth < revenue_growth {
                        "successfully managed costs"
                    } else {
                        "experienced cost increases"
                    },
                    if revenue_growth > 0.0 { "expanding" } else { "maintaining" },
                ),
                key_points: vec![
                    format!(
                        "Revenue {} of {}%",
                        if revenue_growth > 0.0 { "growth" } else { "change" },
                        revenue_growth.abs()
                    ),
                    format!(
                        "Profit {} of {}%",
                        if profit_growth > 0.0 { "growth" } else { "change" },
                        profit_growth.abs()
                    ),
                    format!(
                        "Data covers {} quarters from {} to {}",
                        financials.len(),
                        first.quarter,
                        last.quarter
                    ),
                ],
                confidence: 0.90,
            },
            AgentRole::ChartGenerator => {
                let max_revenue = financials.iter().map(|q| q.revenue).fold(f64::MIN, f64::max);
                let max_profit = financials.iter().map(|q| q.profit).fold(f64::MIN, f64::max);
                RoleResult::ChartGenerator {
                    chart_type: "line".to_string(),
                    data: financials
                        .iter()
                        .map(|q| {
                            json!({
                                "quarter": short_quarter(&q.quarter),
                                "revenue": q.revenue,
                                "profit": q.profit,
                            })
                        })
                        .collect(),
                    insights: vec![
                        format!("Peak revenue: ${}", format_money(max_revenue)),
                        format!("Peak profit: ${}", format_money(max_profit)),
                    ],
                    description: None,
                    confidence: DEFAULT_CONFIDENCE,
                }
            }
            AgentRole::ReportGenerator => {
                let min_revenue = financials.iter().map(|q| q.revenue).fold(f64::MAX, f64::min);
                let max_revenue = financials.iter().map(|q| q.revenue).fold(f64::MIN, f64::max);
                RoleResult::ReportGenerator {
                    sections: vec![
                        ReportSection {
                            title: "Executive Summary".to_string(),
                            content: format!(
                                "Analysis of financial data from {} to {} reveals {} performance with revenue {} of {}%.",
                                first.quarter,
                                last.quarter,
                                if revenue_growth > 0.0 { "strong" } else { "challenging" },
                                if revenue_growth > 0.0 { "growth" } else { "decline" },
                                revenue_growth.abs(),
                            ),
                        },
                        ReportSection {
                            title: "Detailed Analysis".to_string(),
                            content: format!(
                                "Quarter-over-quarter analysis shows revenue ranging from ${} to ${}, with profit margins {}.",
                                format_money(min_revenue),
                                format_money(max_revenue),
                                if profit_growth > revenue_growth { "expanding" } else { "contracting" },
                            ),
                        },
                        ReportSection {
                            title: "Recommendations".to_string(),
                            content: if revenue_growth > 0.0 {
                                "Continue current growth strategy and focus on maintaining cost efficiency."
                            } else {
                                "Review cost structure and identify opportunities for revenue growth."
                            }
                            .to_string(),
                        },
                    ],
                    format: "structured_report".to_string(),
                    ollama_analysis: None,
                    confidence: DEFAULT_CONFIDENCE,
                }
            }
            AgentRole::GeneralAnalyst => RoleResult::GeneralAnalyst {
                analysis: format!(
                    "Financial analysis based on {} quarters of data shows {} trends.",
                    financials.len(),
                    if revenue_growth > 0.0 { "positive" } else { "negative" },
                ),
                recommendations: recommendations(revenue_growth, profit_growth),
                confidence: 0.75,
            },
        }
    }

    fn customer_payload(role: AgentRole, dataset: &BusinessDataset) -> RoleResult {
        let months = &dataset.customer_satisfaction;
        let Some(rate) = metrics::satisfaction_rate(months) else {
            return Self::default_payload(role);
        };
        let total_surveyed: f64 = months.iter().map(|m| m.surveyed).sum();

        match role {
            AgentRole::DataCollector => RoleResult::DataCollector {
                data_points: months.len(),
                sources: months.iter().map(|m| format!("{} Survey", m.month)).collect(),
                time_range: format!(
                    "{} to {}",
                    months.first().map(|m| m.month.as_str()).unwrap_or("N/A"),
                    months.last().map(|m| m.month.as_str()).unwrap_or("N/A"),
                ),
                analysis: None,
                confidence: 0.95,
            },
            AgentRole::Summarizer => RoleResult::Summarizer {
                summary: format!(
                    "Customer satisfaction analysis shows {rate}% satisfaction rate across {} months. \
                     Average {:.0} customers surveyed per month.",
                    months.len(),
                    total_surveyed / months.len() as f64,
                ),
                key_points: vec![
                    format!("Overall satisfaction rate: {rate}%"),
                    format!("Total customers surveyed: {total_surveyed:.0}"),
                    format!("Data covers {} months", months.len()),
                ],
                confidence: 0.90,
            },
            AgentRole::DataAnalyst => {
                let mut m = BTreeMap::new();
                m.insert("satisfactionRate".to_string(), format!("{rate}%"));
                m.insert("totalSurveyed".to_string(), format!("{total_surveyed:.0}"));
                m.insert(
                    "averagePerMonth".to_string(),
                    format!("{:.0}", total_surveyed / months.len() as f64),
                );
                RoleResult::DataAnalyst {
                    metrics: m,
                    patterns: months
                        .iter()
                        .map(|mth| {
                            let monthly = metrics::active_ratio(mth.satisfied, mth.surveyed)
                                .unwrap_or(0.0);
                            format!("{}: {monthly}% satisfied", mth.month)
                        })
                        .collect(),
                    analysis: None,
                    confidence: 0.92,
                }
            }
            AgentRole::ChartGenerator => {
                let peak = months
                    .iter()
                    .filter(|m| m.surveyed > 0.0)
                    .reduce(|best, m| {
                        if m.satisfied / m.surveyed > best.satisfied / best.surveyed {
                            m
                        } else {
                            best
                        }
                    });
                RoleResult::ChartGenerator {
                    chart_type: "bar".to_string(),
                    data: months
                        .iter()
                        .map(|m| {
                            json!({
                                "month": m.month,
                                "satisfied": m.satisfied,
                                "neutral": m.neutral,
                                "dissatisfied": m.dissatisfied,
                            })
                        })
                        .collect(),
                    insights: vec![
                        format!("Average satisfaction: {rate}%"),
                        format!(
                            "Peak satisfaction month: {}",
                            peak.map(|m| m.month.as_str()).unwrap_or("N/A")
                        ),
                    ],
                    description: None,
                    confidence: DEFAULT_CONFIDENCE,
                }
            }
            _ => RoleResult::generic("Customer satisfaction analysis completed"),
        }
    }

    fn sales_payload(role: AgentRole, dataset: &BusinessDataset) -> RoleResult {
        let regions = &dataset.sales_by_region;
        let Some(top) = metrics::top_region(regions) else {
            return Self::default_payload(role);
        };
        let total_sales: f64 = regions.iter().map(|r| r.sales).sum();

        match role {
            AgentRole::DataCollector => RoleResult::DataCollector {
                data_points: regions.len(),
                sources: regions.iter().map(|r| format!("{} Sales Data", r.region)).collect(),
                time_range: "Current period".to_string(),
                analysis: None,
                confidence: 0.95,
            },
            AgentRole::Summarizer => RoleResult::Summarizer {
                summary: format!(
                    "Sales performance across {} regions shows total sales of ${}. \
                     Top performing region is {} with ${} in sales.",
                    regions.len(),
                    format_money(total_sales),
                    top.region,
                    format_money(top.sales),
                ),
                key_points: vec![
                    format!("Total sales: ${}", format_money(total_sales)),
                    format!("Top region: {}", top.region),
                    format!("Regions analyzed: {}", regions.len()),
                ],
                confidence: 0.90,
            },
            AgentRole::DataAnalyst => {
                let mut m = BTreeMap::new();
                m.insert("totalSales".to_string(), format!("${}", format_money(total_sales)));
                m.insert(
                    "averagePerRegion".to_string(),
                    format!("${}", format_money(total_sales / regions.len() as f64)),
                );
                m.insert("topRegion".to_string(), top.region.clone());
                RoleResult::DataAnalyst {
                    metrics: m,
                    patterns: regions
                        .iter()
                        .map(|r| {
                            let share = metrics::active_ratio(r.sales, total_sales).unwrap_or(0.0);
                            format!("{}: ${} ({share}%)", r.region, format_money(r.sales))
                        })
                        .collect(),
                    analysis: None,
                    confidence: 0.92,
                }
            }
            AgentRole::ChartGenerator => RoleResult::ChartGenerator {
                chart_type: "bar".to_string(),
                data: regions
                    .iter()
                    .map(|r| json!({ "region": r.region, "sales": r.sales }))
                    .collect(),
                insights: vec![
                    format!("Total sales: ${}", format_money(total_sales)),
                    format!("Top region: {}", top.region),
                ],
                description: None,
                confidence: DEFAULT_CONFIDENCE,
            },
            _ => RoleResult::generic("Sales analysis completed"),
        }
    }

    fn engagement_payload(role: AgentRole, dataset: &BusinessDataset) -> RoleResult {
        let engagement = &dataset.user_engagement;
        let dau = dataset.engagement_value("daily_active_users");
        let wau = dataset.engagement_value("weekly_active_users");
        let mau = dataset.engagement_value("monthly_active_users");
        let session_time = dataset.engagement_value("average_session_time_minutes");
        let feature_usage = dataset.feature_usage();

        // No monthly baseline means the ratios are undefined; use the
        // hard-coded payload instead of emitting NaN.
        let Some(dau_ratio) = metrics::active_ratio(dau, mau) else {
            return Self::default_payload(role);
        };
        let wau_ratio = metrics::active_ratio(wau, mau).unwrap_or(0.0);

        match role {
            AgentRole::DataCollector => RoleResult::DataCollector {
                data_points: engagement.len(),
                sources: engagement.iter().map(|e| e.metric.clone()).collect(),
                time_range: "Last month average".to_string(),
                analysis: None,
                confidence: 0.95,
            },
            AgentRole::Summarizer => RoleResult::Summarizer {
                summary: format!(
                    "User engagement metrics show {} monthly active users, {} weekly active users, \
                     and {} daily active users. Average session time is {session_time} minutes. \
                     Feature usage: {}.",
                    format_money(mau),
                    format_money(wau),
                    format_money(dau),
                    feature_usage
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}%"))
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                key_points: vec![
                    format!("Monthly Active Users: {}", format_money(mau)),
                    format!("Weekly Active Users: {}", format_money(wau)),
                    format!("Daily Active Users: {}", format_money(dau)),
                    format!("Average Session: {session_time} minutes"),
                ],
                confidence: 0.90,
            },
            AgentRole::DataAnalyst => {
                let mut m = BTreeMap::new();
                m.insert("dailyActiveUsers".to_string(), format_money(dau));
                m.insert("weeklyActiveUsers".to_string(), format_money(wau));
                m.insert("monthlyActiveUsers".to_string(), format_money(mau));
                m.insert("avgSessionTime".to_string(), format!("{session_time} minutes"));
                let most_used = feature_usage
                    .iter()
                    .reduce(|best, f| if f.1 > best.1 { f } else { best })
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| "N/A".to_string());
                RoleResult::DataAnalyst {
                    metrics: m,
                    patterns: vec![
                        format!("DAU/MAU ratio: {dau_ratio}%"),
                        format!("WAU/MAU ratio: {wau_ratio}%"),
                        format!("Most used feature: {most_used}"),
                    ],
                    analysis: None,
                    confidence: 0.92,
                }
            }
            AgentRole::ChartGenerator => RoleResult::ChartGenerator {
                chart_type: "bar".to_string(),
                data: vec![
                    json!({ "metric": "Daily Active Users", "value": dau }),
                    json!({ "metric": "Weekly Active Users", "value": wau }),
                    json!({ "metric": "Monthly Active Users", "value": mau }),
                ],
                insights: vec![
                    format!("Total MAU: {}", format_money(mau)),
                    format!("Engagement rate: {dau_ratio}%"),
                ],
                description: None,
                confidence: DEFAULT_CONFIDENCE,
            },
            _ => RoleResult::generic("Engagement analysis completed"),
        }
    }

    fn general_payload(role: AgentRole, dataset: &BusinessDataset) -> RoleResult {
        let info = &dataset.company_info;
        let name = dataset.company_name();

        match role {
            AgentRole::DataCollector => RoleResult::DataCollector {
                data_points: 5,
                sources: vec![
                    "Company Information".to_string(),
                    "Financial Data".to_string(),
                    "Customer Satisfaction".to_string(),
                    "Sales Data".to_string(),
                    "User Engagement".to_string(),
                ],
                time_range: "Current company data".to_string(),
                analysis: None,
                confidence: 0.95,
            },
            AgentRole::Summarizer => RoleResult::Summarizer {
                summary: format!(
                    "{name} is a company founded in {} with {} employees based in {}. {}",
                    info.founded.map(|f| f.to_string()).unwrap_or_else(|| "2020".to_string()),
                    info.employees.unwrap_or(150),
                    info.headquarters.as_deref().unwrap_or("San Francisco, CA"),
                    info.mission.as_deref().unwrap_or("The company focuses on AI integration."),
                ),
                key_points: vec![
                    format!("Company: {name}"),
                    format!(
                        "Founded: {}",
                        info.founded.map(|f| f.to_string()).unwrap_or_else(|| "2020".to_string())
                    ),
                    format!("Employees: {}", info.employees.unwrap_or(150)),
                    format!(
                        "Headquarters: {}",
                        info.headquarters.as_deref().unwrap_or("San Francisco, CA")
                    ),
                ],
                confidence: 0.90,
            },
            AgentRole::ReportGenerator => RoleResult::ReportGenerator {
                sections: vec![
                    ReportSection {
                        title: "Company Overview".to_string(),
                        content: format!(
                            "Company: {name}, Founded: {}, Mission: {}, Employees: {}, Headquarters: {}, Departments: {}",
                            info.founded.map(|f| f.to_string()).unwrap_or_else(|| "N/A".to_string()),
                            info.mission.as_deref().unwrap_or("N/A"),
                            info.employees.map(|e| e.to_string()).unwrap_or_else(|| "N/A".to_string()),
                            info.headquarters.as_deref().unwrap_or("N/A"),
                            info.departments.join(", "),
                        ),
                    },
                    ReportSection {
                        title: "Available Data".to_string(),
                        content: format!(
                            "Financial data: {} quarters, Customer satisfaction: {} months, Sales regions: {}, Engagement metrics: {}",
                            dataset.financials.len(),
                            dataset.customer_satisfaction.len(),
                            dataset.sales_by_region.len(),
                            dataset.user_engagement.len(),
                        ),
                    },
                ],
                format: "structured_report".to_string(),
                ollama_analysis: None,
                confidence: DEFAULT_CONFIDENCE,
            },
            AgentRole::GeneralAnalyst => RoleResult::GeneralAnalyst {
                analysis: format!(
                    "Analysis based on {name} company data. Company information and various data sources available for analysis."
                ),
                recommendations: vec![
                    "Review company information".to_string(),
                    "Analyze financial trends".to_string(),
                    "Examine customer satisfaction".to_string(),
                    "Review sales performance".to_string(),
                ],
                confidence: 0.75,
            },
            _ => RoleResult::generic("Company information available"),
        }
    }

    /// Hard-coded mock payloads used when no real partition applies.
    fn default_payload(role: AgentRole) -> RoleResult {
        match role {
            AgentRole::DataCollector => RoleResult::DataCollector {
                data_points: 150,
                sources: vec![
                    "Q1 Financial Report".to_string(),
                    "Q2 Financial Report".to_string(),
                    "Q3 Financial Report".to_string(),
                ],
                time_range: "Last 3 quarters".to_string(),
                analysis: None,
                confidence: 0.95,
            },
            AgentRole::FinancialAnalyst => RoleResult::FinancialAnalyst {
                trends: Trends {
                    revenue: "+15.2%".to_string(),
                    expenses: "+8.7%".to_string(),
                    profit: "+23.4%".to_string(),
                },
                insights: vec![
                    "Revenue growth accelerated".to_string(),
                    "Cost management improved".to_string(),
                    "Profit margins expanded".to_string(),
                ],
                analysis: None,
                confidence: 0.88,
            },
            AgentRole::Summarizer => RoleResult::Summarizer {
                summary: "Analysis completed successfully based on available data.".to_string(),
                key_points: vec![
                    "Data processed".to_string(),
                    "Insights generated".to_string(),
                    "Report ready".to_string(),
                ],
                confidence: 0.90,
            },
            AgentRole::ChartGenerator => RoleResult::ChartGenerator {
                chart_type: "line".to_string(),
                data: vec![
                    json!({ "quarter": "Q1", "revenue": 10000, "profit": 2000 }),
                    json!({ "quarter": "Q2", "revenue": 12000, "profit": 2500 }),
                    json!({ "quarter": "Q3", "revenue": 11000, "profit": 2100 }),
                ],
                insights: vec![
                    "Data visualization created".to_string(),
                    "Trends identified".to_string(),
                ],
                description: None,
                confidence: DEFAULT_CONFIDENCE,
            },
            _ => RoleResult::generic("Analysis completed"),
        }
    }
}

fn financial_insights(
    financials: &[crate::data::FinancialQuarter],
    revenue_growth: f64,
    profit_growth: f64,
) -> Vec<String> {
    let mut insights = Vec::new();
    if revenue_growth > 10.0 {
        insights.push("Strong revenue growth observed across quarters".to_string());
    }
    if profit_growth > revenue_growth {
        insights.push("Profit growth outpacing revenue, indicating improved efficiency".to_string());
    }
    let margins: Vec<f64> = financials
        .iter()
        .filter(|q| q.revenue != 0.0)
        .map(|q| q.profit / q.revenue * 100.0)
        .collect();
    if !margins.is_empty() {
        let avg = margins.iter().sum::<f64>() / margins.len() as f64;
        insights.push(format!("Average profit margin: {avg:.1}%"));
    }
    insights
}

fn revenue_patterns(financials: &[crate::data::FinancialQuarter]) -> Vec<String> {
    let revenues: Vec<f64> = financials.iter().map(|q| q.revenue).collect();
    let increasing = revenues.windows(2).all(|w| w[1] >= w[0]);
    let decreasing = revenues.windows(2).all(|w| w[1] <= w[0]);

    let pattern = if increasing {
        "Consistent upward trend in revenue"
    } else if decreasing {
        "Declining revenue pattern detected"
    } else {
        "Volatile revenue pattern with fluctuations"
    };
    vec![pattern.to_string()]
}

fn recommendations(revenue_growth: f64, profit_growth: f64) -> Vec<String> {
    let mut out = Vec::new();
    if revenue_growth > 0.0 {
        out.push("Continue current growth strategy".to_string());
    } else {
        out.push("Review revenue generation strategies".to_string());
    }
    if profit_growth < revenue_growth {
        out.push("Focus on improving profit margins".to_string());
    }
    out.push("Monitor quarterly trends closely".to_string());
    out
}

fn short_quarter(quarter: &str) -> String {
    // "Q1 2025" -> "Q1"
    quarter.split_whitespace().next().unwrap_or(quarter).to_string()
}

/// Format a number with thousands separators and no decimals, e.g. 50000 -> "50,000".
pub(crate) fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let whole = value.abs().round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CompanyInfo, FinancialQuarter, RegionSales, SatisfactionMonth};

    fn dataset() -> BusinessDataset {
        BusinessDataset {
            company_info: CompanyInfo {
                name: Some("Wand AI".to_string()),
                founded: Some(2020),
                mission: Some("Hybrid workforce AI solutions.".to_string()),
                employees: Some(150),
                headquarters: Some("San Francisco, CA".to_string()),
                departments: vec!["Engineering".to_string(), "Sales".to_string()],
            },
            financials: vec![
                FinancialQuarter {
                    quarter: "Q1 2025".to_string(),
                    revenue: 100.0,
                    profit: 10.0,
                    expenses: 50.0,
                },
                FinancialQuarter {
                    quarter: "Q2 2025".to_string(),
                    revenue: 150.0,
                    profit: 20.0,
                    expenses: 60.0,
                },
            ],
            customer_satisfaction: vec![
                SatisfactionMonth {
                    month: "Jan".to_string(),
                    surveyed: 100.0,
                    satisfied: 80.0,
                    neutral: 15.0,
                    dissatisfied: 5.0,
                },
                SatisfactionMonth {
                    month: "Feb".to_string(),
                    surveyed: 100.0,
                    satisfied: 85.0,
                    neutral: 10.0,
                    dissatisfied: 5.0,
                },
            ],
            sales_by_region: vec![
                RegionSales { region: "North America".to_string(), sales: 50000.0 },
                RegionSales { region: "Europe".to_string(), sales: 30000.0 },
                RegionSales { region: "Asia".to_string(), sales: 20000.0 },
            ],
            user_engagement: vec![],
        }
    }

    #[test]
    fn financial_analyst_payload_carries_reference_growth() {
        let result =
            ResultSynthesizer::structured_payload(AgentRole::FinancialAnalyst, Topic::Financial, &dataset());
        let RoleResult::FinancialAnalyst { trends, insights, confidence, .. } = result else {
            panic!("expected financial-analyst result");
        };
        assert_eq!(trends.revenue, "+50.0%");
        assert_eq!(trends.profit, "+100.0%");
        assert_eq!(trends.expenses, "+20.0%");
        assert_eq!(confidence, 0.88);
        // 100% profit growth outpaces 50% revenue growth.
        assert!(insights.iter().any(|i| i.contains("outpacing")));
    }

    #[test]
    fn sales_payload_picks_top_region() {
        let result =
            ResultSynthesizer::structured_payload(AgentRole::Summarizer, Topic::Sales, &dataset());
        let RoleResult::Summarizer { summary, .. } = result else {
            panic!("expected summarizer result");
        };
        assert!(summary.contains("North America"));
        assert!(summary.contains("$100,000"));
    }

    #[test]
    fn chart_generator_uses_short_quarter_labels() {
        let result =
            ResultSynthesizer::structured_payload(AgentRole::ChartGenerator, Topic::Financial, &dataset());
        let RoleResult::ChartGenerator { chart_type, data, .. } = result else {
            panic!("expected chart-generator result");
        };
        assert_eq!(chart_type, "line");
        assert_eq!(data[0]["quarter"], "Q1");
        assert_eq!(data[1]["quarter"], "Q2");
    }

    #[test]
    fn unsupported_role_topic_combo_degrades_to_generic() {
        let result =
            ResultSynthesizer::structured_payload(AgentRole::FinancialAnalyst, Topic::Sales, &dataset());
        let RoleResult::Generic { message, confidence, .. } = result else {
            panic!("expected generic result");
        };
        assert_eq!(message, "Sales analysis completed");
        assert_eq!(confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn engagement_without_mau_degrades_to_default_payload() {
        // Engagement topic with a zero monthly baseline must not produce NaN ratios.
        let data = dataset();
        let result =
            ResultSynthesizer::structured_payload(AgentRole::DataAnalyst, Topic::Engagement, &data);
        assert!(result.confidence() > 0.0);
        assert!(matches!(result, RoleResult::Generic { .. }));
    }

    #[test]
    fn every_payload_carries_confidence_in_range() {
        let data = dataset();
        let roles = [
            AgentRole::DataCollector,
            AgentRole::FinancialAnalyst,
            AgentRole::DataAnalyst,
            AgentRole::Summarizer,
            AgentRole::ChartGenerator,
            AgentRole::ReportGenerator,
            AgentRole::GeneralAnalyst,
        ];
        let topics = [
            Topic::Financial,
            Topic::Customer,
            Topic::Sales,
            Topic::Engagement,
            Topic::General,
            Topic::Default,
        ];
        for role in roles {
            for topic in topics {
                let c = ResultSynthesizer::structured_payload(role, topic, &data).confidence();
                assert!((0.0..=1.0).contains(&c), "{role} / {topic:?} -> {c}");
            }
        }
    }

    #[test]
    fn merge_narrative_targets_designated_field() {
        let summarizer =
            ResultSynthesizer::structured_payload(AgentRole::Summarizer, Topic::Financial, &dataset())
                .merge_narrative("narrative text".to_string());
        let RoleResult::Summarizer { summary, key_points, .. } = summarizer else {
            panic!("expected summarizer result");
        };
        assert_eq!(summary, "narrative text");
        assert!(!key_points.is_empty(), "structured fields must survive the merge");

        let report =
            ResultSynthesizer::structured_payload(AgentRole::ReportGenerator, Topic::Financial, &dataset())
                .merge_narrative("narrative text".to_string());
        let RoleResult::ReportGenerator { ollama_analysis, sections, .. } = report else {
            panic!("expected report-generator result");
        };
        assert_eq!(ollama_analysis.as_deref(), Some("narrative text"));
        assert_eq!(sections.len(), 3);
    }

    struct DownBackend;

    #[async_trait::async_trait]
    impl crate::llm::NarrativeBackend for DownBackend {
        async fn complete(&self, _prompt: &str) -> crate::types::AppResult<String> {
            Err(crate::types::AppError::Narrative("connection refused".to_string()))
        }

        async fn check_availability(&self) -> crate::llm::Availability {
            crate::llm::Availability {
                available: false,
                models: vec![],
                error: Some("connection refused".to_string()),
            }
        }

        async fn list_models(&self) -> crate::types::AppResult<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn unreachable_backend_never_escapes_synthesis() {
        let narrative = NarrativeClient::new(Box::new(DownBackend));
        let data = dataset();
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
            let result =
                ResultSynthesizer::synthesize(role, "financial report", &data, &narrative, None)
                    .await;
            let c = result.confidence();
            assert!((0.0..=1.0).contains(&c), "{role} -> {c}");
        }
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(50000.0), "50,000");
        assert_eq!(format_money(1234567.0), "1,234,567");
        assert_eq!(format_money(999.0), "999");
        assert_eq!(format_money(0.0), "0");
    }
}
