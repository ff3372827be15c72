//! Structured Data Provider
//!
//! Fixed business datasets loaded once at process start. The dataset is
//! immutable after load; an unreadable source falls back to an all-empty
//! structure rather than failing startup.

pub mod metrics;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessDataset {
    #[serde(default)]
    pub company_info: CompanyInfo,
    #[serde(default)]
    pub financials: Vec<FinancialQuarter>,
    #[serde(default)]
    pub customer_satisfaction: Vec<SatisfactionMonth>,
    #[serde(default)]
    pub sales_by_region: Vec<RegionSales>,
    #[serde(default)]
    pub user_engagement: Vec<EngagementMetric>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub founded: Option<u32>,
    #[serde(default)]
    pub mission: Option<String>,
    #[serde(default)]
    pub employees: Option<u32>,
    #[serde(default)]
    pub headquarters: Option<String>,
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialQuarter {
    pub quarter: String,
    pub revenue: f64,
    pub profit: f64,
    pub expenses: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionMonth {
    pub month: String,
    pub surveyed: f64,
    pub satisfied: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub dissatisfied: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSales {
    pub region: String,
    pub sales: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementMetric {
    pub metric: String,
    #[serde(default)]
    pub last_month_average: f64,
    #[serde(default)]
    pub details: Option<BTreeMap<String, f64>>,
}

impl BusinessDataset {
    /// Load the dataset from a JSON file. Called once at startup; any read or
    /// parse failure yields an empty dataset so the server still starts.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BusinessDataset>(&raw) {
                Ok(data) => {
                    info!(
                        path = %path.display(),
                        quarters = data.financials.len(),
                        regions = data.sales_by_region.len(),
                        "Business dataset loaded"
                    );
                    data
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse dataset, using empty data");
                    BusinessDataset::default()
                }
            },
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read dataset, using empty data");
                BusinessDataset::default()
            }
        }
    }

    pub fn company_name(&self) -> &str {
        self.company_info.name.as_deref().unwrap_or("Wand AI")
    }

    pub fn engagement_value(&self, metric: &str) -> f64 {
        self.user_engagement
            .iter()
            .find(|e| e.metric == metric)
            .map(|e| e.last_month_average)
            .unwrap_or(0.0)
    }

    pub fn feature_usage(&self) -> BTreeMap<String, f64> {
        self.user_engagement
            .iter()
            .find(|e| e.metric == "feature_usage")
            .and_then(|e| e.details.clone())
            .unwrap_or_default()
    }
}

/// Request topic, classified independently from agent planning. The planner
/// and this classifier use separate keyword heuristics and may disagree on
/// the same request; that is intentional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Financial,
    Customer,
    Sales,
    Engagement,
    General,
    Default,
}

/// Classify a request into a data topic. Falls through empty partitions:
/// a matched topic whose partition holds no data degrades to General, and
/// General degrades to Default when no company info is present.
pub fn classify_topic(request: &str, dataset: &BusinessDataset) -> Topic {
    let lower = request.to_lowercase();

    let is_financial = ["financial", "quarter", "revenue", "profit", "trend"]
        .iter()
        .any(|k| lower.contains(k));
    let is_customer = ["customer", "satisfaction", "survey"]
        .iter()
        .any(|k| lower.contains(k));
    let is_sales = ["sales", "region"].iter().any(|k| lower.contains(k));
    let is_engagement = ["engagement", "user", "active"]
        .iter()
        .any(|k| lower.contains(k));

    if is_financial && !dataset.financials.is_empty() {
        return Topic::Financial;
    }
    if is_customer && !dataset.customer_satisfaction.is_empty() {
        return Topic::Customer;
    }
    if is_sales && !dataset.sales_by_region.is_empty() {
        return Topic::Sales;
    }
    if is_engagement && !dataset.user_engagement.is_empty() {
        return Topic::Engagement;
    }
    if dataset.company_info.name.is_some() || !dataset.company_info.departments.is_empty() {
        return Topic::General;
    }
    Topic::Default
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> BusinessDataset {
        BusinessDataset {
            company_info: CompanyInfo {
                name: Some("Wand AI".to_string()),
                ..Default::default()
            },
            financials: vec![FinancialQuarter {
                quarter: "Q1 2025".to_string(),
                revenue: 100.0,
                profit: 10.0,
                expenses: 50.0,
            }],
            customer_satisfaction: vec![SatisfactionMonth {
                month: "Jan".to_string(),
                surveyed: 100.0,
                satisfied: 80.0,
                neutral: 15.0,
                dissatisfied: 5.0,
            }],
            sales_by_region: vec![RegionSales {
                region: "North America".to_string(),
                sales: 50000.0,
            }],
            user_engagement: vec![EngagementMetric {
                metric: "monthly_active_users".to_string(),
                last_month_average: 12000.0,
                details: None,
            }],
        }
    }

    #[test]
    fn classifies_by_keyword_family() {
        let data = sample_dataset();
        assert_eq!(classify_topic("show financial trends", &data), Topic::Financial);
        assert_eq!(classify_topic("customer satisfaction survey", &data), Topic::Customer);
        assert_eq!(classify_topic("sales by region", &data), Topic::Sales);
        assert_eq!(classify_topic("active user engagement", &data), Topic::Engagement);
        assert_eq!(classify_topic("tell me about the company", &data), Topic::General);
    }

    #[test]
    fn empty_partition_falls_through_to_general() {
        let mut data = sample_dataset();
        data.financials.clear();
        assert_eq!(classify_topic("financial trends", &data), Topic::General);
    }

    #[test]
    fn empty_dataset_falls_through_to_default() {
        let data = BusinessDataset::default();
        assert_eq!(classify_topic("financial trends", &data), Topic::Default);
        assert_eq!(classify_topic("anything at all", &data), Topic::Default);
    }

    #[test]
    fn load_missing_file_yields_empty_dataset() {
        let data = BusinessDataset::load("does/not/exist.json");
        assert!(data.financials.is_empty());
        assert!(data.company_info.name.is_none());
    }
}
