//! AI-generated weekly and monthly summaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};

/// Summary period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Weekly,
    Monthly,
}

impl SummaryKind {
    /// Wire name of the period.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::Weekly => "weekly",
            SummaryKind::Monthly => "monthly",
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(SummaryKind::Weekly),
            "monthly" => Ok(SummaryKind::Monthly),
            other => Err(format!("unknown summary kind: {other}")),
        }
    }
}

/// A generated (or pending) summary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    pub summary_type: SummaryKind,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Human label such as `"2024-W50"`.
    #[serde(default)]
    pub period_label: String,
    pub period_year: i32,
    /// ISO week, set for weekly summaries.
    #[serde(default)]
    pub period_week: Option<u32>,
    #[serde(default)]
    pub period_month: Option<u32>,
    #[serde(default)]
    pub content: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Summary operations.
#[derive(Debug, Clone)]
pub struct SummaryService {
    client: ApiClient,
}

impl SummaryService {
    /// Create a service on top of `client`.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Weekly summaries, newest first as the backend orders them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn weekly(&self) -> Result<Vec<Summary>, ClientError> {
        self.list(SummaryKind::Weekly).await
    }

    /// Monthly summaries.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn monthly(&self) -> Result<Vec<Summary>, ClientError> {
        self.list(SummaryKind::Monthly).await
    }

    /// Generate, or regenerate, a summary whose period is `date` alone.
    ///
    /// `date` is sent as both `period_start` and `period_end`, and the
    /// server stores the period exactly as given.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the backend rejects the request.
    pub async fn generate(&self, kind: SummaryKind, date: NaiveDate) -> Result<Summary, ClientError> {
        let body = json!({
            "summary_type": kind,
            "period_start": date,
            "period_end": date,
            "force": true
        });
        tracing::info!(kind = %kind, %date, "summary: requesting generation");
        self.client.post("/summaries/generate", &body).await
    }

    async fn list(&self, kind: SummaryKind) -> Result<Vec<Summary>, ClientError> {
        let summaries: Option<Vec<Summary>> =
            self.client.get(&format!("/summaries/{kind}")).await?;
        Ok(summaries.unwrap_or_default())
    }
}
