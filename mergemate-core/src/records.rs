//! Pull request records and the dashboard filter.
//!
//! Records come from a [`RecordSource`] and are never mutated; the dashboard
//! only ever holds a filtered copy of the source's ordered sequence.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Review status of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrStatus::Pending => "pending",
            PrStatus::Approved => "approved",
            PrStatus::Rejected => "rejected",
        };
        f.pad(label)
    }
}

/// A pull request as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Display-formatted creation date, e.g. "2024-03-15".
    pub created: String,
    pub status: PrStatus,
    /// Reviewer display names, in the order they were requested.
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

/// Status tab selected on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Approved,
}

impl StatusFilter {
    pub fn matches(&self, status: PrStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == PrStatus::Pending,
            StatusFilter::Approved => status == PrStatus::Approved,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "approved" => Ok(StatusFilter::Approved),
            other => Err(anyhow!(
                "unknown status filter '{}' (expected all, pending or approved)",
                other
            )),
        }
    }
}

/// Records that pass both the status filter and the search query.
///
/// The query is matched case-insensitively as a substring of the title or the
/// author; an empty query matches everything. Input order is preserved.
pub fn visible_records(
    records: &[PullRequestRecord],
    filter: StatusFilter,
    query: &str,
) -> Vec<PullRequestRecord> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|pr| filter.matches(pr.status))
        .filter(|pr| {
            pr.title.to_lowercase().contains(&needle) || pr.author.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Provider of the ordered pull request sequence.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All records, in display order.
    async fn records(&self) -> Result<Vec<PullRequestRecord>>;

    /// Look up a single record by id.
    async fn find(&self, id: &str) -> Result<Option<PullRequestRecord>> {
        Ok(self.records().await?.into_iter().find(|pr| pr.id == id))
    }
}

/// Fixed, in-memory record list.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordSource {
    records: Vec<PullRequestRecord>,
}

impl StaticRecordSource {
    pub fn new(records: Vec<PullRequestRecord>) -> Self {
        Self { records }
    }

    /// The two demo pull requests shown when no data source is configured.
    pub fn sample() -> Self {
        Self::new(vec![
            PullRequestRecord {
                id: "PR-123".to_string(),
                title: "Feature: Add notification system".to_string(),
                author: "Sarah Chen".to_string(),
                created: "2024-03-15".to_string(),
                status: PrStatus::Pending,
                reviewers: vec!["John Doe".to_string(), "Jane Smith".to_string()],
                description: "Implemented real-time notification system for PR updates"
                    .to_string(),
                url: "https://github.com/your-repo/pull/123".to_string(),
            },
            PullRequestRecord {
                id: "PR-124".to_string(),
                title: "Fix: Authentication flow".to_string(),
                author: "Mike Johnson".to_string(),
                created: "2024-03-14".to_string(),
                status: PrStatus::Approved,
                reviewers: vec!["Alice Brown".to_string()],
                description: "Fixed issues with OAuth authentication process".to_string(),
                url: "https://github.com/your-repo/pull/124".to_string(),
            },
        ])
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn records(&self) -> Result<Vec<PullRequestRecord>> {
        Ok(self.records.clone())
    }
}

/// Records read from a JSON array on disk.
///
/// The file is re-read on every call so that edits show up without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileRecordSource {
    path: PathBuf,
}

impl JsonFileRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonFileRecordSource {
    async fn records(&self) -> Result<Vec<PullRequestRecord>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read records file {:?}", self.path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse records file {:?}", self.path))
    }
}
