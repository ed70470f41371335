use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub token_path: Option<std::path::PathBuf>,
}

/// Profile resolved from a bearer token by `GET /api/supabase-auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A scraped listing, kept exactly as the service sent it. Field values may be any JSON
/// type; accessors render them as text for display and exports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Job(Value);

impl Job {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Text form of a field. Null, missing and blank values are `None`; numbers, booleans
    /// and nested values are rendered as JSON.
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.0.get(field)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    pub fn title(&self) -> Option<Cow<'_, str>> {
        self.text("title")
    }

    pub fn company(&self) -> Option<Cow<'_, str>> {
        self.text("company")
    }

    pub fn location(&self) -> Option<Cow<'_, str>> {
        self.text("location")
    }

    pub fn source(&self) -> Option<Cow<'_, str>> {
        self.text("source")
    }

    pub fn salary(&self) -> Option<Cow<'_, str>> {
        self.text("salary")
    }

    pub fn date_posted(&self) -> Option<Cow<'_, str>> {
        self.text("date_posted")
    }

    pub fn url(&self) -> Option<Cow<'_, str>> {
        self.text("url")
    }
}

impl From<Value> for Job {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A selectable job-listing origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeQuery<'a> {
    pub keyword: &'a str,
    pub sources: &'a [String],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeResponse {
    #[serde(default)]
    pub jobs: Option<Vec<Job>>,
}

/// Payload for `POST /api/supabase-auth/reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub report_type: String,
    #[serde(default)]
    pub keyword: Option<String>,
    pub jobs_data: String,
    pub sources_used: String,
    pub job_count: usize,
}

impl NewReport {
    /// Build a scrape report, serializing jobs and sources the way the service stores them.
    pub fn from_scrape(
        title: &str,
        description: Option<&str>,
        keyword: &str,
        sources: &[String],
        jobs: &[Job],
    ) -> serde_json::Result<Self> {
        Ok(Self {
            title: title.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            report_type: "scrape".to_string(),
            keyword: Some(keyword.to_string()),
            jobs_data: serde_json::to_string(jobs)?,
            sources_used: serde_json::to_string(sources)?,
            job_count: jobs.len(),
        })
    }
}

/// A persisted report. Never updated in place; only created, listed, fetched and deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub job_count: Option<u64>,
    #[serde(default)]
    pub jobs_data: Option<String>,
    #[serde(default)]
    pub sources_used: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Report {
    pub fn jobs(&self) -> serde_json::Result<Vec<Job>> {
        match self.jobs_data.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw),
            _ => Ok(Vec::new()),
        }
    }

    pub fn sources(&self) -> serde_json::Result<Vec<String>> {
        match self.sources_used.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw),
            _ => Ok(Vec::new()),
        }
    }
}

/// Scrape target catalog returned by `GET /api/urls`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCatalog {
    #[serde(default)]
    pub static_urls: Vec<String>,
    #[serde(default)]
    pub dynamic_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Static,
    Dynamic,
}

impl UrlKind {
    pub fn as_path_str(self) -> &'static str {
        match self {
            UrlKind::Static => "static",
            UrlKind::Dynamic => "dynamic",
        }
    }
}

/// Session lifecycle. `Resolving` always ends in `Authenticated` or `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Resolving,
    Authenticated(User),
    Anonymous,
}

/// Scrape lifecycle. Results only exist in `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScrapeStatus {
    Idle,
    Running,
    Done { jobs: Vec<Job> },
    Failed { message: String },
}

impl ScrapeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ScrapeStatus::Idle => "idle",
            ScrapeStatus::Running => "running",
            ScrapeStatus::Done { .. } => "done",
            ScrapeStatus::Failed { .. } => "failed",
        }
    }
}

/// Notifications for presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientEvent {
    Session(SessionState),
    Scrape(ScrapeStatus),
    ReportsChanged,
    Info(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_fields_pass_through_untouched() {
        let raw = json!({
            "title": "SWE",
            "company": "Acme",
            "location": null,
            "salary": 120000,
            "remote": true,
            "tags": ["rust"]
        });
        let job: Job = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(job.title().as_deref(), Some("SWE"));
        assert_eq!(job.location(), None);
        assert_eq!(job.salary().as_deref(), Some("120000"));
        assert_eq!(job.source(), None);
        assert_eq!(job.text("tags").as_deref(), Some(r#"["rust"]"#));
        assert_eq!(serde_json::to_value(&job).unwrap(), raw);
    }

    #[test]
    fn new_report_serializes_jobs_and_sources() {
        let jobs = vec![Job::from(json!({"title": "SWE", "company": "Acme", "salary": 100000, "url": null}))];
        let sources = vec!["indeed".to_string(), "remoteok".to_string()];
        let report =
            NewReport::from_scrape(" Weekly ", Some("  "), "engineer", &sources, &jobs).unwrap();

        assert_eq!(report.title, "Weekly");
        assert_eq!(report.description, None);
        assert_eq!(report.job_count, 1);
        assert_eq!(report.report_type, "scrape");

        let stored = Report {
            id: 1,
            title: report.title.clone(),
            description: None,
            report_type: Some(report.report_type.clone()),
            keyword: report.keyword.clone(),
            job_count: Some(1),
            jobs_data: Some(report.jobs_data.clone()),
            sources_used: Some(report.sources_used.clone()),
            created_at: None,
        };
        assert_eq!(stored.jobs().unwrap(), jobs);
        assert_eq!(stored.sources().unwrap(), sources);
    }

    #[test]
    fn report_without_payload_decodes_empty() {
        let report: Report = serde_json::from_str(r#"{"id":3,"title":"Old"}"#).unwrap();
        assert!(report.jobs().unwrap().is_empty());
        assert!(report.sources().unwrap().is_empty());
    }
}
