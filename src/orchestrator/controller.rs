//! Scrape workflow controller.
//!
//! Owns keyword/source selection and one scrape's lifecycle. It does not queue or coalesce:
//! callers read `status()` (or the `ClientEvent::Scrape` stream) and hold off while a scrape
//! is running.

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::model::{ClientEvent, Job, NewReport, Report, ScrapeQuery, ScrapeResponse, ScrapeStatus};
use crate::session::SessionManager;
use tokio::sync::mpsc::UnboundedSender;

const SCRAPE_PATH: &str = "/api/scrape/jobs";

pub(crate) const MISSING_INPUT: &str = "Please enter a keyword and select at least one source.";
pub(crate) const NOTHING_TO_SAVE: &str = "No scraped jobs to save.";
pub(crate) const MISSING_TITLE: &str = "Please enter a title for the report";

pub(crate) struct ScrapeController {
    api: ApiClient,
    keyword: String,
    selected: Vec<String>,
    status: ScrapeStatus,
    event_tx: Option<UnboundedSender<ClientEvent>>,
}

impl ScrapeController {
    pub fn new(api: ApiClient, event_tx: Option<UnboundedSender<ClientEvent>>) -> Self {
        Self {
            api,
            keyword: String::new(),
            selected: Vec::new(),
            status: ScrapeStatus::Idle,
            event_tx,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
    }

    /// Selected source ids in the order they were picked.
    pub fn selected_sources(&self) -> &[String] {
        &self.selected
    }

    pub fn status(&self) -> &ScrapeStatus {
        &self.status
    }

    /// Jobs from the last successful scrape; empty in every other state.
    pub fn results(&self) -> &[Job] {
        match &self.status {
            ScrapeStatus::Done { jobs } => jobs.as_slice(),
            ScrapeStatus::Idle | ScrapeStatus::Running | ScrapeStatus::Failed { .. } => &[],
        }
    }

    /// Add the source if absent, remove it if present.
    pub fn toggle_source(&mut self, id: &str) {
        match self.selected.iter().position(|s| s == id) {
            Some(idx) => {
                self.selected.remove(idx);
            }
            None => self.selected.push(id.to_string()),
        }
    }

    /// Run one scrape with the current keyword and selection. Returns the job count.
    ///
    /// Invalid input is rejected before anything is sent and leaves `status` untouched.
    pub async fn submit_scrape(&mut self) -> Result<usize> {
        let keyword = self.keyword.trim().to_string();
        if keyword.is_empty() || self.selected.is_empty() {
            return Err(ClientError::validation(MISSING_INPUT));
        }

        // Entering `Running` drops any previous results.
        self.set_status(ScrapeStatus::Running);
        tracing::info!(%keyword, sources = ?self.selected, "scrape started");

        let query = ScrapeQuery {
            keyword: &keyword,
            sources: &self.selected,
        };
        let outcome: Result<ScrapeResponse> = self.api.post(SCRAPE_PATH, &query, "Scrape failed").await;

        match outcome {
            Ok(resp) => {
                let jobs = resp.jobs.unwrap_or_default();
                let count = jobs.len();
                tracing::info!(count, "scrape finished");
                self.set_status(ScrapeStatus::Done { jobs });
                self.emit(ClientEvent::Info(format!("Scraped {count} jobs.")));
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "scrape failed");
                self.set_status(ScrapeStatus::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Save the current results as a report through the session. No retry on failure.
    pub async fn save_current_results(
        &self,
        session: &SessionManager,
        title: &str,
        description: Option<&str>,
    ) -> Result<Report> {
        let jobs = self.results();
        if jobs.is_empty() {
            return Err(ClientError::validation(NOTHING_TO_SAVE));
        }
        if title.trim().is_empty() {
            return Err(ClientError::validation(MISSING_TITLE));
        }

        let report = NewReport::from_scrape(
            title,
            description,
            self.keyword.trim(),
            &self.selected,
            jobs,
        )
        .map_err(|e| ClientError::validation(format!("Could not encode report: {e}")))?;
        session.save_report(&report).await
    }

    fn set_status(&mut self, next: ScrapeStatus) {
        tracing::debug!(from = self.status.label(), to = next.label(), "scrape status");
        self.status = next.clone();
        self.emit(ClientEvent::Scrape(next));
    }

    fn emit(&self, event: ClientEvent) {
        if let Some(tx) = self.event_tx.as_ref() {
            let _ = tx.send(event);
        }
    }
}
