//! Post-scrape processing.
//!
//! Handles exports and the optional report save once a scrape has finished.

use super::controller::ScrapeController;
use crate::error::ClientError;
use crate::model::Report;
use crate::session::SessionManager;
use crate::storage;
use std::path::PathBuf;

/// What to do with a finished scrape.
#[derive(Debug, Clone, Default)]
pub(crate) struct PostScrapeOptions {
    pub save_title: Option<String>,
    pub save_description: Option<String>,
    pub export_json: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}

/// Result of post-scrape processing, ready for presentation layers.
pub(crate) struct ProcessedScrape {
    pub export_messages: Vec<String>,
    pub saved_report: Option<Report>,
    pub save_error: Option<ClientError>,
}

/// Export the current results and save them as a report if asked. Failures are reported
/// back, not raised, so one failed export does not hide the others.
pub(crate) async fn process_scrape_completion(
    controller: &ScrapeController,
    session: &SessionManager,
    opts: &PostScrapeOptions,
) -> ProcessedScrape {
    let jobs = controller.results();
    let mut export_messages = Vec::new();

    if let Some(path) = opts.export_json.as_deref() {
        match storage::export_json(path, controller.keyword(), controller.selected_sources(), jobs) {
            Ok(()) => export_messages.push(format!("Exported JSON: {}", path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e}")),
        }
    }
    if let Some(path) = opts.export_csv.as_deref() {
        match storage::export_csv(path, jobs) {
            Ok(()) => export_messages.push(format!("Exported CSV: {}", path.display())),
            Err(e) => export_messages.push(format!("Export CSV failed: {e}")),
        }
    }

    let (saved_report, save_error) = match opts.save_title.as_deref() {
        Some(title) => {
            match controller
                .save_current_results(session, title, opts.save_description.as_deref())
                .await
            {
                Ok(report) => (Some(report), None),
                Err(e) => (None, Some(e)),
            }
        }
        None => (None, None),
    };

    ProcessedScrape {
        export_messages,
        saved_report,
        save_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeTransport;
    use crate::api::ApiClient;
    use crate::session::Credential;
    use crate::storage::MemoryTokenStore;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn exports_and_save_are_independent() {
        let fake = Arc::new(FakeTransport::default());
        fake.respond(Method::POST, "/api/scrape/jobs", 200, json!({"jobs": [{"title": "SWE", "company": "Acme"}]}));
        fake.respond(Method::POST, "/api/supabase-auth/reports", 500, json!({"detail": "db down"}));
        let session = SessionManager::new(
            ApiClient::new(fake.clone(), Credential::default()),
            Box::new(MemoryTokenStore::default()),
            None,
        );
        let mut ctl = ScrapeController::new(session.api().clone(), None);
        ctl.set_keyword("engineer");
        ctl.toggle_source("indeed");
        ctl.submit_scrape().await.unwrap();

        let dir = TempDir::new().unwrap();
        let opts = PostScrapeOptions {
            save_title: Some("Weekly".into()),
            save_description: None,
            export_json: Some(dir.path().join("jobs.json")),
            export_csv: Some(dir.path().join("jobs.csv")),
        };
        let processed = process_scrape_completion(&ctl, &session, &opts).await;

        assert_eq!(processed.export_messages.len(), 2);
        assert!(processed.export_messages[0].starts_with("Exported JSON"));
        assert!(dir.path().join("jobs.csv").exists());
        assert!(processed.saved_report.is_none());
        assert_eq!(processed.save_error.unwrap().to_string(), "db down");
    }

    #[tokio::test]
    async fn nothing_requested_does_nothing() {
        let fake = Arc::new(FakeTransport::default());
        let session = SessionManager::new(
            ApiClient::new(fake.clone(), Credential::default()),
            Box::new(MemoryTokenStore::default()),
            None,
        );
        let ctl = ScrapeController::new(session.api().clone(), None);

        let processed =
            process_scrape_completion(&ctl, &session, &PostScrapeOptions::default()).await;

        assert!(processed.export_messages.is_empty());
        assert!(processed.saved_report.is_none());
        assert!(processed.save_error.is_none());
        assert!(fake.requests().is_empty());
    }
}
