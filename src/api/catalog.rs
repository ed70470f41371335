//! Source list and scrape-URL catalog endpoints.

use super::ApiClient;
use crate::error::{ClientError, Result};
use crate::model::{Source, UrlCatalog, UrlKind};
use serde_json::json;

impl ApiClient {
    /// Fetch selectable sources. Not critical: any failure degrades to an empty list.
    pub async fn fetch_sources(&self) -> Vec<Source> {
        match self
            .get::<Vec<Source>>("/api/sources", "Failed to fetch sources")
            .await
        {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(error = %e, "source list unavailable, continuing with none");
                Vec::new()
            }
        }
    }

    pub async fn list_urls(&self) -> Result<UrlCatalog> {
        self.get("/api/urls", "Failed to fetch URLs").await
    }

    pub async fn add_url(&self, kind: UrlKind, url: &str) -> Result<()> {
        let url = non_empty_url(url)?;
        let path = format!("/api/urls/{}", kind.as_path_str());
        let _: serde_json::Value = self.post(&path, &json!({ "url": url }), "Failed to add URL").await?;
        Ok(())
    }

    pub async fn remove_url(&self, kind: UrlKind, url: &str) -> Result<()> {
        let url = non_empty_url(url)?;
        let path = format!("/api/urls/{}", kind.as_path_str());
        self.delete(&path, Some(json!({ "url": url })), "Failed to remove URL")
            .await
    }
}

fn non_empty_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ClientError::validation("Please enter a URL"));
    }
    Ok(url)
}
