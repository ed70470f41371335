//! Application-level orchestration.
//!
//! This module owns the scrape workflow (selection, submission, status) and post-scrape
//! processing such as exports and report saving. The CLI calls into this module to keep
//! presentation separate from request lifecycle.

mod controller;
mod post_process;

pub(crate) use controller::ScrapeController;
pub(crate) use post_process::{process_scrape_completion, PostScrapeOptions};
