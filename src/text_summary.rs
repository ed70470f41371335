//! Text rendering for CLI output.
//!
//! Builds human-readable lines for scrape results, reports and catalogs.

use crate::metrics;
use crate::model::{Job, Report, Source, UrlCatalog, User};
use std::borrow::Cow;

/// Companies listed in the breakdown before the rest are folded away.
const TOP_COMPANIES: usize = 5;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Summarize a finished scrape: header, per-source and top-company counts, then each job.
pub(crate) fn build_scrape_summary(keyword: &str, sources: &[String], jobs: &[Job]) -> TextSummary {
    let mut lines = vec![format!(
        "Keyword: {keyword}  Sources: {}  Jobs: {}",
        sources.join(", "),
        jobs.len()
    )];
    if jobs.is_empty() {
        lines.push("No jobs found.".to_string());
        return TextSummary { lines };
    }

    let by_source = metrics::count_by(jobs, Job::source);
    lines.push(format!("By source: {}", join_counts(&by_source)));

    let by_company = metrics::count_by(jobs, Job::company);
    let shown = &by_company[..by_company.len().min(TOP_COMPANIES)];
    let mut companies = join_counts(shown);
    if by_company.len() > shown.len() {
        companies.push_str(&format!(", +{} more", by_company.len() - shown.len()));
    }
    lines.push(format!("Top companies: {companies}"));
    lines.push(format!(
        "With salary: {}/{}",
        metrics::salary_coverage(jobs),
        jobs.len()
    ));

    lines.push(String::new());
    lines.extend(jobs.iter().enumerate().map(|(i, job)| job_line(i + 1, job)));
    TextSummary { lines }
}

fn join_counts(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(k, n)| format!("{k} ({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn job_line(n: usize, job: &Job) -> String {
    let title = job.title().unwrap_or(Cow::Borrowed("No title"));
    let mut line = format!("{n:>3}. {title}");
    for part in [job.company(), job.location(), job.source(), job.salary()]
        .into_iter()
        .flatten()
    {
        line.push_str(" | ");
        line.push_str(&part);
    }
    if let Some(posted) = job.date_posted() {
        line.push_str(&format!(" | posted {posted}"));
    }
    if let Some(url) = job.url() {
        line.push_str(&format!("\n     {url}"));
    }
    line
}

pub(crate) fn report_lines(reports: &[Report]) -> TextSummary {
    if reports.is_empty() {
        return TextSummary {
            lines: vec!["No saved reports yet.".to_string()],
        };
    }
    let lines = reports
        .iter()
        .map(|r| {
            let kind = r.report_type.as_deref().unwrap_or("scrape");
            let count = r
                .job_count
                .map(|n| format!("{n} jobs"))
                .unwrap_or_else(|| "-".into());
            let created = r.created_at.as_deref().unwrap_or("-");
            let mut line = format!("#{:<5} {} [{kind}] {count}, {created}", r.id, r.title);
            if let Some(desc) = r.description.as_deref().filter(|d| !d.trim().is_empty()) {
                line.push_str(&format!("\n       {desc}"));
            }
            line
        })
        .collect();
    TextSummary { lines }
}

/// Detail view of one report: header plus its decoded jobs.
pub(crate) fn report_detail(report: &Report) -> TextSummary {
    let mut lines = report_lines(std::slice::from_ref(report)).lines;
    match (report.sources(), report.jobs()) {
        (Ok(sources), Ok(jobs)) => {
            let keyword = report.keyword.as_deref().unwrap_or("-");
            lines.extend(build_scrape_summary(keyword, &sources, &jobs).lines);
        }
        (Err(e), _) | (_, Err(e)) => {
            lines.push(format!("Stored data could not be decoded: {e}"));
        }
    }
    TextSummary { lines }
}

pub(crate) fn user_line(user: &User) -> String {
    format!("{} <{}> (id {})", user.username, user.email, user.id)
}

pub(crate) fn source_lines(sources: &[Source]) -> TextSummary {
    if sources.is_empty() {
        return TextSummary {
            lines: vec!["No sources available.".to_string()],
        };
    }
    TextSummary {
        lines: sources
            .iter()
            .map(|s| format!("{:<16} {}", s.id, s.name))
            .collect(),
    }
}

pub(crate) fn url_lines(catalog: &UrlCatalog) -> TextSummary {
    let mut lines = Vec::new();
    for (label, urls) in [("Static", &catalog.static_urls), ("Dynamic", &catalog.dynamic_urls)] {
        lines.push(format!("{label} URLs ({}):", urls.len()));
        lines.extend(urls.iter().map(|u| format!("  {u}")));
    }
    TextSummary { lines }
}
