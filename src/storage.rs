//! Local persistence: the token slot and result exports.

use crate::error::{ClientError, Result};
use crate::model::Job;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed name of the persisted token slot.
pub const TOKEN_SLOT: &str = "token";

/// Durable storage for the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<()> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// `<data dir>/talenttrek/token`, falling back to `~/.talenttrek/token`.
pub fn default_token_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("talenttrek").join(TOKEN_SLOT),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".talenttrek")
            .join(TOKEN_SLOT),
    }
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a half-written token.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, token)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            slot: std::sync::Mutex::new(Some(token.to_string())),
        }
    }
}

#[cfg(test)]
impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Serialize)]
struct JobExport<'a> {
    timestamp_utc: String,
    keyword: &'a str,
    sources: &'a [String],
    job_count: usize,
    jobs: &'a [Job],
}

pub fn export_json(path: &Path, keyword: &str, sources: &[String], jobs: &[Job]) -> Result<()> {
    let export = JobExport {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        keyword,
        sources,
        job_count: jobs.len(),
        jobs,
    };
    let out = serde_json::to_string_pretty(&export)
        .map_err(|e| ClientError::storage(e.to_string()))?;
    write_creating_parent(path, out.as_bytes())
}

pub fn export_csv(path: &Path, jobs: &[Job]) -> Result<()> {
    write_creating_parent(path, render_csv(jobs).as_bytes())
}

fn render_csv(jobs: &[Job]) -> String {
    let mut out = String::from("title,company,location,source,salary,date_posted,url\n");
    for job in jobs {
        let row = [
            job.title(),
            job.company(),
            job.location(),
            job.source(),
            job.salary(),
            job.date_posted(),
            job.url(),
        ]
        .iter()
        .map(|field| csv_field(field.as_deref().unwrap_or("")))
        .collect::<Vec<_>>()
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_creating_parent(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes).map_err(|e| {
        ClientError::storage(format!("failed to write {}: {e}", path.display()))
    })
}
