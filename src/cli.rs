use crate::api::{ApiClient, HttpTransport};
use crate::error::{ClientError, Severity};
use crate::model::{ClientConfig, ClientEvent, ScrapeStatus, UrlKind};
use crate::orchestrator::{process_scrape_completion, PostScrapeOptions, ScrapeController};
use crate::session::{Credential, SessionManager};
use crate::storage::{self, FileTokenStore};
use crate::text_summary::{self, TextSummary};
use crate::verification;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// Thin wrapper that routes results to stdout and notices to stderr.
#[derive(Clone)]
struct Output {
    tx: mpsc::UnboundedSender<OutputLine>,
    json: bool,
}

impl Output {
    fn line(&self, msg: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Stdout(msg.into()));
    }

    fn summary(&self, summary: TextSummary) {
        for line in summary.lines {
            self.line(line);
        }
    }

    fn notice(&self, severity: Severity, msg: impl AsRef<str>) {
        let msg = match severity {
            Severity::Info => msg.as_ref().to_string(),
            other => format!("{}: {}", other.label(), msg.as_ref()),
        };
        let _ = self.tx.send(OutputLine::Stderr(msg));
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("failed to encode JSON output")?;
        self.line(out);
        Ok(())
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "talenttrek",
    version,
    about = "Client for the TalentTrek job scraping service"
)]
pub struct Cli {
    /// Base URL of the TalentTrek API
    #[arg(
        long,
        global = true,
        env = "TALENTTREK_BASE_URL",
        default_value = "http://localhost:8000"
    )]
    pub base_url: String,

    /// Per-request timeout
    #[arg(long, global = true, default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Where the session token is persisted
    #[arg(long, global = true, env = "TALENTTREK_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Sign in and persist the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TALENTTREK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account (verify the emailed link before logging in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "TALENTTREK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List selectable job sources
    Sources,
    /// Manage scrape target URLs
    Urls {
        #[command(subcommand)]
        action: UrlsCommand,
    },
    /// Scrape jobs for a keyword across sources
    Scrape(ScrapeArgs),
    /// Manage saved reports
    Reports {
        #[command(subcommand)]
        action: ReportsCommand,
    },
    /// Check an email verification link
    Verify { link: String },
}

#[derive(Debug, Args, Clone)]
pub struct ScrapeArgs {
    /// Search keyword
    #[arg(long, short)]
    pub keyword: String,

    /// Source id to include (repeatable)
    #[arg(long = "source", short = 's')]
    pub sources: Vec<String>,

    /// Save the results as a report with this title
    #[arg(long)]
    pub save: Option<String>,

    /// Description for the saved report
    #[arg(long, requires = "save")]
    pub description: Option<String>,

    /// Export results as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export results as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum UrlsCommand {
    List,
    Add {
        #[arg(long, value_enum)]
        kind: UrlKind,
        #[arg(long)]
        url: String,
    },
    Remove {
        #[arg(long, value_enum)]
        kind: UrlKind,
        #[arg(long)]
        url: String,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ReportsCommand {
    List,
    Show { id: i64 },
    Delete { id: i64 },
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("talenttrek-cli/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: Duration::from(args.timeout),
        token_path: args.token_file.clone(),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let transport = HttpTransport::new(&cfg)?;
    let api = ApiClient::new(Arc::new(transport), Credential::default());
    let token_path = cfg
        .token_path
        .clone()
        .unwrap_or_else(storage::default_token_path);
    tracing::debug!(path = %token_path.display(), "token slot");

    let (out_tx, out_handle) = spawn_output_writer();
    let out = Output {
        tx: out_tx,
        json: args.json,
    };
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let events = spawn_event_printer(evt_rx, out.clone());

    let mut session = SessionManager::new(
        api,
        Box::new(FileTokenStore::new(token_path)),
        Some(evt_tx.clone()),
    );
    let res = dispatch(&args.command, &mut session, evt_tx, &out).await;

    // Every event sender must be gone before the printer can finish.
    drop(session);
    let _ = events.await;
    drop(out);
    let _ = out_handle.await;
    res
}

/// Forward client events to the user; session transitions only go to the log.
fn spawn_event_printer(
    mut rx: mpsc::UnboundedReceiver<ClientEvent>,
    out: Output,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            match ev {
                ClientEvent::Session(state) => {
                    tracing::debug!(?state, "session changed");
                }
                ClientEvent::Scrape(ScrapeStatus::Running) if !out.json => {
                    out.notice(Severity::Info, "Scraping…");
                }
                ClientEvent::Scrape(status) => {
                    tracing::debug!(status = status.label(), "scrape changed");
                }
                ClientEvent::ReportsChanged => {
                    tracing::debug!("reports changed");
                }
                ClientEvent::Info(msg) => {
                    if !out.json {
                        out.notice(Severity::Info, msg);
                    }
                }
            }
        }
    })
}

async fn dispatch(
    command: &Command,
    session: &mut SessionManager,
    evt_tx: mpsc::UnboundedSender<ClientEvent>,
    out: &Output,
) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = session.login(email, password).await?;
            if out.json {
                out.json(&user)?;
            } else {
                out.line(format!("Logged in as {}", text_summary::user_line(&user)));
            }
            Ok(())
        }
        Command::Register {
            email,
            username,
            password,
        } => {
            session.register(email, username, password).await?;
            out.notice(
                Severity::Info,
                "Registration successful. Check your email and open the verification link before logging in.",
            );
            Ok(())
        }
        Command::Logout => {
            session.logout();
            out.notice(Severity::Info, "Logged out successfully");
            Ok(())
        }
        Command::Verify { link } => {
            if verification::is_signup_confirmation(link) {
                out.line("Email verified successfully! You can now log in.");
                Ok(())
            } else {
                Err(ClientError::validation("Invalid verification link").into())
            }
        }
        authenticated => {
            require_session(session).await?;
            let res = run_authenticated(authenticated, session, evt_tx, out).await;
            if let Err(e) = &res {
                if e.downcast_ref::<ClientError>().is_some_and(ClientError::is_auth) {
                    // The service no longer accepts this token.
                    session.logout();
                    out.notice(Severity::Info, "Session ended; please log in again.");
                }
            }
            res
        }
    }
}

async fn require_session(session: &mut SessionManager) -> Result<()> {
    session.start().await;
    anyhow::ensure!(session.auth_resolved(), "session did not resolve");
    tracing::debug!(state = ?session.state(), "session resolved");
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(ClientError::Auth("Not logged in. Run `talenttrek login` first.".into()).into())
    }
}

async fn run_authenticated(
    command: &Command,
    session: &mut SessionManager,
    evt_tx: mpsc::UnboundedSender<ClientEvent>,
    out: &Output,
) -> Result<()> {
    match command {
        Command::Whoami => {
            let user = session
                .user()
                .cloned()
                .context("session resolved without a user")?;
            if out.json {
                out.json(&user)?;
            } else {
                out.line(text_summary::user_line(&user));
            }
        }
        Command::Sources => {
            let sources = session.api().fetch_sources().await;
            if out.json {
                out.json(&sources)?;
            } else {
                out.summary(text_summary::source_lines(&sources));
            }
        }
        Command::Urls { action } => run_urls(action, session, out).await?,
        Command::Reports { action } => run_reports(action, session, out).await?,
        Command::Scrape(scrape) => run_scrape(scrape, session, evt_tx, out).await?,
        Command::Login { .. }
        | Command::Register { .. }
        | Command::Logout
        | Command::Verify { .. } => {
            anyhow::bail!("command does not need a session")
        }
    }
    Ok(())
}

async fn run_urls(action: &UrlsCommand, session: &SessionManager, out: &Output) -> Result<()> {
    let api = session.api();
    match action {
        UrlsCommand::List => {
            let catalog = api.list_urls().await?;
            if out.json {
                out.json(&catalog)?;
            } else {
                out.summary(text_summary::url_lines(&catalog));
            }
        }
        UrlsCommand::Add { kind, url } => {
            api.add_url(*kind, url).await?;
            out.notice(Severity::Info, format!("Added {} URL!", kind.as_path_str()));
        }
        UrlsCommand::Remove { kind, url } => {
            api.remove_url(*kind, url).await?;
            out.notice(Severity::Info, format!("Removed {} URL!", kind.as_path_str()));
        }
    }
    Ok(())
}

async fn run_reports(action: &ReportsCommand, session: &SessionManager, out: &Output) -> Result<()> {
    match action {
        ReportsCommand::List => {
            let reports = session.get_user_reports().await?;
            if out.json {
                out.json(&reports)?;
            } else {
                out.summary(text_summary::report_lines(&reports));
            }
        }
        ReportsCommand::Show { id } => {
            let report = session.get_report(*id).await?;
            if out.json {
                out.json(&report)?;
            } else {
                out.summary(text_summary::report_detail(&report));
            }
        }
        ReportsCommand::Delete { id } => {
            session.delete_report(*id).await?;
            out.notice(Severity::Info, format!("Deleted report #{id}"));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ScrapeOutput<'a> {
    keyword: &'a str,
    sources: &'a [String],
    jobs: &'a [crate::model::Job],
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_report: Option<&'a crate::model::Report>,
}

async fn run_scrape(
    args: &ScrapeArgs,
    session: &SessionManager,
    evt_tx: mpsc::UnboundedSender<ClientEvent>,
    out: &Output,
) -> Result<()> {
    let requested = unique_ids(&args.sources);
    let known = session.api().fetch_sources().await;
    if !known.is_empty() {
        for id in requested.iter().filter(|id| !known.iter().any(|s| s.id == **id)) {
            out.notice(Severity::Warning, format!("unknown source id '{id}'"));
        }
    }

    let mut controller = ScrapeController::new(session.api().clone(), Some(evt_tx));
    controller.set_keyword(args.keyword.as_str());
    for id in &requested {
        controller.toggle_source(id);
    }
    controller.submit_scrape().await?;
    tracing::debug!(status = controller.status().label(), "scrape settled");

    let opts = PostScrapeOptions {
        save_title: args.save.clone(),
        save_description: args.description.clone(),
        export_json: args.export_json.clone(),
        export_csv: args.export_csv.clone(),
    };
    let processed = process_scrape_completion(&controller, session, &opts).await;

    if out.json {
        out.json(&ScrapeOutput {
            keyword: controller.keyword(),
            sources: controller.selected_sources(),
            jobs: controller.results(),
            saved_report: processed.saved_report.as_ref(),
        })?;
    } else {
        out.summary(text_summary::build_scrape_summary(
            controller.keyword(),
            controller.selected_sources(),
            controller.results(),
        ));
        if let Some(report) = processed.saved_report.as_ref() {
            out.notice(
                Severity::Info,
                format!("Saved report #{}: {}", report.id, report.title),
            );
        }
    }
    for msg in &processed.export_messages {
        out.notice(Severity::Info, msg);
    }

    match processed.save_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Trimmed, non-empty ids in first-seen order; repeats on the command line are not toggles.
fn unique_ids(ids: &[String]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for id in ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeTransport;
    use crate::model::SessionState;
    use crate::storage::{MemoryTokenStore, TokenStore};
    use clap::CommandFactory;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scrape_flags_parse() {
        let cli = Cli::try_parse_from([
            "talenttrek",
            "--base-url",
            "https://api.example",
            "scrape",
            "-k",
            "engineer",
            "-s",
            "indeed",
            "--source",
            "remoteok",
            "--save",
            "Weekly",
            "--timeout",
            "5s",
        ])
        .unwrap();

        let cfg = build_config(&cli);
        assert_eq!(cfg.base_url, "https://api.example");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        match cli.command {
            Command::Scrape(args) => {
                assert_eq!(args.keyword, "engineer");
                assert_eq!(args.sources, vec!["indeed", "remoteok"]);
                assert_eq!(args.save.as_deref(), Some("Weekly"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn description_requires_save() {
        let res = Cli::try_parse_from([
            "talenttrek",
            "scrape",
            "-k",
            "engineer",
            "-s",
            "indeed",
            "--description",
            "orphan",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn url_kind_parses() {
        let cli = Cli::try_parse_from([
            "talenttrek",
            "urls",
            "add",
            "--kind",
            "dynamic",
            "--url",
            "https://jobs.example",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Urls {
                action: UrlsCommand::Add {
                    kind: UrlKind::Dynamic,
                    ..
                }
            }
        ));
    }

    #[test]
    fn repeated_sources_are_collapsed() {
        let ids = vec![
            "indeed".to_string(),
            " remoteok ".to_string(),
            "indeed".to_string(),
            "".to_string(),
        ];
        assert_eq!(unique_ids(&ids), vec!["indeed", "remoteok"]);
    }

    #[tokio::test]
    async fn rejected_token_ends_the_session() {
        let fake = Arc::new(FakeTransport::default());
        fake.respond(
            Method::GET,
            "/api/supabase-auth/me",
            200,
            json!({"id": 7, "username": "ada", "email": "a@b.com"}),
        );
        fake.respond(
            Method::GET,
            "/api/supabase-auth/reports",
            401,
            json!({"detail": "Not authenticated"}),
        );
        let credential = Credential::default();
        let store = Arc::new(MemoryTokenStore::with_token("tok"));
        let mut session = SessionManager::new(
            ApiClient::new(fake.clone(), credential.clone()),
            Box::new(store.clone()),
            None,
        );
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let out = Output {
            tx: out_tx,
            json: false,
        };
        let (evt_tx, _evt_rx) = mpsc::unbounded_channel();

        let err = dispatch(
            &Command::Reports {
                action: ReportsCommand::List,
            },
            &mut session,
            evt_tx,
            &out,
        )
        .await
        .unwrap_err();

        assert!(err.downcast_ref::<ClientError>().is_some_and(ClientError::is_auth));
        assert_eq!(session.state(), &SessionState::Anonymous);
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(credential.current(), None);
        assert_eq!(
            fake.requests_to("/api/supabase-auth/reports")[0].bearer.as_deref(),
            Some("tok")
        );

        let mut notices = Vec::new();
        while let Ok(line) = out_rx.try_recv() {
            if let OutputLine::Stderr(msg) = line {
                notices.push(msg);
            }
        }
        assert_eq!(notices, vec!["Session ended; please log in again."]);
    }
}
