//! Authentication session manager.
//!
//! Sole owner of the bearer token: it persists the token, keeps the outbound `Credential` in
//! step with it, and resolves the user profile. Report CRUD goes through here too, but never
//! changes the session.

mod credential;

pub use credential::Credential;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::model::{ClientEvent, NewReport, Report, SessionState, User};
use crate::storage::TokenStore;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

const LOGIN_PATH: &str = "/api/supabase-auth/login";
const REGISTER_PATH: &str = "/api/supabase-auth/register";
const ME_PATH: &str = "/api/supabase-auth/me";
const REPORTS_PATH: &str = "/api/supabase-auth/reports";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct SessionManager {
    api: ApiClient,
    store: Box<dyn TokenStore>,
    token: Option<String>,
    state: SessionState,
    auth_resolved: bool,
    event_tx: Option<UnboundedSender<ClientEvent>>,
}

impl SessionManager {
    pub fn new(
        api: ApiClient,
        store: Box<dyn TokenStore>,
        event_tx: Option<UnboundedSender<ClientEvent>>,
    ) -> Self {
        Self {
            api,
            store,
            token: None,
            state: SessionState::Uninitialized,
            auth_resolved: false,
            event_tx,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Whether the startup verification has finished. Nothing should be shown as
    /// signed in or signed out before this is true.
    pub fn auth_resolved(&self) -> bool {
        self.auth_resolved
    }

    /// Load the persisted token and verify it. Without a token the session resolves
    /// straight to anonymous.
    pub async fn start(&mut self) -> &SessionState {
        let persisted = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted token");
                None
            }
        };

        match persisted {
            Some(token) => {
                self.adopt_token(token, false);
                // Failure already invalidated the session; the state says so.
                let _ = self.check_auth_status().await;
            }
            None => {
                self.auth_resolved = true;
                self.transition(SessionState::Anonymous);
            }
        }
        &self.state
    }

    /// Verify the current token with `whoAmI`. Any failure is a full logout.
    pub async fn check_auth_status(&mut self) -> Result<User> {
        if self.token.is_none() {
            self.auth_resolved = true;
            self.transition(SessionState::Anonymous);
            return Err(ClientError::Auth("Not logged in".into()));
        }

        self.transition(SessionState::Resolving);
        let result = self.who_am_i().await;
        match &result {
            Ok(user) => {
                tracing::info!(user = %user.username, "session verified");
                self.transition(SessionState::Authenticated(user.clone()));
            }
            Err(e) => {
                tracing::info!(error = %e, "stored session is no longer valid");
                self.logout();
            }
        }
        self.auth_resolved = true;
        result
    }

    /// Exchange credentials for a token, then resolve the profile with it.
    ///
    /// A rejected login leaves the session exactly as it was.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        let resp: TokenResponse = self
            .api
            .post(LOGIN_PATH, &LoginRequest { email, password }, "Login failed")
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "login rejected");
                e
            })?;

        // The credential is in place before the profile request is built.
        self.adopt_token(resp.access_token, true);
        self.transition(SessionState::Resolving);

        match self.who_am_i().await {
            Ok(user) => {
                tracing::info!(user = %user.username, "logged in");
                self.auth_resolved = true;
                self.transition(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                // A token that cannot be verified is useless; drop it.
                self.logout();
                Err(match e {
                    ClientError::Remote { status: None, .. } => {
                        ClientError::transport("Login failed")
                    }
                    other => other,
                })
            }
        }
    }

    /// Create an account. Does not sign in: the account must be verified by email first.
    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<()> {
        let _: serde_json::Value = self
            .api
            .post(
                REGISTER_PATH,
                &RegisterRequest {
                    email,
                    username,
                    password,
                },
                "Registration failed",
            )
            .await?;
        tracing::info!(%email, "registration accepted, awaiting email verification");
        Ok(())
    }

    /// Drop the session locally. Never contacts the service and cannot fail.
    pub fn logout(&mut self) {
        // Clear the outbound credential first so no later request can carry it.
        self.api.credential().clear();
        self.token = None;
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted token");
        }
        self.auth_resolved = true;
        self.transition(SessionState::Anonymous);
    }

    pub async fn save_report(&self, report: &NewReport) -> Result<Report> {
        let saved: Report = self
            .api
            .post(REPORTS_PATH, report, "Failed to save report")
            .await?;
        tracing::info!(id = saved.id, title = %saved.title, "report saved");
        self.emit(ClientEvent::ReportsChanged);
        Ok(saved)
    }

    pub async fn get_user_reports(&self) -> Result<Vec<Report>> {
        self.api.get(REPORTS_PATH, "Failed to fetch reports").await
    }

    pub async fn get_report(&self, id: i64) -> Result<Report> {
        self.api
            .get(&format!("{REPORTS_PATH}/{id}"), "Failed to fetch report")
            .await
    }

    pub async fn delete_report(&self, id: i64) -> Result<()> {
        self.api
            .delete(&format!("{REPORTS_PATH}/{id}"), None, "Failed to delete report")
            .await?;
        tracing::info!(id, "report deleted");
        self.emit(ClientEvent::ReportsChanged);
        Ok(())
    }

    async fn who_am_i(&self) -> Result<User> {
        self.api.get(ME_PATH, "Failed to verify session").await
    }

    /// Install a token in memory and on the outbound credential, optionally persisting it.
    fn adopt_token(&mut self, token: String, persist: bool) {
        if persist {
            if let Err(e) = self.store.save(&token) {
                tracing::warn!(error = %e, "failed to persist token; session will not survive restart");
            }
        }
        self.api.credential().set(&token);
        self.token = Some(token);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next.clone();
        self.emit(ClientEvent::Session(next));
    }

    fn emit(&self, event: ClientEvent) {
        if let Some(tx) = self.event_tx.as_ref() {
            let _ = tx.send(event);
        }
    }
}
