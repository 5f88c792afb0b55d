//! Typed surface of the daemon's HTTP API.
//!
//! Read endpoints return their JSON payload directly. Mutating endpoints
//! answer with the [`ServerResponse`] envelope and surface here as `Ok(())`
//! or [`Error::Rejected`]. Command-style mutations (delete, start, stop,
//! pause, regen-port, logout) ride on GET; only payload-carrying calls POST.

use {
    reqwest::StatusCode,
    serde::{Serialize, de::DeserializeOwned},
    tracing::debug,
    url::Url,
};

use rexwall_protocol::{
    ChangePasswordRequest, FilterAddRequest, FirewallStats, LoginRequest, RegexFilter,
    ResetRequest, ServerResponse, ServerStatus, Service, ServiceAddRequest, SetPasswordRequest,
};

use crate::{
    error::{Error, Result},
    session::SessionContext,
};

/// HTTP client for one firewall daemon.
///
/// Cloning is cheap and clones share the cookie store and session context,
/// so a 401 seen by any clone is announced to all subscribers.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionContext,
}

impl ApiClient {
    /// Build a client for the daemon at `base_url` (scheme, host, port and
    /// an optional path prefix).
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base,
            session: SessionContext::new(),
        })
    }

    /// Session context shared by all clones of this client.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(&format!("api/{path}"))?)
    }

    // ── Request plumbing ─────────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "api get");
        let response = self.http.get(url).send().await?;
        self.read_body(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "api post");
        let response = self.http.post(url).json(body).send().await?;
        self.read_body(response).await
    }

    /// Shared tail of every call: 401 handling first, then transport
    /// errors, then the JSON body.
    async fn read_body<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            return Err(Error::Status {
                code: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_owned(),
            });
        }
        Ok(response.json().await?)
    }

    async fn get_ack(&self, path: &str) -> Result<()> {
        let response: ServerResponse = self.get_json(path).await?;
        response.into_result().map_err(Error::Rejected)
    }

    async fn post_ack<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let response: ServerResponse = self.post_json(path, body).await?;
        response.into_result().map_err(Error::Rejected)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub async fn server_status(&self) -> Result<ServerStatus> {
        self.get_json("status").await
    }

    pub async fn firewall_stats(&self) -> Result<FirewallStats> {
        self.get_json("general-stats").await
    }

    pub async fn list_services(&self) -> Result<Vec<Service>> {
        self.get_json("services").await
    }

    pub async fn service(&self, service_id: &str) -> Result<Service> {
        self.get_json(&format!("service/{service_id}")).await
    }

    pub async fn service_filters(&self, service_id: &str) -> Result<Vec<RegexFilter>> {
        self.get_json(&format!("service/{service_id}/regexes")).await
    }

    // ── Service commands ─────────────────────────────────────────────────

    pub async fn add_service(&self, request: &ServiceAddRequest) -> Result<()> {
        self.post_ack("services/add", request).await
    }

    pub async fn delete_service(&self, service_id: &str) -> Result<()> {
        self.get_ack(&format!("service/{service_id}/delete")).await
    }

    pub async fn start_service(&self, service_id: &str) -> Result<()> {
        self.get_ack(&format!("service/{service_id}/start")).await
    }

    pub async fn stop_service(&self, service_id: &str) -> Result<()> {
        self.get_ack(&format!("service/{service_id}/stop")).await
    }

    pub async fn pause_service(&self, service_id: &str) -> Result<()> {
        self.get_ack(&format!("service/{service_id}/pause")).await
    }

    /// Ask the daemon to rebind the service to a fresh internal port.
    pub async fn regen_port(&self, service_id: &str) -> Result<()> {
        self.get_ack(&format!("service/{service_id}/regen-port")).await
    }

    // ── Filter commands ──────────────────────────────────────────────────

    pub async fn add_filter(&self, request: &FilterAddRequest) -> Result<()> {
        self.post_ack("regexes/add", request).await
    }

    pub async fn delete_filter(&self, filter_id: u32) -> Result<()> {
        self.get_ack(&format!("regex/{filter_id}/delete")).await
    }

    // ── Authentication and lifecycle ─────────────────────────────────────

    pub async fn login(&self, password: &str) -> Result<()> {
        let request = LoginRequest {
            password: password.to_owned(),
        };
        self.post_ack("login", &request).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.get_ack("logout").await
    }

    /// First-time setup; only accepted while the instance is in init mode.
    pub async fn set_password(&self, password: &str) -> Result<()> {
        let request = SetPasswordRequest {
            password: password.to_owned(),
        };
        self.post_ack("set-password", &request).await
    }

    /// `expire_sessions` logs out every other client.
    pub async fn change_password(&self, password: &str, expire_sessions: bool) -> Result<()> {
        let request = ChangePasswordRequest {
            password: password.to_owned(),
            expire: expire_sessions,
        };
        self.post_ack("change-password", &request).await
    }

    /// Wipe filtering state; with `delete_services` the services go too.
    pub async fn reset_firewall(&self, delete_services: bool) -> Result<()> {
        let request = ResetRequest {
            delete: delete_services,
        };
        self.post_ack("reset", &request).await
    }
}
