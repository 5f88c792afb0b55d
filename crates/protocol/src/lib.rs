//! Wire-level data model for the rexwall HTTP API.
//!
//! The firewall daemon speaks JSON over HTTP. Mutating endpoints answer with
//! a [`ServerResponse`] envelope whose `status` field carries either the
//! literal `"ok"` or a human-readable rejection reason; transport failures
//! surface separately as HTTP status codes. Filter patterns always travel in
//! transport form (base64 of the raw pattern bytes, see `rexwall-codec`), so
//! binary patterns survive the JSON layer untouched.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Response envelope ────────────────────────────────────────────────────

/// The one value of [`ServerResponse::status`] that means success.
pub const STATUS_OK: &str = "ok";

/// Acknowledgement envelope returned by every mutating endpoint.
///
/// Any status other than [`STATUS_OK`] is a domain-level rejection and
/// carries the reason in the field itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub status: String,
}

impl ServerResponse {
    pub fn error(reason: impl Into<String>) -> Self {
        Self { status: reason.into() }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Collapse the envelope into a `Result`, keeping the rejection reason.
    pub fn into_result(self) -> Result<(), String> {
        if self.is_ok() { Ok(()) } else { Err(self.status) }
    }
}

// ── Traffic direction ────────────────────────────────────────────────────

/// Raised when a direction argument is not one of the three known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown traffic direction {0:?} (expected C, S or B)")]
pub struct ParseDirectionError(String);

/// Which side of the proxied connection a filter inspects.
///
/// Wire codes and human labels form a fixed bijection over exactly three
/// values; an unknown code is a deserialization error, never a fourth state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficDirection {
    /// Packets sent by the client towards the protected service.
    #[serde(rename = "C")]
    ClientToServer,
    /// Packets sent by the protected service back to the client.
    #[serde(rename = "S")]
    ServerToClient,
    /// Both directions.
    #[default]
    #[serde(rename = "B")]
    Both,
}

impl TrafficDirection {
    pub const ALL: [Self; 3] = [Self::ClientToServer, Self::ServerToClient, Self::Both];

    /// Single-letter code used by the HTTP API.
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::ClientToServer => "C",
            Self::ServerToClient => "S",
            Self::Both => "B",
        }
    }

    /// Arrow label shown to operators.
    pub fn label(self) -> &'static str {
        match self {
            Self::ClientToServer => "C -> S",
            Self::ServerToClient => "S -> C",
            Self::Both => "S <-> C",
        }
    }
}

impl fmt::Display for TrafficDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for TrafficDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "client-to-server" => Ok(Self::ClientToServer),
            "s" | "server-to-client" => Ok(Self::ServerToClient),
            "b" | "both" | "bidirectional" => Ok(Self::Both),
            _ => Err(ParseDirectionError(s.to_owned())),
        }
    }
}

// ── Polarity ─────────────────────────────────────────────────────────────

/// Raised when a polarity argument is neither blacklist nor whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown polarity {0:?} (expected blacklist or whitelist)")]
pub struct ParsePolarityError(String);

/// What a match means: drop the packet (blacklist) or drop everything that
/// does not match (whitelist). The wire form is the `is_blacklist` boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Blacklist,
    Whitelist,
}

impl Polarity {
    pub fn from_wire(is_blacklist: bool) -> Self {
        if is_blacklist { Self::Blacklist } else { Self::Whitelist }
    }

    pub fn is_blacklist(self) -> bool {
        matches!(self, Self::Blacklist)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
        })
    }
}

impl FromStr for Polarity {
    type Err = ParsePolarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blacklist" | "black" => Ok(Self::Blacklist),
            "whitelist" | "white" => Ok(Self::Whitelist),
            _ => Err(ParsePolarityError(s.to_owned())),
        }
    }
}

// ── Service state ────────────────────────────────────────────────────────

/// Lifecycle state the daemon reports for a proxied service.
///
/// Decoded through a catch-all: a state string this client does not know
/// about becomes [`ServiceStatus::Unknown`] instead of failing the whole
/// service list, so old clients keep working against newer daemons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceStatus {
    /// Proxying and filtering.
    Active,
    /// Proxy down, packets refused.
    Stopped,
    /// Proxying without filtering.
    Paused,
    #[default]
    Unknown,
}

impl ServiceStatus {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stopped => "stop",
            Self::Paused => "pause",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for ServiceStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "active" => Self::Active,
            "stop" => Self::Stopped,
            "pause" => Self::Paused,
            _ => Self::Unknown,
        }
    }
}

impl From<ServiceStatus> for String {
    fn from(status: ServiceStatus) -> Self {
        status.as_wire().to_owned()
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_wire())
    }
}

// ── Services ─────────────────────────────────────────────────────────────

/// One proxied endpoint, as reported by the daemon. The daemon owns this
/// record; clients only ever hold a cached copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub status: ServiceStatus,
    /// Port exposed to the network.
    pub public_port: u16,
    /// Port the proxied service actually listens on.
    pub internal_port: u16,
    /// Packets matched by any filter of this service.
    pub n_packets: u64,
    pub n_filters: u64,
}

// ── Filters ──────────────────────────────────────────────────────────────

/// One regex rule attached to a service.
///
/// `pattern` is the transport form: base64 of the raw pattern bytes, opaque
/// at this layer. Filters are immutable once created; editing one means
/// deleting it and creating a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexFilter {
    pub id: u32,
    pub service_id: String,
    pub pattern: String,
    pub direction: TrafficDirection,
    pub is_blacklist: bool,
    pub active: bool,
    pub is_case_sensitive: bool,
    pub n_packets: u64,
}

impl RegexFilter {
    pub fn polarity(&self) -> Polarity {
        Polarity::from_wire(self.is_blacklist)
    }
}

// ── Instance status ──────────────────────────────────────────────────────

/// Whether the daemon has been through first-time setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceMode {
    /// Fresh install, no password configured yet.
    Init,
    /// Normal operation.
    Run,
}

impl fmt::Display for InstanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Init => "init",
            Self::Run => "run",
        })
    }
}

/// Reply of the `status` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: InstanceMode,
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ── Global stats ─────────────────────────────────────────────────────────

/// Counters from the `general-stats` endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallStats {
    pub services: u64,
    pub filters: u64,
    pub matched_packets: u64,
}

// ── Request payloads ─────────────────────────────────────────────────────

/// Body of `regexes/add`. `pattern` must already be in transport form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterAddRequest {
    pub service_id: String,
    pub pattern: String,
    pub direction: TrafficDirection,
    pub is_blacklist: bool,
    pub active: bool,
    pub is_case_sensitive: bool,
}

/// Body of `services/add`. The daemon picks the internal port itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddRequest {
    pub name: String,
    pub public_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Body of `set-password`, only accepted while the instance is in
/// [`InstanceMode::Init`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// Body of `change-password`. `expire` invalidates every other session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
    pub expire: bool,
}

/// Body of `reset`. `delete` also wipes every configured service instead of
/// only restarting the filtering engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub delete: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn envelope_ok_sentinel() {
        let res: ServerResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(res.is_ok());
        assert_eq!(res.into_result(), Ok(()));
    }

    #[test]
    fn envelope_keeps_rejection_reason() {
        let res = ServerResponse::error("Invalid regex");
        assert!(!res.is_ok());
        assert_eq!(res.into_result(), Err("Invalid regex".to_owned()));
    }

    #[test]
    fn direction_wire_codes_round_trip() {
        for dir in TrafficDirection::ALL {
            let json = serde_json::to_string(&dir).unwrap();
            assert_eq!(json, format!("\"{}\"", dir.wire_code()));
            let back: TrafficDirection = serde_json::from_str(&json).unwrap();
            assert_eq!(back, dir);
        }
    }

    #[test]
    fn direction_rejects_unknown_wire_code() {
        assert!(serde_json::from_str::<TrafficDirection>("\"X\"").is_err());
        // Wire codes are exact; only FromStr is forgiving about case.
        assert!(serde_json::from_str::<TrafficDirection>("\"c\"").is_err());
    }

    #[test]
    fn direction_labels() {
        assert_eq!(TrafficDirection::ClientToServer.label(), "C -> S");
        assert_eq!(TrafficDirection::ServerToClient.label(), "S -> C");
        assert_eq!(TrafficDirection::Both.label(), "S <-> C");
    }

    #[test]
    fn direction_parses_cli_spellings() {
        let dir: TrafficDirection = "c".parse().unwrap();
        assert_eq!(dir, TrafficDirection::ClientToServer);
        let dir: TrafficDirection = "Both".parse().unwrap();
        assert_eq!(dir, TrafficDirection::Both);
        let dir: TrafficDirection = "server-to-client".parse().unwrap();
        assert_eq!(dir, TrafficDirection::ServerToClient);
        assert!("northbound".parse::<TrafficDirection>().is_err());
    }

    #[test]
    fn polarity_parses_cli_spellings() {
        let pol: Polarity = "whitelist".parse().unwrap();
        assert_eq!(pol, Polarity::Whitelist);
        let pol: Polarity = "Black".parse().unwrap();
        assert_eq!(pol, Polarity::Blacklist);
        assert!("greylist".parse::<Polarity>().is_err());
    }

    #[test]
    fn polarity_wire_flag() {
        assert_eq!(Polarity::from_wire(true), Polarity::Blacklist);
        assert_eq!(Polarity::from_wire(false), Polarity::Whitelist);
        assert!(Polarity::Blacklist.is_blacklist());
        assert!(!Polarity::Whitelist.is_blacklist());
    }

    #[test]
    fn service_status_known_states() {
        let svc: Service = serde_json::from_str(
            r#"{"id":"sshd","name":"ssh","status":"pause","public_port":22,
                "internal_port":2222,"n_packets":9,"n_filters":2}"#,
        )
        .unwrap();
        assert_eq!(svc.status, ServiceStatus::Paused);
    }

    #[test]
    fn service_status_unknown_state_does_not_fail() {
        let status: ServiceStatus = serde_json::from_str("\"wait\"").unwrap();
        assert_eq!(status, ServiceStatus::Unknown);
    }

    #[test]
    fn filter_round_trips_and_exposes_polarity() {
        let filter = RegexFilter {
            id: 7,
            service_id: "sshd".into(),
            pattern: "LipBQT0uKg==".into(),
            direction: TrafficDirection::ClientToServer,
            is_blacklist: true,
            active: true,
            is_case_sensitive: false,
            n_packets: 0,
        };
        let json = serde_json::to_string(&filter).unwrap();
        let back: RegexFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
        assert_eq!(back.polarity(), Polarity::Blacklist);
    }

    #[test]
    fn filter_add_request_uses_wire_names() {
        let req = FilterAddRequest {
            service_id: "sshd".into(),
            pattern: "Lio=".into(),
            direction: TrafficDirection::Both,
            is_blacklist: false,
            active: true,
            is_case_sensitive: true,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["direction"], "B");
        assert_eq!(value["is_blacklist"], false);
        assert_eq!(value["service_id"], "sshd");
    }

    #[test]
    fn server_status_version_is_optional() {
        let st: ServerStatus =
            serde_json::from_str(r#"{"status":"init","logged_in":false}"#).unwrap();
        assert_eq!(st.status, InstanceMode::Init);
        assert!(!st.logged_in);
        assert!(st.version.is_none());

        let st: ServerStatus = serde_json::from_str(
            r#"{"status":"run","logged_in":true,"version":"0.4.1"}"#,
        )
        .unwrap();
        assert_eq!(st.status, InstanceMode::Run);
        assert_eq!(st.version.as_deref(), Some("0.4.1"));
    }
}
