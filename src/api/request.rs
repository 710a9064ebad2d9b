//! Inbound request schemas and their validators

use crate::model::limits;
use crate::model::{NewScanSession, ScanStatus};
use crate::{ValidationError, ValidationResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::OnceLock;

const TARGET_URL_PATTERN: &str = r"^https?://[^\s/$.?#].[^\s]*$";

fn target_url_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TARGET_URL_PATTERN).expect("target URL pattern is valid"))
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Request to start a new scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    pub target_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl ScanRequest {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }

    /// Checks the URL pattern and every length bound
    pub fn validate(&self) -> ValidationResult<()> {
        let target = self.target_url.trim();
        if target.is_empty() {
            return Err(ValidationError::Missing {
                field: "target_url",
            });
        }

        check_len("target_url", Some(target), limits::TARGET_URL)?;

        if !target_url_regex().is_match(target) {
            return Err(ValidationError::InvalidFormat {
                field: "target_url",
                reason: "must be an http(s) URL".to_string(),
            });
        }

        url::Url::parse(target).map_err(|e| ValidationError::InvalidFormat {
            field: "target_url",
            reason: e.to_string(),
        })?;

        check_len("username", self.username.as_deref(), limits::USERNAME)?;
        check_len("password", self.password.as_deref(), limits::PASSWORD)?;
        check_len("auth_token", self.auth_token.as_deref(), limits::AUTH_TOKEN)?;
        check_len("payload", self.payload.as_deref(), limits::PAYLOAD)?;

        let has_username = self.username.as_deref().is_some_and(|u| !u.trim().is_empty());
        let has_password = self.password.as_deref().is_some_and(|p| !p.is_empty());
        if has_password && !has_username {
            return Err(ValidationError::Missing { field: "username" });
        }

        Ok(())
    }

    /// Validates the request and converts it into a session to persist
    pub fn into_new_session(self) -> ValidationResult<NewScanSession> {
        self.validate()?;
        Ok(NewScanSession {
            target_url: self.target_url.trim().to_string(),
            username: non_empty(self.username),
            password: self.password.filter(|p| !p.is_empty()),
            auth_token: non_empty(self.auth_token),
            payload: self.payload.filter(|p| !p.is_empty()),
        })
    }
}

/// Request to download one resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub resource_id: i64,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl DownloadRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.resource_id < 1 {
            return Err(ValidationError::OutOfRange {
                field: "resource_id",
                reason: format!("must be positive, got {}", self.resource_id),
            });
        }

        check_len("client_ip", self.client_ip.as_deref(), limits::CLIENT_IP)?;
        if let Some(ip) = &self.client_ip {
            ip.parse::<IpAddr>()
                .map_err(|e| ValidationError::InvalidFormat {
                    field: "client_ip",
                    reason: e.to_string(),
                })?;
        }

        check_len("user_agent", self.user_agent.as_deref(), limits::USER_AGENT)?;
        Ok(())
    }
}

/// Externally requested status change for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatusUpdate {
    pub status: ScanStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub total_resources_found: Option<u64>,
    #[serde(default)]
    pub scan_duration_seconds: Option<f64>,
}

impl ScanStatusUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        check_len(
            "error_message",
            self.error_message.as_deref(),
            limits::SESSION_ERROR_MESSAGE,
        )?;

        if let Some(duration) = self.scan_duration_seconds {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: "scan_duration_seconds",
                    reason: format!("must be a non-negative number, got {}", duration),
                });
            }
        }

        Ok(())
    }
}
