use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wom_leaders_core::config::{Config, DEFAULT_WOM_BASE_URL, DEFAULT_WOM_USER_AGENT};
use wom_leaders_core::error::AppError;
use wom_leaders_core::metric::Metric;
use wom_leaders_core::models::PlayerRankEntry;
use wom_leaders_core::traits::{LeaderboardClient, SubmissionReceipt};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

/// WOM rejects group names longer than this.
const MAX_GROUP_NAME_LEN: usize = 30;

/// Wise Old Man API client.
///
/// A submission registers the leaders with WOM through a short-lived
/// group: the group is created with the leaders as members, an update of
/// its outdated members is requested, and the group is deleted again.
///
/// Every submission names its group `<group_name> <8 hex chars>`, so a group
/// left behind by a failed delete never collides with a later one.
#[derive(Clone)]
pub struct WomClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    step_delay: Duration,
}

impl WomClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_base_url(DEFAULT_WOM_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, AppError> {
        Self::build(base_url, DEFAULT_WOM_USER_AGENT, None, DEFAULT_TIMEOUT)
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::build(
            &config.wom_api_url(),
            &config.wom_user_agent,
            config.wom_api_key.clone(),
            config.http_timeout,
        )
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Pause between the create, update and delete calls.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    fn build(
        base_url: &str,
        user_agent: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: timeout.as_secs(),
            step_delay: DEFAULT_STEP_DELAY,
        })
    }

    async fn create_group(
        &self,
        name: &str,
        entries: &[PlayerRankEntry],
    ) -> Result<CreatedGroup, AppError> {
        let request = CreateGroupRequest {
            name,
            members: entries
                .iter()
                .map(|e| MemberFragment {
                    username: &e.player,
                })
                .collect(),
        };

        let response = self
            .send(self.client.post(format!("{}/groups", self.base_url)).json(&request))
            .await?;
        let created: CreateGroupResponse = read_json(response).await?;

        tracing::info!(
            group_id = created.group.id,
            members = entries.len(),
            "Created WOM group"
        );
        tracing::debug!(verification_code = %created.verification_code, "Group verification code");

        Ok(CreatedGroup {
            id: created.group.id,
            verification_code: created.verification_code,
        })
    }

    /// Request an update of every outdated member. WOM answers 400 when
    /// nothing is outdated, which counts as success.
    async fn update_outdated_members(&self, group: &CreatedGroup) -> Result<String, AppError> {
        let url = format!("{}/groups/{}/update-all", self.base_url, group.id);
        let response = self
            .send(self.client.post(url).json(&VerificationRequest {
                verification_code: &group.verification_code,
            }))
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: MessageResponse = read_json(response).await?;
            return Ok(body.message);
        }

        let message = error_message(status, response).await;
        if status == StatusCode::BAD_REQUEST
            && message.to_lowercase().contains("no outdated members")
        {
            return Ok(message);
        }
        Err(status_error(status, message))
    }

    async fn delete_group(&self, group: &CreatedGroup) -> Result<(), AppError> {
        let url = format!("{}/groups/{}", self.base_url, group.id);
        let response = self
            .send(self.client.delete(url).json(&VerificationRequest {
                verification_code: &group.verification_code,
            }))
            .await?;
        let body: MessageResponse = read_json(response).await?;
        tracing::info!(group_id = group.id, message = %body.message, "Deleted WOM group");
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let request = match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        };

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })
    }

    async fn pause(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }
}

impl LeaderboardClient for WomClient {
    async fn submit_leaders(
        &self,
        group_name: &str,
        metric: Metric,
        entries: &[PlayerRankEntry],
    ) -> Result<SubmissionReceipt, AppError> {
        if entries.is_empty() {
            tracing::debug!(%metric, "No leaders to submit");
            return Ok(SubmissionReceipt {
                members: 0,
                message: "Nothing to submit".to_string(),
            });
        }

        let name = unique_group_name(group_name);
        tracing::info!(%metric, group = %name, members = entries.len(), "Submitting leaders");
        let group = self.create_group(&name, entries).await?;
        self.pause().await;

        // The group is deleted even when the update fails.
        let update = self.update_outdated_members(&group).await;
        match &update {
            Ok(message) => tracing::info!(%metric, %message, "Requested member update"),
            Err(e) => tracing::error!(%metric, error = %e, "Member update failed"),
        }
        self.pause().await;

        if let Err(e) = self.delete_group(&group).await {
            tracing::error!(
                group_id = group.id,
                group = %name,
                error = %e,
                "Group deletion failed, investigate group"
            );
            return Err(e);
        }

        Ok(SubmissionReceipt {
            members: entries.len(),
            message: update?,
        })
    }
}

/// `<prefix> <8 hex chars>`, with the prefix cut so the whole name fits
/// WOM's length limit.
fn unique_group_name(prefix: &str) -> String {
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let room = MAX_GROUP_NAME_LEN - suffix.len() - 1;
    let prefix: String = prefix.trim().chars().take(room).collect();
    format!("{} {suffix}", prefix.trim_end())
}

struct CreatedGroup {
    id: i64,
    verification_code: String,
}

// ---- WOM API types ----

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    name: &'a str,
    members: Vec<MemberFragment<'a>>,
}

#[derive(Serialize)]
struct MemberFragment<'a> {
    username: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationRequest<'a> {
    verification_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGroupResponse {
    group: GroupDetails,
    verification_code: String,
}

#[derive(Deserialize)]
struct GroupDetails {
    id: i64,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

/// Decode a success body, or turn an error status into an [`AppError`].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let message = error_message(status, response).await;
        return Err(status_error(status, message));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;
    Ok(serde_json::from_str(&body)?)
}

/// The `message` of a WOM error payload, or the raw body when it has none.
async fn error_message(status: StatusCode, response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<MessageResponse>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status.as_u16(), body))
}

fn status_error(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimitExceeded,
        _ => AppError::LeaderboardError {
            message,
            status_code: status.as_u16(),
        },
    }
}
