use crate::domain::models::AdminProfile;
use crate::infrastructure::error::CoreError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// User profile service; the core only needs it to resolve the acting
/// administrator's numeric id before mutating slots.
#[async_trait]
pub trait UserProfileClient: Send + Sync {
    async fn fetch_profile(&self, access_token: &str) -> Result<AdminProfile, CoreError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUserProfileClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, serde::Deserialize)]
struct UserProfilePayload {
    id: Option<i64>,
    name: Option<String>,
    #[serde(rename = "isAdmin", default)]
    is_admin: Option<bool>,
}

impl ReqwestUserProfileClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn profile_endpoint(&self) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| CoreError::Api(format!("invalid profile api base url: {error}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CoreError::Api("profile api base URL cannot be a base".to_string()))?;
            path.push("users");
            path.push("me");
        }
        Ok(url)
    }
}

#[async_trait]
impl UserProfileClient for ReqwestUserProfileClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<AdminProfile, CoreError> {
        if access_token.trim().is_empty() {
            return Err(CoreError::Api("access token must not be empty".to_string()));
        }

        let endpoint = self.profile_endpoint()?;
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| {
                CoreError::Api(format!("network error while fetching profile: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            CoreError::Api(format!("failed reading profile response: {error}"))
        })?;

        if !status.is_success() {
            return Err(CoreError::Api(format!(
                "profile service error: http {}; body={body}",
                status.as_u16()
            )));
        }

        let parsed: UserProfilePayload = serde_json::from_str(&body).map_err(|error| {
            CoreError::Api(format!("invalid profile payload: {error}; body={body}"))
        })?;

        let id = parsed
            .id
            .ok_or_else(|| CoreError::Api("profile response did not include id".to_string()))?;
        Ok(AdminProfile {
            id,
            display_name: parsed
                .name
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| format!("user-{id}")),
            is_admin: parsed.is_admin.unwrap_or(false),
        })
    }
}
