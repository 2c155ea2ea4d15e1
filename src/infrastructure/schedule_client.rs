use crate::domain::models::RoomCatalogEntry;
use crate::infrastructure::error::CoreError;
use crate::infrastructure::slot_mapper::{
    decode_catalog_room, RawCatalogRoom, RawSchedulePage, RawScheduleSlot,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use url::Url;

const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_SCHEDULE_PAGES: u32 = 50;

/// Remote schedule/room service the core calls into. The trait is the
/// seam that keeps batch mutation strategy swappable and the
/// orchestration testable against fakes.
#[async_trait]
pub trait ScheduleClient: Send + Sync {
    async fn list_rooms(&self, access_token: &str) -> Result<Vec<RoomCatalogEntry>, CoreError>;

    /// All raw schedule records for one day, paged internally until the
    /// reported total is collected.
    async fn list_day_schedule(
        &self,
        access_token: &str,
        day: NaiveDate,
    ) -> Result<Vec<RawScheduleSlot>, CoreError>;

    async fn disable_slot(
        &self,
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError>;

    async fn enable_slot(
        &self,
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError>;

    /// Cancels a booked slot on the student's behalf. Distinct from
    /// `enable_slot`: an occupied slot must be cancelled, not re-enabled.
    async fn cancel_slot(
        &self,
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestScheduleClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

#[derive(Debug, serde::Serialize)]
struct SlotMutationRequest {
    #[serde(rename = "scheduleId")]
    schedule_id: i64,
    #[serde(rename = "adminId")]
    admin_id: i64,
}

impl ReqwestScheduleClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), CoreError> {
        if value.trim().is_empty() {
            return Err(CoreError::Api(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn api_http_error(status: reqwest::StatusCode, body: &str) -> CoreError {
        let message = if body.trim().is_empty() {
            format!("schedule service error: http {}", status.as_u16())
        } else {
            format!(
                "schedule service error: http {}; body={body}",
                status.as_u16()
            )
        };
        CoreError::Api(message)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| CoreError::Api(format!("invalid schedule api base url: {error}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CoreError::Api("schedule api base URL cannot be a base".to_string()))?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn patch_slot(
        &self,
        segments: &[&str],
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError> {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.endpoint(segments)?;
        let request = SlotMutationRequest {
            schedule_id,
            admin_id,
        };
        let response = self
            .client
            .patch(endpoint)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                CoreError::Api(format!("network error while updating schedule slot: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            CoreError::Api(format!("failed reading schedule update response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleClient for ReqwestScheduleClient {
    async fn list_rooms(&self, access_token: &str) -> Result<Vec<RoomCatalogEntry>, CoreError> {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.endpoint(&["studyRooms"])?;
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| {
                CoreError::Api(format!("network error while listing rooms: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            CoreError::Api(format!("failed reading room list response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        let parsed: Vec<RawCatalogRoom> = serde_json::from_str(&body).map_err(|error| {
            CoreError::Api(format!("invalid room list payload: {error}; body={body}"))
        })?;

        Ok(parsed.iter().filter_map(decode_catalog_room).collect())
    }

    async fn list_day_schedule(
        &self,
        access_token: &str,
        day: NaiveDate,
    ) -> Result<Vec<RawScheduleSlot>, CoreError> {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.endpoint(&["schedule"])?;
        let day_key = day.format("%Y-%m-%d").to_string();
        let mut page: u32 = 1;
        let mut items = Vec::new();

        loop {
            let take = self.page_size.to_string();
            let page_number = page.to_string();
            let response = self
                .client
                .get(endpoint.clone())
                .bearer_auth(access_token)
                .query(&[
                    ("day", day_key.as_str()),
                    ("take", take.as_str()),
                    ("page", page_number.as_str()),
                ])
                .send()
                .await
                .map_err(|error| {
                    CoreError::Api(format!("network error while listing day schedule: {error}"))
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|error| {
                CoreError::Api(format!("failed reading day schedule response: {error}"))
            })?;

            if !status.is_success() {
                return Err(Self::api_http_error(status, &body));
            }

            let parsed: RawSchedulePage = serde_json::from_str(&body).map_err(|error| {
                CoreError::Api(format!("invalid day schedule payload: {error}; body={body}"))
            })?;

            let page_was_empty = parsed.items.is_empty();
            items.extend(parsed.items);

            if page_was_empty
                || items.len() as u64 >= parsed.total
                || page >= MAX_SCHEDULE_PAGES
            {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    async fn disable_slot(
        &self,
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError> {
        self.patch_slot(&["schedule", "disable"], access_token, schedule_id, admin_id)
            .await
    }

    async fn enable_slot(
        &self,
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError> {
        self.patch_slot(&["schedule", "enable"], access_token, schedule_id, admin_id)
            .await
    }

    async fn cancel_slot(
        &self,
        access_token: &str,
        schedule_id: i64,
        admin_id: i64,
    ) -> Result<(), CoreError> {
        self.patch_slot(
            &["schedule", "cancel", "admin"],
            access_token,
            schedule_id,
            admin_id,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_built_from_the_configured_base() {
        let client = ReqwestScheduleClient::new("https://rooms.example.edu/api");
        let url = client
            .endpoint(&["schedule", "cancel", "admin"])
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://rooms.example.edu/api/schedule/cancel/admin"
        );
    }

    #[test]
    fn endpoint_rejects_an_invalid_base_url() {
        let client = ReqwestScheduleClient::new("not a url");
        assert!(client.endpoint(&["schedule"]).is_err());
    }

    #[test]
    fn mutation_request_serializes_in_wire_casing() {
        let request = SlotMutationRequest {
            schedule_id: 41,
            admin_id: 7,
        };
        let encoded = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(
            encoded,
            serde_json::json!({"scheduleId": 41, "adminId": 7})
        );
    }
}
