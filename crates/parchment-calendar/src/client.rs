//! Google Calendar API client.

use std::time::Duration;

use tracing::instrument;

use crate::error::FetchError;
use crate::source::{Credential, EventQuery};
use crate::types::{CalendarEvent, EventListResponse};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Largest page Google will return for events.list
const MAX_PAGE_SIZE: u32 = 2500;

pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
}

impl CalendarClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::with_base_url(CALENDAR_API_BASE, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// List events, following `nextPageToken` until `max_results` is reached.
    ///
    /// Malformed records are logged and skipped.
    #[instrument(skip(self, credential), level = "info")]
    pub async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        let limit = query.max_results.map(|m| m as usize);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = limit.map(|l| l.saturating_sub(events.len()));
            if remaining == Some(0) {
                break;
            }

            let page_size = remaining.map(|r| (r as u32).min(MAX_PAGE_SIZE));
            let page = self
                .list_events_page(credential, query, page_size, page_token.as_deref())
                .await?;

            for api_event in page.items {
                match CalendarEvent::from_api(api_event) {
                    Ok(event) => events.push(event),
                    Err(e) => tracing::warn!("Skipping malformed event: {}", e),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if let Some(limit) = limit {
            events.truncate(limit);
        }

        tracing::debug!("Fetched {} events", events.len());
        Ok(events)
    }

    async fn list_events_page(
        &self,
        credential: &Credential,
        query: &EventQuery,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<EventListResponse, FetchError> {
        let mut url = format!(
            "{}/calendars/{}/events?timeMin={}&showDeleted={}&singleEvents={}&orderBy={}",
            self.base_url,
            urlencoding::encode(&query.calendar_id),
            urlencoding::encode(&query.time_min.to_rfc3339()),
            query.show_deleted,
            query.single_events,
            query.order_by.as_str(),
        );

        if let Some(time_max) = query.time_max {
            url.push_str(&format!(
                "&timeMax={}",
                urlencoding::encode(&time_max.to_rfc3339())
            ));
        }
        if let Some(size) = page_size {
            url.push_str(&format!("&maxResults={}", size));
        }
        if let Some(pt) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(pt)));
        }

        let response = self
            .client
            .get(&url)
            .header("Authorization", credential.bearer())
            .send()
            .await?;

        self.handle_response(response, &query.calendar_id).await
    }

    /// Map HTTP status codes onto fetch errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        calendar_id: &str,
    ) -> Result<T, FetchError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| FetchError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(FetchError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(FetchError::AuthRequired)
        } else if status.as_u16() == 404 {
            Err(FetchError::CalendarNotFound(calendar_id.to_string()))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(FetchError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(FetchError::ApiError(format!("{}: {}", status, text)))
        }
    }
}
