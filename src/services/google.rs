// src/services/google.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::common::config::GoogleConfig;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/calendars";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google Calendar not configured")]
    NotConfigured,

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("Calendar API error: {0}")]
    CalendarError(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub attendees: Vec<String>,
    pub create_meet_link: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventResponse {
    pub id: String,
    pub html_link: Option<String>,
    pub meet_link: Option<String>,
}

/// Calendar backend used when scheduling interviews
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn create_event(&self, event: &CalendarEvent) -> Result<CalendarEventResponse, GoogleError>;
    async fn delete_event(&self, event_id: &str) -> Result<(), GoogleError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

// Google Calendar API request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CalendarEventRequest {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct Attendee {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    create_request: ConferenceCreateRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceCreateRequest {
    request_id: String,
    conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Serialize)]
struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    solution_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CalendarEventApiResponse {
    id: String,
    html_link: Option<String>,
    hangout_link: Option<String>,
    conference_data: Option<ConferenceDataResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceDataResponse {
    entry_points: Option<Vec<EntryPoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPoint {
    entry_point_type: String,
    uri: Option<String>,
}

pub(crate) fn build_event_request(event: &CalendarEvent, time_zone: &str) -> CalendarEventRequest {
    CalendarEventRequest {
        summary: event.summary.clone(),
        description: event.description.clone(),
        start: EventDateTime {
            date_time: event.start.to_rfc3339(),
            time_zone: time_zone.to_string(),
        },
        end: EventDateTime {
            date_time: event.end.to_rfc3339(),
            time_zone: time_zone.to_string(),
        },
        attendees: event
            .attendees
            .iter()
            .map(|email| Attendee {
                email: email.clone(),
            })
            .collect(),
        conference_data: event.create_meet_link.then(|| ConferenceData {
            create_request: ConferenceCreateRequest {
                request_id: uuid::Uuid::new_v4().to_string(),
                conference_solution_key: ConferenceSolutionKey {
                    solution_type: "hangoutsMeet".to_string(),
                },
            },
        }),
    }
}

/// Video entry point of the conference, falling back to the legacy `hangoutLink`
pub(crate) fn extract_meet_link(response: &CalendarEventApiResponse) -> Option<String> {
    response
        .conference_data
        .as_ref()
        .and_then(|data| data.entry_points.as_ref())
        .and_then(|points| {
            points
                .iter()
                .find(|ep| ep.entry_point_type == "video")
                .and_then(|ep| ep.uri.clone())
        })
        .or_else(|| response.hangout_link.clone())
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Google Calendar client authenticated with a long lived refresh token
#[derive(Debug)]
pub struct GoogleCalendarService {
    client: Client,
    config: GoogleConfig,
    time_zone: String,
    token: RwLock<Option<CachedToken>>,
}

impl GoogleCalendarService {
    pub fn new(config: &GoogleConfig, time_zone: &str, client: Client) -> Self {
        Self {
            client,
            config: config.clone(),
            time_zone: time_zone.to_string(),
            token: RwLock::new(None),
        }
    }

    fn credentials(&self) -> Result<(&str, &str, &str), GoogleError> {
        match (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
            self.config.refresh_token.as_deref(),
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok((id, secret, refresh)),
            _ => Err(GoogleError::NotConfigured),
        }
    }

    async fn refresh_access_token(&self) -> Result<CachedToken, GoogleError> {
        let (client_id, client_secret, refresh_token) = self.credentials()?;

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!("Refreshing access token with Google OAuth");

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send token refresh request");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "Token refresh failed - check your refresh token and credentials"
            );
            return Err(GoogleError::OAuthFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        info!("Successfully refreshed access token");
        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: Utc::now() + Duration::seconds(token_response.expires_in),
        })
    }

    /// Cached access token, refreshed when it expires within 5 minutes
    async fn access_token(&self) -> Result<String, GoogleError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Utc::now() + Duration::minutes(5) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() + Duration::minutes(5) {
                return Ok(cached.access_token.clone());
            }
        }

        warn!("Access token expired or missing, refreshing");
        let fresh = self.refresh_access_token().await?;
        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    fn events_url(&self) -> String {
        format!(
            "{}/{}/events",
            CALENDAR_API,
            urlencoding::encode(&self.config.calendar_id)
        )
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarService {
    async fn create_event(&self, event: &CalendarEvent) -> Result<CalendarEventResponse, GoogleError> {
        let access_token = self.access_token().await?;
        let event_request = build_event_request(event, &self.time_zone);

        debug!(
            summary = %event_request.summary,
            create_meet_link = event.create_meet_link,
            start_time = %event.start,
            attendee_count = event.attendees.len(),
            "Creating calendar event"
        );

        let mut query_params = vec![("sendUpdates", "all")];
        if event.create_meet_link {
            query_params.push(("conferenceDataVersion", "1"));
        }

        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(&access_token)
            .query(&query_params)
            .json(&event_request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send calendar event creation request");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "Calendar event creation failed - check OAuth scopes and permissions"
            );
            return Err(GoogleError::CalendarError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let api_response: CalendarEventApiResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        let result = CalendarEventResponse {
            meet_link: extract_meet_link(&api_response),
            id: api_response.id,
            html_link: api_response.html_link,
        };

        info!(
            event_id = %result.id,
            has_meet_link = result.meet_link.is_some(),
            "Calendar event created successfully"
        );

        Ok(result)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), GoogleError> {
        let access_token = self.access_token().await?;

        let response = self
            .client
            .delete(format!("{}/{}", self.events_url(), urlencoding::encode(event_id)))
            .bearer_auth(&access_token)
            .query(&[("sendUpdates", "all")])
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {
                info!(event_id = %event_id, "Calendar event deleted");
                Ok(())
            }
            // Already gone
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                warn!(event_id = %event_id, "Calendar event was already deleted");
                Ok(())
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                error!(status = %status, error = %error_text, "Calendar event deletion failed");
                Err(GoogleError::CalendarError(format!(
                    "HTTP {}: {}",
                    status, error_text
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::AppConfig;

    fn sample_event(create_meet_link: bool) -> CalendarEvent {
        let start = DateTime::parse_from_rfc3339("2030-03-10T10:00:00-03:00").unwrap();
        CalendarEvent {
            summary: "Entrevista: Ana - Backend".to_string(),
            description: None,
            start,
            end: start + Duration::minutes(45),
            attendees: vec!["ana@x.cl".to_string(), "luis@hirepro.cl".to_string()],
            create_meet_link,
        }
    }

    #[test]
    fn test_build_event_request_with_meet() {
        let request = build_event_request(&sample_event(true), "America/Santiago");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["start"]["timeZone"], "America/Santiago");
        assert_eq!(json["end"]["dateTime"], "2030-03-10T10:45:00-03:00");
        assert_eq!(json["attendees"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
    }

    #[test]
    fn test_build_event_request_without_meet() {
        let request = build_event_request(&sample_event(false), "UTC");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("conferenceData").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_extract_meet_link_prefers_video_entry_point() {
        let response: CalendarEventApiResponse = serde_json::from_value(serde_json::json!({
            "id": "evt1",
            "hangoutLink": "https://meet.google.com/old-link",
            "conferenceData": {
                "entryPoints": [
                    { "entryPointType": "phone", "uri": "tel:+1-555" },
                    { "entryPointType": "video", "uri": "https://meet.google.com/abc-defg-hij" }
                ]
            }
        }))
        .unwrap();
        assert_eq!(
            extract_meet_link(&response).as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
    }

    #[test]
    fn test_extract_meet_link_falls_back_to_hangout_link() {
        let response: CalendarEventApiResponse = serde_json::from_value(serde_json::json!({
            "id": "evt1",
            "hangoutLink": "https://meet.google.com/old-link"
        }))
        .unwrap();
        assert_eq!(
            extract_meet_link(&response).as_deref(),
            Some("https://meet.google.com/old-link")
        );
    }

    #[tokio::test]
    async fn test_create_event_not_configured() {
        let config = AppConfig::for_tests();
        let service = GoogleCalendarService::new(&config.google, &config.timezone, Client::new());
        let result = service.create_event(&sample_event(true)).await;
        assert!(matches!(result, Err(GoogleError::NotConfigured)));
    }
}
