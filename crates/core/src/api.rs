//! Backend client for the lesson listing and progress endpoints.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    catalog::demo_lessons,
    config::ApiBase,
    error::{MediaError, Result},
    types::Lesson,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub user_id: String,
    pub lesson_id: String,
    pub watched: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub status: u16,
    pub message: String,
}

/// Where a lesson list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonSource {
    Backend,
    Demo,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: Option<ErrorDetail>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct HealthPayload {
    message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Client for an absolute base URL. Same-origin bases need a host to be
    /// useful outside a browser, so they are rejected.
    pub fn new(base: &ApiBase) -> Result<Self> {
        let prefix = base.as_prefix();
        if prefix.is_empty() {
            return Err(MediaError::MissingOrigin);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("microreel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base: prefix.to_string(),
            client,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn lessons(&self) -> Result<Vec<Lesson>> {
        self.get_json("/api/lessons").await
    }

    pub async fn lesson(&self, id: &str) -> Result<Lesson> {
        self.get_json(&format!("/api/lessons/{id}")).await
    }

    pub async fn update_progress(&self, update: &ProgressUpdate) -> Result<serde_json::Value> {
        let url = self.url("/api/progress");
        let response = self.client.post(&url).json(update).send().await?;
        Self::decode(url, response).await
    }

    /// Probe `GET /`. Never fails; problems are reported in the status.
    pub async fn health(&self) -> HealthStatus {
        let url = self.url("/");
        let response = match self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return HealthStatus {
                    ok: false,
                    status: 0,
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return HealthStatus {
                ok: false,
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("health not ok")
                    .to_string(),
            };
        }
        let message = response
            .json::<HealthPayload>()
            .await
            .ok()
            .and_then(|p| p.message)
            .unwrap_or_else(|| "ok".to_string());
        HealthStatus {
            ok: true,
            status: status.as_u16(),
            message,
        }
    }

    /// Backend lessons, or the demo catalog when the backend fails or has none.
    pub async fn lessons_or_demo(&self) -> (Vec<Lesson>, LessonSource) {
        match self.lessons().await {
            Ok(lessons) if !lessons.is_empty() => {
                debug!(count = lessons.len(), "Loaded lessons from backend");
                (lessons, LessonSource::Backend)
            }
            Ok(_) => {
                warn!("Backend returned no lessons, using demo catalog");
                (demo_lessons(), LessonSource::Demo)
            }
            Err(e) => {
                warn!(error = %e, "Backend unavailable, using demo catalog");
                (demo_lessons(), LessonSource::Demo)
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await?;
        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MediaError::Status {
            url,
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }
}

/// Server message from an error body, else the status reason.
fn error_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|p| p.error.and_then(|e| e.message).or(p.message))
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| "Request failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_origin_client_is_rejected() {
        assert!(matches!(
            ApiClient::new(&ApiBase::SameOrigin),
            Err(MediaError::MissingOrigin)
        ));
    }

    #[test]
    fn base_is_trimmed() {
        let client = ApiClient::new(&ApiBase::Url("http://localhost:3001/".into())).unwrap();
        assert_eq!(client.url("/api/lessons"), "http://localhost:3001/api/lessons");
    }

    #[test]
    fn error_message_prefers_nested_payload() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Lesson not found"}}"#, Some("Not Found")),
            "Lesson not found"
        );
        assert_eq!(error_message(r#"{"message":"bad id"}"#, None), "bad id");
        assert_eq!(error_message("<html>", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("", None), "Request failed");
    }

    #[test]
    fn progress_update_uses_camel_case() {
        let update = ProgressUpdate {
            user_id: "u1".into(),
            lesson_id: "inbox-zero".into(),
            watched: true,
            completed: false,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["lessonId"], "inbox-zero");
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back_to_demo() {
        // port 9 (discard) is not expected to serve HTTP
        let client = ApiClient::new(&ApiBase::Url("http://127.0.0.1:9".into())).unwrap();
        let (lessons, source) = client.lessons_or_demo().await;
        assert_eq!(source, LessonSource::Demo);
        assert_eq!(lessons, demo_lessons());
    }
}
