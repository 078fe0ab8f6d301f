//! API client for communicating with the prediction service

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use service_lib::{ErrorResponse, HealthResponse, PredictionResponse, WelcomeResponse};
use url::Url;

/// Failure talking to the prediction service
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request rejected ({status}): {}", .body.message)]
    Rejected { status: StatusCode, body: ErrorResponse },

    #[error("API error ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },

    #[error("failed to reach {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to decode response")]
    Decode(#[source] reqwest::Error),
}

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|source| ApiError::Http {
                url: base_url.to_string(),
                source,
            })?;

        // Keep any path prefix when joining endpoint paths
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })?;
        Self::decode(response).await
    }

    pub async fn welcome(&self) -> Result<WelcomeResponse, ApiError> {
        self.get("").await
    }

    /// Health report; a 503 still carries a report worth showing
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        match self.get("healthz").await {
            Err(ApiError::Unexpected { status, body }) if status == StatusCode::SERVICE_UNAVAILABLE => {
                serde_json::from_str(&body).map_err(|_| ApiError::Unexpected { status, body })
            }
            other => other,
        }
    }

    /// Submit a raw request payload; validation happens server side
    pub async fn predict(&self, request: &serde_json::Value) -> Result<PredictionResponse, ApiError> {
        self.post("predict", request).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(ApiError::Decode);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(body) if status.is_client_error() || status.is_server_error() => {
                Err(ApiError::Rejected { status, body })
            }
            _ => Err(ApiError::Unexpected { status, body }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_lib::{ComponentStatus, PredictionRequest, SleepDisorder};

    fn example() -> serde_json::Value {
        serde_json::to_value(PredictionRequest::example()).unwrap()
    }

    #[tokio::test]
    async fn test_predict_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::Json(example()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"prediction":"Insomnia"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.predict(&example()).await.unwrap();

        assert_eq!(response.prediction, SleepDisorder::Insomnia);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_predict_rejected_with_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":"validation_error","message":"request validation failed for Gender","fields":[{"field":"Gender","kind":"enum","message":"must be one of Male, Female"}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        match client.predict(&serde_json::json!({})).await {
            Err(ApiError::Rejected { status, body }) => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(body.error, "validation_error");
                assert_eq!(body.fields.len(), 1);
                assert_eq!(body.fields[0].field, "Gender");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_is_unexpected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        match client.welcome().await {
            Err(ApiError::Unexpected { status, body }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unhealthy_report_still_decoded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"unhealthy","components":{"artifact":{"status":"unhealthy","message":"unreadable","last_check_timestamp":0}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(health.artifact_version.is_none());
    }

    #[test]
    fn test_base_url_keeps_prefix() {
        let client = ApiClient::new("http://localhost:8080/sleep").unwrap();
        assert_eq!(
            client.base_url().join("predict").unwrap().as_str(),
            "http://localhost:8080/sleep/predict"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::Url(_))
        ));
    }
}
