//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::errors::MonitorError;

/// HTTP client for control-plane communication
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        api_token: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, MonitorError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, MonitorError> {
        let response = self
            .authorize(request)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("HTTP {} {} failed: {} - {}", method, url, status, body);
            return Err(MonitorError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, MonitorError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.client.get(&url);
        self.send("GET", &url, request).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, MonitorError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.client.post(&url).json(body);
        self.send("POST", &url, request).await
    }
}
