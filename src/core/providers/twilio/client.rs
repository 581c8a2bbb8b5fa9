//! Twilio API client

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::core::providers::{ProviderError, ProviderReceipt, SmsProvider};

use super::PROVIDER_NAME;
use super::config::TwilioConfig;
use super::error::{map_http_error, network_error, parse_error};

/// Twilio Messaging API client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    config: TwilioConfig,
    http_client: Client,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self, ProviderError> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| network_error(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build the form body for a message creation request
    ///
    /// Twilio takes one `MediaUrl` key per attachment and rejects an empty
    /// `Body`, so the body key is only present when there is text.
    fn build_form(&self, to: &str, body: &str, media_urls: &[Url]) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = vec![
            ("To", to.to_string()),
            ("From", self.config.from_number.clone()),
        ];
        if !body.is_empty() {
            params.push(("Body", body.to_string()));
        }
        for url in media_urls {
            params.push(("MediaUrl", url.to_string()));
        }
        if let Some(callback) = &self.config.status_callback {
            params.push(("StatusCallback", callback.clone()));
        }
        params
    }

    async fn post_message(&self, params: &[(&'static str, String)]) -> Result<Value, ProviderError> {
        let url = self.config.messages_url();

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    network_error("Request timeout")
                } else {
                    network_error(format!("Network error: {}", e))
                }
            })?;

        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> Result<Value, ProviderError> {
        let status = response.status().as_u16();
        let response_text = response
            .text()
            .await
            .map_err(|e| network_error(format!("Failed to read response: {}", e)))?;

        if !(200..300).contains(&status) {
            return Err(map_http_error(status, &response_text));
        }

        serde_json::from_str(&response_text)
            .map_err(|e| parse_error(format!("Failed to parse JSON: {}", e)))
    }
}

#[async_trait]
impl SmsProvider for TwilioClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn send(
        &self,
        to: &str,
        body: &str,
        media_urls: &[Url],
    ) -> Result<ProviderReceipt, ProviderError> {
        let params = self.build_form(to, body, media_urls);
        let response = self.post_message(&params).await?;

        let sid = response
            .get("sid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| parse_error("Response is missing message sid"))?
            .to_string();

        Ok(ProviderReceipt {
            sid,
            accepted_at: Utc::now(),
            raw: response,
        })
    }
}
