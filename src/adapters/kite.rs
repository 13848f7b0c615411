use crate::config::{BrokerConfig, TokenSource};
use crate::domain::model::Position;
use crate::domain::ports::PortfolioClient;
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "broker";

/// Kite Connect v3 回應封包
#[derive(Debug, Deserialize)]
struct KiteEnvelope {
    status: String,
    data: Option<serde_json::Value>,
    message: Option<String>,
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionsData {
    net: Vec<Position>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    user_name: String,
}

pub struct KiteClient {
    client: Client,
    base_url: String,
    api_key: String,
    token_source: TokenSource,
    timeout: Duration,
}

impl KiteClient {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            token_source: config.token_source(),
            timeout: config.timeout(),
        }
    }

    /// 每次請求都重新讀取 token，讓每日重新登入後不必重啟
    async fn access_token(&self) -> Result<String> {
        let token = match &self.token_source {
            TokenSource::Inline(token) => token.trim().to_string(),
            TokenSource::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(content) => content.trim().to_string(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(MonitorError::AuthExpired {
                        message: format!("No access token found at {}", path.display()),
                    });
                }
                Err(e) => return Err(MonitorError::IoError(e)),
            },
        };

        if token.is_empty() {
            return Err(MonitorError::AuthExpired {
                message: "Access token is empty".to_string(),
            });
        }
        Ok(token)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!("📡 Making API request to: {}", url);
        let response = self
            .client
            .get(&url)
            .header("X-Kite-Version", "3")
            .header("Authorization", format!("token {}:{}", self.api_key, token))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        tracing::debug!("📡 API response status: {}", status);
        let body = response.text().await.map_err(transport_error)?;

        let envelope: KiteEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Err(if status == StatusCode::FORBIDDEN {
                    MonitorError::AuthExpired {
                        message: format!("HTTP {}", status),
                    }
                } else if !status.is_success() {
                    MonitorError::BrokerApi {
                        status: status.as_u16(),
                        message: truncate(&body, 200),
                    }
                } else {
                    MonitorError::BrokerResponse {
                        message: format!("Invalid JSON: {}", e),
                    }
                });
            }
        };

        let message = envelope
            .message
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status == StatusCode::FORBIDDEN
            || envelope.error_type.as_deref() == Some("TokenException")
        {
            return Err(MonitorError::AuthExpired { message });
        }

        if !status.is_success() || envelope.status != "success" {
            return Err(MonitorError::BrokerApi {
                status: status.as_u16(),
                message,
            });
        }

        let data = envelope.data.ok_or_else(|| MonitorError::BrokerResponse {
            message: "Response has no data field".to_string(),
        })?;
        serde_json::from_value(data).map_err(|e| MonitorError::BrokerResponse {
            message: format!("Unexpected data shape for {}: {}", path, e),
        })
    }

    /// 驗證 session 是否有效，回傳使用者名稱
    pub async fn verify_session(&self) -> Result<String> {
        let profile: Profile = self.get_data("/user/profile").await?;
        Ok(profile.user_name)
    }
}

#[async_trait]
impl PortfolioClient for KiteClient {
    async fn fetch_positions(&self) -> Result<Vec<Position>> {
        let data: PositionsData = self.get_data("/portfolio/positions").await?;

        let positions: Vec<Position> = data
            .net
            .into_iter()
            .filter(|p| p.quantity != 0)
            .collect();

        if positions.is_empty() {
            tracing::info!("📊 No open positions found");
        } else {
            tracing::debug!("📊 Found {} open positions", positions.len());
        }
        Ok(positions)
    }
}

fn transport_error(e: reqwest::Error) -> MonitorError {
    if e.is_timeout() {
        MonitorError::network(SERVICE, format!("request timed out ({})", e))
    } else {
        MonitorError::network(SERVICE, e.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
