use crate::error::{DataError, DataResult};
use crate::models::{DateRange, FuelPrice, LoginRequest, StationCoupons, StationInfo, TradingService};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bearer tokens issued by the trading API stay valid for 20 minutes.
const TOKEN_TTL_MINUTES: i64 = 20;

#[derive(Clone)]
struct CachedToken {
    value: String,
    obtained_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.obtained_at) < chrono::Duration::minutes(TOKEN_TTL_MINUTES)
    }
}

/// Client for the trading-network POS API.
///
/// Login tokens are cached for their validity window and refreshed
/// transparently; a 401 triggers exactly one forced re-login and retry
/// before the error surfaces.
pub struct TradingApiClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    token: RwLock<Option<CachedToken>>,
}

impl TradingApiClient {
    pub fn new(base_url: String, username: String, password: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            token: RwLock::new(None),
        }
    }

    /// Coupons issued at the given system's stations inside the window.
    pub async fn coupons(
        &self,
        system: i64,
        station: Option<i64>,
        range: DateRange,
    ) -> DataResult<Vec<StationCoupons>> {
        let mut query = vec![
            ("system".to_string(), system.to_string()),
            ("dt_beg".to_string(), format_timestamp(range.dt_beg)),
            ("dt_end".to_string(), format_timestamp(range.dt_end)),
        ];
        if let Some(station) = station {
            query.push(("station".to_string(), station.to_string()));
        }

        self.get_json("/v1/coupons", &query).await
    }

    /// Fuel and service items sold in the given system.
    pub async fn services(&self, system: i64) -> DataResult<Vec<TradingService>> {
        let query = vec![("system".to_string(), system.to_string())];
        self.get_json("/v1/services", &query).await
    }

    /// Prices at one station on a given date.
    pub async fn prices(
        &self,
        system: i64,
        station: i64,
        date: NaiveDate,
    ) -> DataResult<Vec<FuelPrice>> {
        let query = vec![
            ("system".to_string(), system.to_string()),
            ("date".to_string(), date.format("%Y-%m-%d").to_string()),
        ];
        self.get_json(&format!("/v1/pos/prices/{}", station), &query)
            .await
    }

    /// Station reference data.
    pub async fn station_info(&self, system: i64, station: i64) -> DataResult<StationInfo> {
        let query = vec![
            ("system".to_string(), system.to_string()),
            ("station".to_string(), station.to_string()),
        ];
        self.get_json("/v1/info", &query).await
    }

    /// Authenticate and cache the bearer token.
    pub async fn login(&self) -> DataResult<String> {
        let request = LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        };

        let response = self
            .http
            .post(format!("{}/v1/login", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "trading API login failed");
            return Err(DataError::from_status(status.as_u16(), message));
        }

        // The token arrives as a JSON-quoted string.
        let body = response.text().await.map_err(DataError::from)?;
        let token: String = serde_json::from_str(&body)
            .unwrap_or_else(|_| body.trim().trim_matches('"').to_string());

        if token.is_empty() {
            return Err(DataError::Auth("login returned an empty token".to_string()));
        }

        info!("trading API login succeeded");
        *self.token.write().await = Some(CachedToken {
            value: token.clone(),
            obtained_at: Utc::now(),
        });

        Ok(token)
    }

    async fn token(&self, force_refresh: bool) -> DataResult<String> {
        if !force_refresh {
            let cached = self.token.read().await.clone();
            if let Some(token) = cached {
                if token.is_fresh(Utc::now()) {
                    return Ok(token.value);
                }
                debug!("cached trading API token expired");
            }
        }
        self.login().await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> DataResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let token = self.token(false).await?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(path, "trading API rejected token, re-authenticating");
            let token = self.token(true).await?;
            let retried = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await?;
            return Self::into_json(retried).await;
        }

        Self::into_json(response).await
    }

    async fn into_json<T: DeserializeOwned>(response: reqwest::Response) -> DataResult<T> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| DataError::Unknown(format!("Malformed response body: {}", e)))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(DataError::from_status(status.as_u16(), message))
        }
    }
}

fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S").to_string()
}
