use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::sets::{SetDetailResponse, SetListResponse};
use crate::models::{SetDetail, SetSummary};

pub const DEFAULT_API_URL: &str = "http://localhost:3002";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin HTTP client over the public set routes, used by the `study` binary.
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            http: reqwest::Client::new(),
        }
    }

    pub fn set_url(&self, id: &str) -> String {
        format!("{}/api/v1/sets/{}", self.base_url, urlencoding::encode(id))
    }

    pub fn browse_url(&self, query: &str) -> String {
        format!(
            "{}/api/v1/sets?query={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(anyhow!("API error ({}): {}", status.as_u16(), message));
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn get_set(&self, id: &str) -> Result<SetDetail> {
        let body: SetDetailResponse = self.get_json(&self.set_url(id)).await?;
        Ok(body.set)
    }

    pub async fn browse(&self, query: &str) -> Result<Vec<SetSummary>> {
        let body: SetListResponse = self.get_json(&self.browse_url(query)).await?;
        Ok(body.sets)
    }
}
