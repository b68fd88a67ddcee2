use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::util::retry::{RetryConfig, is_retryable_error};

/// カスタム検索APIのクライアント。
///
/// クエリを投げ、`{title, link, snippet}` のランク付きリストを返す。
/// ドメインの許可リストによる絞り込みは呼び出し側（公式サイトステージ）
/// が行う。一時的な失敗はバックオフ付きで再試行する。
#[derive(Debug, Clone)]
pub struct OfficialSearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    engine_id: String,
    request_timeout: Duration,
    retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

impl OfficialSearchClient {
    /// # Errors
    /// ベースURLが不正、またはHTTPクライアントの構築に失敗した場合。
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build search client")?;
        let endpoint = Url::parse(&endpoint.into()).context("invalid search endpoint URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            request_timeout,
            retry,
        })
    }

    /// クエリを実行してランク付き結果を返す。
    ///
    /// # Errors
    /// 再試行を使い切っても応答が得られない場合。
    pub async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
        let mut attempt = 0;
        loop {
            match self.search_once(query).await {
                Ok(items) => return Ok(items),
                Err(err) => {
                    attempt += 1;
                    let transient = err
                        .downcast_ref::<reqwest::Error>()
                        .is_some_and(is_retryable_error);
                    if !transient || !self.retry.can_retry(attempt) {
                        return Err(err);
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    debug!(query, attempt, delay_ms, "retrying search");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn search_once(&self, query: &str) -> Result<Vec<SearchItem>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", "5"),
            ])
            .timeout(self.request_timeout)
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search endpoint returned error status")?;

        let parsed = response
            .json::<SearchResponse>()
            .await
            .context("failed to deserialize search response")?;
        Ok(parsed.items)
    }
}
