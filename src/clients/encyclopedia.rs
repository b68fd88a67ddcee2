use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;

/// MediaWiki互換APIのクライアント。
///
/// 検索語のページが存在し、対象言語への言語間リンクを持っていれば
/// そのリンク先タイトルを返す。
#[derive(Debug, Clone)]
pub struct EncyclopediaClient {
    client: Client,
    endpoint: Url,
    target_lang: String,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    missing: Option<serde_json::Value>,
    #[serde(default)]
    langlinks: Vec<LangLink>,
}

#[derive(Debug, Deserialize)]
struct LangLink {
    lang: String,
    #[serde(rename = "*")]
    title: String,
}

impl EncyclopediaClient {
    /// # Errors
    /// APIエンドポイントのURLが不正、またはクライアント構築に失敗した場合。
    pub fn new(
        endpoint: impl Into<String>,
        target_lang: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build encyclopedia client")?;
        let endpoint = Url::parse(&endpoint.into()).context("invalid encyclopedia endpoint URL")?;

        Ok(Self {
            client,
            endpoint,
            target_lang: target_lang.into(),
            request_timeout,
        })
    }

    /// ページが存在すれば対象言語へのリンク先タイトルを返す。
    ///
    /// ページ欠落・リンク欠落は `Ok(None)`。HTTP・デコード失敗のみ `Err`。
    ///
    /// # Errors
    /// リクエストが失敗、もしくは応答のデコードに失敗した場合。
    pub async fn cross_language_title(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("redirects", "1"),
                ("prop", "langlinks"),
                ("lllang", self.target_lang.as_str()),
                ("lllimit", "1"),
                ("titles", query),
            ])
            .timeout(self.request_timeout)
            .send()
            .await
            .context("encyclopedia request failed")?
            .error_for_status()
            .context("encyclopedia endpoint returned error status")?;

        let parsed = response
            .json::<QueryResponse>()
            .await
            .context("failed to deserialize encyclopedia response")?;

        let Some(body) = parsed.query else {
            return Ok(None);
        };

        for page in body.pages.values() {
            if page.missing.is_some() {
                continue;
            }
            if let Some(link) = page
                .langlinks
                .iter()
                .find(|link| link.lang == self.target_lang)
            {
                return Ok(Some(link.title.clone()));
            }
        }

        Ok(None)
    }
}
