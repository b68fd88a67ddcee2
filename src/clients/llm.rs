use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

/// OpenAI互換のchat completionsエンドポイントを叩くクライアント。
///
/// 抽出タスクなので temperature は常に 0 で固定する。
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: Url,
    model: String,
    request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

impl LlmClient {
    /// # Errors
    /// ベースURLが不正、またはクライアント構築に失敗した場合。
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build LLM client")?;
        let mut base = base_url.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("v1/chat/completions"))
            .context("invalid LLM base URL")?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            request_timeout,
        })
    }

    /// プロンプトを1往復だけ投げ、先頭choiceの本文をtrimして返す。
    ///
    /// # Errors
    /// リクエスト失敗、エラーステータス、choicesが空の場合。
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            max_tokens: 256,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .context("LLM request failed")?
            .error_for_status()
            .context("LLM endpoint returned error status")?;

        let parsed = response
            .json::<ChatResponse>()
            .await
            .context("failed to deserialize LLM response")?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            bail!("LLM response contained no choices");
        };

        Ok(choice.message.content.trim().to_owned())
    }
}
