use std::{env, num::NonZeroUsize, time::Duration};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    search_api_base_url: String,
    search_api_key: Option<String>,
    search_engine_id: Option<String>,
    encyclopedia_api_base_url: String,
    encyclopedia_target_lang: String,
    llm_base_url: Option<String>,
    llm_model: String,
    lookup_timeout: Duration,
    http_connect_timeout: Duration,
    http_max_retries: usize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    resolver_max_concurrency: NonZeroUsize,
    official_domains: Option<String>,
    brand_table_path: Option<String>,
    brand_table_version: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数からリゾルバの設定値を読み込み、検証する。
    ///
    /// 外部ソースの認証情報は任意。未設定のソースは連鎖から外れるだけで、
    /// ルールと辞書による解決は常に動く。
    ///
    /// # Errors
    /// 数値系の環境変数のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let search_api_base_url = env::var("SEARCH_API_BASE_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/customsearch/v1".to_string());
        let search_api_key = env::var("SEARCH_API_KEY").ok();
        let search_engine_id = env::var("SEARCH_ENGINE_ID").ok();

        let encyclopedia_api_base_url = env::var("ENCYCLOPEDIA_API_BASE_URL")
            .unwrap_or_else(|_| "https://zh.wikipedia.org/w/api.php".to_string());
        let encyclopedia_target_lang =
            env::var("ENCYCLOPEDIA_TARGET_LANG").unwrap_or_else(|_| "en".to_string());

        let llm_base_url = env::var("LLM_BASE_URL").ok();
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        // HTTPタイムアウトとリトライ（指数バックオフ + ジッタ）
        let lookup_timeout = parse_duration_secs("LOOKUP_TIMEOUT_SECS", 20)?;
        let http_connect_timeout = parse_duration_ms("HTTP_CONNECT_TIMEOUT_MS", 3000)?;
        let http_max_retries = parse_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10000)?;

        let resolver_max_concurrency =
            parse_non_zero_usize("RESOLVER_MAX_CONCURRENCY", num_cpus::get().max(2))?;

        // ドメイン許可リストの上書き（`domain=Brand` のカンマ区切り）
        let official_domains = env::var("OFFICIAL_DOMAINS").ok();

        // ブランド辞書。パス未指定なら組み込みテーブルを使う。
        let brand_table_path = env::var("BRAND_TABLE_PATH").ok();
        let brand_table_version =
            env::var("BRAND_TABLE_VERSION").unwrap_or_else(|_| "builtin-v1".to_string());

        Ok(Self {
            search_api_base_url,
            search_api_key,
            search_engine_id,
            encyclopedia_api_base_url,
            encyclopedia_target_lang,
            llm_base_url,
            llm_model,
            lookup_timeout,
            http_connect_timeout,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            resolver_max_concurrency,
            official_domains,
            brand_table_path,
            brand_table_version,
        })
    }

    #[must_use]
    pub fn search_api_base_url(&self) -> &str {
        &self.search_api_base_url
    }

    #[must_use]
    pub fn search_api_key(&self) -> Option<&str> {
        self.search_api_key.as_deref()
    }

    #[must_use]
    pub fn search_engine_id(&self) -> Option<&str> {
        self.search_engine_id.as_deref()
    }

    #[must_use]
    pub fn encyclopedia_api_base_url(&self) -> &str {
        &self.encyclopedia_api_base_url
    }

    #[must_use]
    pub fn encyclopedia_target_lang(&self) -> &str {
        &self.encyclopedia_target_lang
    }

    #[must_use]
    pub fn llm_base_url(&self) -> Option<&str> {
        self.llm_base_url.as_deref()
    }

    #[must_use]
    pub fn llm_model(&self) -> &str {
        &self.llm_model
    }

    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    #[must_use]
    pub fn http_connect_timeout(&self) -> Duration {
        self.http_connect_timeout
    }

    #[must_use]
    pub fn http_max_retries(&self) -> usize {
        self.http_max_retries
    }

    #[must_use]
    pub fn http_backoff_base_ms(&self) -> u64 {
        self.http_backoff_base_ms
    }

    #[must_use]
    pub fn http_backoff_cap_ms(&self) -> u64 {
        self.http_backoff_cap_ms
    }

    #[must_use]
    pub fn resolver_max_concurrency(&self) -> NonZeroUsize {
        self.resolver_max_concurrency
    }

    #[must_use]
    pub fn official_domains(&self) -> Option<&str> {
        self.official_domains.as_deref()
    }

    #[must_use]
    pub fn brand_table_path(&self) -> Option<&str> {
        self.brand_table_path.as_deref()
    }

    #[must_use]
    pub fn brand_table_version(&self) -> &str {
        &self.brand_table_version
    }
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default_ms.to_string());
    let ms = raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    Ok(Duration::from_millis(ms))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}
