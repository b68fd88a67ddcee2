//! 名称解決パイプラインの編成。
//!
//! 1件の入力は 正規化 → キャッシュ → 規則分割 → 辞書ヒント → 外部連鎖 の
//! 順で流れる。信頼度が閾値に達した時点で確定し、後段は呼ばない。
//! どの段でも確定しなければプレースホルダの未解決レコードを返す。

use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};

use crate::alias::{AliasResolver, BrandTable};
use crate::cache::ResolutionCache;
use crate::clients::{EncyclopediaClient, LlmClient, OfficialSearchClient};
use crate::config::Config;
use crate::external::{
    EncyclopediaSource, ExternalNameResolver, LlmSource, LookupQuery, LookupSource,
    OfficialSiteSource, builtin_official_domains, parse_official_domains,
};
use crate::normalize::normalize;
use crate::schema::{
    CONFIDENCE_BRAND_PREFIX, RawNameInput, ResolutionSource, ResolvedName, SplitCandidate,
};
use crate::split::RuleBasedSplitter;
use crate::util::retry::RetryConfig;

pub struct NameResolutionPipeline {
    table: Arc<BrandTable>,
    splitter: RuleBasedSplitter,
    aliases: AliasResolver,
    external: Option<Arc<ExternalNameResolver>>,
    cache: ResolutionCache,
    max_concurrency: usize,
}

pub struct PipelineBuilder {
    table: Arc<BrandTable>,
    external: Option<Arc<ExternalNameResolver>>,
    max_concurrency: usize,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(table: Arc<BrandTable>) -> Self {
        Self {
            table,
            external: None,
            max_concurrency: 8,
        }
    }

    #[must_use]
    pub fn with_external(mut self, external: Arc<ExternalNameResolver>) -> Self {
        self.external = Some(external);
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn build(self) -> NameResolutionPipeline {
        NameResolutionPipeline {
            splitter: RuleBasedSplitter::new(Arc::clone(&self.table)),
            aliases: AliasResolver::new(Arc::clone(&self.table)),
            table: self.table,
            external: self.external,
            cache: ResolutionCache::new(),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl NameResolutionPipeline {
    /// 環境設定からパイプラインを組み立てる。
    ///
    /// 外部ソースは設定が揃っているものだけ連鎖に入る。検索APIは
    /// キーとエンジンIDの両方、LLMはベースURLが必要。百科事典は常時。
    ///
    /// # Errors
    /// ブランド辞書の読み込み、またはHTTPクライアントの構築に失敗した場合。
    pub fn from_config(config: &Config) -> Result<Self> {
        let table = match config.brand_table_path() {
            Some(path) => BrandTable::from_json_file(path, config.brand_table_version())?,
            None => BrandTable::builtin(config.brand_table_version()),
        };
        let table = Arc::new(table);

        let retry = RetryConfig::new(
            config.http_max_retries(),
            config.http_backoff_base_ms(),
            config.http_backoff_cap_ms(),
        );

        let mut sources: Vec<Arc<dyn LookupSource>> = Vec::new();

        if let (Some(api_key), Some(engine_id)) =
            (config.search_api_key(), config.search_engine_id())
        {
            let client = OfficialSearchClient::new(
                config.search_api_base_url(),
                api_key,
                engine_id,
                config.http_connect_timeout(),
                config.lookup_timeout(),
                retry,
            )?;
            let domains = config
                .official_domains()
                .map_or_else(builtin_official_domains, parse_official_domains);
            sources.push(Arc::new(OfficialSiteSource::new(
                client,
                domains,
                Arc::clone(&table),
            )));
        } else {
            tracing::info!("search API credentials not set, official site source disabled");
        }

        let encyclopedia = EncyclopediaClient::new(
            config.encyclopedia_api_base_url(),
            config.encyclopedia_target_lang(),
            config.http_connect_timeout(),
            config.lookup_timeout(),
        )?;
        sources.push(Arc::new(EncyclopediaSource::new(
            encyclopedia,
            Arc::clone(&table),
        )));

        if let Some(base_url) = config.llm_base_url() {
            let client = LlmClient::new(
                base_url,
                config.llm_model(),
                config.http_connect_timeout(),
                config.lookup_timeout(),
            )?;
            sources.push(Arc::new(LlmSource::new(client, Arc::clone(&table))));
        } else {
            tracing::info!("LLM base URL not set, LLM source disabled");
        }

        let external = ExternalNameResolver::new(sources, config.lookup_timeout());

        Ok(PipelineBuilder::new(table)
            .with_external(Arc::new(external))
            .with_max_concurrency(config.resolver_max_concurrency().get())
            .build())
    }

    #[must_use]
    pub fn builder(table: Arc<BrandTable>) -> PipelineBuilder {
        PipelineBuilder::new(table)
    }

    /// 1件を解決する。エラーは返さない。
    ///
    /// 外部ソースの障害は内部で握りつぶされ、最悪でも未解決レコードに
    /// 落ちる。同じ正規化入力はキャッシュで一度だけ解決される。
    pub async fn resolve_one(&self, input: RawNameInput) -> ResolvedName {
        let normalized = normalize(&input.text);
        if normalized.is_empty() {
            return ResolvedName::unresolved(input);
        }

        let key = ResolutionCache::key(self.table.version(), &normalized);
        if let Some(mut hit) = self.cache.get(&key).await {
            tracing::debug!(normalized = %normalized, "resolution cache hit");
            hit.input = input;
            return hit;
        }

        let mut candidate = self.splitter.split(&normalized);

        // 規則で割れなかったら、呼び出し元が知っている文脈ブランドを辞書で引く
        if candidate.needs_escalation() {
            if let Some(hinted) = self.hint_candidate(&normalized, input.context_brand_hint.as_deref())
            {
                candidate = hinted;
            }
        }

        if candidate.needs_escalation() && candidate.brand.is_empty() {
            if let Some(external) = &self.external {
                let query = LookupQuery::new(
                    normalized.clone(),
                    self.canonical_hint(input.context_brand_hint.as_deref()),
                );
                if let Some(found) = external.resolve(&query).await {
                    candidate = found;
                }
            }
        }

        if candidate.brand.is_empty() {
            tracing::debug!(normalized = %normalized, "input left unresolved");
            return ResolvedName::unresolved(input);
        }

        let resolved = ResolvedName {
            brand: candidate.brand,
            model: candidate.model,
            confidence: candidate.confidence,
            source: candidate.source,
            input,
        };
        tracing::debug!(
            brand = %resolved.brand,
            model = %resolved.model,
            confidence = resolved.confidence,
            source = resolved.source.as_str(),
            "input resolved"
        );
        // 未解決は書かない。辞書やソースの復旧後に再解決の余地を残す。
        self.cache.insert_if_absent(key, resolved.clone()).await
    }

    /// 複数件を入力順を保ったまま並行解決する。
    pub async fn resolve_batch(&self, inputs: Vec<RawNameInput>) -> Vec<ResolvedName> {
        stream::iter(inputs)
            .map(|input| self.resolve_one(input))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    fn hint_candidate(&self, normalized: &str, hint: Option<&str>) -> Option<SplitCandidate> {
        let brand = self.aliases.resolve(hint?)?;
        let model = crate::split::clean_model_fragment(normalized);
        if model.is_empty() {
            return None;
        }
        Some(SplitCandidate {
            brand,
            model,
            confidence: CONFIDENCE_BRAND_PREFIX,
            source: ResolutionSource::Dictionary,
        })
    }

    fn canonical_hint(&self, hint: Option<&str>) -> Option<String> {
        let raw = hint?;
        Some(
            self.aliases
                .resolve(raw)
                .unwrap_or_else(|| raw.to_string()),
        )
    }
}
