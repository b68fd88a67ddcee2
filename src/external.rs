//! 外部ソースによる車名解決のフォールバック連鎖。
//!
//! 辞書とルールで割れなかった入力を、公式サイト検索 → 百科事典 → LLM の
//! 順で問い合わせる。各ソースは失敗してもパイプラインを止めない。
//! 最初に妥当な候補を返したソースで打ち切り、その後段は呼ばない。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use rustc_hash::FxHashMap;

use crate::alias::BrandTable;
use crate::clients::{EncyclopediaClient, LlmClient, OfficialSearchClient};
use crate::denylist::CandidateFilter;
use crate::schema::{
    CONFIDENCE_ENCYCLOPEDIA, CONFIDENCE_LLM, CONFIDENCE_OFFICIAL, ResolutionSource, SplitCandidate,
};
use crate::util::error::classify_error;

/// 各ソースに渡す問い合わせ。`text` は正規化済み。
#[derive(Debug, Clone)]
pub struct LookupQuery {
    pub text: String,
    pub brand_hint: Option<String>,
}

impl LookupQuery {
    #[must_use]
    pub fn new(text: impl Into<String>, brand_hint: Option<String>) -> Self {
        Self {
            text: text.into(),
            brand_hint,
        }
    }
}

/// ソースが返すブランドとモデルの組。ブランドは正規名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePair {
    pub brand: String,
    pub model: String,
}

/// 外部解決ソース。1件の問い合わせに対し候補を最大1つ返す。
///
/// `Ok(None)` は「答えが無い」、`Err` は「ソース自体の障害」。
/// 呼び出し側はどちらでも次段へ進む。
#[async_trait]
pub trait LookupSource: Send + Sync {
    fn source(&self) -> ResolutionSource;

    /// # Errors
    /// ソース自体の障害（通信・デコード失敗）の場合。答えが無いだけなら
    /// `Ok(None)`。
    async fn lookup(&self, query: &LookupQuery) -> Result<Option<NamePair>>;
}

/// 公式サイト検索ソース。
///
/// 検索結果のリンク先ドメインが許可リストに載っているものだけを信じ、
/// そのドメインに紐づくブランドを採用する。タイトルはフィルタに通し、
/// ノイズを落とした残りをモデル名とする。
pub struct OfficialSiteSource {
    client: OfficialSearchClient,
    domains: FxHashMap<String, String>,
    filter: CandidateFilter,
}

/// 比亜迪の漢字シリーズ名と英語表記の対応。検索語の補強に使う。
/// 2文字の方を先に引く（「海豹」が「海」系列の別名に食われないように）。
const BYD_SERIES_HINTS: [(&str, &str); 9] = [
    ("海豹", "Seal"),
    ("海豚", "Dolphin"),
    ("海鸥", "Seagull"),
    ("海狮", "Sealion"),
    ("秦", "Qin"),
    ("元", "Yuan"),
    ("宋", "Song"),
    ("唐", "Tang"),
    ("汉", "Han"),
];

/// 既定のドメイン許可リスト。主要メーカーの公式サイトのみ。
#[must_use]
pub fn builtin_official_domains() -> FxHashMap<String, String> {
    let pairs = [
        ("byd.com", "BYD"),
        ("bydauto.com.cn", "BYD"),
        ("wuling.com", "Wuling"),
        ("sgmw.com.cn", "Wuling"),
        ("geely.com", "Geely"),
        ("zeekrlife.com", "Zeekr"),
        ("chery.cn", "Chery"),
        ("gwm.com.cn", "Great Wall"),
        ("changan.com.cn", "Changan"),
        ("saicmotor.com", "SAIC"),
        ("vw.com.cn", "Volkswagen"),
        ("svw-volkswagen.com", "Volkswagen"),
        ("tesla.cn", "Tesla"),
        ("xiaomiev.com", "Xiaomi"),
        ("nio.cn", "NIO"),
        ("lixiang.com", "Li Auto"),
        ("xiaopeng.com", "XPeng"),
        ("denza.com", "Denza"),
    ];
    pairs
        .into_iter()
        .map(|(domain, brand)| (domain.to_string(), brand.to_string()))
        .collect()
}

/// `domain=Brand` のカンマ区切り文字列をパースする。空要素は無視。
#[must_use]
pub fn parse_official_domains(raw: &str) -> FxHashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (domain, brand) = pair.split_once('=')?;
            let domain = domain.trim().to_lowercase();
            let brand = brand.trim();
            if domain.is_empty() || brand.is_empty() {
                return None;
            }
            Some((domain, brand.to_string()))
        })
        .collect()
}

impl OfficialSiteSource {
    #[must_use]
    pub fn new(
        client: OfficialSearchClient,
        domains: FxHashMap<String, String>,
        table: Arc<BrandTable>,
    ) -> Self {
        Self {
            client,
            domains,
            filter: CandidateFilter::new(table),
        }
    }

    fn build_query(query: &LookupQuery) -> String {
        let series = BYD_SERIES_HINTS
            .iter()
            .find(|(zh, _)| query.text.contains(zh))
            .map(|(_, en)| *en);
        match (&query.brand_hint, series) {
            (Some(hint), Some(en)) => format!("{hint} {en} {} official site", query.text),
            (Some(hint), None) => format!("{hint} {} official site", query.text),
            (None, _) => format!("{} official site", query.text),
        }
    }

    fn brand_for_link(&self, link: &str) -> Option<&str> {
        let url = Url::parse(link).ok()?;
        let host = url.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        self.domains
            .iter()
            .find(|(domain, _)| host == domain.as_str() || host.ends_with(&format!(".{domain}")))
            .map(|(_, brand)| brand.as_str())
    }
}

#[async_trait]
impl LookupSource for OfficialSiteSource {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Official
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Option<NamePair>> {
        let items = self.client.search(&Self::build_query(query)).await?;
        for item in items {
            let Some(brand) = self.brand_for_link(&item.link) else {
                continue;
            };
            if let Some(model) = self.filter.clean(&item.title, Some(brand)) {
                return Ok(Some(NamePair {
                    brand: brand.to_string(),
                    model,
                }));
            }
        }
        Ok(None)
    }
}

/// 百科事典ソース。多言語リンク先のタイトルを英語表記として採用する。
///
/// タイトルの先頭が正規ブランド名ならそこで切り、残りをモデル名とする。
/// 百科事典のタイトルは編集済みの固有名なので、文字種フィルタは通さない。
pub struct EncyclopediaSource {
    client: EncyclopediaClient,
    table: Arc<BrandTable>,
}

impl EncyclopediaSource {
    #[must_use]
    pub fn new(client: EncyclopediaClient, table: Arc<BrandTable>) -> Self {
        Self { client, table }
    }

    fn split_title(&self, title: &str, hint: Option<&str>) -> Option<NamePair> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some((canonical, consumed)) = self.table.longest_prefix(trimmed) {
            let model = trimmed[consumed..].trim();
            if !model.is_empty() {
                return Some(NamePair {
                    brand: canonical.to_string(),
                    model: model.to_string(),
                });
            }
            // ブランド名単体のタイトルはモデル名にならない
            return None;
        }
        hint.filter(|brand| !brand.eq_ignore_ascii_case(trimmed))
            .map(|brand| NamePair {
                brand: brand.to_string(),
                model: trimmed.to_string(),
            })
    }
}

#[async_trait]
impl LookupSource for EncyclopediaSource {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Encyclopedia
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Option<NamePair>> {
        let mut title = self.client.cross_language_title(&query.text).await?;
        if title.is_none() {
            if let Some(hint) = &query.brand_hint {
                let prefixed = format!("{hint}{}", query.text);
                title = self.client.cross_language_title(&prefixed).await?;
            }
        }
        let Some(title) = title else {
            return Ok(None);
        };
        Ok(self.split_title(&title, query.brand_hint.as_deref()))
    }
}

const LLM_SYSTEM_PROMPT: &str = "You normalize scraped car listing titles. \
Reply with exactly one line in the form `Brand|Model`, using the maker's \
official English brand name and the model designation as marketed. \
Reply `unknown|unknown` if you cannot tell.";

/// LLMソース。最後の砦。出力は `Brand|Model` の1行に固定し、
/// ブランド側は辞書で、モデル側はフィルタで検証してから採用する。
pub struct LlmSource {
    client: LlmClient,
    table: Arc<BrandTable>,
    filter: CandidateFilter,
}

impl LlmSource {
    #[must_use]
    pub fn new(client: LlmClient, table: Arc<BrandTable>) -> Self {
        let filter = CandidateFilter::new(Arc::clone(&table));
        Self {
            client,
            table,
            filter,
        }
    }

    fn parse_reply(&self, reply: &str, hint: Option<&str>) -> Option<NamePair> {
        let line = reply.lines().next()?.trim().trim_matches('`');
        let (brand_raw, model_raw) = line.split_once('|')?;
        let brand_raw = brand_raw.trim();
        let model_raw = model_raw.trim();
        if brand_raw.eq_ignore_ascii_case("unknown") || model_raw.eq_ignore_ascii_case("unknown") {
            return None;
        }

        let resolver = crate::alias::AliasResolver::new(Arc::clone(&self.table));
        let brand = resolver.resolve(brand_raw).or_else(|| {
            // 辞書外ブランドはヒントと一致したときのみ信用する
            hint.filter(|h| h.eq_ignore_ascii_case(brand_raw))
                .map(ToString::to_string)
        })?;
        let model = self.filter.clean(model_raw, Some(&brand))?;
        Some(NamePair { brand, model })
    }
}

#[async_trait]
impl LookupSource for LlmSource {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Llm
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Option<NamePair>> {
        let user = match &query.brand_hint {
            Some(hint) => format!("Listing title: {}\nLikely brand: {hint}", query.text),
            None => format!("Listing title: {}", query.text),
        };
        let reply = self.client.complete(LLM_SYSTEM_PROMPT, &user).await?;
        Ok(self.parse_reply(&reply, query.brand_hint.as_deref()))
    }
}

/// フォールバック連鎖の本体。ソースを優先順に保持する。
pub struct ExternalNameResolver {
    sources: Vec<Arc<dyn LookupSource>>,
    lookup_timeout: Duration,
}

impl ExternalNameResolver {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn LookupSource>>, lookup_timeout: Duration) -> Self {
        Self {
            sources,
            lookup_timeout,
        }
    }

    /// ソースを順に試し、最初の候補を信頼度つきで返す。
    ///
    /// タイムアウトとエラーはWARNで記録して次段へ。全段が空振りなら `None`。
    pub async fn resolve(&self, query: &LookupQuery) -> Option<SplitCandidate> {
        for source in &self.sources {
            let kind = source.source();
            match tokio::time::timeout(self.lookup_timeout, source.lookup(query)).await {
                Ok(Ok(Some(pair))) => {
                    tracing::debug!(
                        source = kind.as_str(),
                        brand = %pair.brand,
                        model = %pair.model,
                        "external source produced candidate"
                    );
                    return Some(SplitCandidate {
                        brand: pair.brand,
                        model: pair.model,
                        confidence: confidence_for(kind),
                        source: kind,
                    });
                }
                Ok(Ok(None)) => {
                    tracing::debug!(source = kind.as_str(), "external source had no answer");
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        source = kind.as_str(),
                        error_kind = ?classify_error(&err),
                        error = ?err,
                        "external source failed, trying next"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        source = kind.as_str(),
                        timeout_secs = self.lookup_timeout.as_secs(),
                        "external source timed out, trying next"
                    );
                }
            }
        }
        None
    }
}

fn confidence_for(source: ResolutionSource) -> f32 {
    match source {
        ResolutionSource::Official => CONFIDENCE_OFFICIAL,
        ResolutionSource::Encyclopedia => CONFIDENCE_ENCYCLOPEDIA,
        _ => CONFIDENCE_LLM,
    }
}
