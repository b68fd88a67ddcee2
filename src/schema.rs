//! Data model shared across resolution stages.

use serde::{Deserialize, Serialize};

/// 規則マッチごとの信頼度スコア。
///
/// 括弧内ブランド注記が最も曖昧さが少なく、区切り文字による分割が最も弱い。
pub const CONFIDENCE_PARENTHETICAL: f32 = 0.9;
pub const CONFIDENCE_BRAND_PREFIX: f32 = 0.85;
pub const CONFIDENCE_SEPARATOR: f32 = 0.7;
pub const CONFIDENCE_NONE: f32 = 0.0;

/// External sources are weaker than any local rule match.
pub const CONFIDENCE_OFFICIAL: f32 = 0.6;
pub const CONFIDENCE_ENCYCLOPEDIA: f32 = 0.5;
pub const CONFIDENCE_LLM: f32 = 0.4;

/// この値未満の信頼度は外部ステージへエスカレーションする。
///
/// 規則マッチは 0.7 / 0.85 / 0.9 に較正されているため、区切り分割の失敗と
/// 不一致ケースだけが閾値を下回る。
pub const ESCALATION_THRESHOLD: f32 = 0.7;

/// Placeholder emitted when every stage is exhausted. Distinct from a raw
/// passthrough so downstream consumers can tell failure from coincidence.
pub const UNRESOLVED_PLACEHOLDER: &str = "unknown";

/// Where a raw string was observed in the source page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Title,
    Breadcrumb,
    CardText,
}

/// 収集元から渡される未加工の文字列。解決後は破棄される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNameInput {
    pub text: String,
    pub source_kind: SourceKind,
    /// 別フィールドから既に判明しているブランド（あれば）。
    pub context_brand_hint: Option<String>,
}

impl RawNameInput {
    #[must_use]
    pub fn title(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_kind: SourceKind::Title,
            context_brand_hint: None,
        }
    }

    #[must_use]
    pub fn breadcrumb(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_kind: SourceKind::Breadcrumb,
            context_brand_hint: None,
        }
    }

    #[must_use]
    pub fn card_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_kind: SourceKind::CardText,
            context_brand_hint: None,
        }
    }

    #[must_use]
    pub fn with_brand_hint(mut self, hint: impl Into<String>) -> Self {
        self.context_brand_hint = Some(hint.into());
        self
    }
}

/// Which stage produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Rule,
    Dictionary,
    Official,
    Encyclopedia,
    Llm,
    Unresolved,
}

impl ResolutionSource {
    /// Tie-break order for equal-confidence candidates: rule beats
    /// dictionary beats any external source.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Rule => 0,
            Self::Dictionary => 1,
            Self::Official => 2,
            Self::Encyclopedia => 3,
            Self::Llm => 4,
            Self::Unresolved => 5,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Dictionary => "dictionary",
            Self::Official => "official",
            Self::Encyclopedia => "encyclopedia",
            Self::Llm => "llm",
            Self::Unresolved => "unresolved",
        }
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ひとつの解決ステージが出す (brand, model) の中間候補。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitCandidate {
    pub brand: String,
    pub model: String,
    pub confidence: f32,
    pub source: ResolutionSource,
}

impl SplitCandidate {
    /// どの規則にも一致しなかったことを示す空の候補。
    ///
    /// ブランド不明のまま下流へ伝播させる。誤ったブランドを推測で
    /// 埋めるより空のほうがよい。
    #[must_use]
    pub fn no_match() -> Self {
        Self {
            brand: String::new(),
            model: String::new(),
            confidence: CONFIDENCE_NONE,
            source: ResolutionSource::Unresolved,
        }
    }

    #[must_use]
    pub fn needs_escalation(&self) -> bool {
        self.confidence < ESCALATION_THRESHOLD
    }
}

/// One dictionary entry: a set of raw spellings collapsing to a single
/// canonical brand. Loaded once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalBrandEntry {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl CanonicalBrandEntry {
    #[must_use]
    pub fn new(canonical: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// 1入力行につき1件の最終出力。作成後は不変。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedName {
    pub brand: String,
    pub model: String,
    pub confidence: f32,
    pub source: ResolutionSource,
    /// Traceability link back to the raw observation.
    pub input: RawNameInput,
}

impl ResolvedName {
    /// Terminal record after all stages were exhausted. Never dropped from
    /// batch output.
    #[must_use]
    pub fn unresolved(input: RawNameInput) -> Self {
        Self {
            brand: UNRESOLVED_PLACEHOLDER.to_string(),
            model: UNRESOLVED_PLACEHOLDER.to_string(),
            confidence: CONFIDENCE_NONE,
            source: ResolutionSource::Unresolved,
            input,
        }
    }
}
