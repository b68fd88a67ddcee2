//! 規則ベースの (brand, model) 分割。
//!
//! 正規化済み文字列に対して順序付きの規則を適用し、最初に一致した規則の
//! 信頼度つき候補を返す。どの規則にも当たらなければ空の候補を返し、
//! 判断は下流ステージへ委ねる。ブランドを推測で埋めることはしない。

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::alias::{AliasResolver, BrandTable};
use crate::schema::{
    CONFIDENCE_BRAND_PREFIX, CONFIDENCE_PARENTHETICAL, CONFIDENCE_SEPARATOR, ResolutionSource,
    SplitCandidate,
};

/// 末尾の括弧でブランドを注記するパターン: `<model>(<brand>)`。
/// 全角括弧は正規化で半角に寄っている前提。
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<model>[^()]+?)\s*\((?P<brand>[^()]+)\)$").expect("pattern"));

/// 正規化後の区切り: ` - ` もしくはパイプ。
static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s-\s|\s*\|\s*").expect("pattern"));

/// モデル名として妥当な先頭の連続部分（英数・漢字・空白・`+`・`.`・`/`・`-`）。
/// `ID.4` のようにドットを含む車名を切らないこと。`_` はポータル定型語の
/// 連結子（`参数配置_汽车之家`）なので意図的に含めない。
static MODEL_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z\p{Han}+./\- ]+").expect("pattern"));

/// 車系ページタイトルに付きがちなポータル定型語。モデル名の末尾から落とす。
const PORTAL_BOILERPLATE: [&str; 6] = ["参数配置", "报价", "图片", "论坛", "二手车", "汽车之家"];

#[derive(Debug, Clone)]
pub struct RuleBasedSplitter {
    resolver: AliasResolver,
}

impl RuleBasedSplitter {
    #[must_use]
    pub fn new(table: Arc<BrandTable>) -> Self {
        Self {
            resolver: AliasResolver::new(table),
        }
    }

    /// 順序付き規則で分割する。最初に一致した規則で確定。
    ///
    /// 1. 括弧内ブランド注記 → 0.9
    /// 2. 既知ブランドの最長前方一致 → 0.85
    /// 3. 区切り分割（左側が辞書で解決できた場合のみ）→ 0.7
    /// 4. 不一致 → 空候補・0.0
    #[must_use]
    pub fn split(&self, text: &str) -> SplitCandidate {
        if let Some(candidate) = self.parenthetical_rule(text) {
            return candidate;
        }
        if let Some(candidate) = self.brand_prefix_rule(text) {
            return candidate;
        }
        if let Some(candidate) = self.separator_rule(text) {
            return candidate;
        }
        SplitCandidate::no_match()
    }

    fn parenthetical_rule(&self, text: &str) -> Option<SplitCandidate> {
        let captures = PARENTHETICAL.captures(text)?;
        let brand_raw = captures.name("brand")?.as_str().trim();
        let model = clean_model_fragment(captures.name("model")?.as_str());
        if brand_raw.is_empty() || model.is_empty() {
            return None;
        }
        // 辞書で正規名に畳めるなら畳む。畳めなくても注記は注記として信じる。
        let brand = self
            .resolver
            .resolve(brand_raw)
            .unwrap_or_else(|| brand_raw.to_string());
        Some(SplitCandidate {
            brand,
            model,
            confidence: CONFIDENCE_PARENTHETICAL,
            source: ResolutionSource::Rule,
        })
    }

    fn brand_prefix_rule(&self, text: &str) -> Option<SplitCandidate> {
        let (canonical, consumed) = self.resolver.table().longest_prefix(text)?;
        let rest = text[consumed..].trim_start_matches([' ', '-']).trim();
        // 会社名を途中で切っただけのケースは区切り規則に任せる。
        if crate::alias::starts_with_corporate_qualifier(rest) {
            return None;
        }
        Some(SplitCandidate {
            brand: canonical.to_string(),
            model: clean_model_fragment(rest),
            confidence: CONFIDENCE_BRAND_PREFIX,
            source: ResolutionSource::Rule,
        })
    }

    fn separator_rule(&self, text: &str) -> Option<SplitCandidate> {
        let found = SEPARATOR.find(text)?;
        let left = text[..found.start()].trim();
        let right = text[found.end()..].trim();
        // 左側が既知ブランドに解決できないなら偽陽性とみなして棄却する。
        let brand = self.resolver.resolve(left)?;
        let model = clean_model_fragment(right);
        if model.is_empty() {
            return None;
        }
        Some(SplitCandidate {
            brand,
            model,
            confidence: CONFIDENCE_SEPARATOR,
            source: ResolutionSource::Rule,
        })
    }
}

/// モデル名断片を整える。
///
/// 後続の区切り以降とポータル定型語を落とす。`DM-i` のような空白を
/// 伴わないハイフンはここでは切れない。
pub(crate) fn clean_model_fragment(raw: &str) -> String {
    let trimmed = raw.trim();
    let cut = SEPARATOR
        .find(trimmed)
        .map_or(trimmed, |m| trimmed[..m.start()].trim());
    let matched = MODEL_FRAGMENT.find(cut).map_or(cut, |m| m.as_str()).trim();

    let mut tokens: Vec<&str> = matched.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if PORTAL_BOILERPLATE.contains(last) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::schema::CONFIDENCE_NONE;

    fn splitter() -> RuleBasedSplitter {
        RuleBasedSplitter::new(Arc::new(BrandTable::builtin("test-v1")))
    }

    #[test]
    fn parenthetical_rule_wins_with_exact_confidence() {
        let candidate = splitter().split(&normalize("宏光MINIEV（五菱汽车）"));
        assert_eq!(candidate.brand, "Wuling");
        assert_eq!(candidate.model, "宏光MINIEV");
        assert_eq!(candidate.confidence, CONFIDENCE_PARENTHETICAL);
        assert_eq!(candidate.source, ResolutionSource::Rule);
    }

    #[test]
    fn parenthetical_keeps_unknown_brand_verbatim() {
        let candidate = splitter().split(&normalize("某车型（未知厂商）"));
        assert_eq!(candidate.brand, "未知厂商");
        assert_eq!(candidate.confidence, CONFIDENCE_PARENTHETICAL);
    }

    #[test]
    fn brand_prefix_rule_uses_longest_alias() {
        let candidate = splitter().split(&normalize("上汽大众朗逸"));
        assert_eq!(candidate.brand, "Volkswagen");
        assert_eq!(candidate.model, "朗逸");
        assert_eq!(candidate.confidence, CONFIDENCE_BRAND_PREFIX);
    }

    #[test]
    fn canonical_brand_alone_yields_empty_model() {
        let candidate = splitter().split("BYD");
        assert_eq!(candidate.brand, "BYD");
        assert_eq!(candidate.model, "");
        assert_eq!(candidate.confidence, CONFIDENCE_BRAND_PREFIX);
    }

    #[test]
    fn prefix_rule_trims_portal_boilerplate() {
        let candidate = splitter().split(&normalize("上汽大众-朗逸 参数配置_汽车之家"));
        assert_eq!(candidate.brand, "Volkswagen");
        assert_eq!(candidate.model, "朗逸");
    }

    #[test]
    fn separator_rule_requires_known_left_segment() {
        // 左側 "星越L 参数配置" はブランドに解決できないので棄却 → 不一致
        let candidate = splitter().split(&normalize("星越L 参数配置 | 汽车之家"));
        assert_eq!(candidate.brand, "");
        assert_eq!(candidate.confidence, CONFIDENCE_NONE);
        assert!(candidate.needs_escalation());
    }

    #[test]
    fn separator_rule_resolves_joint_venture_left_segment() {
        // 前方一致では拾えない表記でも、区切り左側の接尾辞剥がしで解決できる
        let candidate = splitter().split("奇瑞汽车股份有限公司 - 瑞虎8");
        assert_eq!(candidate.brand, "Chery");
        assert_eq!(candidate.model, "瑞虎8");
        assert_eq!(candidate.confidence, CONFIDENCE_SEPARATOR);
    }

    #[test]
    fn model_only_string_propagates_empty_brand() {
        let candidate = splitter().split(&normalize("星越L"));
        assert_eq!(candidate.brand, "");
        assert_eq!(candidate.model, "");
        assert_eq!(candidate.confidence, CONFIDENCE_NONE);
    }

    #[test]
    fn protected_hyphen_survives_splitting() {
        let candidate = splitter().split(&normalize("比亚迪海豹05 DM-i"));
        assert_eq!(candidate.brand, "BYD");
        assert_eq!(candidate.model, "海豹05 DM-i");
    }

    #[test]
    fn dotted_model_name_survives_splitting() {
        let candidate = splitter().split(&normalize("一汽大众ID.4"));
        assert_eq!(candidate.brand, "Volkswagen");
        assert_eq!(candidate.model, "ID.4");
        assert_eq!(candidate.confidence, CONFIDENCE_BRAND_PREFIX);
    }

    #[test]
    fn underscore_still_delimits_portal_boilerplate() {
        let candidate = splitter().split(&normalize("上汽大众朗逸 参数配置_报价_图片"));
        assert_eq!(candidate.brand, "Volkswagen");
        assert_eq!(candidate.model, "朗逸");
    }

    #[test]
    fn latin_title_with_separator() {
        let candidate = splitter().split(&normalize("Tesla Model Y"));
        assert_eq!(candidate.brand, "Tesla");
        assert_eq!(candidate.model, "Model Y");
        assert_eq!(candidate.confidence, CONFIDENCE_BRAND_PREFIX);
    }
}
