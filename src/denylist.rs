//! 外部ソース由来の候補名に対する却下フィルタ。
//!
//! 公式サイトのタイトルは極めてノイジーで、素朴に抽出すると曜日の略記や
//! 国名が「モデル名」として返ってくる。ここで文字種・長さ・既知のゴミ語を
//! 検査し、汚染された候補を確実に落とす。

use std::sync::Arc;

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::alias::BrandTable;

/// 許容する文字種と長さ（2〜40文字、英数字開始）。
static VALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 .+\-_/]{1,39}$").expect("pattern"));

/// "Jun 7" や "Sat 12" のような日付断片。
static DATE_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec|mon|tue|wed|thu|fri|sat|sun)\.?\s*\d{1,2}$")
        .expect("pattern")
});

/// 先頭に付きがちな宣伝語。
static LEADING_FLUFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(the\s+)?(all\s+new|brand\s+new|new|order|category)\s+").expect("pattern")
});

/// 候補全体がこれらに一致したら却下（小文字比較）。
const STOP_WORDS: [&str; 24] = [
    "suv",
    "suvs",
    "sedan",
    "mpv",
    "hatchback",
    "pickup",
    "ev",
    "phev",
    "category",
    "categories",
    "order",
    "preorder",
    "reserve",
    "config",
    "configuration",
    "spec",
    "specs",
    "download",
    "brochure",
    "manual",
    "news",
    "dealer",
    "store",
    "home",
];

/// 含まれているだけで却下する定型フレーズ。
const STOP_PHRASES: [&str; 12] = [
    "official site",
    "official website",
    "electric car",
    "electric cars",
    "product category",
    "book now",
    "press release",
    "join us",
    "new zealand",
    "saudi arabia",
    "contact us",
    "about us",
];

/// 国・地域名（単語単位の小文字比較）。
const GEO_WORDS: [&str; 33] = [
    "singapore",
    "ethiopia",
    "egypt",
    "saudi",
    "uae",
    "qatar",
    "oman",
    "kuwait",
    "bahrain",
    "vietnam",
    "indonesia",
    "malaysia",
    "thailand",
    "philippines",
    "japan",
    "korea",
    "europe",
    "global",
    "international",
    "china",
    "usa",
    "canada",
    "mexico",
    "brazil",
    "turkey",
    "russia",
    "india",
    "australia",
    "uk",
    "germany",
    "france",
    "italy",
    "spain",
];

/// タイトル末尾から削ってよい語。ブランド名はテーブル経由で判定する。
const TRAILER_WORDS: [&str; 5] = ["official", "website", "site", "home", "global"];

static STOP_PHRASE_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(STOP_PHRASES)
        .expect("stop phrase automaton")
});

/// 外部候補の洗浄と検証。ブランド辞書を参照して「ブランド名だけ」の
/// 候補も落とす。
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    table: Arc<BrandTable>,
}

impl CandidateFilter {
    #[must_use]
    pub fn new(table: Arc<BrandTable>) -> Self {
        Self { table }
    }

    /// 候補文字列を整形し、検証を通ったものだけ返す。
    ///
    /// タイトル末尾の `| BYD Global` のような付帯部を落とし、ブランド語と
    /// 定型語を剥がした上で [`Self::is_junk`] にかける。
    #[must_use]
    pub fn clean(&self, raw: &str, brand_hint: Option<&str>) -> Option<String> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        // 最初の区切り以降はサイト名・ブランド付帯部
        let head = split_at_separator(&collapsed);

        let defluffed = LEADING_FLUFF.replace(head, "");

        let mut tokens: Vec<&str> = defluffed.split_whitespace().collect();
        while let Some(first) = tokens.first() {
            if self.is_droppable_token(first, brand_hint) {
                tokens.remove(0);
            } else {
                break;
            }
        }
        while let Some(last) = tokens.last() {
            if self.is_droppable_token(last, brand_hint) {
                tokens.pop();
            } else {
                break;
            }
        }

        let cleaned = tokens.join(" ");
        if self.is_junk(&cleaned) {
            None
        } else {
            Some(cleaned)
        }
    }

    /// 候補として受け入れられない文字列かどうか。
    #[must_use]
    pub fn is_junk(&self, candidate: &str) -> bool {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return true;
        }
        if !VALID_CHARS.is_match(trimmed) {
            return true;
        }
        let lower = trimmed.to_lowercase();
        if DATE_FRAGMENT.is_match(trimmed) {
            return true;
        }
        if STOP_WORDS.contains(&lower.as_str()) {
            return true;
        }
        if GEO_WORDS.contains(&lower.as_str()) {
            return true;
        }
        if lower
            .split_whitespace()
            .any(|token| GEO_WORDS.contains(&token))
        {
            return true;
        }
        if STOP_PHRASE_MATCHER.is_match(&lower) {
            return true;
        }
        // ブランド名だけの候補はモデル名ではない
        if self.table.is_canonical(trimmed) {
            return true;
        }
        false
    }

    fn is_droppable_token(&self, token: &str, brand_hint: Option<&str>) -> bool {
        let bare = token.trim_matches(['|', '-', '·', ',']);
        if bare.is_empty() {
            return true;
        }
        if TRAILER_WORDS
            .iter()
            .any(|word| bare.eq_ignore_ascii_case(word))
        {
            return true;
        }
        if self.table.is_canonical(bare) {
            return true;
        }
        brand_hint.is_some_and(|hint| bare.eq_ignore_ascii_case(hint.trim()))
    }
}

/// 最初の区切り（スペースで挟まれたダッシュ、またはパイプ）で切る。
/// `DM-i` のような詰めたハイフンは区切りとして扱わない。
fn split_at_separator(text: &str) -> &str {
    static SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s[-–—|·•]\s|\|").expect("pattern"));
    SEP.find(text).map_or(text, |m| text[..m.start()].trim_end())
}
