//! テキスト正規化ユーティリティ。
//!
//! スクレイプ由来の生文字列（ページタイトル、カード片、パンくず）を
//! パターンマッチに安全な形へ揃える。全角・半角の揺れ、空白の連続、
//! 区切り記号のバリエーションをここで吸収する。

use unicode_normalization::UnicodeNormalization;

/// 区切りとして現れうるダッシュ類。全角ハイフンはNFKCで半角化済み。
const SEPARATOR_DASHES: [char; 5] = ['-', '–', '—', '・', '·'];

/// Canonical separator emitted for non-protected dash variants.
pub const CANONICAL_SEPARATOR: &str = " - ";

/// トークン全体を包んでいる場合にだけ剥がす装飾ペア。
const WRAP_PAIRS: [(char, char); 7] = [
    ('【', '】'),
    ('[', ']'),
    ('(', ')'),
    ('「', '」'),
    ('“', '”'),
    ('"', '"'),
    ('\'', '\''),
];

/// 生文字列を正規化する。
///
/// - NFKC互換分解で全角英数・全角空白・全角括弧を半角へ寄せる
/// - 空白の連続（全角空白含む）を半角スペース1個に潰す
/// - トークン全体を包む装飾括弧・引用符だけを剥がす
/// - 区切り用途のダッシュ類を ` - ` に統一する。英数字に両側を挟まれた
///   ハイフン（`DM-i` や `CR-V` のような型式片）は区切りではないので保護する
/// - 正規化の結果が空になる場合は、元の文字列をトリムしてそのまま返す
///   （非空入力から空の候補を作らない）
#[must_use]
pub fn normalize(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();

    let stripped: Vec<String> = folded
        .split_whitespace()
        .map(strip_wrapping)
        .filter(|token| !token.is_empty())
        .collect();
    let joined = stripped.join(" ");

    let separated = unify_separators(&joined);

    let collapsed = separated.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        raw.trim().to_string()
    } else {
        collapsed
    }
}

/// トークン全体を包む装飾を（入れ子も含めて）剥がす。
fn strip_wrapping(token: &str) -> String {
    let mut current = token;
    loop {
        let mut chars = current.chars();
        let Some(first) = chars.next() else {
            break;
        };
        let Some(last) = current.chars().next_back() else {
            break;
        };
        if current.chars().count() < 2 {
            break;
        }
        let wrapped = WRAP_PAIRS
            .iter()
            .any(|&(open, close)| first == open && last == close);
        if !wrapped {
            break;
        }
        let inner = &current[first.len_utf8()..current.len() - last.len_utf8()];
        current = inner;
    }
    current.to_string()
}

/// ダッシュ類を走査し、保護対象でないものを正規区切りへ置き換える。
fn unify_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if SEPARATOR_DASHES.contains(&c) {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
            let next = chars.get(i + 1).copied();
            if is_protected_dash(prev, next) {
                // 型式名の一部。ASCIIハイフンに寄せるだけで分割はしない。
                out.push('-');
            } else {
                out.push_str(CANONICAL_SEPARATOR);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// 両側がASCII英数字のダッシュはモデル名断片（`DM-i`, `UNI-Z` 等）。
fn is_protected_dash(prev: Option<char>, next: Option<char>) -> bool {
    matches!(
        (prev, next),
        (Some(p), Some(n)) if p.is_ascii_alphanumeric() && n.is_ascii_alphanumeric()
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn collapses_fullwidth_space_runs() {
        assert_eq!(normalize("星越L　 参数配置"), "星越L 参数配置");
    }

    #[test]
    fn folds_fullwidth_parens_and_digits() {
        assert_eq!(normalize("宏光ＭＩＮＩＥＶ（五菱汽车）"), "宏光MINIEV(五菱汽车)");
    }

    #[test]
    fn strips_wrapping_brackets_only_for_whole_tokens() {
        assert_eq!(normalize("【图】 朗逸"), "图 朗逸");
        // 括弧がトークンの一部である場合は剥がさない
        assert_eq!(normalize("【图】朗逸"), "【图】朗逸");
        assert_eq!(normalize("宏光MINIEV(五菱汽车)"), "宏光MINIEV(五菱汽车)");
    }

    #[test]
    fn strips_nested_decorations() {
        assert_eq!(normalize("【「新车」】 朗逸"), "新车 朗逸");
    }

    #[test]
    fn protects_model_name_hyphens() {
        assert_eq!(normalize("海豹05 DM-i"), "海豹05 DM-i");
        assert_eq!(normalize("本田CR-V"), "本田CR-V");
        assert_eq!(normalize("长安UNI-Z新能源"), "长安UNI-Z新能源");
    }

    #[rstest]
    #[case("上汽大众-朗逸", "上汽大众 - 朗逸")]
    #[case("吉利·星越L", "吉利 - 星越L")]
    #[case("一汽—大众", "一汽 - 大众")]
    // NFKCで－は半角ハイフンに寄る
    #[case("上汽大众－朗逸", "上汽大众 - 朗逸")]
    fn unifies_separator_dashes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw), expected);
    }

    #[test]
    fn protected_dash_variant_is_folded_to_ascii() {
        assert_eq!(normalize("DM–i"), "DM-i");
    }

    #[test]
    fn never_returns_empty_for_nonempty_input() {
        let out = normalize("  【】  ");
        assert!(!out.is_empty());
        assert_eq!(out, "【】");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
    }
}
