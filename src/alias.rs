//! ブランド別名辞書と正規化ルックアップ。
//!
//! 生のブランド表記（合弁会社名・持株会社名・略称）を正規ブランド名へ
//! 畳み込む。テーブルはプロセス起動時に一度だけ構築される読み取り専用
//! データで、実行時に変更されることはない。更新はテーブルの差し替え
//! （バージョンラベルの繰り上げ）で行う。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::schema::CanonicalBrandEntry;

/// 末尾に付きがちな企業接尾辞。剥がしてから辞書を一度だけ再引きする。
const CORPORATE_SUFFIXES_ZH: [&str; 7] = [
    "股份有限公司",
    "有限公司",
    "新能源",
    "集团",
    "控股",
    "公司",
    "汽车",
];

/// 英語表記の企業接尾辞（小文字比較、語境界つき）。
const CORPORATE_SUFFIXES_EN: [&str; 9] = [
    " group",
    " holdings",
    " holding",
    " motors",
    " motor",
    " automobile",
    " auto",
    " company",
    " co",
];

/// 正規ブランド辞書。起動時に一度構築し、以後は共有参照のみ。
#[derive(Debug)]
pub struct BrandTable {
    /// 小文字化した正規名 → 正規名
    canonical: FxHashMap<String, String>,
    /// 小文字化した別名 → 正規名
    aliases: FxHashMap<String, String>,
    /// 前方一致用キー（文字数の長い順）。短い別名が長い別名を
    /// 先取りしないための並び。
    prefix_keys: Vec<(String, String)>,
    version: String,
}

impl BrandTable {
    #[must_use]
    pub fn from_entries(entries: &[CanonicalBrandEntry], version: impl Into<String>) -> Self {
        let mut canonical = FxHashMap::default();
        let mut aliases = FxHashMap::default();
        let mut prefix_keys: Vec<(String, String)> = Vec::new();

        for entry in entries {
            canonical.insert(entry.canonical.to_lowercase(), entry.canonical.clone());
            prefix_keys.push((entry.canonical.clone(), entry.canonical.clone()));
            for alias in &entry.aliases {
                aliases.insert(alias.to_lowercase(), entry.canonical.clone());
                prefix_keys.push((alias.clone(), entry.canonical.clone()));
            }
        }

        // 長い順、同長はキー辞書順で決定的に。
        prefix_keys.sort_by(|a, b| {
            let len_a = a.0.chars().count();
            let len_b = b.0.chars().count();
            len_b.cmp(&len_a).then_with(|| a.0.cmp(&b.0))
        });
        prefix_keys.dedup();

        Self {
            canonical,
            aliases,
            prefix_keys,
            version: version.into(),
        }
    }

    /// JSONファイル（`CanonicalBrandEntry` の配列）からテーブルを読む。
    ///
    /// # Errors
    /// ファイルが読めない、またはJSONの形が合わない場合はエラーを返す。
    pub fn from_json_file(path: impl AsRef<Path>, version: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read brand table {}", path.display()))?;
        let entries: Vec<CanonicalBrandEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse brand table {}", path.display()))?;
        Ok(Self::from_entries(&entries, version))
    }

    /// ソースデータに実際に現れるブランドを収めた既定テーブル。
    #[must_use]
    pub fn builtin(version: impl Into<String>) -> Self {
        Self::from_entries(&builtin_entries(), version)
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 正規名そのものかどうか。
    #[must_use]
    pub fn is_canonical(&self, name: &str) -> bool {
        self.canonical.contains_key(&name.to_lowercase())
    }

    fn exact(&self, raw: &str) -> Option<&str> {
        let key = raw.to_lowercase();
        self.canonical
            .get(&key)
            .or_else(|| self.aliases.get(&key))
            .map(String::as_str)
    }

    /// 最長前方一致。一致した正規名と、消費した先頭バイト数を返す。
    ///
    /// ラテン文字ブランドでは、一致直後が英字だと別単語への食い込み
    /// （短いブランド名が長いモデル名に埋め込まれているケース）なので
    /// そのキーは採用しない。
    #[must_use]
    pub fn longest_prefix(&self, text: &str) -> Option<(&str, usize)> {
        for (key, canonical) in &self.prefix_keys {
            let Some(head) = text.get(..key.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(key) {
                continue;
            }
            let key_ends_alnum = key.chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric());
            let rest_starts_letter = text[key.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic());
            if key_ends_alnum && rest_starts_letter {
                continue;
            }
            return Some((canonical.as_str(), key.len()));
        }
        None
    }
}

/// 辞書テーブルだけを根拠にブランド名を解決する純関数リゾルバ。
///
/// ネットワークも入出力も行わない。同じ入力には常に同じ答えを返す。
#[derive(Debug, Clone)]
pub struct AliasResolver {
    table: Arc<BrandTable>,
}

impl AliasResolver {
    #[must_use]
    pub fn new(table: Arc<BrandTable>) -> Self {
        Self { table }
    }

    /// 生のブランド表記を正規名へ解決する。解決できなければ `None`。
    ///
    /// 完全一致 → 別名一致 → 企業接尾辞を剥がして一回だけ再試行、の順。
    /// 明示的な別名表と接尾辞剥がし以外の部分文字列一致は行わない。
    /// 埋め込まれた短いブランド名への誤一致を避けるための方針。
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(canonical) = self.table.exact(trimmed) {
            return Some(canonical.to_string());
        }

        let stripped = strip_corporate_suffixes(trimmed);
        if stripped != trimmed {
            if let Some(canonical) = self.table.exact(&stripped) {
                return Some(canonical.to_string());
            }
        }

        None
    }

    #[must_use]
    pub fn table(&self) -> &BrandTable {
        &self.table
    }
}

/// 企業接尾辞の語で始まるかどうか。
///
/// 前方一致がブランド名で止まり、残りが「股份有限公司」や「Automobile」で
/// 始まる場合、会社名を途中で切っただけなので前方一致規則は適用しない。
#[must_use]
pub(crate) fn starts_with_corporate_qualifier(rest: &str) -> bool {
    let trimmed = rest.trim_start();
    if CORPORATE_SUFFIXES_ZH
        .iter()
        .any(|suffix| trimmed.starts_with(suffix))
    {
        return true;
    }
    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches(['.', ','])
        .to_lowercase();
    CORPORATE_SUFFIXES_EN
        .iter()
        .any(|suffix| suffix.trim_start() == first_word)
}

/// 末尾の企業接尾辞を（複数重なっていても）剥がす。
fn strip_corporate_suffixes(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let before = current.len();

        for suffix in CORPORATE_SUFFIXES_ZH {
            if let Some(head) = current.strip_suffix(suffix) {
                current = head.trim_end().to_string();
            }
        }

        // 「Co.」「Inc,」のような末尾句読点は ends_with の前に落とす
        current = current.trim_end_matches(['.', ',']).to_string();
        let lower = current.to_lowercase();
        for suffix in CORPORATE_SUFFIXES_EN {
            if lower.ends_with(suffix) {
                current.truncate(current.len() - suffix.len());
                current = current.trim_end_matches(['.', ',', ' ']).to_string();
                break;
            }
        }

        if current.len() == before {
            return current;
        }
    }
}

/// 既定のブランド辞書。中国国内の合弁・持株表記も正規小売ブランドへ畳む。
#[must_use]
pub fn builtin_entries() -> Vec<CanonicalBrandEntry> {
    vec![
        CanonicalBrandEntry::new("BYD", &["比亚迪", "比亚迪汽车", "BYD Auto"]),
        CanonicalBrandEntry::new("Wuling", &["五菱", "五菱汽车", "上汽通用五菱", "SGMW"]),
        CanonicalBrandEntry::new("Geely", &["吉利", "吉利汽车", "吉利集团", "吉利银河", "Geely Galaxy"]),
        CanonicalBrandEntry::new("Tesla", &["特斯拉"]),
        CanonicalBrandEntry::new("Toyota", &["丰田", "一汽丰田", "广汽丰田"]),
        CanonicalBrandEntry::new("Volkswagen", &["大众", "上汽大众", "一汽大众", "VW"]),
        CanonicalBrandEntry::new("Honda", &["本田", "广汽本田", "东风本田"]),
        CanonicalBrandEntry::new("Nissan", &["日产", "东风日产"]),
        CanonicalBrandEntry::new("Audi", &["奥迪", "一汽奥迪"]),
        CanonicalBrandEntry::new("BMW", &["宝马", "华晨宝马"]),
        CanonicalBrandEntry::new("Mercedes-Benz", &["奔驰", "北京奔驰", "梅赛德斯", "梅赛德斯-奔驰"]),
        CanonicalBrandEntry::new("Buick", &["别克", "上汽通用别克"]),
        CanonicalBrandEntry::new("Chery", &["奇瑞", "奇瑞汽车"]),
        CanonicalBrandEntry::new("Haval", &["哈弗"]),
        CanonicalBrandEntry::new("Hongqi", &["红旗"]),
        CanonicalBrandEntry::new("Changan", &["长安", "长安汽车", "长安启源"]),
        CanonicalBrandEntry::new("XPeng", &["小鹏", "小鹏汽车"]),
        CanonicalBrandEntry::new("Xiaomi", &["小米", "小米汽车"]),
        CanonicalBrandEntry::new("Leapmotor", &["零跑", "零跑汽车"]),
        CanonicalBrandEntry::new("NIO", &["蔚来"]),
        CanonicalBrandEntry::new("Onvo", &["乐道"]),
        CanonicalBrandEntry::new("Li Auto", &["理想", "理想汽车"]),
        CanonicalBrandEntry::new("AITO", &["问界"]),
        CanonicalBrandEntry::new("Seres", &["赛力斯"]),
        CanonicalBrandEntry::new("Great Wall", &["长城", "长城汽车"]),
        CanonicalBrandEntry::new("WEY", &["魏牌"]),
        CanonicalBrandEntry::new("Trumpchi", &["传祺", "广汽传祺"]),
        CanonicalBrandEntry::new("GAC", &["广汽", "广汽集团"]),
        CanonicalBrandEntry::new("FAW", &["一汽", "中国一汽"]),
        CanonicalBrandEntry::new("Bestune", &["奔腾"]),
        CanonicalBrandEntry::new("Dongfeng", &["东风", "东风汽车"]),
        CanonicalBrandEntry::new("SAIC", &["上汽", "上汽集团"]),
        CanonicalBrandEntry::new("Roewe", &["荣威"]),
        CanonicalBrandEntry::new("MG", &["名爵", "MG名爵"]),
        CanonicalBrandEntry::new("BAIC", &["北汽"]),
        CanonicalBrandEntry::new("Arcfox", &["极狐"]),
        CanonicalBrandEntry::new("Jetour", &["捷途"]),
        CanonicalBrandEntry::new("Zeekr", &["极氪"]),
        CanonicalBrandEntry::new("Lynk & Co", &["领克"]),
        CanonicalBrandEntry::new("Denza", &["腾势"]),
        CanonicalBrandEntry::new("Deepal", &["深蓝", "深蓝汽车"]),
        CanonicalBrandEntry::new("Avatr", &["阿维塔"]),
    ]
}
