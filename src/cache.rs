//! 解決結果のプロセス内キャッシュ。
//!
//! キーは「辞書バージョン:正規化済み入力」。辞書を差し替えると
//! キーが変わるので、明示的な掃除をしなくても旧結果は参照されなくなる。

use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::schema::ResolvedName;

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<FxHashMap<String, ResolvedName>>,
}

impl ResolutionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(table_version: &str, normalized: &str) -> String {
        format!("{table_version}:{normalized}")
    }

    pub async fn get(&self, key: &str) -> Option<ResolvedName> {
        self.entries.read().await.get(key).cloned()
    }

    /// 既存エントリを上書きしない。同じ正規化入力が並走しても
    /// 先に書いた結果で固定され、後続は同じ答えを見る。
    pub async fn insert_if_absent(&self, key: String, value: ResolvedName) -> ResolvedName {
        let mut entries = self.entries.write().await;
        entries.entry(key).or_insert(value).clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
