//! テーマ分類用キーワード辞書と高速照合。
//!
//! 辞書はバージョン付きの固定データ。変更したら `KEYWORD_TABLE_VERSION` を上げ、
//! テストのフィクスチャも更新すること。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, BuildError, MatchKind};

use super::theme::Theme;

pub const KEYWORD_TABLE_VERSION: &str = "2026.1";

/// 生成AIテーマのキーワード（定義順 = タグの関連度順）。
pub(crate) const GENAI_KEYWORDS: &[&str] = &[
    "generative ai",
    "artificial intelligence",
    "large language model",
    "llm",
    "ai agent",
    "autonomous agent",
    "machine learning",
    "deep learning",
    "neural network",
    "ai",
    "gpt",
    "chatbot",
    "prompt engineering",
    "fine-tuning",
    "retrieval-augmented generation",
    "rag",
    "multimodal",
    "diffusion model",
    "computer vision",
    "natural language processing",
    "ai safety",
];

/// ブロックチェーンテーマのキーワード。
pub(crate) const BLOCKCHAIN_KEYWORDS: &[&str] = &[
    "blockchain",
    "bitcoin",
    "ethereum",
    "cryptocurrency",
    "crypto",
    "defi",
    "decentralized finance",
    "nft",
    "dao",
    "web3",
    "smart contract",
    "decentralized",
    "cbdc",
    "tokenization",
    "stablecoin",
    "layer 2",
    "consensus",
    "mining",
    "wallet",
];

#[must_use]
pub(crate) fn keywords_for(theme: Theme) -> &'static [&'static str] {
    match theme {
        Theme::Genai => GENAI_KEYWORDS,
        Theme::Blockchain => BLOCKCHAIN_KEYWORDS,
    }
}

/// 辞書の1エントリ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub theme: Theme,
    pub phrase: String,
}

/// Aho-Corasick ベースの照合器。
///
/// 小文字化したテキストに対し全キーワードを一度に走査し、語境界に乗ったヒットだけを数える。
#[derive(Debug)]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
    matcher: AhoCorasick,
}

impl KeywordTable {
    /// # Errors
    /// オートマトンの構築に失敗した場合は [`BuildError`] を返す。
    pub fn new(entries: Vec<KeywordEntry>) -> Result<Self, BuildError> {
        let patterns: Vec<String> = entries.iter().map(|e| e.phrase.to_lowercase()).collect();
        let matcher = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&patterns)?;
        Ok(Self { entries, matcher })
    }

    /// 組み込み辞書からテーブルを構築する。
    #[must_use]
    pub fn default_table() -> Self {
        let entries = Theme::ALL
            .iter()
            .flat_map(|&theme| {
                keywords_for(theme).iter().map(move |phrase| KeywordEntry {
                    theme,
                    phrase: (*phrase).to_string(),
                })
            })
            .collect();
        Self::new(entries).expect("built-in keyword table is valid")
    }

    #[must_use]
    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    /// テキスト中でヒットしたエントリを、エントリ順のフラグ列で返す。
    ///
    /// 同じキーワードが何度出現しても1回として扱う。
    #[must_use]
    pub fn hits(&self, text: &str) -> Vec<bool> {
        let lowered = text.to_lowercase();
        let mut hits = vec![false; self.entries.len()];
        for mat in self.matcher.find_overlapping_iter(&lowered) {
            let idx = mat.pattern().as_usize();
            if hits[idx] {
                continue;
            }
            if on_word_boundary(&lowered, mat.start(), mat.end()) {
                hits[idx] = true;
            }
        }
        hits
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// 前後が語境界か判定する。末尾の複数形 `s` は1文字だけ許容する。
fn on_word_boundary(haystack: &str, start: usize, end: usize) -> bool {
    let starts_clean = haystack[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !is_word_char(c));
    if !starts_clean {
        return false;
    }

    let mut rest = haystack[end..].chars();
    match rest.next() {
        None => true,
        Some('s') => rest.next().is_none_or(|c| !is_word_char(c)),
        Some(c) => !is_word_char(c),
    }
}
