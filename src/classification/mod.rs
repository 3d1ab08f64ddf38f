//! テーマ分類とタグ付けの高水準API。
//!
//! 分類は純粋関数で、同じ入力には常に同じ結果を返す。
use std::collections::BTreeMap;

mod keywords;
mod tags;
mod theme;

pub use keywords::{KEYWORD_TABLE_VERSION, KeywordEntry, KeywordTable};
pub use tags::{TagNormalizer, canonical_tag, tag_universe};
pub use theme::{Theme, UnknownTheme};

/// 1回の分類呼び出しの結果。永続化はしない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub detected_theme: Theme,
    pub scores_by_theme: BTreeMap<Theme, usize>,
    /// 勝者テーマでヒットしたキーワード（辞書の定義順）。
    pub matched_keywords: Vec<String>,
}

impl ClassificationResult {
    /// いずれかのテーマで1件以上ヒットしたか。
    #[must_use]
    pub fn has_evidence(&self) -> bool {
        self.scores_by_theme.values().any(|score| *score > 0)
    }

    #[must_use]
    pub fn score(&self, theme: Theme) -> usize {
        self.scores_by_theme.get(&theme).copied().unwrap_or(0)
    }
}

/// キーワード辞書ベースのテーマ分類器。
#[derive(Debug)]
pub struct Classifier {
    table: KeywordTable,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordTable::default_table())
    }
}

impl Classifier {
    #[must_use]
    pub fn new(table: KeywordTable) -> Self {
        Self { table }
    }

    /// テキストを分類する。全テーマ0件なら `fallback` を返す。
    ///
    /// 同点の場合は `Theme::ALL` の先頭側が勝つ。
    #[must_use]
    pub fn classify(&self, text: &str, fallback: Theme) -> ClassificationResult {
        let hits = self.table.hits(text);
        let entries = self.table.entries();

        let mut scores: BTreeMap<Theme, usize> =
            Theme::ALL.iter().map(|theme| (*theme, 0)).collect();
        for (entry, hit) in entries.iter().zip(&hits) {
            if *hit {
                *scores.entry(entry.theme).or_insert(0) += 1;
            }
        }

        let mut detected = fallback;
        let mut best = 0;
        for theme in Theme::ALL {
            let score = scores.get(&theme).copied().unwrap_or(0);
            if score > best {
                best = score;
                detected = theme;
            }
        }

        let matched_keywords = if best == 0 {
            Vec::new()
        } else {
            entries
                .iter()
                .zip(&hits)
                .filter(|(entry, hit)| **hit && entry.theme == detected)
                .map(|(entry, _)| entry.phrase.clone())
                .collect()
        };

        ClassificationResult {
            detected_theme: detected,
            scores_by_theme: scores,
            matched_keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::default();
        let text = "Ethereum validators and LLM copilots";
        assert_eq!(
            classifier.classify(text, Theme::Genai),
            classifier.classify(text, Theme::Genai)
        );
    }

    #[test]
    fn ties_resolve_to_first_declared_theme() {
        let classifier = Classifier::default();
        let result = classifier.classify("bitcoin meets gpt", Theme::Blockchain);
        assert_eq!(result.score(Theme::Genai), 1);
        assert_eq!(result.score(Theme::Blockchain), 1);
        assert_eq!(result.detected_theme, Theme::Genai);
        assert_eq!(result.matched_keywords, vec!["gpt"]);
    }

    #[test]
    fn no_evidence_falls_back_to_requested() {
        let classifier = Classifier::default();
        let result = classifier.classify("A quiet afternoon in the garden.", Theme::Blockchain);
        assert!(!result.has_evidence());
        assert_eq!(result.detected_theme, Theme::Blockchain);
        assert!(result.matched_keywords.is_empty());
    }

    #[test]
    fn empty_text_scores_zero_everywhere() {
        let classifier = Classifier::default();
        let result = classifier.classify("", Theme::Genai);
        assert_eq!(result.scores_by_theme.len(), Theme::ALL.len());
        assert!(result.scores_by_theme.values().all(|s| *s == 0));
    }

    #[test]
    fn smart_contract_text_is_blockchain() {
        let classifier = Classifier::default();
        let result = classifier.classify(
            "Smart Contracts and DeFi protocols power Web3",
            Theme::Genai,
        );
        assert_eq!(result.detected_theme, Theme::Blockchain);
        assert_eq!(result.score(Theme::Genai), 0);
        assert_eq!(result.matched_keywords, vec!["defi", "web3", "smart contract"]);
    }

    #[test]
    fn llm_text_is_genai() {
        let classifier = Classifier::default();
        let result = classifier.classify(
            "Large Language Models enable autonomous AI agents",
            Theme::Blockchain,
        );
        assert_eq!(result.detected_theme, Theme::Genai);
        assert_eq!(result.score(Theme::Blockchain), 0);
        assert_eq!(
            result.matched_keywords,
            vec!["large language model", "ai agent", "ai"]
        );
    }

    #[test]
    fn repeated_buzzword_does_not_dominate() {
        let classifier = Classifier::default();
        let text = "AI AI AI AI AI. Bitcoin and Ethereum on the blockchain.";
        let result = classifier.classify(text, Theme::Genai);
        assert_eq!(result.score(Theme::Genai), 1);
        assert_eq!(result.detected_theme, Theme::Blockchain);
    }
}
