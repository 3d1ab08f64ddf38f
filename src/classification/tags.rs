//! キーワードから表示用タグへの正規化。
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use super::keywords::keywords_for;
use super::theme::Theme;

/// Canonical display forms for keywords whose title-cased form would be wrong.
static SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // genai
        ("generative ai", "Generative AI"),
        ("artificial intelligence", "Artificial Intelligence"),
        ("ai", "Artificial Intelligence"),
        ("large language model", "Large Language Models"),
        ("llm", "Large Language Models"),
        ("ai agent", "AI Agents"),
        ("autonomous agent", "AI Agents"),
        ("gpt", "GPT"),
        ("rag", "RAG"),
        ("retrieval-augmented generation", "RAG"),
        ("natural language processing", "NLP"),
        ("multimodal", "Multimodal AI"),
        ("ai safety", "AI Safety"),
        ("fine-tuning", "Fine-Tuning"),
        ("diffusion model", "Diffusion Models"),
        ("neural network", "Neural Networks"),
        // blockchain
        ("defi", "DeFi"),
        ("decentralized finance", "DeFi"),
        ("nft", "NFT"),
        ("dao", "DAO"),
        ("web3", "Web3"),
        ("cbdc", "CBDC"),
        ("crypto", "Cryptocurrency"),
        ("smart contract", "Smart Contracts"),
        ("decentralized", "Decentralization"),
        ("consensus", "Consensus Mechanisms"),
        ("mining", "Crypto Mining"),
        ("wallet", "Crypto Wallets"),
        ("stablecoin", "Stablecoins"),
        ("layer 2", "Layer 2"),
    ])
});

/// テーマごとの既定タグ（順序付き）。タグ数が下限に満たないときの補完に使う。
#[must_use]
pub(crate) fn default_tags(theme: Theme) -> &'static [&'static str] {
    match theme {
        Theme::Genai => &[
            "Generative AI",
            "Artificial Intelligence",
            "Machine Learning",
            "AI Innovation",
            "Emerging Tech",
        ],
        Theme::Blockchain => &[
            "Blockchain",
            "Cryptocurrency",
            "Web3",
            "Decentralization",
            "Digital Assets",
        ],
    }
}

/// Display form of a single keyword.
#[must_use]
pub fn canonical_tag(keyword: &str) -> String {
    let key = keyword.trim().to_lowercase();
    match SYNONYMS.get(key.as_str()) {
        Some(tag) => (*tag).to_string(),
        None => crate::util::text::title_case(&key),
    }
}

/// Every tag the normalizer can ever emit for `theme`.
#[must_use]
pub fn tag_universe(theme: Theme) -> HashSet<String> {
    keywords_for(theme)
        .iter()
        .map(|keyword| canonical_tag(keyword))
        .chain(default_tags(theme).iter().map(|tag| (*tag).to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagNormalizer {
    min_tags: usize,
    max_tags: usize,
}

impl Default for TagNormalizer {
    fn default() -> Self {
        Self {
            min_tags: 4,
            max_tags: 6,
        }
    }
}

impl TagNormalizer {
    /// `max_tags` is raised to `min_tags` when configured below it.
    #[must_use]
    pub fn new(min_tags: usize, max_tags: usize) -> Self {
        Self {
            min_tags,
            max_tags: max_tags.max(min_tags),
        }
    }

    #[must_use]
    pub fn min_tags(&self) -> usize {
        self.min_tags
    }

    #[must_use]
    pub fn max_tags(&self) -> usize {
        self.max_tags
    }

    /// マッチしたキーワードを正規化タグ列に変換する。
    ///
    /// 重複除去（初出順）→ 既定タグで下限まで補完 → 上限で切り詰め、の順に適用する。
    #[must_use]
    pub fn normalize<S: AsRef<str>>(&self, theme: Theme, matched_keywords: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(self.max_tags);

        for keyword in matched_keywords {
            let tag = canonical_tag(keyword.as_ref());
            if seen.insert(tag.clone()) {
                tags.push(tag);
            }
        }

        for default in default_tags(theme) {
            if tags.len() >= self.min_tags {
                break;
            }
            if seen.insert((*default).to_string()) {
                tags.push((*default).to_string());
            }
        }

        tags.truncate(self.max_tags);
        tags
    }
}
