//! テーマごとのトピックプールと、トレンド観点を付けた動的トピック生成。
use chrono::{Datelike, Utc};

use super::random::ThemeRng;
use crate::classification::Theme;

const GENAI_TOPICS: &[&str] = &[
    "Large Language Models (LLMs) and their latest developments",
    "Retrieval-Augmented Generation (RAG) systems and applications",
    "AI Agents and autonomous systems",
    "Multi-modal AI models combining text, image, and audio",
    "AI-powered chatbots and conversational interfaces",
    "AI image generation and computer vision breakthroughs",
    "AI video generation and synthetic media",
    "AI audio and music generation technologies",
    "AI code generation and programming assistants",
    "Prompt engineering and optimization techniques",
    "Fine-tuning and customization of AI models",
    "AI safety and alignment research",
    "Edge AI and on-device machine learning",
    "AI in creative industries and content creation",
    "Generative AI ethics and responsible AI development",
    "AI model compression and efficiency improvements",
    "Open-source vs proprietary AI models comparison",
    "AI-powered automation tools and workflows",
    "Generative AI in healthcare and medical applications",
    "AI in education and personalized learning systems",
];

const BLOCKCHAIN_TOPICS: &[&str] = &[
    "Decentralized Finance (DeFi) protocols and yield strategies",
    "Ethereum scaling with Layer 2 rollups",
    "Bitcoin as a treasury asset for institutions",
    "NFT marketplaces beyond digital art",
    "DAO governance models and on-chain voting",
    "Smart contract security audits and common exploits",
    "Central bank digital currencies (CBDC) around the world",
    "Stablecoin regulation and reserve transparency",
    "Real-world asset tokenization on public blockchains",
    "Cross-chain bridges and blockchain interoperability",
    "Proof-of-stake consensus and validator economics",
    "Self-custody crypto wallets and key management",
    "Web3 identity and decentralized social networks",
    "Blockchain in supply chain traceability",
];

/// テーマのトピックプール。
#[must_use]
pub fn topic_pool(theme: Theme) -> &'static [&'static str] {
    match theme {
        Theme::Genai => GENAI_TOPICS,
        Theme::Blockchain => BLOCKCHAIN_TOPICS,
    }
}

/// トピック末尾に付けるトレンド観点。
#[must_use]
pub(crate) fn trending_aspects(year: i32) -> [String; 6] {
    [
        format!("in {year}"),
        "latest trends and innovations".to_string(),
        "breaking developments".to_string(),
        "industry impact and future prospects".to_string(),
        "practical applications and use cases".to_string(),
        "challenges and opportunities ahead".to_string(),
    ]
}

/// プールから一様に選んだトピックに、一様に選んだ観点を付けて返す。
#[must_use]
pub fn dynamic_topic(theme: Theme, rng: &ThemeRng) -> String {
    dynamic_topic_for_year(theme, rng, Utc::now().year())
}

pub(crate) fn dynamic_topic_for_year(theme: Theme, rng: &ThemeRng, year: i32) -> String {
    let base = rng
        .pick(topic_pool(theme))
        .copied()
        .unwrap_or(theme.display_name());
    let aspects = trending_aspects(year);
    match rng.pick(&aspects) {
        Some(aspect) => format!("{base} - {aspect}"),
        None => base.to_string(),
    }
}
