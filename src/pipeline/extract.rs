//! 生成されたMarkdownから記事の構成要素を取り出す。
use once_cell::sync::Lazy;
use regex::Regex;

use crate::classification::Theme;
use crate::util::text::{slugify, title_case, word_count};

static H1_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").expect("valid title regex"));
static LABELLED_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t*_]*title[ \t*_]*:[ \t*_]*(.+?)[ \t]*$").expect("valid title regex")
});
static META_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t*_]*meta description[ \t*_]*:[ \t*_]*(.*?)[ \t]*$")
        .expect("valid meta regex")
});
static TAGS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t*_]*(?:tags|keywords)[ \t*_]*:.*$").expect("valid tags regex")
});
/// この語数以下の全大文字行は見出しとみなす。
const SHOUTED_HEADING_MAX_WORDS: usize = 5;

static EXTRA_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));

/// 保存用に整形した記事の構成要素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub meta_description: Option<String>,
    pub word_count: u32,
}

#[must_use]
pub fn default_title(theme: Theme) -> String {
    format!("Latest Developments in {}", theme.display_name())
}

/// 生成結果を記事の構成要素に分解する。
///
/// - タイトル: 最初の `# ` 見出し、無ければ `Title:` 行、それも無ければテーマ既定
/// - `Meta Description:` 行は本文から除く
/// - 生成側が書いた `**Tags:**` 行は本文から除く（タグは正規化器だけが決める）
/// - 各行の前後空白を落とし、短い全大文字行は `## ` 見出しに直す（コードブロック内は触らない）
#[must_use]
pub fn extract_components(raw: &str, theme: Theme) -> ExtractedPost {
    let trimmed = raw.trim();

    let title = H1_TITLE
        .captures(trimmed)
        .or_else(|| LABELLED_TITLE.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| clean_title(m.as_str()))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| default_title(theme));

    let meta_description = META_LINE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['*', '_']).trim().to_string())
        .filter(|meta| !meta.is_empty());

    let without_meta = META_LINE.replace_all(trimmed, "");
    let without_tags = TAGS_LINE.replace_all(&without_meta, "");
    let tidied = tidy_markdown(&without_tags);
    let content = EXTRA_BLANK_LINES
        .replace_all(tidied.trim(), "\n\n")
        .into_owned();

    let mut slug = slugify(&title);
    if slug.is_empty() {
        slug = slugify(&default_title(theme));
    }

    ExtractedPost {
        word_count: u32::try_from(word_count(&content)).unwrap_or(u32::MAX),
        title,
        slug,
        content,
        meta_description,
    }
}

fn tidy_markdown(content: &str) -> String {
    let mut in_fence = false;
    content
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with("```") {
                in_fence = !in_fence;
                return trimmed.to_string();
            }
            if in_fence {
                return line.trim_end().to_string();
            }
            if is_shouted_heading(trimmed) {
                return format!("## {}", title_case(&trimmed.to_lowercase()));
            }
            trimmed.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 英字で始まり、小文字を含まず大文字を含む短い行。
fn is_shouted_heading(line: &str) -> bool {
    line.chars().next().is_some_and(char::is_alphabetic)
        && line.chars().any(char::is_uppercase)
        && !line.chars().any(char::is_lowercase)
        && line.split_whitespace().count() <= SHOUTED_HEADING_MAX_WORDS
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '*' | '_'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const SAMPLE: &str = "\
# \"Smart Contracts Grow Up\"

## Introduction
DeFi protocols keep shipping.

Meta Description: How smart contracts matured in 2026.

**Tags:** DeFi, Web3, smart contracts
";

    #[test]
    fn extracts_title_meta_and_strips_lines() {
        let post = extract_components(SAMPLE, Theme::Blockchain);
        assert_eq!(post.title, "Smart Contracts Grow Up");
        assert_eq!(post.slug, "smart-contracts-grow-up");
        assert_eq!(
            post.meta_description.as_deref(),
            Some("How smart contracts matured in 2026.")
        );
        assert!(!post.content.contains("Meta Description"));
        assert!(!post.content.contains("Tags:"));
        assert!(post.content.starts_with("# \"Smart Contracts Grow Up\""));
        assert!(post.content.ends_with("DeFi protocols keep shipping."));
    }

    #[test]
    fn word_count_excludes_markup() {
        let post = extract_components(SAMPLE, Theme::Blockchain);
        // "Smart Contracts Grow Up" (4) + "Introduction" (1) + 4 words
        assert_eq!(post.word_count, 9);
    }

    #[test]
    fn falls_back_to_labelled_title() {
        let post = extract_components("Title: RAG in Practice\n\nBody text.", Theme::Genai);
        assert_eq!(post.title, "RAG in Practice");
    }

    #[test]
    fn second_level_heading_is_not_a_title() {
        let post = extract_components("## Section only\n\nBody.", Theme::Genai);
        assert_eq!(post.title, "Latest Developments in Generative AI");
        assert_eq!(post.slug, "latest-developments-in-generative-ai");
    }

    #[test]
    fn bold_meta_label_is_recognised() {
        let post = extract_components(
            "# T\n\nBody\n\n**Meta Description:** Short summary.",
            Theme::Genai,
        );
        assert_eq!(post.meta_description.as_deref(), Some("Short summary."));
        assert_eq!(post.content, "# T\n\nBody");
    }

    #[test]
    fn non_ascii_title_keeps_ascii_fragment_in_slug() {
        let post = extract_components("# 生成AIの現在\n\n本文", Theme::Genai);
        assert_eq!(post.title, "生成AIの現在");
        assert_eq!(post.slug, "ai");
    }

    #[rstest]
    #[case("KEY TAKEAWAYS", "## Key Takeaways")]
    #[case("  WHY LAYER-2 MATTERS  ", "## Why Layer-2 Matters")]
    #[case("CONCLUSION:", "## Conclusion:")]
    #[case("THIS LINE HAS FAR TOO MANY WORDS", "THIS LINE HAS FAR TOO MANY WORDS")]
    #[case("Plain sentence stays.", "Plain sentence stays.")]
    #[case("- DAO", "- DAO")]
    #[case("2026 OUTLOOK", "2026 OUTLOOK")]
    #[case("## ALREADY A HEADING", "## ALREADY A HEADING")]
    fn shouted_lines_become_section_headings(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(tidy_markdown(line), expected);
    }

    #[test]
    fn stored_content_is_tidied_outside_code_fences() {
        let raw = "# Agents\n\n   INTRODUCTION   \nAgents plan tasks.   \n\n```python\n    RETURN VALUE\n```\n";
        let post = extract_components(raw, Theme::Genai);
        assert_eq!(
            post.content,
            "# Agents\n\n## Introduction\nAgents plan tasks.\n\n```python\n    RETURN VALUE\n```"
        );
        assert_eq!(post.title, "Agents");
    }
}
