/// テキスト処理ユーティリティ。
///
/// タイトルケース変換、スラッグ生成、単語数カウントを提供します。
use once_cell::sync::Lazy;
use regex::Regex;

/// スラッグの最大長。
pub(crate) const SLUG_MAX_LEN: usize = 100;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid slug regex"));
static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s-]+").expect("valid separator regex"));

/// 単語ごとに先頭を大文字化する。ハイフン区切りの各要素も対象。
#[must_use]
pub(crate) fn title_case(text: &str) -> String {
    text.split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            word.split('-')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// タイトルからURL用スラッグを作る。
///
/// 出力は `[a-z0-9-]` のみで、前後のハイフンを含まず、最大 [`SLUG_MAX_LEN`] 文字。
#[must_use]
pub(crate) fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let cleaned = NON_SLUG_CHARS.replace_all(&lowered, "");
    let joined = SLUG_SEPARATORS.replace_all(cleaned.trim(), "-");
    let mut slug: String = joined.trim_matches('-').to_string();
    if slug.len() > SLUG_MAX_LEN {
        // ASCIIのみなのでバイト単位で切ってよい
        slug.truncate(SLUG_MAX_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Markdown記号を除いた単語数。
#[must_use]
pub(crate) fn word_count(markdown: &str) -> usize {
    markdown
        .split_whitespace()
        .filter(|token| {
            token
                .chars()
                .any(|c| !matches!(c, '#' | '*' | '_' | '`' | '>' | '-' | '[' | ']' | '(' | ')' | '|'))
        })
        .count()
}
