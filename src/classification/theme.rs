use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 記事のテーマ（閉じた集合）。
///
/// 宣言順がそのまま同点時の優先順位になる。新しいテーマは末尾に追加すること。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Genai,
    Blockchain,
}

impl Theme {
    /// Priority order used for tie-breaking and uniform random selection.
    pub const ALL: [Theme; 2] = [Theme::Genai, Theme::Blockchain];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Genai => "genai",
            Theme::Blockchain => "blockchain",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Theme::Genai => "Generative AI",
            Theme::Blockchain => "Blockchain",
        }
    }
}

impl AsRef<str> for Theme {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown theme '{0}' (expected one of: genai, blockchain)")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "genai" | "ai" | "generative_ai" => Ok(Theme::Genai),
            "blockchain" | "web3" | "crypto" => Ok(Theme::Blockchain),
            _ => Err(UnknownTheme(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_declaration_order() {
        assert!(Theme::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(Theme::ALL.first(), Some(&Theme::Genai));
    }

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!(" GenAI ".parse::<Theme>(), Ok(Theme::Genai));
        assert_eq!("Web3".parse::<Theme>(), Ok(Theme::Blockchain));
        assert!("sports".parse::<Theme>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Theme::Blockchain).expect("serialize");
        assert_eq!(json, "\"blockchain\"");
        let back: Theme = serde_json::from_str("\"genai\"").expect("deserialize");
        assert_eq!(back, Theme::Genai);
    }
}
