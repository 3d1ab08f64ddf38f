//! 外部の文章生成サービスとの境界。
use async_trait::async_trait;
use serde::Serialize;

use crate::classification::Theme;

/// 生成サービスへの1回分の依頼。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub theme: Theme,
    pub brief: String,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(topic: impl Into<String>, theme: Theme) -> Self {
        Self {
            topic: topic.into(),
            theme,
            brief: writing_brief(theme),
        }
    }
}

/// トピックとテーマからMarkdown本文を返す生成能力。
///
/// 呼び出しは毎回新しい試行として扱い、冪等性は仮定しない。
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;

    /// 生成サービスが応答できるか。リモートを持たない実装は常に成功。
    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// テーマ別の執筆ガイドライン。
#[must_use]
pub fn writing_brief(theme: Theme) -> String {
    let focus = match theme {
        Theme::Genai => {
            "Cover recent model releases, research results and real products. \
             Use accurate AI terminology and explain technical ideas for a general tech audience."
        }
        Theme::Blockchain => {
            "Cover protocols, networks, regulation and market adoption. \
             Use accurate blockchain terminology and explain on-chain mechanics plainly."
        }
    };
    format!(
        "Write an 800-1200 word blog post about {display}.\n\
         {focus}\n\
         Format the output as Markdown:\n\
         - start with a single `# ` title line\n\
         - use `##` for main sections and `###` for subsections\n\
         - include practical examples and a few concrete statistics\n\
         - end with a conclusion and key takeaways\n\
         - finish with one line `Meta Description: <150-160 characters>`",
        display = theme.display_name()
    )
}
