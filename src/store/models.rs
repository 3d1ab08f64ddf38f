use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::dao::types::{RunStatus, RunTrigger};
use crate::classification::Theme;

pub(crate) const DEFAULT_PAGE_LIMIT: u32 = 10;
pub(crate) const MAX_PAGE_LIMIT: u32 = 100;

/// 書き込み前の検証エラー。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate tag '{0}'")]
    DuplicateTag(String),
    #[error("post title must not be empty")]
    EmptyTitle,
    #[error("post content must not be empty")]
    EmptyContent,
}

/// 生成済みの記事。
///
/// 生成後に変更できるのは `published` だけ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub topic: String,
    pub content: String,
    pub meta_description: Option<String>,
    pub requested_theme: Theme,
    pub effective_theme: Theme,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub word_count: u32,
    pub published: bool,
}

impl Artifact {
    /// タグの重複と空のタイトル・本文を拒否する。
    ///
    /// # Errors
    /// 検証に失敗した最初の項目を返す。
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(ModelError::EmptyContent);
        }
        let mut seen = HashSet::with_capacity(self.tags.len());
        for tag in &self.tags {
            if !seen.insert(tag.as_str()) {
                return Err(ModelError::DuplicateTag(tag.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn was_corrected(&self) -> bool {
        self.requested_theme != self.effective_theme
    }
}

/// 1回の生成試行の台帳エントリ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub requested_theme: Theme,
    pub requested_topic: Option<String>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub artifact_id: Option<Uuid>,
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    #[must_use]
    pub fn pending(theme: Theme, topic: Option<String>, trigger: RunTrigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            requested_theme: theme,
            requested_topic: topic,
            status: RunStatus::Pending,
            error_message: None,
            artifact_id: None,
            trigger,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// ランの終端状態。`finalize_run` に渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCompletion {
    Succeeded { artifact_id: Uuid },
    Failed { message: String },
}

impl RunCompletion {
    #[must_use]
    pub fn status(&self) -> RunStatus {
        match self {
            RunCompletion::Succeeded { .. } => RunStatus::Succeeded,
            RunCompletion::Failed { .. } => RunStatus::Failed,
        }
    }

    pub(crate) fn artifact_id(&self) -> Option<Uuid> {
        match self {
            RunCompletion::Succeeded { artifact_id } => Some(*artifact_id),
            RunCompletion::Failed { .. } => None,
        }
    }

    pub(crate) fn error_message(&self) -> Option<&str> {
        match self {
            RunCompletion::Succeeded { .. } => None,
            RunCompletion::Failed { message } => Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PostFilter {
    pub theme: Option<Theme>,
    pub published: Option<bool>,
}

impl PostFilter {
    #[must_use]
    pub fn matches(&self, post: &Artifact) -> bool {
        self.theme.is_none_or(|theme| post.effective_theme == theme)
            && self.published.is_none_or(|published| post.published == published)
    }
}

/// ページング指定。`limit` は 1..=100 に丸める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    #[must_use]
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// 指定時間窓の運用統計。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub window_hours: u32,
    pub total_runs: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub pending: u64,
    pub success_rate: f64,
    pub total_posts: u64,
    pub themes: BTreeMap<Theme, u64>,
}

impl RunStats {
    /// ステータス別件数から統計を組み立てる。成功率は終端済みのランだけで計算する。
    #[must_use]
    pub fn from_counts(
        window_hours: u32,
        succeeded: u64,
        failed: u64,
        pending: u64,
        themes: BTreeMap<Theme, u64>,
    ) -> Self {
        let finished = succeeded + failed;
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if finished == 0 {
            0.0
        } else {
            succeeded as f64 / finished as f64
        };
        let total_posts = themes.values().sum();
        Self {
            window_hours,
            total_runs: succeeded + failed + pending,
            succeeded,
            failed,
            pending,
            success_rate,
            total_posts,
            themes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(tags: &[&str]) -> Artifact {
        Artifact {
            id: Uuid::new_v4(),
            title: "Title".to_string(),
            slug: "title".to_string(),
            topic: "topic".to_string(),
            content: "body".to_string(),
            meta_description: None,
            requested_theme: Theme::Genai,
            effective_theme: Theme::Genai,
            tags: tags.iter().map(ToString::to_string).collect(),
            created_at: Utc::now(),
            word_count: 1,
            published: false,
        }
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let post = artifact(&["GPT", "RAG", "GPT"]);
        assert_eq!(post.validate(), Err(ModelError::DuplicateTag("GPT".into())));
        assert!(artifact(&["GPT", "RAG"]).validate().is_ok());
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut post = artifact(&[]);
        post.title = "   ".into();
        assert_eq!(post.validate(), Err(ModelError::EmptyTitle));
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(Pagination::new(None, None), Pagination::default());
        assert_eq!(Pagination::new(Some(500), Some(3)).limit, MAX_PAGE_LIMIT);
        assert_eq!(Pagination::new(Some(0), None).limit, 1);
    }

    #[test]
    fn filter_matches_theme_and_publication() {
        let mut post = artifact(&[]);
        post.effective_theme = Theme::Blockchain;
        post.published = true;
        let filter = PostFilter {
            theme: Some(Theme::Blockchain),
            published: Some(true),
        };
        assert!(filter.matches(&post));
        assert!(!PostFilter { theme: Some(Theme::Genai), published: None }.matches(&post));
        assert!(PostFilter::default().matches(&post));
    }

    #[test]
    fn stats_success_rate_ignores_pending() {
        let themes = BTreeMap::from([(Theme::Genai, 3), (Theme::Blockchain, 1)]);
        let stats = RunStats::from_counts(24, 3, 1, 2, themes);
        assert_eq!(stats.total_runs, 6);
        assert_eq!(stats.total_posts, 4);
        assert!((stats.success_rate - 0.75).abs() < f64::EPSILON);
        let idle = RunStats::from_counts(24, 0, 0, 1, BTreeMap::new());
        assert!(idle.success_rate.abs() < f64::EPSILON);
    }
}
