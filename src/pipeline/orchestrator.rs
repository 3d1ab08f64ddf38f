use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::extract::extract_components;
use super::generation::{ContentGenerator, GenerationRequest};
use super::random::ThemeRng;
use super::topics::dynamic_topic;
use crate::classification::{Classifier, TagNormalizer, Theme};
use crate::observability::Metrics;
use crate::store::{Artifact, BlogDao};

const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(600);

/// 1回の実行で失敗したステップ。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// API とログで使う種別名。
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Generation(_) => "generation_failure",
            PipelineError::Persistence(_) => "persistence_failure",
        }
    }
}

/// テーマとトピックが確定した実行要求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub topic: String,
    pub theme: Theme,
}

/// 生成→抽出→分類→タグ正規化→保存を1回分実行する。
pub struct PipelineOrchestrator {
    generator: Arc<dyn ContentGenerator>,
    dao: Arc<dyn BlogDao>,
    classifier: Classifier,
    normalizer: TagNormalizer,
    rng: ThemeRng,
    generation_timeout: Duration,
    metrics: Arc<Metrics>,
}

pub struct PipelineBuilder {
    generator: Arc<dyn ContentGenerator>,
    dao: Arc<dyn BlogDao>,
    metrics: Arc<Metrics>,
    classifier: Option<Classifier>,
    normalizer: Option<TagNormalizer>,
    rng: Option<ThemeRng>,
    generation_timeout: Duration,
}

impl PipelineBuilder {
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: TagNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: ThemeRng) -> Self {
        self.rng = Some(rng);
        self
    }

    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn build(self) -> PipelineOrchestrator {
        PipelineOrchestrator {
            generator: self.generator,
            dao: self.dao,
            classifier: self.classifier.unwrap_or_default(),
            normalizer: self.normalizer.unwrap_or_default(),
            rng: self.rng.unwrap_or_else(ThemeRng::from_entropy),
            generation_timeout: self.generation_timeout,
            metrics: self.metrics,
        }
    }
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn builder(
        generator: Arc<dyn ContentGenerator>,
        dao: Arc<dyn BlogDao>,
        metrics: Arc<Metrics>,
    ) -> PipelineBuilder {
        PipelineBuilder {
            generator,
            dao,
            metrics,
            classifier: None,
            normalizer: None,
            rng: None,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// 未指定のテーマ・トピックを乱数源から埋める。
    pub fn resolve_request(&self, topic: Option<String>, theme: Option<Theme>) -> RunRequest {
        let theme = theme.unwrap_or_else(|| self.rng.pick_theme());
        let topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| dynamic_topic(theme, &self.rng));
        RunRequest { topic, theme }
    }

    /// 未解決の要求を解決してから実行する。
    ///
    /// # Errors
    /// 生成か保存に失敗した場合。
    pub async fn run(
        &self,
        topic: Option<String>,
        theme: Option<Theme>,
    ) -> Result<Artifact, PipelineError> {
        let request = self.resolve_request(topic, theme);
        self.run_resolved(request).await
    }

    /// 確定済みの要求を実行し、保存した記事を返す。
    ///
    /// # Errors
    /// 生成サービスのエラー・タイムアウト・空出力は `Generation`、
    /// 書き込み失敗は `Persistence`。どちらも再試行しない。
    pub async fn run_resolved(&self, request: RunRequest) -> Result<Artifact, PipelineError> {
        let RunRequest { topic, theme } = request;
        info!(theme = %theme, topic = %topic, "starting generation");

        let raw = self.generate(&topic, theme).await?;
        let extracted = extract_components(&raw, theme);

        let classification = self.classifier.classify(&extracted.content, theme);
        let effective_theme = if classification.has_evidence() {
            classification.detected_theme
        } else {
            theme
        };
        if effective_theme != theme {
            warn!(
                requested = %theme,
                detected = %effective_theme,
                matched = ?classification.matched_keywords,
                "content theme differs from request; correcting"
            );
            self.metrics
                .theme_corrections
                .with_label_values(&[theme.as_str(), effective_theme.as_str()])
                .inc();
        }

        let tags = self
            .normalizer
            .normalize(effective_theme, &classification.matched_keywords);

        let artifact = Artifact {
            id: Uuid::new_v4(),
            title: extracted.title,
            slug: extracted.slug,
            topic,
            content: extracted.content,
            meta_description: extracted.meta_description,
            requested_theme: theme,
            effective_theme,
            tags,
            created_at: Utc::now(),
            word_count: extracted.word_count,
            published: false,
        };

        self.dao
            .save_post(&artifact)
            .await
            .map_err(|err| PipelineError::Persistence(format!("{err:#}")))?;

        self.metrics
            .posts_created
            .with_label_values(&[effective_theme.as_str()])
            .inc();
        info!(
            post_id = %artifact.id,
            slug = %artifact.slug,
            theme = %effective_theme,
            word_count = artifact.word_count,
            tags = artifact.tags.len(),
            "post persisted"
        );
        Ok(artifact)
    }

    async fn generate(&self, topic: &str, theme: Theme) -> Result<String, PipelineError> {
        let request = GenerationRequest::new(topic, theme);
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.generation_timeout, self.generator.generate(&request)).await;
        self.metrics
            .generation_duration
            .observe(started.elapsed().as_secs_f64());

        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return Err(PipelineError::Generation(format!("{err:#}"))),
            Err(_) => {
                return Err(PipelineError::Generation(format!(
                    "writer did not respond within {}s",
                    self.generation_timeout.as_secs()
                )));
            }
        };
        if raw.trim().is_empty() {
            return Err(PipelineError::Generation(
                "writer returned empty content".to_string(),
            ));
        }
        Ok(raw)
    }
}
