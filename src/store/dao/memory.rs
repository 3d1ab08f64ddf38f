// プロセス内メモリのBlogDao実装
// AUTOBLOG_STORAGE=memory とテストで使う。再起動で内容は消える。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::dao_trait::BlogDao;
use super::types::RunStatus;
use crate::store::models::{
    Artifact, Pagination, PostFilter, RunCompletion, RunRecord, RunStats,
};

#[derive(Debug, Default)]
pub struct InMemoryBlogDao {
    posts: RwLock<Vec<Artifact>>,
    runs: RwLock<HashMap<Uuid, RunRecord>>,
    fail_post_writes: AtomicBool,
    fail_run_inserts: AtomicBool,
    fail_pings: AtomicBool,
}

impl InMemoryBlogDao {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の `save_post` を失敗させる（障害注入）。
    pub fn set_fail_post_writes(&self, fail: bool) {
        self.fail_post_writes.store(fail, Ordering::SeqCst);
    }

    /// 以降の `insert_run` を失敗させる（障害注入）。
    pub fn set_fail_run_inserts(&self, fail: bool) {
        self.fail_run_inserts.store(fail, Ordering::SeqCst);
    }

    /// 以降の `ping` を失敗させる（障害注入）。
    pub fn set_fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn all_runs(&self) -> Vec<RunRecord> {
        let mut runs: Vec<RunRecord> = self.runs.read().await.values().cloned().collect();
        runs.sort_by_key(|run| run.started_at);
        runs
    }
}

#[async_trait]
impl BlogDao for InMemoryBlogDao {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> anyhow::Result<()> {
        if self.fail_pings.load(Ordering::SeqCst) {
            bail!("injected ping failure");
        }
        Ok(())
    }

    async fn save_post(&self, post: &Artifact) -> anyhow::Result<Uuid> {
        if self.fail_post_writes.load(Ordering::SeqCst) {
            bail!("injected post write failure");
        }
        post.validate().context("refusing to persist invalid post")?;
        let mut posts = self.posts.write().await;
        if posts.iter().any(|existing| existing.id == post.id) {
            bail!("blog post {} already exists", post.id);
        }
        posts.push(post.clone());
        Ok(post.id)
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Artifact>> {
        Ok(self.posts.read().await.iter().find(|post| post.id == id).cloned())
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        pagination: Pagination,
    ) -> anyhow::Result<Vec<Artifact>> {
        let posts = self.posts.read().await;
        let mut matching: Vec<&Artifact> = posts.iter().filter(|post| filter.matches(post)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect())
    }

    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<Option<Artifact>> {
        let mut posts = self.posts.write().await;
        Ok(posts.iter_mut().find(|post| post.id == id).map(|post| {
            post.published = published;
            post.clone()
        }))
    }

    async fn insert_run(&self, record: &RunRecord) -> anyhow::Result<()> {
        if self.fail_run_inserts.load(Ordering::SeqCst) {
            bail!("injected run insert failure");
        }
        let mut runs = self.runs.write().await;
        if runs.contains_key(&record.id) {
            bail!("run {} already exists", record.id);
        }
        runs.insert(record.id, record.clone());
        Ok(())
    }

    async fn finalize_run(&self, id: Uuid, completion: &RunCompletion) -> anyhow::Result<()> {
        let mut runs = self.runs.write().await;
        let Some(run) = runs.get_mut(&id).filter(|run| run.status == RunStatus::Pending) else {
            bail!("run {id} is not pending (missing or already finalized)");
        };
        run.status = completion.status();
        run.error_message = completion.error_message().map(str::to_string);
        run.artifact_id = completion.artifact_id();
        run.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn get_run(&self, id: Uuid) -> anyhow::Result<Option<RunRecord>> {
        Ok(self.runs.read().await.get(&id).cloned())
    }

    async fn list_runs(&self, limit: u32) -> anyhow::Result<Vec<RunRecord>> {
        let mut runs = self.all_runs().await;
        runs.reverse();
        runs.truncate(limit as usize);
        Ok(runs)
    }

    async fn find_stale_runs(
        &self,
        started_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RunRecord>> {
        Ok(self
            .all_runs()
            .await
            .into_iter()
            .filter(|run| run.status == RunStatus::Pending && run.started_at < started_before)
            .collect())
    }

    async fn run_stats(&self, since: DateTime<Utc>, window_hours: u32) -> anyhow::Result<RunStats> {
        let (mut succeeded, mut failed, mut pending) = (0_u64, 0_u64, 0_u64);
        for run in self.runs.read().await.values().filter(|run| run.started_at >= since) {
            match run.status {
                RunStatus::Succeeded => succeeded += 1,
                RunStatus::Failed => failed += 1,
                RunStatus::Pending => pending += 1,
            }
        }

        let mut themes = BTreeMap::new();
        for post in self.posts.read().await.iter().filter(|post| post.created_at >= since) {
            *themes.entry(post.effective_theme).or_insert(0) += 1;
        }

        Ok(RunStats::from_counts(
            window_hours,
            succeeded,
            failed,
            pending,
            themes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Theme;
    use crate::store::dao::types::RunTrigger;
    use chrono::Duration;

    fn post(theme: Theme, minutes_ago: i64) -> Artifact {
        Artifact {
            id: Uuid::new_v4(),
            title: "A title".into(),
            slug: "a-title".into(),
            topic: "topic".into(),
            content: "content".into(),
            meta_description: None,
            requested_theme: theme,
            effective_theme: theme,
            tags: vec!["Tag".into()],
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            word_count: 1,
            published: false,
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_filter_and_paging() {
        let dao = InMemoryBlogDao::new();
        let oldest = post(Theme::Genai, 30);
        let middle = post(Theme::Blockchain, 20);
        let newest = post(Theme::Genai, 10);
        for p in [&oldest, &middle, &newest] {
            dao.save_post(p).await.expect("save");
        }

        let all = dao
            .list_posts(PostFilter::default(), Pagination::default())
            .await
            .expect("list");
        let ids: Vec<Uuid> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

        let genai = dao
            .list_posts(
                PostFilter {
                    theme: Some(Theme::Genai),
                    published: None,
                },
                Pagination::new(Some(1), Some(1)),
            )
            .await
            .expect("list");
        assert_eq!(genai.len(), 1);
        assert_eq!(genai[0].id, oldest.id);
    }

    #[tokio::test]
    async fn rejects_duplicate_tags_on_write() {
        let dao = InMemoryBlogDao::new();
        let mut p = post(Theme::Genai, 0);
        p.tags = vec!["GPT".into(), "GPT".into()];
        assert!(dao.save_post(&p).await.is_err());
        assert_eq!(dao.post_count().await, 0);
    }

    #[tokio::test]
    async fn set_published_toggles_only_the_flag() {
        let dao = InMemoryBlogDao::new();
        let p = post(Theme::Blockchain, 0);
        dao.save_post(&p).await.expect("save");
        let updated = dao.set_published(p.id, true).await.expect("update").expect("exists");
        assert!(updated.published);
        assert_eq!(updated.content, p.content);
        assert!(dao.set_published(Uuid::new_v4(), true).await.expect("update").is_none());
    }

    #[tokio::test]
    async fn finalize_refuses_second_terminal_write() {
        let dao = InMemoryBlogDao::new();
        let record = RunRecord::pending(Theme::Genai, None, RunTrigger::Manual);
        dao.insert_run(&record).await.expect("insert");

        let failed = RunCompletion::Failed {
            message: "boom".into(),
        };
        dao.finalize_run(record.id, &failed).await.expect("first finalize");
        assert!(dao.finalize_run(record.id, &failed).await.is_err());

        let stored = dao.get_run(record.id).await.expect("get").expect("exists");
        assert_eq!(stored.status, RunStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("boom"));
        assert!(stored.finished_at.is_some());
    }

    #[tokio::test]
    async fn stats_count_runs_and_posts_in_window() {
        let dao = InMemoryBlogDao::new();
        let ok = RunRecord::pending(Theme::Genai, None, RunTrigger::Scheduled);
        let bad = RunRecord::pending(Theme::Blockchain, None, RunTrigger::Scheduled);
        let open = RunRecord::pending(Theme::Genai, None, RunTrigger::Manual);
        for r in [&ok, &bad, &open] {
            dao.insert_run(r).await.expect("insert");
        }
        let p = post(Theme::Blockchain, 5);
        dao.save_post(&p).await.expect("save");
        dao.finalize_run(ok.id, &RunCompletion::Succeeded { artifact_id: p.id })
            .await
            .expect("finalize");
        dao.finalize_run(
            bad.id,
            &RunCompletion::Failed {
                message: "x".into(),
            },
        )
        .await
        .expect("finalize");

        let stats = dao
            .run_stats(Utc::now() - Duration::hours(1), 1)
            .await
            .expect("stats");
        assert_eq!((stats.succeeded, stats.failed, stats.pending), (1, 1, 1));
        assert_eq!(stats.themes.get(&Theme::Blockchain), Some(&1));
        assert_eq!(stats.total_posts, 1);
    }
}
