/// BlogDaoトレイト - データアクセス層の抽象化
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::models::{
    Artifact, Pagination, PostFilter, RunCompletion, RunRecord, RunStats,
};

#[async_trait]
pub trait BlogDao: Send + Sync {
    /// 実装の識別名（ログ用）
    fn backend(&self) -> &'static str;

    /// 接続確認（readiness プローブ用）
    async fn ping(&self) -> anyhow::Result<()>;

    // Posts
    /// 記事を1回の書き込みで保存する。タグ重複は書き込み前に拒否する。
    async fn save_post(&self, post: &Artifact) -> anyhow::Result<Uuid>;

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Artifact>>;

    /// 新しい順のページ
    async fn list_posts(
        &self,
        filter: PostFilter,
        pagination: Pagination,
    ) -> anyhow::Result<Vec<Artifact>>;

    /// 公開フラグを更新する。対象が無ければ `None`。
    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<Option<Artifact>>;

    // Runs
    async fn insert_run(&self, record: &RunRecord) -> anyhow::Result<()>;

    /// pending のランを終端状態にする。pending でなければエラー。
    async fn finalize_run(&self, id: Uuid, completion: &RunCompletion) -> anyhow::Result<()>;

    async fn get_run(&self, id: Uuid) -> anyhow::Result<Option<RunRecord>>;

    /// 開始が新しい順
    async fn list_runs(&self, limit: u32) -> anyhow::Result<Vec<RunRecord>>;

    /// `started_before` より前に開始して pending のままのラン
    async fn find_stale_runs(&self, started_before: DateTime<Utc>)
    -> anyhow::Result<Vec<RunRecord>>;

    async fn run_stats(&self, since: DateTime<Utc>, window_hours: u32) -> anyhow::Result<RunStats>;
}
