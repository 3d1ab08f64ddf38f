//! PostgreSQL 実装の確認。`DATABASE_URL` が無ければ何もしない。
use autoblog_worker::classification::Theme;
use autoblog_worker::config::Config;
use autoblog_worker::store::{
    Artifact, BlogDao, Pagination, PgBlogDao, PostFilter, RunCompletion, RunRecord, RunStatus,
    RunTrigger,
};
use chrono::Utc;
use uuid::Uuid;

async fn connect() -> Option<PgBlogDao> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL tests");
        return None;
    };
    let config = Config::in_memory("http://writer.invalid/");
    Some(
        PgBlogDao::connect(&config, &database_url)
            .await
            .expect("database connection"),
    )
}

fn artifact(theme: Theme) -> Artifact {
    let id = Uuid::new_v4();
    Artifact {
        id,
        title: "Rollups in Production".into(),
        slug: format!("rollups-in-production-{}", id.simple()),
        topic: "Ethereum scaling".into(),
        content: "# Rollups in Production\n\nEthereum layer 2.".into(),
        meta_description: Some("Where rollups stand.".into()),
        requested_theme: Theme::Genai,
        effective_theme: theme,
        tags: vec!["Layer 2".into(), "Blockchain".into()],
        created_at: Utc::now(),
        word_count: 7,
        published: false,
    }
}

#[tokio::test]
async fn post_round_trip_and_publication() {
    let Some(dao) = connect().await else {
        return;
    };
    dao.ping().await.expect("ping");

    let post = artifact(Theme::Blockchain);
    dao.save_post(&post).await.expect("save");
    let stored = dao.get_post(post.id).await.expect("get").expect("exists");
    assert_eq!(stored.tags, post.tags);
    assert_eq!(stored.effective_theme, Theme::Blockchain);
    assert!(stored.was_corrected());

    let updated = dao
        .set_published(post.id, true)
        .await
        .expect("update")
        .expect("exists");
    assert!(updated.published);

    let page = dao
        .list_posts(
            PostFilter {
                theme: Some(Theme::Blockchain),
                published: Some(true),
            },
            Pagination::new(Some(100), None),
        )
        .await
        .expect("list");
    assert!(page.iter().any(|p| p.id == post.id));
}

#[tokio::test]
async fn duplicate_tags_are_rejected_before_write() {
    let Some(dao) = connect().await else {
        return;
    };
    let mut post = artifact(Theme::Genai);
    post.tags = vec!["GPT".into(), "GPT".into()];
    assert!(dao.save_post(&post).await.is_err());
    assert!(dao.get_post(post.id).await.expect("get").is_none());
}

#[tokio::test]
async fn run_is_finalized_only_once() {
    let Some(dao) = connect().await else {
        return;
    };
    let post = artifact(Theme::Blockchain);
    dao.save_post(&post).await.expect("save");

    let run = RunRecord::pending(Theme::Blockchain, Some("rollups".into()), RunTrigger::Manual);
    dao.insert_run(&run).await.expect("insert");
    dao.finalize_run(run.id, &RunCompletion::Succeeded { artifact_id: post.id })
        .await
        .expect("finalize");

    let second = dao
        .finalize_run(
            run.id,
            &RunCompletion::Failed {
                message: "late".into(),
            },
        )
        .await;
    assert!(second.is_err());

    let stored = dao.get_run(run.id).await.expect("get").expect("exists");
    assert_eq!(stored.status, RunStatus::Succeeded);
    assert_eq!(stored.artifact_id, Some(post.id));
    assert_eq!(stored.trigger, RunTrigger::Manual);
}
