use anyhow::{Context, Result};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::classification::Theme;
use crate::store::models::{Artifact, Pagination, PostFilter};

const POST_COLUMNS: &str = "id, title, slug, topic, content, meta_description, requested_theme, \
     effective_theme, tags, word_count, published, created_at";

pub(crate) struct PostQueries;

impl PostQueries {
    /// 検証済みの記事を1行で挿入する。
    pub async fn save(pool: &PgPool, post: &Artifact) -> Result<Uuid> {
        post.validate().context("refusing to persist invalid post")?;
        let word_count =
            i32::try_from(post.word_count).context("word count does not fit in INTEGER")?;

        sqlx::query(
            r"
            INSERT INTO blog_posts (
                id, title, slug, topic, content, meta_description, requested_theme,
                effective_theme, tags, word_count, published, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.topic)
        .bind(&post.content)
        .bind(post.meta_description.as_deref())
        .bind(post.requested_theme.as_str())
        .bind(post.effective_theme.as_str())
        .bind(&post.tags)
        .bind(word_count)
        .bind(post.published)
        .bind(post.created_at)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert blog post {}", post.id))?;

        Ok(post.id)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Artifact>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch blog post")?;

        row.as_ref().map(post_from_row).transpose()
    }

    pub async fn list(
        pool: &PgPool,
        filter: PostFilter,
        pagination: Pagination,
    ) -> Result<Vec<Artifact>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {POST_COLUMNS}
            FROM blog_posts
            WHERE ($1::text IS NULL OR effective_theme = $1)
              AND ($2::boolean IS NULL OR published = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(filter.theme.map(Theme::as_str))
        .bind(filter.published)
        .bind(i64::from(pagination.limit))
        .bind(i64::from(pagination.offset))
        .fetch_all(pool)
        .await
        .context("failed to list blog posts")?;

        rows.iter().map(post_from_row).collect()
    }

    pub async fn set_published(
        pool: &PgPool,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Artifact>> {
        let row = sqlx::query(&format!(
            "UPDATE blog_posts SET published = $2 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .fetch_optional(pool)
        .await
        .context("failed to update blog post publication")?;

        row.as_ref().map(post_from_row).transpose()
    }
}

fn post_from_row(row: &PgRow) -> Result<Artifact> {
    let requested_theme: String = row.try_get("requested_theme")?;
    let effective_theme: String = row.try_get("effective_theme")?;
    let word_count: i32 = row.try_get("word_count")?;

    Ok(Artifact {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        topic: row.try_get("topic")?,
        content: row.try_get("content")?,
        meta_description: row.try_get("meta_description")?,
        requested_theme: requested_theme.parse()?,
        effective_theme: effective_theme.parse()?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        word_count: u32::try_from(word_count).context("negative word count in blog_posts")?,
        published: row.try_get("published")?,
    })
}
