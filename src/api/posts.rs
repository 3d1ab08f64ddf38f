use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error::ApiError, parse_theme};
use crate::{
    app::AppState,
    store::{Artifact, Pagination, PostFilter},
};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<u32>,
    offset: Option<u32>,
    theme: Option<String>,
    published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostPage {
    limit: u32,
    offset: u32,
    posts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublishRequest {
    published: bool,
}

/// 新しい順のページ。
pub(crate) async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let filter = PostFilter {
        theme: parse_theme(query.theme.as_deref())?,
        published: query.published,
    };
    let pagination = Pagination::new(query.limit, query.offset);
    let posts = state
        .dao()
        .list_posts(filter, pagination)
        .await
        .map_err(|err| ApiError::internal(&err))?;
    Ok(Json(PostPage {
        limit: pagination.limit,
        offset: pagination.offset,
        posts,
    }))
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Artifact>, ApiError> {
    state
        .dao()
        .get_post(id)
        .await
        .map_err(|err| ApiError::internal(&err))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("post {id} not found")))
}

pub(crate) async fn set_published(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<Artifact>, ApiError> {
    state
        .dao()
        .set_published(id, request.published)
        .await
        .map_err(|err| ApiError::internal(&err))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("post {id} not found")))
}
