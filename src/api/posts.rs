// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post endpoints.
//!
//! Creating a post costs the configured fee. The debit and the insert commit
//! together, so a post never exists without its fee and a failed insert
//! leaves the wallet untouched. Only the author may edit or delete a post.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use super::JsonBody;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        AuthorSummary, CreatePostRequest, MessageResponse, PostListResponse, PostResponse,
        UpdatePostRequest,
    },
    state::AppState,
    storage::{NewPost, OwnedResource, PostRepository, StoreError, StoredPost, UserRepository},
};

const RATING_ERROR: &str = "rating must be an integer between 1 and 5";

/// Accepts JSON integers 1..=5 only.
fn parse_rating(value: &Value) -> Result<u8, ApiError> {
    value
        .as_u64()
        .filter(|rating| (1..=5).contains(rating))
        .map(|rating| rating as u8)
        .ok_or_else(|| ApiError::bad_request(RATING_ERROR))
}

fn load_post(state: &AppState, post_id: u64) -> Result<StoredPost, ApiError> {
    PostRepository::new(&state.db)
        .get(post_id)
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::not_found("Post not found"),
            other => other.into(),
        })
}

fn author_summary(state: &AppState, author_id: u64) -> Result<AuthorSummary, ApiError> {
    // Users are never deleted, so a missing author is a storage fault.
    UserRepository::new(&state.db)
        .get(author_id)
        .map(AuthorSummary::from)
        .map_err(ApiError::internal)
}

/// List all posts, newest first.
#[utoipa::path(
    get,
    path = "/v1/posts",
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All posts", body = PostListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_posts(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<PostListResponse>, ApiError> {
    let posts = PostRepository::new(&state.db).list()?;

    let mut authors: HashMap<u64, AuthorSummary> = HashMap::new();
    let mut responses = Vec::with_capacity(posts.len());
    for post in posts {
        let author = match authors.get(&post.author_id) {
            Some(author) => author.clone(),
            None => {
                let author = author_summary(&state, post.author_id)?;
                authors.insert(post.author_id, author.clone());
                author
            }
        };
        responses.push(PostResponse::new(post, author));
    }

    Ok(Json(PostListResponse { posts: responses }))
}

/// Get a single post.
#[utoipa::path(
    get,
    path = "/v1/posts/{post_id}",
    tag = "Posts",
    security(("bearer" = [])),
    params(("post_id" = u64, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn get_post(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = load_post(&state, post_id)?;
    let author = author_summary(&state, post.author_id)?;
    Ok(Json(PostResponse::new(post, author)))
}

/// Create a post, debiting the post creation fee from the author's wallet.
#[utoipa::path(
    post,
    path = "/v1/posts",
    tag = "Posts",
    security(("bearer" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Missing or invalid field"),
        (status = 401, description = "Unauthorized"),
        (status = 402, description = "Insufficient funds; body carries `required` and `balance`"),
    )
)]
pub async fn create_post(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(title), Some(description), Some(rating)) = (
        non_empty(request.title),
        non_empty(request.description),
        request.rating.filter(|v| !v.is_null()),
    ) else {
        return Err(ApiError::bad_request(
            "title, description, and rating are required",
        ));
    };
    let rating = parse_rating(&rating)?;

    let new_post = NewPost {
        title,
        description,
        rating,
        author_id: user.user_id,
    };
    let (balance, post) = state
        .post_fee
        .charge_with(user.user_id, |txn| PostRepository::insert(txn, new_post))?;

    info!(
        post_id = post.id,
        user_id = user.user_id,
        fee = %state.post_fee.cost(),
        balance = %balance,
        "Post created"
    );

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::new(post, AuthorSummary::from(&user))),
    ))
}

/// Update some fields of a post. Author only.
#[utoipa::path(
    put,
    path = "/v1/posts/{post_id}",
    tag = "Posts",
    security(("bearer" = [])),
    params(("post_id" = u64, Path, description = "Post identifier")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 400, description = "Invalid field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn update_post(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
    JsonBody(request): JsonBody<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let mut post = load_post(&state, post_id)?;
    if !post.is_owned_by(&user) {
        return Err(ApiError::forbidden("You can only edit your own posts"));
    }

    if let Some(title) = request.title {
        post.title = title;
    }
    if let Some(description) = request.description {
        post.description = description;
    }
    if let Some(rating) = request.rating {
        post.rating = parse_rating(&rating)?;
    }

    PostRepository::new(&state.db).update(&mut post)?;
    info!(post_id, user_id = user.user_id, "Post updated");

    Ok(Json(PostResponse::new(post, AuthorSummary::from(&user))))
}

/// Delete a post. Author only.
#[utoipa::path(
    delete,
    path = "/v1/posts/{post_id}",
    tag = "Posts",
    security(("bearer" = [])),
    params(("post_id" = u64, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn delete_post(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let post = load_post(&state, post_id)?;
    if !post.is_owned_by(&user) {
        return Err(ApiError::forbidden("You can only delete your own posts"));
    }

    PostRepository::new(&state.db).delete(post_id)?;
    info!(post_id, user_id = user.user_id, "Post deleted");

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
