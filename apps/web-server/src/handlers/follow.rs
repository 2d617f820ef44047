//! Follow feed and follow/unfollow handlers.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use postboard_core::domain::PostEntry;
use postboard_core::pagination::{Page, PageRequest};
use postboard_core::services::FollowOutcome;
use postboard_shared::dto::PageQuery;

use super::{profile_url, redirect};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
struct FollowFeedView {
    page: Page<PostEntry>,
}

/// GET /follow/
pub async fn follow_index(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = PageRequest::new(query.page_param(), state.site.posts_per_page);
    let page = state.feed.follow_feed(identity.user_id(), request).await?;

    Ok(HttpResponse::Ok().json(FollowFeedView { page }))
}

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let (author, outcome) = state
        .follows
        .follow(identity.user_id(), &path.into_inner())
        .await?;

    if outcome == FollowOutcome::SelfFollow {
        tracing::debug!(user = %identity.user.username, "Ignoring self follow");
    }

    Ok(redirect(profile_url(&author.username)))
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = state
        .follows
        .unfollow(identity.user_id(), &path.into_inner())
        .await?;

    Ok(redirect(profile_url(&author.username)))
}
