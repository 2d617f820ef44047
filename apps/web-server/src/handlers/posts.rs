//! Feed, post and comment handlers.

use actix_web::{HttpResponse, http::StatusCode, http::header::ContentType, web};
use serde::Serialize;

use postboard_core::domain::{Group, Post, PostEntry};
use postboard_core::forms::{CommentForm, FormErrors, PostForm};
use postboard_core::pagination::{Page, PageRequest};
use postboard_core::services::{
    CommentOutcome, EditOutcome, FragmentCache, INDEX_PAGE_FRAGMENT, PostDetail, SubmitOutcome,
};
use postboard_shared::dto::PageQuery;

use super::{post_url, profile_url, redirect};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
struct IndexView {
    page: Page<PostEntry>,
}

#[derive(Serialize)]
struct GroupView {
    group: Group,
    page: Page<PostEntry>,
}

#[derive(Serialize)]
struct PostDetailView {
    #[serde(flatten)]
    detail: PostDetail,
    /// Blank comment form.
    form: CommentForm,
    /// Whether the viewer wrote this post.
    can_edit: bool,
}

/// Create/edit form description.
#[derive(Serialize)]
struct PostFormView {
    form: PostForm,
    errors: FormErrors,
    groups: Vec<Group>,
    is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<i64>,
}

fn page_request(state: &AppState, query: &PageQuery) -> PageRequest {
    PageRequest::new(query.page_param(), state.site.posts_per_page)
}

fn form_for(post: &Post) -> PostForm {
    PostForm {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()),
        image: post.image.clone(),
    }
}

async fn render_form(
    state: &AppState,
    status: StatusCode,
    form: PostForm,
    errors: FormErrors,
    post_id: Option<i64>,
) -> AppResult<HttpResponse> {
    let groups = state.posts.group_choices().await?;
    Ok(HttpResponse::build(status).json(PostFormView {
        form,
        errors,
        groups,
        is_edit: post_id.is_some(),
        post_id,
    }))
}

/// GET /
///
/// The page body is served from the fragment cache until it expires, so new
/// posts can take up to one TTL to appear here. Entries are keyed by the
/// resolved page, so out-of-range requests share the last page's entry.
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&state, &query);
    let page_number = state.feed.index_page_number(request).await?.to_string();
    let key = FragmentCache::key(INDEX_PAGE_FRAGMENT, &[page_number.as_str()]);

    let body = state
        .fragments
        .get_or_render(&key, || async {
            let page = state.feed.index(request).await?;
            serde_json::to_string(&IndexView { page })
                .map_err(|e| AppError::Internal(e.to_string()))
        })
        .await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let (group, page) = state
        .feed
        .group(&slug, page_request(&state, &query))
        .await?;

    Ok(HttpResponse::Ok().json(GroupView { group, page }))
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let view = state
        .feed
        .profile(&username, viewer.user_id(), page_request(&state, &query))
        .await?;

    Ok(HttpResponse::Ok().json(view))
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let detail = state.feed.post_detail(path.into_inner()).await?;
    let can_edit = viewer
        .user_id()
        .is_some_and(|id| detail.post.post.is_authored_by(id));

    Ok(HttpResponse::Ok().json(PostDetailView {
        detail,
        form: CommentForm::default(),
        can_edit,
    }))
}

/// GET /create/
pub async fn post_create_form(
    _identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    render_form(
        &state,
        StatusCode::OK,
        PostForm::default(),
        FormErrors::default(),
        None,
    )
    .await
}

/// POST /create/
pub async fn post_create(
    identity: Identity,
    state: web::Data<AppState>,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match state.posts.create(identity.user_id(), &form).await? {
        SubmitOutcome::Saved(_) => Ok(redirect(profile_url(&identity.user.username))),
        SubmitOutcome::Invalid(errors) => {
            render_form(&state, StatusCode::UNPROCESSABLE_ENTITY, form, errors, None).await
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    match state.posts.open_edit(identity.user_id(), post_id).await? {
        EditOutcome::Editable(post) => {
            render_form(
                &state,
                StatusCode::OK,
                form_for(&post),
                FormErrors::default(),
                Some(post.id),
            )
            .await
        }
        _ => Ok(redirect(post_url(post_id))),
    }
}

/// POST /posts/{post_id}/edit/
///
/// Non-authors are sent to the read-only detail view with nothing changed.
pub async fn post_edit(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let form = form.into_inner();

    match state.posts.edit(identity.user_id(), post_id, &form).await? {
        EditOutcome::Invalid(post, errors) => {
            render_form(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                form,
                errors,
                Some(post.id),
            )
            .await
        }
        EditOutcome::Saved(_) | EditOutcome::NotAuthor(_) | EditOutcome::Editable(_) => {
            Ok(redirect(post_url(post_id)))
        }
    }
}

/// POST /posts/{post_id}/comment/
///
/// Always returns to the post; an invalid comment is dropped.
pub async fn add_comment(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    match state
        .posts
        .add_comment(identity.user_id(), post_id, &form)
        .await?
    {
        CommentOutcome::Created(comment) => {
            tracing::debug!(post_id, comment_id = comment.id, "Comment added");
        }
        CommentOutcome::Discarded(_) => {}
    }

    Ok(redirect(post_url(post_id)))
}
