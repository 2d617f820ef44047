use std::sync::Arc;

use actix_web::{
    App,
    dev::ServiceResponse,
    http::{StatusCode, header},
    test, web,
};
use chrono::{Duration, Utc};
use serde_json::Value;

use postboard_core::domain::{Group, NewFollow, NewGroup, NewPost, Post, User};
use postboard_core::ports::{BaseRepository, PostFilter};
use postboard_core::services::{FragmentCache, INDEX_PAGE_FRAGMENT};
use postboard_infra::{InMemoryCache, JwtConfig};

use super::configure_routes;
use crate::config::SiteConfig;
use crate::middleware::problem::NotFoundMiddleware;
use crate::state::{AppState, Repositories};

struct Fixture {
    repos: Repositories,
    state: AppState,
}

impl Fixture {
    fn new() -> Self {
        let repos = Repositories::in_memory();
        let state = AppState::assemble(
            repos.clone(),
            Arc::new(InMemoryCache::new()),
            JwtConfig::default(),
            SiteConfig::default(),
        );
        Self { repos, state }
    }

    async fn user(&self, username: &str) -> User {
        self.repos
            .users
            .create(User::new(
                username.to_string(),
                format!("{username}@example.com"),
                String::new(),
            ))
            .await
            .unwrap()
    }

    async fn group(&self, slug: &str) -> Group {
        self.repos
            .groups
            .create(NewGroup::new("Тестовая группа", slug, "Тестовое описание"))
            .await
            .unwrap()
    }

    async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.repos
            .posts
            .create(NewPost::new(author.id, text).in_group(group.map(|g| g.id)))
            .await
            .unwrap()
    }

    async fn follow(&self, user: &User, author: &User) {
        self.repos
            .follows
            .create(NewFollow {
                user_id: user.id,
                author_id: author.id,
            })
            .await
            .unwrap();
    }

    async fn following(&self, user: &User) -> usize {
        self.repos
            .follows
            .followed_author_ids(user.id)
            .await
            .unwrap()
            .len()
    }

    fn bearer(&self, user: &User) -> (header::HeaderName, String) {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }
}

/// Service with the production routes over the fixture's state.
macro_rules! app {
    ($fx:expr) => {
        test::init_service(
            App::new()
                .wrap(NotFoundMiddleware)
                .app_data(web::Data::new($fx.state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

fn location<B>(res: &ServiceResponse<B>) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[actix_web::test]
async fn test_health() {
    let fx = Fixture::new();
    let app = app!(fx);

    let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_index_splits_thirteen_posts_ten_and_three() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    for i in 0..13 {
        fx.post(&author, &format!("Тестовый пост {i}"), None).await;
    }
    let app = app!(fx);

    let first: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/").to_request(),
    )
    .await;
    assert_eq!(first["page"]["items"].as_array().unwrap().len(), 10);
    assert_eq!(first["page"]["has_next"], true);

    let second: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=2").to_request(),
    )
    .await;
    assert_eq!(second["page"]["items"].as_array().unwrap().len(), 3);

    let fallback: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=abc").to_request(),
    )
    .await;
    assert_eq!(fallback["page"]["number"], 1);
}

#[actix_web::test]
async fn test_every_feed_splits_thirteen_posts_ten_and_three() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let reader = fx.user("reader").await;
    let group = fx.group("test-slug").await;
    for i in 0..13 {
        fx.post(&author, &format!("Тестовый пост {i}"), Some(&group)).await;
    }
    fx.follow(&reader, &author).await;
    let app = app!(fx);

    for feed in ["/group/test-slug/", "/profile/auth/", "/follow/"] {
        for (page, expected, has_next) in [(1, 10, true), (2, 3, false)] {
            let body: Value = test::call_and_read_body_json(
                &app,
                test::TestRequest::get()
                    .uri(&format!("{feed}?page={page}"))
                    .insert_header(fx.bearer(&reader))
                    .to_request(),
            )
            .await;

            let items = body["page"]["items"].as_array().unwrap();
            assert_eq!(items.len(), expected, "{feed} page {page}");
            assert_eq!(body["page"]["number"], page, "{feed} page {page}");
            assert_eq!(body["page"]["has_next"], has_next, "{feed} page {page}");
            assert_eq!(items[0]["author"]["username"], "auth");
        }
    }
}

#[actix_web::test]
async fn test_out_of_range_index_pages_share_one_cache_entry() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    for i in 0..13 {
        fx.post(&author, &format!("Тестовый пост {i}"), None).await;
    }
    let app = app!(fx);

    for i in 0..200 {
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/?page={}", 1000 + i))
                .to_request(),
        )
        .await;
        assert_eq!(body["page"]["number"], 2);
    }

    let last_page = FragmentCache::key(INDEX_PAGE_FRAGMENT, &["2"]);
    assert!(fx.state.fragments.get(&last_page).await.is_some());
    for i in 0..200 {
        let raw = (1000 + i).to_string();
        let key = FragmentCache::key(INDEX_PAGE_FRAGMENT, &[raw.as_str()]);
        assert!(fx.state.fragments.get(&key).await.is_none(), "{key}");
    }
}

#[actix_web::test]
async fn test_index_page_is_served_from_cache_until_invalidated() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    fx.post(&author, "first", None).await;
    let app = app!(fx);

    let count = |body: &Value| body["page"]["items"].as_array().unwrap().len();
    let get_index = || test::TestRequest::get().uri("/").to_request();

    let before: Value = test::call_and_read_body_json(&app, get_index()).await;
    assert_eq!(count(&before), 1);

    fx.post(&author, "second", None).await;
    let stale: Value = test::call_and_read_body_json(&app, get_index()).await;
    assert_eq!(count(&stale), 1);

    fx.state
        .fragments
        .invalidate(&FragmentCache::key(INDEX_PAGE_FRAGMENT, &["1"]))
        .await;
    let fresh: Value = test::call_and_read_body_json(&app, get_index()).await;
    assert_eq!(count(&fresh), 2);
}

#[actix_web::test]
async fn test_group_page_lists_only_group_posts() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let group = fx.group("test-slug").await;
    fx.post(&author, "in group", Some(&group)).await;
    fx.post(&author, "no group", None).await;
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/group/test-slug/").to_request(),
    )
    .await;

    assert_eq!(body["group"]["slug"], "test-slug");
    let items = body["page"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["text"], "in group");
    assert_eq!(items[0]["group"]["title"], "Тестовая группа");
}

#[actix_web::test]
async fn test_unknown_lookups_are_problem_documents() {
    let fx = Fixture::new();
    let app = app!(fx);

    for uri in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/not-a-number/",
        "/unexisting_page/",
    ] {
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 404);
        assert_eq!(body["instance"], uri);
    }
}

#[actix_web::test]
async fn test_guest_is_redirected_to_login() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let post = fx.post(&author, "text", None).await;
    let app = app!(fx);

    let res = test::call_service(&app, test::TestRequest::get().uri("/create/").to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/auth/login/?next=/create/");

    let edit_uri = format!("/posts/{}/edit/", post.id);
    let res = test::call_service(&app, test::TestRequest::get().uri(&edit_uri).to_request()).await;
    assert_eq!(location(&res), format!("/auth/login/?next={edit_uri}"));

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .set_form([("text", "guest comment")])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(location(&res).starts_with("/auth/login/"));
}

#[actix_web::test]
async fn test_create_post_saves_group_and_text() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let group = fx.group("test-slug").await;
    let app = app!(fx);

    let group_id = group.id.to_string();
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .insert_header(fx.bearer(&author))
            .set_form([("text", "Тестовый текст"), ("group", group_id.as_str())])
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/profile/auth/");

    let posts = fx.repos.posts.list(&PostFilter::All, 0, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "Тестовый текст");
    assert_eq!(posts[0].group_id, Some(group.id));
    assert_eq!(posts[0].author_id, author.id);
}

#[actix_web::test]
async fn test_create_post_rejects_blank_text() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let app = app!(fx);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .insert_header(fx.bearer(&author))
            .set_form([("text", "   ")])
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(res).await;
    assert!(body["errors"]["text"].is_array());
    assert_eq!(body["is_edit"], false);
    assert_eq!(
        fx.repos.posts.count(&PostFilter::All).await.unwrap(),
        0
    );
}

#[actix_web::test]
async fn test_edit_by_non_author_changes_nothing() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let other = fx.user("vova").await;
    let post = fx.post(&author, "original", None).await;
    let app = app!(fx);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(fx.bearer(&other))
            .set_form([("text", "hijacked")])
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), format!("/posts/{}/", post.id));

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "original");
    assert_eq!(stored.group_id, None);
}

#[actix_web::test]
async fn test_author_edit_keeps_pub_date() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let group = fx.group("test-slug").await;
    let post = fx
        .repos
        .posts
        .create(NewPost::new(author.id, "original").published_at(Utc::now() - Duration::days(1)))
        .await
        .unwrap();
    let app = app!(fx);

    let form_uri = format!("/posts/{}/edit/", post.id);
    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&form_uri)
            .insert_header(fx.bearer(&author))
            .to_request(),
    )
    .await;
    let form: Value = test::read_body_json(res).await;
    assert_eq!(form["is_edit"], true);
    assert_eq!(form["form"]["text"], "original");

    let group_id = group.id.to_string();
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&form_uri)
            .insert_header(fx.bearer(&author))
            .set_form([("text", "edited"), ("group", group_id.as_str())])
            .to_request(),
    )
    .await;
    assert_eq!(location(&res), format!("/posts/{}/", post.id));

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "edited");
    assert_eq!(stored.group_id, Some(group.id));
    assert_eq!(stored.pub_date, post.pub_date);
}

#[actix_web::test]
async fn test_comment_shows_on_detail_and_blank_is_dropped() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "text", None).await;
    let app = app!(fx);

    let comment_uri = format!("/posts/{}/comment/", post.id);
    for text in ["Тестовый комментарий", "  "] {
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&comment_uri)
                .insert_header(fx.bearer(&reader))
                .set_form([("text", text)])
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location(&res), format!("/posts/{}/", post.id));
    }

    let detail: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request(),
    )
    .await;
    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "Тестовый комментарий");
    assert_eq!(comments[0]["author"]["username"], "reader");
    assert_eq!(detail["author_post_count"], 1);
    assert_eq!(detail["can_edit"], false);
}

#[actix_web::test]
async fn test_follow_feed_tracks_follow_state() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let reader = fx.user("reader").await;
    fx.post(&author, "followed post", None).await;
    let app = app!(fx);

    let feed = |user: &User| {
        test::TestRequest::get()
            .uri("/follow/")
            .insert_header(fx.bearer(user))
            .to_request()
    };
    let items = |body: &Value| body["page"]["items"].as_array().unwrap().len();

    let body: Value = test::call_and_read_body_json(&app, feed(&reader)).await;
    assert_eq!(items(&body), 0);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/auth/follow/")
            .insert_header(fx.bearer(&reader))
            .to_request(),
    )
    .await;
    assert_eq!(location(&res), "/profile/auth/");

    let body: Value = test::call_and_read_body_json(&app, feed(&reader)).await;
    assert_eq!(items(&body), 1);
    let profile: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile/auth/")
            .insert_header(fx.bearer(&reader))
            .to_request(),
    )
    .await;
    assert_eq!(profile["following"], true);
    assert_eq!(profile["post_count"], 1);

    // The author follows nobody.
    let body: Value = test::call_and_read_body_json(&app, feed(&author)).await;
    assert_eq!(items(&body), 0);

    test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/auth/unfollow/")
            .insert_header(fx.bearer(&reader))
            .to_request(),
    )
    .await;
    let body: Value = test::call_and_read_body_json(&app, feed(&reader)).await;
    assert_eq!(items(&body), 0);
    assert_eq!(fx.following(&reader).await, 0);
}

#[actix_web::test]
async fn test_self_and_repeated_follows() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let reader = fx.user("reader").await;
    let app = app!(fx);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/auth/follow/")
            .insert_header(fx.bearer(&author))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(fx.following(&author).await, 0);

    for _ in 0..2 {
        test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/profile/auth/follow/")
                .insert_header(fx.bearer(&reader))
                .to_request(),
        )
        .await;
    }
    assert_eq!(fx.following(&reader).await, 1);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/nobody/follow/")
            .insert_header(fx.bearer(&reader))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_deleting_group_keeps_post_visible() {
    let fx = Fixture::new();
    let author = fx.user("auth").await;
    let group = fx.group("test-slug").await;
    let post = fx.post(&author, "text", Some(&group)).await;
    let app = app!(fx);

    fx.repos.groups.delete(group.id).await.unwrap();

    let detail: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request(),
    )
    .await;
    assert_eq!(detail["post"]["text"], "text");
    assert!(detail["post"]["group"].is_null());
    assert!(detail["post"]["group_id"].is_null());
}

#[actix_web::test]
async fn test_signup_then_login_sets_session_cookie() {
    let fx = Fixture::new();
    let app = app!(fx);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("first_name", "Ankl"),
                ("last_name", "Bens"),
                ("username", "ketchup"),
                ("email", "ketchup@example.com"),
                ("password1", "AiVFCdkMW3YvHYC"),
                ("password2", "AiVFCdkMW3YvHYC"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "ketchup"),
                ("password", "wrong-password"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "ketchup"),
                ("password", "AiVFCdkMW3YvHYC"),
                ("next", "/follow/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/follow/");

    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == "access_token")
        .expect("session cookie")
        .into_owned();
    assert_eq!(cookie.http_only(), Some(true));

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_signup_rejects_taken_username() {
    let fx = Fixture::new();
    fx.user("ketchup").await;
    let app = app!(fx);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("username", "ketchup"),
                ("password1", "AiVFCdkMW3YvHYC"),
                ("password2", "AiVFCdkMW3YvHYC"),
            ])
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(res).await;
    assert!(body["errors"]["username"].is_array());
    assert!(body["form"].get("password1").is_none());
}
