mod support;

use std::time::Duration;

use axum::http::StatusCode;
use support::{TestApp, body_text, count_cards, delete, post_empty, post_form};

#[tokio::test]
async fn home_page_is_served_from_cache_until_invalidated() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    app.seed_posts(leo.id, None, 1).await;

    let (_, first) = app.get_page("/", None).await;
    assert_eq!(count_cards(&first), 1);
    assert_eq!(app.cache.len(), 1);

    app.seed_posts(leo.id, None, 1).await;
    let (_, cached) = app.get_page("/", None).await;
    assert_eq!(count_cards(&cached), 1, "writes do not invalidate the cache");

    let response = app.send_admin(post_empty("/cache/invalidate", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("\"removed\":1"));

    let (_, fresh) = app.get_page("/", None).await;
    assert_eq!(count_cards(&fresh), 2);
}

#[tokio::test]
async fn cached_home_page_still_lists_a_deleted_post() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    let posts = app.seed_posts(leo.id, None, 2).await;

    let (_, before) = app.get_page("/", None).await;
    assert!(before.contains("Seeded post number 1"));

    let response = app
        .send_admin(delete(&format!("/posts/{}", posts[1].id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (_, cached) = app.get_page("/", None).await;
    assert_eq!(cached, before, "cache hit serves identical bytes");

    app.clock.advance(Duration::from_secs(21));
    let (_, fresh) = app.get_page("/", None).await;
    assert_ne!(fresh, before);
    assert!(!fresh.contains("Seeded post number 1"));
    assert_eq!(count_cards(&fresh), 1);
}

#[tokio::test]
async fn cached_pages_expire_after_their_ttl() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    app.seed_posts(leo.id, None, 1).await;

    app.get_page("/", None).await;
    app.seed_posts(leo.id, None, 1).await;

    app.clock.advance(Duration::from_secs(19));
    let (_, still_cached) = app.get_page("/", None).await;
    assert_eq!(count_cards(&still_cached), 1);

    app.clock.advance(Duration::from_secs(2));
    let (_, expired) = app.get_page("/", None).await;
    assert_eq!(count_cards(&expired), 2);
}

#[tokio::test]
async fn pages_and_viewers_are_cached_separately() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    app.seed_posts(leo.id, None, 12).await;

    let (_, anonymous) = app.get_page("/", None).await;
    let (_, signed_in) = app.get_page("/", Some(&leo.cookie)).await;
    let (_, second) = app.get_page("/?page=2", None).await;

    assert!(anonymous.contains("Log in"));
    assert!(signed_in.contains("Log out"));
    assert_eq!(count_cards(&second), 2);
    assert_eq!(app.cache.len(), 3);
}

#[tokio::test]
async fn single_keys_can_be_invalidated() {
    let app = TestApp::new().await;
    app.get_page("/", None).await;

    let key = "index_page:page=1:viewer=anonymous";
    let response = app
        .send_admin(post_empty(&format!("/cache/invalidate/{key}"), None))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send_admin(post_empty(&format!("/cache/invalidate/{key}"), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_group_delete_keeps_posts() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;

    let response = app
        .send_admin(post_form("/groups", "title=Tech+Talk", None))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_text(response).await;
    assert!(body.contains("\"slug\":\"tech-talk\""));

    let duplicate = app
        .send_admin(post_form("/groups", "title=Tech+Talk", None))
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let (_, group_page) = app.get_page("/group/tech-talk/", None).await;
    assert!(group_page.contains("Tech Talk"));

    let group = blogroll::application::repos::GroupsRepo::find_group_by_slug(
        app.db.as_ref(),
        "tech-talk",
    )
    .await
    .expect("lookup")
    .expect("group exists");
    let posts = app.seed_posts(leo.id, Some(group.id), 2).await;

    let response = app.send_admin(delete("/groups/tech-talk")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("\"detached_posts\":2"));

    let (status, _) = app.get_page("/group/tech-talk/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, detail) = app.get_page(&format!("/posts/{}/", posts[0].id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!detail.contains("group-badge"));
}

#[tokio::test]
async fn admin_author_delete_cascades() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    let mia = app.signup("mia").await;
    let post = app.seed_posts(leo.id, None, 2).await.remove(0);
    let mia_post = app.seed_posts(mia.id, None, 1).await.remove(0);

    app.send(post_form(
        &format!("/posts/{}/comment/", post.id),
        "text=nice",
        Some(&mia.cookie),
    ))
    .await;
    app.send(post_form(
        &format!("/posts/{}/comment/", mia_post.id),
        "text=thanks+from+leo",
        Some(&leo.cookie),
    ))
    .await;
    app.send(post_empty("/profile/leo/follow/", Some(&mia.cookie)))
        .await;
    app.send(post_empty("/profile/mia/follow/", Some(&leo.cookie)))
        .await;

    let response = app.send_admin(delete("/authors/leo")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("\"posts\":2"));
    assert!(body.contains("\"comments\":2"));
    assert!(body.contains("\"follows\":2"));

    let (status, _) = app.get_page(&format!("/posts/{}/", post.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get_page("/profile/leo/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, detail) = app
        .get_page(&format!("/posts/{}/", mia_post.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!detail.contains("thanks from leo"));

    let follows_left = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows")
        .fetch_one(app.db.pool())
        .await
        .expect("count follows");
    assert_eq!(follows_left, 0);

    let response = app.send(support::get("/create/", Some(&leo.cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.send_admin(delete("/authors/leo")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_post_delete_removes_comments() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    let post = app.seed_posts(leo.id, None, 1).await.remove(0);
    app.send(post_form(
        &format!("/posts/{}/comment/", post.id),
        "text=first",
        Some(&leo.cookie),
    ))
    .await;

    let response = app
        .send_admin(delete(&format!("/posts/{}", post.id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("\"comments\":1"));

    let (status, _) = app.get_page(&format!("/posts/{}/", post.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_health_reports_database() {
    let app = TestApp::new().await;
    let response = app.send_admin(support::get("/_health/db", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
