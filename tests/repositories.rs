mod support;

use blogroll::application::repos::{
    CreatePostParams, FollowsRepo, PostFilter, PostsRepo, PostsWriteRepo,
};
use support::TestApp;
use time::macros::datetime;

async fn follow_rows(app: &TestApp, user_id: i64, author_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM follows WHERE user_id = ? AND author_id = ?",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(app.db.pool())
    .await
    .expect("count follows")
}

#[tokio::test]
async fn repeated_follow_inserts_a_single_edge() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;
    let mia = app.signup("mia").await;

    let first = app.db.create_follow(mia.id, leo.id).await.expect("follow");
    let second = app.db.create_follow(mia.id, leo.id).await.expect("follow again");

    assert!(first);
    assert!(!second);
    assert_eq!(follow_rows(&app, mia.id, leo.id).await, 1);
    assert_eq!(follow_rows(&app, leo.id, mia.id).await, 0);
}

#[tokio::test]
async fn whole_second_posts_sort_by_time_not_text() {
    let app = TestApp::new().await;
    let leo = app.signup("leo").await;

    let newer_at = datetime!(2025-01-01 12:00:00.5 UTC);
    let older_at = datetime!(2025-01-01 12:00:00 UTC);
    for (text, created_at) in [("newer", newer_at), ("older", older_at)] {
        app.db
            .create_post(CreatePostParams {
                author_id: leo.id,
                text: text.to_string(),
                group_id: None,
                image_path: None,
                created_at,
            })
            .await
            .expect("post should be created");
    }

    let posts = app
        .db
        .list_posts(PostFilter::All, 0, 10)
        .await
        .expect("list posts");
    let texts: Vec<&str> = posts.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(texts, ["newer", "older"]);
    assert_eq!(posts[0].created_at, newer_at);
    assert_eq!(posts[1].created_at, older_at);
}
