/// Integration tests for categories and genres
mod common;

use actix_web::{test, App};
use common::{fixtures::*, TestContext};
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use yamdb::orm::titles;
use yamdb::orm::users::Role;

#[actix_rt::test]
async fn test_category_lifecycle() {
    let ctx = TestContext::new().await;
    let admin = create_test_user(&ctx.db, "boss", Role::Admin).await.unwrap();
    let reader = create_test_user(&ctx.db, "reader", Role::User).await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let payload = json!({ "name": "Music", "slug": "music" });

    let req = test::TestRequest::post()
        .uri("/api/v1/categories")
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/v1/categories")
        .insert_header(ctx.bearer(reader.id))
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri("/api/v1/categories")
        .insert_header(ctx.bearer(admin.id))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, payload);

    // Slugs are unique.
    let req = test::TestRequest::post()
        .uri("/api/v1/categories")
        .insert_header(ctx.bearer(admin.id))
        .set_json(json!({ "name": "Other music", "slug": "music" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("slug").is_some());

    let req = test::TestRequest::post()
        .uri("/api/v1/categories")
        .insert_header(ctx.bearer(admin.id))
        .set_json(json!({ "name": "Bad", "slug": "bad slug" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/v1/categories").to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body, json!([{ "name": "Music", "slug": "music" }]));

    let req = test::TestRequest::delete()
        .uri("/api/v1/categories/music")
        .insert_header(ctx.bearer(admin.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::delete()
        .uri("/api/v1/categories/music")
        .insert_header(ctx.bearer(admin.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_rt::test]
async fn test_search_filters_by_name() {
    let ctx = TestContext::new().await;
    create_test_genre(&ctx.db, "Science fiction", "sci-fi").await.unwrap();
    create_test_genre(&ctx.db, "Drama", "drama").await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::get().uri("/api/v1/genres?search=FICT").to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body, json!([{ "name": "Science fiction", "slug": "sci-fi" }]));

    let req = test::TestRequest::get().uri("/api/v1/genres").to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["slug"], "drama");
}

#[actix_rt::test]
async fn test_deleting_category_keeps_titles() {
    let ctx = TestContext::new().await;
    let admin = create_test_user(&ctx.db, "boss", Role::Admin).await.unwrap();
    let movies = create_test_category(&ctx.db, "Movies", "movie").await.unwrap();
    let title = create_test_title(&ctx.db, "Mirror", 1975, Some(&movies), &[]).await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::delete()
        .uri("/api/v1/categories/movie")
        .insert_header(ctx.bearer(admin.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let title = titles::Entity::find_by_id(title.id)
        .one(&ctx.db)
        .await
        .unwrap()
        .expect("title survives its category");
    assert_eq!(title.category_id, None);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/titles/{}", title.id))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["category"], Value::Null);
}

#[actix_rt::test]
async fn test_deleting_genre_unlinks_titles() {
    let ctx = TestContext::new().await;
    let admin = create_test_user(&ctx.db, "boss", Role::Admin).await.unwrap();
    let drama = create_test_genre(&ctx.db, "Drama", "drama").await.unwrap();
    let comedy = create_test_genre(&ctx.db, "Comedy", "comedy").await.unwrap();
    let title = create_test_title(&ctx.db, "Mirror", 1975, None, &[&drama, &comedy]).await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::delete()
        .uri("/api/v1/genres/drama")
        .insert_header(ctx.bearer(admin.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/titles/{}", title.id))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["genre"], json!([{ "name": "Comedy", "slug": "comedy" }]));
}
