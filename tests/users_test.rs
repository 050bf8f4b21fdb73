/// Integration tests for user management and the self-service profile
mod common;

use actix_web::{test, App};
use common::{fixtures::*, TestContext};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{json, Value};
use yamdb::orm::users::{self, Role};
use yamdb::orm::{comments, reviews};
use yamdb::user::find_by_username;

#[actix_rt::test]
async fn test_users_are_admin_only() {
    let ctx = TestContext::new().await;
    let reader = create_test_user(&ctx.db, "reader", Role::User).await.unwrap();
    let moderator = create_test_user(&ctx.db, "mod", Role::Moderator).await.unwrap();
    let admin = create_test_user(&ctx.db, "boss", Role::Admin).await.unwrap();
    let superuser = create_test_superuser(&ctx.db, "root").await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::get().uri("/api/v1/users").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    for who in [&reader, &moderator] {
        let req = test::TestRequest::get()
            .uri("/api/v1/users")
            .insert_header(ctx.bearer(who.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);
    }

    for who in [&admin, &superuser] {
        let req = test::TestRequest::get()
            .uri("/api/v1/users?search=REA")
            .insert_header(ctx.bearer(who.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["username"], "reader");
        assert_eq!(body[0]["role"], "user");
    }
}

#[actix_rt::test]
async fn test_admin_creates_and_edits_users() {
    let ctx = TestContext::new().await;
    let admin = create_test_user(&ctx.db, "boss", Role::Admin).await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .insert_header(ctx.bearer(admin.id))
        .set_json(json!({
            "username": "critic",
            "email": "critic@example.com",
            "first_name": "Roger",
            "role": "moderator"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "username": "critic",
            "email": "critic@example.com",
            "first_name": "Roger",
            "last_name": null,
            "bio": null,
            "role": "moderator"
        })
    );

    for payload in [
        json!({ "username": "critic", "email": "new@example.com" }),
        json!({ "username": "fresh", "email": "critic@example.com" }),
        json!({ "username": "Me", "email": "me@example.com" }),
        json!({ "username": "fresh", "email": "fresh@example.com", "role": "overlord" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/users")
            .insert_header(ctx.bearer(admin.id))
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400, "{}", payload);
    }

    let req = test::TestRequest::patch()
        .uri("/api/v1/users/critic")
        .insert_header(ctx.bearer(admin.id))
        .set_json(json!({ "role": "admin", "bio": "Watches everything." }))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["role"], "admin");
    assert_eq!(body["bio"], "Watches everything.");

    let req = test::TestRequest::get()
        .uri("/api/v1/users/nobody")
        .insert_header(ctx.bearer(admin.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::put()
        .uri("/api/v1/users/critic")
        .insert_header(ctx.bearer(admin.id))
        .set_json(json!({ "username": "critic", "email": "critic@example.com" }))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_client_error());
}

#[actix_rt::test]
async fn test_me_pins_role() {
    let ctx = TestContext::new().await;
    let reader = create_test_user(&ctx.db, "reader", Role::User).await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::get().uri("/api/v1/users/me").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::patch()
        .uri("/api/v1/users/me")
        .insert_header(ctx.bearer(reader.id))
        .set_json(json!({ "role": "admin", "first_name": "Rita" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["role"], "user");
    assert_eq!(body["first_name"], "Rita");

    let stored = find_by_username(&ctx.db, "reader").await.unwrap().unwrap();
    assert_eq!(stored.role, Role::User);

    let req = test::TestRequest::patch()
        .uri("/api/v1/users/me")
        .insert_header(ctx.bearer(reader.id))
        .set_json(json!({ "username": "mE" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_rt::test]
async fn test_me_delete_removes_everything_authored() {
    let ctx = TestContext::new().await;
    let reader = create_test_user(&ctx.db, "reader", Role::User).await.unwrap();
    let other = create_test_user(&ctx.db, "other", Role::User).await.unwrap();
    let title = create_test_title(&ctx.db, "Mirror", 1975, None, &[]).await.unwrap();
    let review = create_test_review(&ctx.db, &title, &reader, 6).await.unwrap();
    create_test_comment(&ctx.db, &review, &other, "On the reader's review.").await.unwrap();
    let other_review = create_test_review(&ctx.db, &title, &other, 3).await.unwrap();
    create_test_comment(&ctx.db, &other_review, &reader, "By the reader.").await.unwrap();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::delete()
        .uri("/api/v1/users/me")
        .insert_header(ctx.bearer(reader.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    assert_eq!(users::Entity::find().count(&ctx.db).await.unwrap(), 1);
    assert_eq!(reviews::Entity::find().count(&ctx.db).await.unwrap(), 1);
    assert_eq!(comments::Entity::find().count(&ctx.db).await.unwrap(), 0);

    // The old token now belongs to nobody.
    let req = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(ctx.bearer(reader.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}
