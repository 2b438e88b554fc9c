mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

async fn create(
    env: &common::TestEnv,
    server: &axum_test::TestServer,
    path: &str,
    body: Value,
) -> Value {
    let response = server
        .post(path)
        .authorization_bearer(&env.editor_token)
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

#[tokio::test]
async fn service_crud_and_toggle() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();

    let service = create(
        &env,
        &server,
        "/api/services",
        json!({
            "title": "Roof Insulation",
            "subtitle": "Foam and membranes",
            "hero": { "image": "/hero.webp", "description": "Hero text" },
            "sections": [{ "id": "s1", "type": "features-grid", "title": "Why us" }]
        }),
    )
    .await;
    assert_eq!(service["slug"], "roof-insulation");
    assert_eq!(service["isActive"], true);
    assert_eq!(service["sections"][0]["type"], "features-grid");

    let public: Value = server.get("/api/services/roof-insulation").await.json();
    assert_eq!(public["data"]["_id"], service["_id"]);

    let id = service["_id"].as_str().unwrap();
    let toggled: Value = server
        .patch(&format!("/api/services/{id}/toggle"))
        .authorization_bearer(&env.editor_token)
        .await
        .json();
    assert_eq!(toggled["data"]["isActive"], false);

    let active: Value = server.get("/api/services?active=true").await.json();
    assert_eq!(active["count"], 0);
    let all: Value = server.get("/api/services").await.json();
    assert_eq!(all["count"], 1);

    let response = server
        .delete(&format!("/api/services/{id}"))
        .authorization_bearer(&env.editor_token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["message"], "تم حذف الخدمة بنجاح");

    let response = server.get("/api/services/roof-insulation").await;
    response.assert_status_not_found();
    assert_eq!(response.json::<Value>()["message"], "الخدمة غير موجودة");
}

#[tokio::test]
async fn service_writes_require_token() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();

    let response = server
        .post("/api/services")
        .json(&json!({ "title": "x", "subtitle": "y" }))
        .await;
    response.assert_status_unauthorized();

    let response = server
        .post("/api/services")
        .authorization_bearer("not-a-token")
        .json(&json!({ "title": "x", "subtitle": "y" }))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(response.json::<Value>()["message"], "غير مصرح - التوكن غير صالح");
}

#[tokio::test]
async fn service_reorder_assigns_sequential_orders() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    let mut ids = Vec::new();
    for title in ["First", "Second", "Third"] {
        let service = create(
            &env,
            &server,
            "/api/services",
            json!({ "title": title, "subtitle": "sub" }),
        )
        .await;
        ids.push(service["_id"].as_str().unwrap().to_string());
    }

    let response: Value = server
        .patch("/api/services/reorder")
        .authorization_bearer(&env.editor_token)
        .json(&json!({ "orderedIds": [ids[2], ids[0], ids[1]] }))
        .await
        .json();
    assert_eq!(response["message"], "تم تحديث الترتيب بنجاح");

    let list: Value = server.get("/api/services").await.json();
    let titles: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Third", "First", "Second"]);
    assert_eq!(list["data"][0]["order"], 0);
    assert_eq!(list["data"][2]["order"], 2);
}

#[tokio::test]
async fn category_filters_by_type_and_active() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    let service_category = create(
        &env,
        &server,
        "/api/categories",
        json!({ "name": "عزل مائي", "type": "service" }),
    )
    .await;
    assert_eq!(service_category["slug"], "عزل-مائي");
    assert_eq!(service_category["color"]["primary"], "#3b82f6");

    let blog_category = create(
        &env,
        &server,
        "/api/categories",
        json!({ "name": "Tips", "type": "blog" }),
    )
    .await;

    let services: Value = server.get("/api/categories?type=service").await.json();
    assert_eq!(services["count"], 1);
    assert_eq!(services["data"][0]["_id"], service_category["_id"]);

    let id = blog_category["_id"].as_str().unwrap();
    server
        .patch(&format!("/api/categories/{id}/toggle"))
        .authorization_bearer(&env.editor_token)
        .await;

    let active: Value = server.get("/api/categories?active=true").await.json();
    assert_eq!(active["count"], 1);

    let fetched: Value = server.get(&format!("/api/categories/{id}")).await.json();
    assert_eq!(fetched["data"]["isActive"], false);
}

#[tokio::test]
async fn category_requires_type() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();

    let response = server
        .post("/api/categories")
        .authorization_bearer(&env.editor_token)
        .json(&json!({ "name": "No Type" }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn category_update_and_delete() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();

    let category = create(
        &env,
        &server,
        "/api/categories",
        json!({ "name": "Old Name", "type": "blog" }),
    )
    .await;
    let id = category["_id"].as_str().unwrap();

    let updated: Value = server
        .put(&format!("/api/categories/{id}"))
        .authorization_bearer(&env.editor_token)
        .json(&json!({ "name": "New Name", "description": "desc" }))
        .await
        .json();
    assert_eq!(updated["data"]["name"], "New Name");
    assert_eq!(updated["data"]["slug"], "old-name");
    assert_eq!(updated["data"]["type"], "blog");

    let response = server
        .delete(&format!("/api/categories/{id}"))
        .authorization_bearer(&env.editor_token)
        .await;
    assert_eq!(response.json::<Value>()["message"], "تم حذف القسم بنجاح");

    let response = server.get(&format!("/api/categories/{id}")).await;
    response.assert_status_not_found();
}
