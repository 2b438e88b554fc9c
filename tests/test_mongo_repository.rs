//! Runs against a real MongoDB in Docker: `cargo test -- --ignored`.

use serde_json::json;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;

use sitecms::api::resource::{process_create, process_reorder, process_update};
use sitecms::db::connection::DbHandle;
use sitecms::db::models::{Blog, Category, User};
use sitecms::db::query::{Filter, Sort};
use sitecms::db::repository::{ensure_indexes, MongoRepository, Repository};
use sitecms::error::AppError;

async fn database() -> (testcontainers::ContainerAsync<Mongo>, DbHandle) {
    let container = Mongo::default()
        .start()
        .await
        .expect("Failed to start MongoDB container");
    let port = container
        .get_host_port_ipv4(27017)
        .await
        .expect("Failed to get MongoDB port");
    let handle = DbHandle::new(format!("mongodb://127.0.0.1:{port}"), "sitecms_test");
    (container, handle)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_slug_maps_to_duplicate_key() {
    let (_container, handle) = database().await;
    let db = handle.connect().await.unwrap();
    assert!(handle.is_connected());
    ensure_indexes::<Blog>(&db).await.unwrap();

    let repo = MongoRepository::<Blog>::new(&db);
    let body = json!({
        "title": "دليل العزل الحراري",
        "excerpt": "ملخص",
        "content": "محتوى",
        "image": "/img.webp",
        "category": "عزل"
    });

    let first = process_create(&repo, body.clone()).await.unwrap();
    assert_eq!(first.slug, "دليل-العزل-الحراري");

    let err = process_create(&repo, body).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateKey { ref field } if field == "slug"));

    let stored = repo.find_by_slug(&first.slug).await.unwrap().unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(repo.count(&Filter::new()).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn update_filter_sort_and_reorder() {
    let (_container, handle) = database().await;
    let db = handle.connect().await.unwrap();
    ensure_indexes::<Category>(&db).await.unwrap();
    let repo = MongoRepository::<Category>::new(&db);

    let mut ids = Vec::new();
    for (name, kind) in [("Alpha", "blog"), ("Beta", "service"), ("Gamma", "blog")] {
        let category = process_create(&repo, json!({ "name": name, "type": kind }))
            .await
            .unwrap();
        ids.push(category.id);
    }

    let updated = process_update(&repo, &ids[0], json!({ "description": "first" }))
        .await
        .unwrap();
    assert_eq!(updated.description, "first");
    assert_eq!(updated.slug, "alpha");

    process_reorder(&repo, &[ids[2].clone(), ids[0].clone(), ids[1].clone()])
        .await
        .unwrap();

    let blogs = repo
        .find_many(&Filter::new().eq("type", "blog"), &Sort::asc("order"), None)
        .await
        .unwrap();
    let names: Vec<&str> = blogs.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Gamma", "Alpha"]);

    let deleted = repo.delete_by_id(&ids[1]).await.unwrap();
    assert_eq!(deleted.unwrap().name, "Beta");
    assert!(repo.find_by_id(&ids[1]).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_email_maps_to_duplicate_key() {
    let (_container, handle) = database().await;
    let db = handle.connect().await.unwrap();
    ensure_indexes::<User>(&db).await.unwrap();
    let repo = MongoRepository::<User>::new(&db);

    let user = json!({ "email": "a@example.com", "passwordHash": "hash" });
    process_create(&repo, user.clone()).await.unwrap();
    let err = process_create(&repo, user).await.unwrap_err();
    assert_eq!(err.to_string(), "البريد الإلكتروني موجود مسبقاً");
}
