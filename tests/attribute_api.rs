mod common;

use common::{ids, names, TestApp};
use serde_json::json;
use warp::http::StatusCode;

const TAGS: &str = "/api/recipe/tags/";
const INGREDIENTS: &str = "/api/recipe/ingredients/";

#[tokio::test]
async fn attributes_require_authentication() {
    let app = TestApp::new();

    for path in [TAGS, INGREDIENTS] {
        let (status, _) = app.call("GET", path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn lists_are_scoped_and_sorted_by_name_descending() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;
    let other = app.user("other@example.com").await;

    for name in ["Dessert", "Vegan", "Breakfast"] {
        let (status, body) = app.post(TAGS, &token, json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], name);
        assert!(body.get("user").is_none());
    }
    app.post(TAGS, &other, json!({ "name": "Zesty" })).await;

    let (status, body) = app.get(TAGS, &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Vegan", "Dessert", "Breakfast"]);
}

#[tokio::test]
async fn ingredients_are_independent_of_tags() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;

    app.post(INGREDIENTS, &token, json!({ "name": "Kale" })).await;
    app.post(INGREDIENTS, &token, json!({ "name": "Salt" })).await;

    let (_, ingredients) = app.get(INGREDIENTS, &token).await;
    let (_, tags) = app.get(TAGS, &token).await;

    assert_eq!(names(&ingredients), vec!["Salt", "Kale"]);
    assert_eq!(tags, json!([]));
}

#[tokio::test]
async fn blank_names_are_refused() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;

    let (status, body) = app.post(TAGS, &token, json!({ "name": "  " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], json!(["This field may not be blank."]));
}

#[tokio::test]
async fn renaming_and_deleting() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;
    let (_, tag) = app.post(TAGS, &token, json!({ "name": "After Dinner" })).await;
    let path = format!("{TAGS}{}/", tag["id"]);

    let (status, body) = app.patch(&path, &token, json!({ "name": "Dessert" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": tag["id"], "name": "Dessert" }));

    let (status, body) = app.patch(&path, &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Dessert");

    let (status, body) = app.put(&path, &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["name"].is_array());

    let (status, _) = app.delete(&path, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get(TAGS, &token).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn other_users_entries_are_not_found() {
    let app = TestApp::new();
    let owner = app.user("owner@example.com").await;
    let intruder = app.user("intruder@example.com").await;
    let (_, ingredient) = app.post(INGREDIENTS, &owner, json!({ "name": "Pepper" })).await;
    let path = format!("{INGREDIENTS}{}/", ingredient["id"]);

    let (status, _) = app.patch(&path, &intruder, json!({ "name": "Stolen" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&path, &intruder).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(INGREDIENTS, &owner).await;
    assert_eq!(names(&body), vec!["Pepper"]);
}

#[tokio::test]
async fn deleted_tags_disappear_from_recipes() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;
    let recipe = app
        .recipe(&token, json!({ "tags": [{ "name": "Quick" }] }))
        .await;
    let tag_id = &recipe["tags"][0]["id"];

    app.delete(&format!("{TAGS}{tag_id}/"), &token).await;

    let (_, body) = app
        .get(&format!("/api/recipe/recipes/{}/", recipe["id"]), &token)
        .await;
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn assigned_only_keeps_linked_entries_without_duplicates() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;

    app.recipe(
        &token,
        json!({ "title": "Eggs Benedict", "ingredients": [{ "name": "Eggs" }] }),
    )
    .await;
    app.recipe(
        &token,
        json!({ "title": "Herb Eggs", "ingredients": [{ "name": "Eggs" }] }),
    )
    .await;
    app.post(INGREDIENTS, &token, json!({ "name": "Lentils" })).await;

    let (_, all) = app.get(INGREDIENTS, &token).await;
    assert_eq!(names(&all), vec!["Lentils", "Eggs"]);

    let (status, body) = app
        .get(&format!("{INGREDIENTS}?assigned_only=1"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Eggs"]);
    assert_eq!(ids(&body).len(), 1);

    let (_, body) = app
        .get(&format!("{INGREDIENTS}?assigned_only=0"), &token)
        .await;
    assert_eq!(names(&body), vec!["Lentils", "Eggs"]);

    let (status, body) = app
        .get(&format!("{INGREDIENTS}?assigned_only=yes"), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["assigned_only"].is_array());
}

#[tokio::test]
async fn malformed_renames_are_bad_requests() {
    let app = TestApp::new();
    let token = app.user("user@example.com").await;
    let (_, tag) = app.post(TAGS, &token, json!({ "name": "Brunch" })).await;
    let path = format!("{TAGS}{}/", tag["id"]);

    for method in ["PUT", "PATCH"] {
        let (status, _) = app.raw(method, &path, &token, "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
    }

    let (status, _) = app.raw("POST", TAGS, &token, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
