#![allow(dead_code)]

use std::{io::Cursor, sync::Arc};

use recipe_api::{config::Config, memory_state, routes, state::AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use warp::{http::StatusCode, test::RequestBuilder};

pub const BOUNDARY: &str = "recipe-api-test-boundary";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media = TempDir::new().unwrap();
        let state = memory_state(&Config::local(media.path().to_path_buf())).unwrap();
        Self { state, media }
    }

    pub async fn send(&self, request: RequestBuilder) -> (StatusCode, Value) {
        let response = request.reply(&routes::api(self.state.clone())).await;
        let body = if response.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(response.body()).unwrap_or(Value::Null)
        };

        (response.status(), body)
    }

    pub async fn call(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Token {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        self.send(request).await
    }

    /// Sends `body` verbatim, labelled as JSON.
    pub async fn raw(
        &self,
        method: &str,
        path: &str,
        token: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let request = warp::test::request()
            .method(method)
            .path(path)
            .header("authorization", format!("Token {token}"))
            .header("content-type", "application/json")
            .body(body.to_owned());

        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.call("GET", path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("PATCH", path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("PUT", path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.call("DELETE", path, Some(token), None).await
    }

    /// Registers `email` and returns a token for it.
    pub async fn user(&self, email: &str) -> String {
        let (status, _) = self
            .call(
                "POST",
                "/api/user/create/",
                None,
                Some(json!({ "email": email, "password": "testpass123", "name": "Test" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .call(
                "POST",
                "/api/user/token/",
                None,
                Some(json!({ "email": email, "password": "testpass123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        body["token"].as_str().unwrap().to_string()
    }

    pub async fn recipe(&self, token: &str, body: Value) -> Value {
        let mut payload = json!({ "title": "Sample recipe", "time_minutes": 22, "price": "5.25" });
        if let (Some(payload), Some(extra)) = (payload.as_object_mut(), body.as_object()) {
            payload.extend(extra.clone());
        }

        let (status, body) = self.post("/api/recipe/recipes/", token, payload).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn upload(&self, recipe_id: i64, token: &str, data: &[u8]) -> (StatusCode, Value) {
        let request = warp::test::request()
            .method("POST")
            .path(&format!("/api/recipe/recipes/{recipe_id}/upload-image/"))
            .header("authorization", format!("Token {token}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart("image", data));

        self.send(request).await
    }
}

pub fn multipart(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn png() -> Vec<u8> {
    let mut buffer = Vec::new();
    image::RgbImage::new(10, 10)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

pub fn names(values: &Value) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value["name"].as_str().unwrap().to_string())
        .collect()
}

pub fn ids(values: &Value) -> Vec<i64> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value["id"].as_i64().unwrap())
        .collect()
}
