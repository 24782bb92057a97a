use serde_json::json;
use warp::{http::StatusCode, Filter};

use super::{json_reply, Route};

/// `GET /api/health-check/`, open to anonymous callers.
pub fn routes() -> Route {
    warp::path!("api" / "health-check")
        .and(warp::get())
        .map(|| json_reply(&json!({ "healthy": true }), StatusCode::OK))
        .boxed()
}
