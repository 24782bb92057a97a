use std::{convert::Infallible, sync::Arc};

use log::{debug, error};
use serde::Serialize;
use warp::{
    filters::{body::BodyDeserializeError, BoxedFilter},
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, Rejection, UnsupportedMediaType,
    },
    reply::Response,
    Filter, Reply,
};

use crate::{
    constants::JSON_BODY_LIMIT,
    error::{Error, HttpError},
    form::FormData,
    schema::AttributeKind,
    state::AppState,
};

pub mod attributes;
pub mod health;
pub mod recipes;
pub mod users;

pub type Route = BoxedFilter<(Response,)>;

/// The whole HTTP surface, with errors rendered as JSON and requests logged.
pub fn api(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    health::routes()
        .or(users::routes(state.clone()))
        .unify()
        .or(recipes::routes(state.clone()))
        .unify()
        .or(attributes::routes(AttributeKind::Tag, state.clone()))
        .unify()
        .or(attributes::routes(AttributeKind::Ingredient, state.clone()))
        .unify()
        .or(media_files(&state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("recipe_api"))
}

fn media_files(state: &AppState) -> Route {
    if !state.serve_media {
        return warp::any()
            .and_then(|| async { Err::<Response, Rejection>(warp::reject::not_found()) })
            .boxed();
    }

    warp::path("static")
        .and(warp::path("media"))
        .and(warp::fs::dir(state.media.root().to_owned()))
        .map(|file: warp::fs::File| file.into_response())
        .boxed()
}

pub fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}

pub fn json_reply<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

pub fn no_content() -> Response {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response()
}

/// Every branch of the tree contributes a rejection; `find` sees all of them.
/// A body or header problem on a matching method outranks the 405 produced by
/// sibling routes on the same path.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error: Error = if let Some(error) = err.find::<Error>() {
        error.clone()
    } else if err.is_not_found() {
        HttpError::NotFound.default()
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        debug!("Rejected body: {e}");
        HttpError::InvalidRequest.new("JSON parse error - expected an object.")
    } else if err.find::<PayloadTooLarge>().is_some() {
        HttpError::PayloadTooLarge.default()
    } else if err.find::<UnsupportedMediaType>().is_some() {
        HttpError::UnsupportedMediaType.default()
    } else if err.find::<LengthRequired>().is_some() {
        HttpError::InvalidRequest.new("Content-Length header is required.")
    } else if let Some(e) = err.find::<MissingHeader>() {
        HttpError::InvalidRequest.new(&format!("Missing header \"{}\".", e.name()))
    } else if let Some(e) = err.find::<InvalidHeader>() {
        HttpError::InvalidRequest.new(&format!("Invalid header \"{}\".", e.name()))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        debug!("Rejected query: {e}");
        HttpError::InvalidRequest.new("Invalid query string.")
    } else if err.find::<MethodNotAllowed>().is_some() {
        HttpError::MethodNotAllowed.default()
    } else {
        error!("Unhandled rejection: {err:?}");
        HttpError::Internal.default()
    };

    if error.is_server_error() {
        error!("Request failed: {error}");
    }

    Ok(error.to_response())
}
