//! Tags and ingredients share one set of handlers, parameterised by
//! [`AttributeKind`]. Both live under `/api/recipe/<kind>/`.

use std::sync::Arc;

use log::info;
use warp::{http::StatusCode, reject::Rejection, reply::Response, Filter};

use super::{json_body, json_reply, no_content, Route};
use crate::{
    authentication::{
        middleware::{with_auth, with_state},
        permissions::ensure_owner,
    },
    constants::NAME_MAX_LENGTH,
    error::HttpError,
    filters::{AttributeFilter, QueryParams},
    form::{Form, FormData, TextRule},
    schema::{AttributeKind, Id, User},
    state::AppState,
};

pub fn routes(kind: AttributeKind, state: Arc<AppState>) -> Route {
    let base = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(kind.segment()));
    let collection = base.and(warp::path::end());
    let detail = base.and(warp::path::param::<Id>()).and(warp::path::end());

    let list = collection
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<QueryParams>())
        .and(with_state(state.clone()))
        .and_then(move |user: User, params: QueryParams, state: Arc<AppState>| {
            list_attributes(kind, user, params, state)
        });

    let create = collection
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(move |user: User, data: FormData, state: Arc<AppState>| {
            create_attribute(kind, user, data, state)
        });

    let update = detail
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(
            move |id: Id, user: User, data: FormData, state: Arc<AppState>| {
                update_attribute(kind, id, user, data, state, false)
            },
        );

    let partial_update = detail
        .and(warp::patch())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(
            move |id: Id, user: User, data: FormData, state: Arc<AppState>| {
                update_attribute(kind, id, user, data, state, true)
            },
        );

    let delete = detail
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(move |id: Id, user: User, state: Arc<AppState>| {
            delete_attribute(kind, id, user, state)
        });

    list.or(create)
        .unify()
        .or(update)
        .unify()
        .or(partial_update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

async fn list_attributes(
    kind: AttributeKind,
    user: User,
    params: QueryParams,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let filter = AttributeFilter::from_query(&params)?;
    let attributes = state.store.list_attributes(kind, user.id, filter).await?;

    Ok(json_reply(&attributes, StatusCode::OK))
}

async fn create_attribute(
    kind: AttributeKind,
    user: User,
    data: FormData,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let name = parse_name(data, false)?.ok_or_else(|| HttpError::InvalidRequest.default())?;
    let attribute = state.store.create_attribute(kind, user.id, &name).await?;

    info!("User {} created {kind:?} {}", user.id, attribute.id);
    Ok(json_reply(&attribute, StatusCode::CREATED))
}

async fn update_attribute(
    kind: AttributeKind,
    id: Id,
    user: User,
    data: FormData,
    state: Arc<AppState>,
    partial: bool,
) -> Result<Response, Rejection> {
    let attribute = match parse_name(data, partial)? {
        Some(name) => state.store.rename_attribute(kind, user.id, id, &name).await?,
        None => state.store.get_attribute(kind, user.id, id).await?,
    };
    let attribute = ensure_owner(&user, attribute)?;

    Ok(json_reply(&attribute, StatusCode::OK))
}

async fn delete_attribute(
    kind: AttributeKind,
    id: Id,
    user: User,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    if !state.store.delete_attribute(kind, user.id, id).await? {
        return Err(HttpError::NotFound.default().into());
    }

    info!("User {} deleted {kind:?} {id}", user.id);
    Ok(no_content())
}

fn parse_name(data: FormData, partial: bool) -> Result<Option<String>, crate::error::Error> {
    let mut form = if partial {
        Form::partial(data)
    } else {
        Form::from_data(data)
    };
    let name = form.get_str("name", TextRule::required(NAME_MAX_LENGTH));
    form.finish()?;

    Ok(name)
}
