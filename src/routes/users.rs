use std::sync::Arc;

use log::{info, warn};
use warp::{http::StatusCode, reject::Rejection, reply::Response, Filter};

use super::{json_body, json_reply, Route};
use crate::{
    actions::users::duplicate_email,
    authentication::{
        cryptography::{hash_password, verify_password},
        middleware::{with_auth, with_state},
    },
    error::Error,
    form::{Credentials, FormData, UserInput},
    schema::{NewUser, User, UserChanges},
    serializers::{TokenView, UserView},
    state::AppState,
};

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

pub fn routes(state: Arc<AppState>) -> Route {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_user);

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_token);

    let me = warp::path!("api" / "user" / "me");

    let retrieve = me
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and_then(|user: User| async move {
            Ok::<Response, Rejection>(json_reply(&UserView::from(&user), StatusCode::OK))
        });

    let update = me
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(|user: User, data: FormData, state: Arc<AppState>| {
            update_me(user, data, state, false)
        });

    let partial_update = me
        .and(warp::patch())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state))
        .and_then(|user: User, data: FormData, state: Arc<AppState>| {
            update_me(user, data, state, true)
        });

    create
        .or(token)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(partial_update)
        .unify()
        .boxed()
}

async fn create_user(data: FormData, state: Arc<AppState>) -> Result<Response, Rejection> {
    let input = UserInput::parse(data, false)?;
    let (Some(email), Some(password), Some(name)) = (input.email, input.password, input.name)
    else {
        return Err(Error::field("email", "This field is required.").into());
    };

    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(duplicate_email().into());
    }

    let user = state
        .store
        .create_user(NewUser {
            email,
            name,
            password: hash_password(&password).map_err(Error::from)?,
            is_staff: false,
            is_superuser: false,
        })
        .await?;

    info!("Registered user {}", user.id);
    Ok(json_reply(&UserView::from(&user), StatusCode::CREATED))
}

async fn create_token(data: FormData, state: Arc<AppState>) -> Result<Response, Rejection> {
    let credentials = Credentials::parse(data)?;

    let user = match state.store.get_user_by_email(&credentials.email).await? {
        Some(user) if user.is_active => user,
        _ => return Err(Error::field("non_field_errors", BAD_CREDENTIALS).into()),
    };

    let valid = verify_password(&credentials.password, &user.password).unwrap_or_else(|e| {
        warn!("Stored password hash for user {} is unreadable: {e}", user.id);
        false
    });
    if !valid {
        return Err(Error::field("non_field_errors", BAD_CREDENTIALS).into());
    }

    state.store.touch_last_login(user.id).await?;
    let token = state.keys.sign(&user)?;

    Ok(json_reply(&TokenView { token }, StatusCode::OK))
}

async fn update_me(
    user: User,
    data: FormData,
    state: Arc<AppState>,
    partial: bool,
) -> Result<Response, Rejection> {
    let input = UserInput::parse(data, partial)?;

    if let Some(email) = &input.email {
        if let Some(other) = state.store.get_user_by_email(email).await? {
            if other.id != user.id {
                return Err(duplicate_email().into());
            }
        }
    }

    let password = match input.password {
        Some(password) => Some(hash_password(&password).map_err(Error::from)?),
        None => None,
    };

    let user = state
        .store
        .update_user(
            user.id,
            UserChanges {
                email: input.email,
                name: input.name,
                password,
            },
        )
        .await?;

    Ok(json_reply(&UserView::from(&user), StatusCode::OK))
}
