use std::sync::Arc;

use bytes::BufMut;
use futures_util::TryStreamExt;
use log::{debug, info};
use warp::{
    http::StatusCode,
    multipart::FormData as Multipart,
    reject::Rejection,
    reply::Response,
    Filter,
};

use super::{json_body, json_reply, no_content, Route};
use crate::{
    authentication::{
        middleware::{with_auth, with_state},
        permissions::ensure_owner,
    },
    constants::IMAGE_UPLOAD_LIMIT,
    error::{Error, HttpError},
    filters::{QueryParams, RecipeFilter},
    form::FormData,
    schema::{Id, NewRecipe, RecipeChanges, User},
    serializers::{RecipeDetail, RecipeImage, RecipeSummary},
    state::AppState,
};

const MALFORMED_UPLOAD: &str =
    "The submitted data was not a file. Check the encoding type on the form.";

pub fn routes(state: Arc<AppState>) -> Route {
    let list = warp::path!("api" / "recipe" / "recipes")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<QueryParams>())
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("api" / "recipe" / "recipes")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let detail = warp::path!("api" / "recipe" / "recipes" / Id);

    let retrieve = detail
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_recipe);

    let update = detail
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(|id: Id, user: User, data: FormData, state: Arc<AppState>| {
            update_recipe(id, user, data, state, false)
        });

    let partial_update = detail
        .and(warp::patch())
        .and(with_auth(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(|id: Id, user: User, data: FormData, state: Arc<AppState>| {
            update_recipe(id, user, data, state, true)
        });

    let delete = detail
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    let upload = warp::path!("api" / "recipe" / "recipes" / Id / "upload-image")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(warp::multipart::form().max_length(IMAGE_UPLOAD_LIMIT))
        .and(with_state(state))
        .and_then(upload_image);

    list.or(create)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(partial_update)
        .unify()
        .or(delete)
        .unify()
        .or(upload)
        .unify()
        .boxed()
}

async fn list_recipes(
    user: User,
    params: QueryParams,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_query(&params)?;
    let recipes = state.store.list_recipes(user.id, &filter).await?;

    let body: Vec<RecipeSummary> = recipes.iter().map(RecipeSummary::from).collect();
    Ok(json_reply(&body, StatusCode::OK))
}

async fn create_recipe(
    user: User,
    data: FormData,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let recipe = NewRecipe::parse(data)?;
    let recipe = state.store.create_recipe(user.id, recipe).await?;

    info!("User {} created recipe {}", user.id, recipe.id);
    Ok(json_reply(
        &RecipeDetail::new(&recipe, &state.media),
        StatusCode::CREATED,
    ))
}

async fn retrieve_recipe(id: Id, user: User, state: Arc<AppState>) -> Result<Response, Rejection> {
    let recipe = ensure_owner(&user, state.store.get_recipe(user.id, id).await?)?;

    Ok(json_reply(
        &RecipeDetail::new(&recipe, &state.media),
        StatusCode::OK,
    ))
}

async fn update_recipe(
    id: Id,
    user: User,
    data: FormData,
    state: Arc<AppState>,
    partial: bool,
) -> Result<Response, Rejection> {
    let changes = RecipeChanges::parse(data, partial)?;
    let recipe = ensure_owner(&user, state.store.update_recipe(user.id, id, changes).await?)?;

    Ok(json_reply(
        &RecipeDetail::new(&recipe, &state.media),
        StatusCode::OK,
    ))
}

async fn delete_recipe(id: Id, user: User, state: Arc<AppState>) -> Result<Response, Rejection> {
    let recipe = ensure_owner(&user, state.store.delete_recipe(user.id, id).await?)?;

    if let Some(image) = &recipe.image {
        state.media.remove(image).await;
    }

    info!("User {} deleted recipe {}", user.id, recipe.id);
    Ok(no_content())
}

async fn upload_image(
    id: Id,
    user: User,
    form: Multipart,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    ensure_owner(&user, state.store.get_recipe(user.id, id).await?)?;

    let data = read_image(form)
        .await?
        .ok_or_else(|| Error::field("image", "No file was submitted."))?;
    let path = state.media.save_recipe_image(&data).await?;

    let previous = match state.store.set_recipe_image(user.id, id, Some(&path)).await {
        Ok(Some(previous)) => previous,
        Ok(None) => {
            state.media.remove(&path).await;
            return Err(HttpError::NotFound.default().into());
        }
        Err(e) => {
            state.media.remove(&path).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        state.media.remove(&previous).await;
    }

    Ok(json_reply(
        &RecipeImage {
            id,
            image: Some(state.media.url(&path)),
        },
        StatusCode::OK,
    ))
}

/// Pulls the `image` part out of the form, ignoring any other parts.
async fn read_image(mut form: Multipart) -> Result<Option<Vec<u8>>, Error> {
    let malformed = |e: warp::Error| {
        debug!("Malformed multipart body: {e}");
        Error::field("image", MALFORMED_UPLOAD)
    };

    while let Some(part) = form.try_next().await.map_err(malformed)? {
        if part.name() != "image" {
            continue;
        }

        let data = part
            .stream()
            .try_fold(Vec::new(), |mut buffer, chunk| async move {
                buffer.put(chunk);
                Ok(buffer)
            })
            .await
            .map_err(malformed)?;

        if data.is_empty() {
            return Err(Error::field("image", "The submitted file is empty."));
        }
        return Ok(Some(data));
    }

    Ok(None)
}
