use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::{
    error::{Error, HttpError},
    schema::User,
    state::AppState,
};

pub fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Resolves the `Authorization: Token <token>` (or `Bearer`) header to an
/// active user, rejecting with 401 otherwise.
pub fn with_auth(
    state: Arc<AppState>,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: Arc<AppState>| async move {
            authenticate(header.as_deref(), &state)
                .await
                .map_err(Rejection::from)
        })
}

pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() || token.contains(' ') {
        return None;
    }

    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

pub async fn authenticate(header: Option<&str>, state: &AppState) -> Result<User, Error> {
    let header = match header {
        Some(header) if !header.trim().is_empty() => header,
        _ => return Err(HttpError::Unauthorized.default()),
    };

    let token = parse_authorization(header)
        .ok_or_else(|| HttpError::InvalidSession.new("Invalid token header."))?;
    let claims = state.keys.verify(token)?;

    match state.store.get_user(claims.user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(HttpError::InvalidSession.new("User inactive or deleted.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_and_bearer_schemes_are_accepted() {
        assert_eq!(parse_authorization("Token abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Bearer abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("bearer  abc"), Some("abc"));
    }

    #[test]
    fn malformed_headers_are_refused() {
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_authorization("Token"), None);
        assert_eq!(parse_authorization("Token a b"), None);
    }
}
