use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use thiserror::Error;
use warp::{http::StatusCode, reject::Reject, reply::Response, Reply};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kinds the API can answer with. `new` attaches a message, `default`
/// uses the stock one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    InvalidRequest,
    Unauthorized,
    InvalidSession,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    UnsupportedMediaType,
    Internal,
}

impl HttpError {
    pub fn code(self) -> StatusCode {
        match self {
            HttpError::InvalidRequest => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized | HttpError::InvalidSession => StatusCode::UNAUTHORIZED,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            HttpError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> &'static str {
        match self {
            HttpError::InvalidRequest => "Invalid request.",
            HttpError::Unauthorized => "Authentication credentials were not provided.",
            HttpError::InvalidSession => "Invalid token.",
            HttpError::NotFound => "Not found.",
            HttpError::MethodNotAllowed => "Method not allowed.",
            HttpError::PayloadTooLarge => "Request body is too large.",
            HttpError::UnsupportedMediaType => "Unsupported media type in request.",
            HttpError::Internal => "Internal server error.",
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            body: ErrorBody::Detail {
                detail: info.to_string(),
            },
        }
    }

    pub fn default(self) -> Error {
        self.new(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Detail { detail: String },
    Fields(BTreeMap<String, Vec<String>>),
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBody::Detail { detail } => write!(f, "{detail}"),
            ErrorBody::Fields(fields) => {
                let joined = fields
                    .iter()
                    .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
                    .collect::<Vec<String>>()
                    .join("; ");
                write!(f, "{joined}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {body}")]
pub struct Error {
    pub code: StatusCode,
    pub body: ErrorBody,
}

impl Error {
    pub fn fields(fields: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            body: ErrorBody::Fields(fields),
        }
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        Self::fields(fields)
    }

    pub fn is_server_error(&self) -> bool {
        self.code.is_server_error()
    }

    pub fn to_response(&self) -> Response {
        let mut response =
            warp::reply::with_status(warp::reply::json(&self.body), self.code).into_response();

        if self.code == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                warp::http::header::WWW_AUTHENTICATE,
                warp::http::HeaderValue::from_static("Token"),
            );
        }

        response
    }
}

impl Reject for Error {}

impl From<crate::authentication::cryptography::PasswordError> for Error {
    fn from(value: crate::authentication::cryptography::PasswordError) -> Self {
        log::error!("Password hashing failed: {value}");
        HttpError::Internal.default()
    }
}
