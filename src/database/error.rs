use std::convert::Infallible;
use std::fmt::{self, Display};

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use warp::{http::StatusCode, reject::Rejection, Reply};

/// Storage-layer failure. Everything sqlx can report collapses into an
/// opaque message; callers translate expected conditions (missing rows,
/// lost uniqueness races) before this type is ever produced.
#[derive(Debug, Clone)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::AnyDriverError(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

/// Malformed value inside an otherwise well-formed payload.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for ApiError {
    fn from(value: TypeError) -> Self {
        ApiError::InvalidRequest(value.info)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulated field-scoped validation failures. Empty means valid.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Ok when no failure was recorded, the full set otherwise.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    /// `{"field": ["message", ..]}` response body.
    pub fn field_map(&self) -> Value {
        let mut map = Map::new();
        for error in &self.errors {
            map.entry(error.field.clone())
                .or_insert_with(|| Value::Array(vec![]))
                .as_array_mut()
                .map(|messages| messages.push(Value::String(error.message.clone())));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Session(String),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    pub fn invalid(info: &str) -> Self {
        Self::InvalidRequest(info.to_string())
    }

    pub fn conflict(info: &str) -> Self {
        Self::Conflict(info.to_string())
    }

    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(String::from(
            "You don't have permission to perform this action",
        ))
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        Self::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) | Self::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Session(_) => StatusCode::UNAUTHORIZED,
            Self::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => errors.field_map(),
            Self::InvalidRequest(info) | Self::Conflict(info) => json!({ "errors": info }),
            Self::NotFound(info) | Self::Forbidden(info) | Self::Session(info) => {
                json!({ "detail": info })
            }
            Self::Query(_) => json!({ "detail": "Internal server error." }),
        }
    }

    pub fn reject(self) -> Rejection {
        warp::reject::custom(self)
    }
}

impl warp::reject::Reject for ApiError {}

/// Terminal rejection handler: every error the SDK produces becomes a
/// JSON reply here, nothing propagates as a raw 500 page.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, body) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "detail": "Not found." }))
    } else if let Some(e) = err.find::<ApiError>() {
        if let ApiError::Query(query) = e {
            log::error!("storage fault: {query}");
        }
        (e.status_code(), e.body())
    } else if err.find::<warp::reject::MissingCookie>().is_some() {
        (
            StatusCode::UNAUTHORIZED,
            json!({ "detail": "Authentication credentials were not provided." }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": "Internal server error." }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_validation_set_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn validation_errors_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.push("ingredients", "This list may not be empty");
        errors.push("ingredients", "Amounts must be positive");
        errors.push("name", "This field may not be blank");

        let map = errors.field_map();
        assert_eq!(map["ingredients"].as_array().unwrap().len(), 2);
        assert_eq!(map["name"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::field("name", "blank").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::conflict("duplicate").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("missing").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::forbidden().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Session(String::from("expired")).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Query(QueryError::new(String::from("down"))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_body_uses_errors_key() {
        let body = ApiError::conflict("Recipe is already in favorites").body();
        assert_eq!(body["errors"], "Recipe is already in favorites");
    }
}
