//! Expense Tracker is a web app for recording expenses and summarising spending
//! by category.
//!
//! This library provides server-rendered HTML pages and a small JSON API, both
//! backed by a SQLite database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod category;
mod db;
mod endpoints;
mod expense;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod summary;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, create_user, get_user_by_email};
pub use category::{Category, CategoryId, CategoryName, get_or_create_category};
pub use db::initialize as initialize_db;
pub use expense::{Amount, Expense, ExpenseId, NewExpense, PaymentMethod, create_expense};
pub use logging::logging_middleware;
pub use routing::build_router;
pub use timezone::get_local_offset;

use crate::{
    alert::Alert, expense::ValidationErrors, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more fields of a submitted expense were missing or malformed.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A JSON request body was malformed or had fields of the wrong type.
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The category name is longer than [category::MAX_CATEGORY_NAME_LENGTH] characters.
    #[error("Category name cannot be longer than {0} characters")]
    CategoryNameTooLong(usize),

    /// A category with the same name already exists.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The email or password was missing from a signup request.
    #[error("Email and password required")]
    MissingCredentials,

    /// A user with the email already exists.
    #[error("User already exists")]
    DuplicateEmail,

    /// The email and password did not match a registered user.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The bearer token was missing or does not belong to any user.
    #[error("Invalid token")]
    InvalidToken,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update an expense that does not exist
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An invalid canonical timezone name was configured.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {rejection}");
        Error::InvalidRequestBody(rejection.body_text())
    }
}

impl From<ValidationErrors> for Error {
    fn from(value: ValidationErrors) -> Self {
        Error::Validation(value)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound | Error::UpdateMissingExpense | Error::DeleteMissingExpense => {
                get_404_not_found_response()
            }
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert page with a link back to the expenses list.
    fn into_alert_response(self) -> Response {
        match self {
            Error::DeleteMissingExpense => Alert::Error {
                message: "Could not delete expense".to_owned(),
                details: "The expense could not be found. \
                    Try refreshing the page to see if the expense has already been deleted."
                    .to_owned(),
            }
            .into_page_response(StatusCode::NOT_FOUND),
            Error::UpdateMissingExpense => Alert::Error {
                message: "Could not update expense".to_owned(),
                details: "The expense could not be found.".to_owned(),
            }
            .into_page_response(StatusCode::NOT_FOUND),
            Error::DeleteMissingCategory => Alert::Error {
                message: "Could not delete category".to_owned(),
                details: "The category could not be found. \
                    Try refreshing the page to see if the category has already been deleted."
                    .to_owned(),
            }
            .into_page_response(StatusCode::NOT_FOUND),
            Error::DuplicateCategoryName(name) => Alert::Error {
                message: "Duplicate Category Name".to_owned(),
                details: format!(
                    "The category {name} already exists. Choose a different category name."
                ),
            }
            .into_page_response(StatusCode::BAD_REQUEST),
            Error::Validation(errors) => Alert::Error {
                message: "Invalid expense".to_owned(),
                details: errors.to_string(),
            }
            .into_page_response(StatusCode::BAD_REQUEST),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details: "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                }
                .into_page_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Render the error as a JSON body of the form `{"error": "..."}`.
    fn into_json_response(self) -> Response {
        let (status, body) = match self {
            Error::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid expense", "fields": errors.as_map() }),
            ),
            Error::InvalidRequestBody(_)
            | Error::EmptyCategoryName
            | Error::CategoryNameTooLong(_)
            | Error::DuplicateCategoryName(_)
            | Error::MissingCredentials
            | Error::DuplicateEmail
            | Error::InvalidCredentials => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            Error::InvalidToken => (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() })),
            Error::NotFound
            | Error::UpdateMissingExpense
            | Error::DeleteMissingExpense
            | Error::DeleteMissingCategory => {
                (StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
            }
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An unexpected error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
