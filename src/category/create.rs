//! Category creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{
        CategoryName, create_category,
        domain::CategoryFormData,
        list::{categories_view, get_categories_with_counts},
    },
    endpoints,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category creation form submission.
///
/// Redirects back to the categories page on success. An invalid or duplicate name re-renders
/// the page with the error and status `400 Bad Request`.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryEndpointState>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = CategoryName::new(&form.name).and_then(|name| create_category(name, &connection));

    match result {
        Ok(category) => {
            tracing::info!("Created category {}", category.name);
            Redirect::to(endpoints::CATEGORIES_VIEW).into_response()
        }
        Err(
            error @ (Error::EmptyCategoryName
            | Error::CategoryNameTooLong(_)
            | Error::DuplicateCategoryName(_)),
        ) => match get_categories_with_counts(&connection) {
            Ok(categories) => (
                StatusCode::BAD_REQUEST,
                categories_view(&categories, &form.name, &format!("Error: {error}")),
            )
                .into_response(),
            Err(error) => error.into_alert_response(),
        },
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            error.into_alert_response()
        }
    }
}
