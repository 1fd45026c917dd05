//! JSON endpoint for listing categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, category::get_all_categories};

/// The state needed for the categories API.
#[derive(Debug, Clone)]
pub struct CategoriesApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List all categories as `[{"id": 1, "name": "Food"}, ...]`, ordered by name.
pub async fn list_categories_api(State(state): State<CategoriesApiState>) -> Response {
    let categories = match state.db_connection.lock() {
        Ok(connection) => get_all_categories(&connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match categories {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => error.into_json_response(),
    }
}
