//! Authentication middleware that resolves a bearer token to a user.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use rusqlite::Connection;

use crate::{AppState, Error, auth::token::get_user_id_for_token};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that checks for a valid `Authorization: Bearer <token>` header.
///
/// The user ID is placed into the request extensions and the request is executed normally if the
/// token is valid, otherwise a `401 Unauthorized` JSON error is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>`
/// to receive the user ID.
pub async fn require_token(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>()
    else {
        return Error::InvalidToken.into_json_response();
    };

    let user_id = match state.db_connection.lock() {
        Ok(connection) => get_user_id_for_token(bearer.token(), &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match user_id {
        Ok(user_id) => {
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        Err(error) => error.into_json_response(),
    }
}
