//! The JSON endpoint for exchanging an email and password for an API token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{
        get_user_by_email,
        sign_up::{AuthResponse, Credentials},
        token::get_or_create_token,
    },
};

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handler for log-in requests.
///
/// On success the user's existing token is returned, or a new one if the user has never logged
/// in. Logging in repeatedly returns the same token.
///
/// # Errors
///
/// Responds with `400 Bad Request` and "Invalid credentials" if the email is unknown, the
/// password is wrong, or either is missing.
pub async fn log_in(
    State(state): State<LoginState>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> Response {
    let Ok(Json(credentials)) = credentials.inspect_err(|rejection| {
        tracing::debug!("Rejected log in body: {rejection}");
    }) else {
        return Error::InvalidCredentials.into_json_response();
    };

    let (Some(email), Some(password)) = (credentials.email, credentials.password) else {
        return Error::InvalidCredentials.into_json_response();
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_json_response();
            }
        };

        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Error::InvalidCredentials.into_json_response(),
            Err(error) => return error.into_json_response(),
        }
    };

    match user.password_hash.verify(&password) {
        Ok(true) => {}
        Ok(false) => return Error::InvalidCredentials.into_json_response(),
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return Error::HashingError(error.to_string()).into_json_response();
        }
    }

    let token = match state.db_connection.lock() {
        Ok(connection) => get_or_create_token(user.id, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match token {
        Ok(token) => Json(AuthResponse::new(token, user)).into_response(),
        Err(error) => error.into_json_response(),
    }
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        auth::{PasswordHash, create_user, sign_up::AuthResponse},
        db::initialize,
        test_utils::{parse_json_body, response_error_message},
    };

    use super::{Credentials, LoginState, log_in};

    fn get_test_state() -> LoginState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_user(
            "foo@bar.baz",
            PasswordHash::new("hunter2", 4).unwrap(),
            &connection,
        )
        .unwrap();

        LoginState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
        }
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state();

        let response = log_in(State(state), Ok(Json(credentials("foo@bar.baz", "hunter2")))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: AuthResponse = parse_json_body(response).await;
        assert_eq!(body.user.email, "foo@bar.baz");
        assert_eq!(body.token.len(), 40);
    }

    #[tokio::test]
    async fn log_in_twice_returns_same_token() {
        let state = get_test_state();

        let first: AuthResponse = parse_json_body(
            log_in(
                State(state.clone()),
                Ok(Json(credentials("foo@bar.baz", "hunter2"))),
            )
            .await,
        )
        .await;
        let second: AuthResponse = parse_json_body(
            log_in(State(state), Ok(Json(credentials("foo@bar.baz", "hunter2")))).await,
        )
        .await;

        assert_eq!(first.token, second.token);
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_test_state();

        let response = log_in(State(state), Ok(Json(credentials("foo@bar.baz", "wrong")))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_error_message(response).await, "Invalid credentials");
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let state = get_test_state();

        let response = log_in(State(state), Ok(Json(credentials("bar@baz.qux", "hunter2")))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_error_message(response).await, "Invalid credentials");
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_fields() {
        let state = get_test_state();

        let response = log_in(State(state), Ok(Json(Credentials::default()))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
