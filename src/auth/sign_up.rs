//! The JSON endpoint for creating an account and receiving an API token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{
        PasswordHash, User, UserID, create_user,
        token::{AuthToken, get_or_create_token},
    },
};

/// The state needed to create a user.
#[derive(Debug, Clone)]
pub struct SignUpState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for SignUpState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_hash_cost: state.password_hash_cost,
        }
    }
}

/// The email and password sent to the sign up and log in endpoints.
///
/// Both fields are optional so that a missing field can be reported with the
/// same error body as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// The body returned by a successful sign up or log in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// The public view of a user. The email doubles as the display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserID,
    pub email: String,
    pub name: String,
}

impl AuthResponse {
    pub fn new(token: AuthToken, user: User) -> Self {
        Self {
            token: token.key,
            user: UserResponse {
                id: user.id,
                name: user.email.clone(),
                email: user.email,
            },
        }
    }
}

/// Handler for sign up requests.
///
/// Responds with `201 Created` and the new user's token, or `400 Bad Request` if the email or
/// password is missing or the email is already registered.
pub async fn sign_up(
    State(state): State<SignUpState>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> Response {
    let Ok(Json(credentials)) = credentials.inspect_err(|rejection| {
        tracing::debug!("Rejected sign up body: {rejection}");
    }) else {
        return Error::MissingCredentials.into_json_response();
    };

    let (email, password) = match (credentials.email, credentials.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Error::MissingCredentials.into_json_response(),
    };

    // Hashing is slow, so do it before taking the database lock.
    let password_hash = match PasswordHash::new(&password, state.password_hash_cost) {
        Ok(password_hash) => password_hash,
        Err(error) => return error.into_json_response(),
    };

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match create_user_with_token(&email, password_hash, &mut connection) {
        Ok((user, token)) => {
            tracing::info!("Created user {}", user.id);
            (StatusCode::CREATED, Json(AuthResponse::new(token, user))).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// Create the user and their token together so that a failed sign up issues no token.
fn create_user_with_token(
    email: &str,
    password_hash: PasswordHash,
    connection: &mut Connection,
) -> Result<(User, AuthToken), Error> {
    let transaction = connection.transaction()?;
    let user = create_user(email, password_hash, &transaction)?;
    let token = get_or_create_token(user.id, &transaction)?;
    transaction.commit()?;

    Ok((user, token))
}
