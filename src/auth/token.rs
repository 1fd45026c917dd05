//! Opaque API tokens that identify a user.
//!
//! Each user has at most one token. The token is created on sign up or the first log in and is
//! returned unchanged on every later log in.

use rand::RngCore;
use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::{Error, auth::UserID};

/// The number of random bytes in a token key. The key is hex encoded, so it has twice as many
/// characters.
const KEY_BYTES: usize = 20;

/// A token that authenticates API requests for a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    /// The 40 character hex string sent in the `Authorization` header.
    pub key: String,
    /// The user the token belongs to.
    pub user_id: UserID,
    /// When the token was created.
    pub created: OffsetDateTime,
}

pub fn create_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS auth_token (
                key TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE,
                created TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Get the token for `user_id`, creating one if the user does not have a token yet.
///
/// # Errors
///
/// Returns [Error::SqlError] if the token could not be inserted or read back, for example
/// because `user_id` does not refer to an existing user.
pub fn get_or_create_token(user_id: UserID, connection: &Connection) -> Result<AuthToken, Error> {
    if let Some(token) = get_token_for_user(user_id, connection)? {
        return Ok(token);
    }

    let token = AuthToken {
        key: generate_key(),
        user_id,
        created: OffsetDateTime::now_utc(),
    };

    connection.execute(
        "INSERT OR IGNORE INTO auth_token (key, user_id, created) VALUES (?1, ?2, ?3)",
        (&token.key, token.user_id.as_i64(), token.created),
    )?;

    // Another request may have created the token between the select and the insert.
    get_token_for_user(user_id, connection)?.ok_or(Error::NotFound)
}

/// Look up the user that owns the token `key`.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if no token matches `key`.
pub fn get_user_id_for_token(key: &str, connection: &Connection) -> Result<UserID, Error> {
    connection
        .query_row(
            "SELECT user_id FROM auth_token WHERE key = ?1",
            [key],
            |row| row.get(0).map(UserID::new),
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::InvalidToken,
            error => error.into(),
        })
}

fn get_token_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<AuthToken>, rusqlite::Error> {
    connection
        .query_row(
            "SELECT key, user_id, created FROM auth_token WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| {
                Ok(AuthToken {
                    key: row.get(0)?,
                    user_id: UserID::new(row.get(1)?),
                    created: row.get(2)?,
                })
            },
        )
        .optional()
}

/// Generate a random 40 character lowercase hex string.
fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    hex::encode(bytes)
}
