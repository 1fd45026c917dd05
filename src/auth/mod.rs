//! User accounts and the bearer tokens that authenticate the JSON API.

mod log_in;
mod middleware;
mod password;
mod sign_up;
mod token;
mod user;

pub use log_in::log_in;
pub use middleware::require_token;
pub use password::PasswordHash;
pub use sign_up::sign_up;
pub use token::create_token_table;
pub use user::{User, UserID, create_user, create_user_table, get_user_by_email};
