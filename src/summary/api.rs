//! JSON endpoint for the caller's spending summary.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, auth::UserID, expense::DateRangeQuery, summary::get_summary};

/// The state needed for the summary API.
#[derive(Debug, Clone)]
pub struct SummaryApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SummaryApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Summarize the caller's expenses as `{"per_category": {"Food": "10.00"}, "overall": "10.00"}`.
pub async fn get_summary_api(
    State(state): State<SummaryApiState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DateRangeQuery>,
) -> Response {
    let date_range = match query.date_range() {
        Ok(date_range) => date_range,
        Err(errors) => return Error::from(errors).into_json_response(),
    };

    let summary = match state.db_connection.lock() {
        Ok(connection) => get_summary(date_range, Some(user_id), &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match summary {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error.into_json_response(),
    }
}

#[cfg(test)]
mod summary_api_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::date;

    use crate::{
        auth::{PasswordHash, UserID, create_user},
        category::{CategoryName, create_category},
        db::initialize,
        expense::{Amount, DateRangeQuery, NewExpense, PaymentMethod, create_expense},
        test_utils::parse_json_body,
    };

    use super::{SummaryApiState, get_summary_api};

    fn get_test_state() -> (SummaryApiState, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let alice = create_user(
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();
        let bob = create_user(
            "bob@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();
        let food = create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
        let travel = create_category(CategoryName::new_unchecked("Travel"), &connection).unwrap();

        for (owner, date, category_id, cents) in [
            (alice.id, date!(2023 - 01 - 01), food.id, 1000),
            (alice.id, date!(2023 - 02 - 01), travel.id, 2000),
            (bob.id, date!(2023 - 02 - 02), travel.id, 9900),
        ] {
            create_expense(
                NewExpense {
                    owner: Some(owner),
                    date,
                    category_id,
                    description: "Something".to_owned(),
                    amount: Amount::from_cents(cents),
                    payment_method: PaymentMethod::Card,
                    receipt_link: None,
                },
                &connection,
            )
            .unwrap();
        }

        (
            SummaryApiState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            alice.id,
        )
    }

    #[tokio::test]
    async fn summarizes_callers_expenses() {
        let (state, alice) = get_test_state();

        let response = get_summary_api(
            State(state),
            Extension(alice),
            Query(DateRangeQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = parse_json_body(response).await;
        assert_eq!(
            body,
            json!({
                "per_category": {"Food": "10.00", "Travel": "20.00"},
                "overall": "30.00",
            })
        );
    }

    #[tokio::test]
    async fn summarizes_date_range() {
        let (state, alice) = get_test_state();

        let response = get_summary_api(
            State(state),
            Extension(alice),
            Query(DateRangeQuery {
                start_date: Some("2023-01-15".to_owned()),
                end_date: Some("2023-12-31".to_owned()),
            }),
        )
        .await;

        let body: Value = parse_json_body(response).await;
        assert_eq!(body["overall"], json!("20.00"));
        assert_eq!(body["per_category"], json!({"Travel": "20.00"}));
    }

    #[tokio::test]
    async fn rejects_malformed_dates() {
        let (state, alice) = get_test_state();

        let response = get_summary_api(
            State(state),
            Extension(alice),
            Query(DateRangeQuery {
                start_date: None,
                end_date: Some("31/12/2023".to_owned()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = parse_json_body(response).await;
        assert_eq!(body["fields"]["end_date"], json!("Enter a valid date."));
    }
}
