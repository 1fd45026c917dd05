//! JSON endpoints for managing the caller's expenses.
//!
//! Every route expects the [UserID] placed in the request extensions by the token middleware,
//! and only ever sees or changes expenses owned by that user.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{CategoryId, CategoryName, get_or_create_category},
    expense::{
        DateRangeQuery, Expense, ExpenseFilter, ExpenseForm, ExpenseId, ValidationErrors,
        bulk_delete_expenses, create_expense, delete_expense, list_expenses, update_expense,
    },
};

/// The state needed for the expenses API.
#[derive(Debug, Clone)]
pub struct ExpensesApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpensesApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a create or update request.
///
/// The category is given by name and created if it does not exist yet. The amount may be a
/// JSON string or number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseRequest {
    pub date: String,
    pub category: String,
    pub description: String,
    pub amount: Value,
    pub payment_method: String,
    pub receipt_link: Option<String>,
}

impl From<ExpenseRequest> for ExpenseForm {
    fn from(request: ExpenseRequest) -> Self {
        let amount = match request.amount {
            Value::String(amount) => amount,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        Self {
            date: request.date,
            category: request.category,
            description: request.description,
            amount,
            payment_method: request.payment_method,
            receipt_link: request.receipt_link.unwrap_or_default(),
        }
    }
}

/// The query parameters for listing expenses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpensesApiQuery {
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ExpensesApiQuery {
    fn into_filter(self, owner: UserID) -> Result<ExpenseFilter, Error> {
        let date_range = DateRangeQuery {
            start_date: self.start_date,
            end_date: self.end_date,
        }
        .date_range()?;

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw_id) => Some(raw_id.parse::<CategoryId>().map_err(|_| {
                ValidationErrors::from_field("category", "Select a valid category.")
            })?),
        };

        Ok(ExpenseFilter {
            owner: Some(owner),
            category,
            date_range,
        })
    }
}

/// The body of a bulk delete request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<ExpenseId>,
}

/// The response to a bulk delete request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
}

/// List the caller's expenses, newest first.
pub async fn list_expenses_api(
    State(state): State<ExpensesApiState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ExpensesApiQuery>,
) -> Response {
    let filter = match query.into_filter(user_id) {
        Ok(filter) => filter,
        Err(error) => return error.into_json_response(),
    };

    let expenses = match state.db_connection.lock() {
        Ok(connection) => list_expenses(filter, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match expenses {
        Ok(expenses) => Json(expenses).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Create an expense owned by the caller and respond with `201 Created`.
pub async fn create_expense_api(
    State(state): State<ExpensesApiState>,
    Extension(user_id): Extension<UserID>,
    request: Result<Json<ExpenseRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => return Error::from(rejection).into_json_response(),
    };

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    let result = save_expense(request.into(), None, user_id, &mut connection);

    match result {
        Ok(expense) => {
            tracing::info!("User {user_id} created expense {}", expense.id);
            (StatusCode::CREATED, Json(expense)).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// Replace every field of one of the caller's expenses.
pub async fn update_expense_api(
    State(state): State<ExpensesApiState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<ExpenseId>,
    request: Result<Json<ExpenseRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => return Error::from(rejection).into_json_response(),
    };

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match save_expense(request.into(), Some(expense_id), user_id, &mut connection) {
        Ok(expense) => Json(expense).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Validate `form`, resolving its category by name, then create the expense or update the
/// expense `expense_id`.
///
/// A category created for a request that then fails is rolled back.
fn save_expense(
    form: ExpenseForm,
    expense_id: Option<ExpenseId>,
    owner: UserID,
    connection: &mut Connection,
) -> Result<Expense, Error> {
    let transaction = connection.transaction()?;

    let category_id = match CategoryName::new(&form.category) {
        Ok(name) => Ok(get_or_create_category(name, &transaction)?.id),
        Err(error) => Err(error.to_string()),
    };
    let new_expense = form.validate_with_category(Some(owner), category_id)?;

    let expense = match expense_id {
        Some(expense_id) => update_expense(expense_id, new_expense, Some(owner), &transaction)?,
        None => create_expense(new_expense, &transaction)?,
    };

    transaction.commit()?;

    Ok(expense)
}

/// Delete one of the caller's expenses and respond with `204 No Content`.
pub async fn delete_expense_api(
    State(state): State<ExpensesApiState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<ExpenseId>,
) -> Response {
    let result = match state.db_connection.lock() {
        Ok(connection) => delete_expense(expense_id, Some(user_id), &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Delete the caller's expenses listed in `ids` and respond with how many were deleted.
pub async fn bulk_delete_expenses_api(
    State(state): State<ExpensesApiState>,
    Extension(user_id): Extension<UserID>,
    request: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => return Error::from(rejection).into_json_response(),
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => bulk_delete_expenses(&request.ids, Some(user_id), &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(deleted) => Json(BulkDeleteResponse { deleted }).into_response(),
        Err(error) => error.into_json_response(),
    }
}

#[cfg(test)]
mod expenses_api_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Path, Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::date;

    use crate::{
        auth::{PasswordHash, UserID, create_user},
        category::{CategoryName, get_all_categories, get_category_by_name},
        db::initialize,
        expense::{Amount, Expense, PaymentMethod, get_expense},
        test_utils::{parse_json_body, response_error_message},
    };

    use super::{
        BulkDeleteRequest, BulkDeleteResponse, ExpenseRequest, ExpensesApiQuery,
        ExpensesApiState, bulk_delete_expenses_api, create_expense_api, delete_expense_api,
        list_expenses_api, update_expense_api,
    };

    fn get_test_state() -> (ExpensesApiState, UserID, UserID) {
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

        (
            ExpensesApiState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            alice.id,
            bob.id,
        )
    }

    fn request(date: &str, category: &str, amount: Value) -> ExpenseRequest {
        ExpenseRequest {
            date: date.to_owned(),
            category: category.to_owned(),
            description: "Something".to_owned(),
            amount,
            payment_method: "Card".to_owned(),
            receipt_link: None,
        }
    }

    async fn create(state: &ExpensesApiState, user_id: UserID, body: ExpenseRequest) -> Expense {
        let response =
            create_expense_api(State(state.clone()), Extension(user_id), Ok(Json(body))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        parse_json_body(response).await
    }

    async fn list(state: &ExpensesApiState, user_id: UserID, query: ExpensesApiQuery) -> Vec<Expense> {
        let response =
            list_expenses_api(State(state.clone()), Extension(user_id), Query(query)).await;
        assert_eq!(response.status(), StatusCode::OK);
        parse_json_body(response).await
    }

    #[tokio::test]
    async fn create_makes_category_on_first_use() {
        let (state, alice, _) = get_test_state();

        let expense = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;

        assert_eq!(expense.owner, Some(alice));
        assert_eq!(expense.category.name.to_string(), "Food");
        assert_eq!(expense.amount, Amount::from_cents(1000));
        assert_eq!(expense.payment_method, PaymentMethod::Card);
        assert_eq!(
            expense,
            get_expense(expense.id, None, &state.db_connection.lock().unwrap()).unwrap()
        );
    }

    #[tokio::test]
    async fn create_reuses_existing_category() {
        let (state, alice, _) = get_test_state();

        let first = create(&state, alice, request("2023-01-01", "Food", json!("1"))).await;
        let second = create(&state, alice, request("2023-01-02", " Food ", json!(2.5))).await;

        assert_eq!(first.category, second.category);
        assert_eq!(second.amount, Amount::from_cents(250));
        assert_eq!(
            get_all_categories(&state.db_connection.lock().unwrap())
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn amount_is_serialized_as_string() {
        let (state, alice, _) = get_test_state();

        let response = create_expense_api(
            State(state),
            Extension(alice),
            Ok(Json(request("2023-01-01", "Food", json!(10)))),
        )
        .await;

        let body: Value = parse_json_body(response).await;
        assert_eq!(body["amount"], json!("10.00"));
        assert_eq!(body["date"], json!("2023-01-01"));
        assert_eq!(body["category"]["name"], json!("Food"));
    }

    #[tokio::test]
    async fn invalid_create_reports_fields_and_rolls_back_category() {
        let (state, alice, _) = get_test_state();

        let response = create_expense_api(
            State(state.clone()),
            Extension(alice),
            Ok(Json(request("2023-01-01", "Food", json!("10.005")))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = parse_json_body(response).await;
        assert_eq!(
            body["fields"]["amount"],
            json!("Ensure that there are no more than 2 decimal places.")
        );
        assert!(
            get_category_by_name(
                &CategoryName::new_unchecked("Food"),
                &state.db_connection.lock().unwrap()
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn empty_category_is_a_field_error() {
        let (state, alice, _) = get_test_state();

        let response = create_expense_api(
            State(state),
            Extension(alice),
            Ok(Json(request("2023-01-01", "  ", json!("10")))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = parse_json_body(response).await;
        assert_eq!(body["fields"]["category"], json!("Category name cannot be empty"));
    }

    #[tokio::test]
    async fn list_only_shows_callers_expenses() {
        let (state, alice, bob) = get_test_state();
        let alices = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;
        create(&state, bob, request("2023-01-02", "Food", json!("20"))).await;

        let expenses = list(&state, alice, ExpensesApiQuery::default()).await;

        assert_eq!(expenses, vec![alices]);
    }

    #[tokio::test]
    async fn list_filters_by_date_and_category() {
        let (state, alice, _) = get_test_state();
        create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;
        let travel = create(&state, alice, request("2023-02-01", "Travel", json!("20"))).await;
        create(&state, alice, request("2023-03-01", "Food", json!("30"))).await;

        let in_range = list(
            &state,
            alice,
            ExpensesApiQuery {
                category: None,
                start_date: Some("2023-01-15".to_owned()),
                end_date: Some("2023-02-28".to_owned()),
            },
        )
        .await;
        let by_category = list(
            &state,
            alice,
            ExpensesApiQuery {
                category: Some(travel.category.id.to_string()),
                start_date: None,
                end_date: Some("".to_owned()),
            },
        )
        .await;

        assert_eq!(in_range, vec![travel.clone()]);
        assert_eq!(by_category, vec![travel]);
    }

    #[tokio::test]
    async fn list_rejects_bad_dates() {
        let (state, alice, _) = get_test_state();

        let response = list_expenses_api(
            State(state),
            Extension(alice),
            Query(ExpensesApiQuery {
                category: None,
                start_date: Some("01/01/2023".to_owned()),
                end_date: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let (state, alice, _) = get_test_state();
        let expense = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;
        let body = ExpenseRequest {
            description: "Train".to_owned(),
            payment_method: "cash".to_owned(),
            receipt_link: Some("https://example.com/r/1".to_owned()),
            ..request("2023-01-05", "Travel", json!("42.10"))
        };

        let response = update_expense_api(
            State(state.clone()),
            Extension(alice),
            Path(expense.id),
            Ok(Json(body)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let updated: Expense = parse_json_body(response).await;
        assert_eq!(updated.id, expense.id);
        assert_eq!(updated.owner, Some(alice));
        assert_eq!(updated.date, date!(2023 - 01 - 05));
        assert_eq!(updated.category.name.to_string(), "Travel");
        assert_eq!(updated.description, "Train");
        assert_eq!(updated.amount, Amount::from_cents(4210));
        assert_eq!(updated.payment_method, PaymentMethod::Cash);
        assert_eq!(
            updated.receipt_link.map(|url| url.to_string()),
            Some("https://example.com/r/1".to_owned())
        );
    }

    #[tokio::test]
    async fn cannot_update_another_users_expense() {
        let (state, alice, bob) = get_test_state();
        let expense = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;

        let response = update_expense_api(
            State(state.clone()),
            Extension(bob),
            Path(expense.id),
            Ok(Json(request("2023-01-01", "Food", json!("99")))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get_expense(expense.id, None, &state.db_connection.lock().unwrap()).unwrap(),
            expense
        );
    }

    #[tokio::test]
    async fn delete_responds_with_no_content() {
        let (state, alice, _) = get_test_state();
        let expense = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;

        let response =
            delete_expense_api(State(state.clone()), Extension(alice), Path(expense.id)).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(list(&state, alice, ExpensesApiQuery::default()).await.is_empty());
    }

    #[tokio::test]
    async fn deleting_another_users_expense_is_not_found() {
        let (state, alice, bob) = get_test_state();
        let expense = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;

        let response =
            delete_expense_api(State(state.clone()), Extension(bob), Path(expense.id)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response_error_message(response).await, "Not found");
        assert_eq!(list(&state, alice, ExpensesApiQuery::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn bulk_delete_counts_only_callers_expenses() {
        let (state, alice, bob) = get_test_state();
        let first = create(&state, alice, request("2023-01-01", "Food", json!("10"))).await;
        let second = create(&state, alice, request("2023-01-02", "Food", json!("10"))).await;
        let bobs = create(&state, bob, request("2023-01-03", "Food", json!("10"))).await;

        let response = bulk_delete_expenses_api(
            State(state.clone()),
            Extension(alice),
            Ok(Json(BulkDeleteRequest {
                ids: vec![first.id, second.id, bobs.id, 999],
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: BulkDeleteResponse = parse_json_body(response).await;
        assert_eq!(body, BulkDeleteResponse { deleted: 2 });
        assert_eq!(list(&state, bob, ExpensesApiQuery::default()).await, vec![bobs]);
    }
}
