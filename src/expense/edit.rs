//! The page and endpoint for changing an existing expense.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::get_all_categories,
    endpoints::{self, format_endpoint},
    expense::{
        ExpenseForm, ExpenseId, ValidationErrors, create::expense_form_view, get_expense,
        update_expense,
    },
};

/// The state needed for the edit expense page and endpoint.
#[derive(Debug, Clone)]
pub struct EditExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the edit page for an expense, filled in with its current values.
pub async fn get_edit_expense_page(
    State(state): State<EditExpenseState>,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let expense = get_expense(expense_id, None, &connection)?;
    let categories = get_all_categories(&connection)?;
    let action = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense_id);

    Ok(expense_form_view(
        "Edit Expense",
        &action,
        endpoints::EXPENSES_VIEW,
        &ExpenseForm::from(&expense),
        &ValidationErrors::default(),
        &categories,
    )
    .into_response())
}

/// Handle edit expense form submissions.
///
/// Redirects to the expense list on success. Invalid fields show the form again with status
/// `400 Bad Request` and a missing expense shows the 404 page.
pub async fn edit_expense_endpoint(
    State(state): State<EditExpenseState>,
    Path(expense_id): Path<ExpenseId>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = form
        .validate(None)
        .map_err(Error::from)
        .and_then(|expense| update_expense(expense_id, expense, None, &connection));

    match result {
        Ok(expense) => {
            tracing::info!("Updated expense {}", expense.id);
            Redirect::to(endpoints::EXPENSES_VIEW).into_response()
        }
        Err(Error::Validation(errors)) => match get_all_categories(&connection) {
            Ok(categories) => (
                StatusCode::BAD_REQUEST,
                expense_form_view(
                    "Edit Expense",
                    &format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense_id),
                    endpoints::EXPENSES_VIEW,
                    &form,
                    &errors,
                    &categories,
                ),
            )
                .into_response(),
            Err(error) => error.into_alert_response(),
        },
        Err(error @ Error::UpdateMissingExpense) => error.into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating expense {expense_id}: {error}");
            error.into_alert_response()
        }
    }
}
