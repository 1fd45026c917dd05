//! Deleting one expense after confirmation, or several at once from the expenses page.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    expense::{Expense, ExpenseId, bulk_delete_expenses, delete_expense, get_expense},
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_CONTAINER_STYLE, base,
        format_currency,
    },
    navigation::NavBar,
};

/// The state needed for deleting expenses.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render a page asking the user to confirm deleting an expense.
pub async fn get_delete_expense_page(
    State(state): State<DeleteExpenseState>,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Response, Error> {
    let expense = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_expense(expense_id, None, &connection)?
    };

    Ok(confirm_delete_view(&expense).into_response())
}

fn confirm_delete_view(expense: &Expense) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();
    let action = format_endpoint(endpoints::DELETE_EXPENSE_VIEW, expense.id);

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Delete Expense" }

            p class="mb-4"
            {
                "Are you sure you want to delete \""
                (expense.description)
                "\" ("
                (format_currency(expense.amount.value()))
                ") from "
                (expense.category.name)
                "?"
            }

            form method="post" action=(action) class="w-full max-w-md"
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Delete" }
            }

            a href=(endpoints::EXPENSES_VIEW) class=(BUTTON_SECONDARY_STYLE) { "Cancel" }
        }
    };

    base("Delete Expense", &[], &content)
}

/// Handle a confirmed expense deletion.
pub async fn delete_expense_endpoint(
    State(state): State<DeleteExpenseState>,
    Path(expense_id): Path<ExpenseId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_expense(expense_id, None, &connection) {
        Ok(()) => {
            tracing::info!("Deleted expense {expense_id}");
            Redirect::to(endpoints::EXPENSES_VIEW).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// The expenses ticked on the expenses page.
#[derive(Debug, Default, Deserialize)]
pub struct BulkDeleteForm {
    #[serde(default)]
    pub ids: Vec<ExpenseId>,
}

/// Delete every selected expense and report how many were removed on the expenses page.
pub async fn bulk_delete_expenses_endpoint(
    State(state): State<DeleteExpenseState>,
    Form(form): Form<BulkDeleteForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match bulk_delete_expenses(&form.ids, None, &connection) {
        Ok(deleted) => {
            tracing::info!("Deleted {deleted} expenses");
            Redirect::to(&format!("{}?deleted={deleted}", endpoints::EXPENSES_VIEW))
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}
