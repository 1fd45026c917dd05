//! The page and endpoint for recording a new expense.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, get_all_categories},
    endpoints,
    expense::{
        ExpenseForm, PaymentMethod, ValidationErrors, create_expense,
        form::{expense_form_fields, format_date},
    },
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for the new expense page and endpoint.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render a page with an expense form that submits to `action`.
pub(super) fn expense_form_view(
    title: &str,
    action: &str,
    active_endpoint: &str,
    form: &ExpenseForm,
    errors: &ValidationErrors,
    categories: &[Category],
) -> Markup {
    let nav_bar = NavBar::new(active_endpoint).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { (title) }

            form method="post" action=(action) class="w-full space-y-4 md:space-y-6"
            {
                (expense_form_fields(form, errors, categories))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
            }
        }
    };

    base(title, &[], &content)
}

/// Render the new expense page with the date set to today.
pub async fn get_new_expense_page(State(state): State<CreateExpenseState>) -> Response {
    let Some(today) = local_today(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let categories = match state.db_connection.lock() {
        Ok(connection) => get_all_categories(&connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };
    let categories = match categories {
        Ok(categories) => categories,
        Err(error) => return error.into_response(),
    };

    let form = ExpenseForm {
        date: format_date(today),
        payment_method: PaymentMethod::Cash.to_string(),
        ..Default::default()
    };

    expense_form_view(
        "Add Expense",
        endpoints::NEW_EXPENSE_VIEW,
        endpoints::NEW_EXPENSE_VIEW,
        &form,
        &ValidationErrors::default(),
        &categories,
    )
    .into_response()
}

/// Handle new expense form submissions.
///
/// Redirects to the expense list on success, otherwise shows the form again with the errors
/// and status `400 Bad Request`.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
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
        .and_then(|new_expense| create_expense(new_expense, &connection));

    match result {
        Ok(expense) => {
            tracing::info!("Created expense {}", expense.id);
            Redirect::to(endpoints::EXPENSES_VIEW).into_response()
        }
        Err(Error::Validation(errors)) => match get_all_categories(&connection) {
            Ok(categories) => (
                StatusCode::BAD_REQUEST,
                expense_form_view(
                    "Add Expense",
                    endpoints::NEW_EXPENSE_VIEW,
                    endpoints::NEW_EXPENSE_VIEW,
                    &form,
                    &errors,
                    &categories,
                ),
            )
                .into_response(),
            Err(error) => error.into_alert_response(),
        },
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating an expense: {error}");
            error.into_alert_response()
        }
    }
}
