//! The expenses page: every expense, newest first, with a category filter and bulk deletion.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::Alert,
    category::{Category, CategoryId, get_all_categories},
    endpoints::{self, format_endpoint},
    expense::{Amount, Expense, ExpenseFilter, form::format_date, list_expenses},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, link,
    },
    navigation::NavBar,
};

/// The state needed for the expenses page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the expenses page.
#[derive(Debug, Default, Deserialize)]
pub struct ExpensesQuery {
    /// The category ID to filter by. Empty or malformed values show every expense.
    pub category: Option<String>,
    /// The number of expenses removed by the last bulk delete. Malformed values are ignored.
    pub deleted: Option<String>,
}

impl ExpensesQuery {
    fn category_id(&self) -> Option<CategoryId> {
        self.category
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }

    fn deleted_count(&self) -> Option<usize> {
        self.deleted
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }
}

/// Route handler for the expenses page.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Query(query): Query<ExpensesQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let selected_category = query.category_id();
    let filter = ExpenseFilter {
        category: selected_category,
        ..Default::default()
    };

    let expenses = list_expenses(filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve expenses: {error}"))?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let alert = query.deleted_count().map(|count| Alert::SuccessSimple {
        message: deleted_message(count),
    });

    Ok(expenses_view(&expenses, &categories, selected_category, alert).into_response())
}

fn deleted_message(count: usize) -> String {
    match count {
        1 => "Deleted 1 expense".to_owned(),
        count => format!("Deleted {count} expenses"),
    }
}

fn expenses_view(
    expenses: &[Expense],
    categories: &[Category],
    selected_category: Option<CategoryId>,
    alert: Option<Alert>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();
    let total: Amount = expenses.iter().map(|expense| expense.amount).sum();

    let table_row = |expense: &Expense| {
        let edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
        let delete_url = format_endpoint(endpoints::DELETE_EXPENSE_VIEW, expense.id);
        let filter_url = format!("{}?category={}", endpoints::EXPENSES_VIEW, expense.category.id);

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    input
                        type="checkbox"
                        name="ids"
                        value=(expense.id)
                        aria-label="Select expense";
                }

                td class=(TABLE_CELL_STYLE) { (format_date(expense.date)) }

                td class=(TABLE_CELL_STYLE)
                {
                    a href=(filter_url) class=(CATEGORY_BADGE_STYLE) { (expense.category.name) }
                }

                td class=(TABLE_CELL_STYLE) { (expense.description) }

                td class="px-6 py-4 text-right" { (format_currency(expense.amount.value())) }

                td class=(TABLE_CELL_STYLE) { (expense.payment_method) }

                td class=(TABLE_CELL_STYLE)
                {
                    @if let Some(receipt_link) = &expense.receipt_link {
                        a href=(receipt_link) class=(LINK_STYLE) target="_blank" rel="noopener"
                        {
                            "Receipt"
                        }
                    }
                }

                td class="px-6 py-4 space-x-2"
                {
                    a href=(edit_url) class=(LINK_STYLE) { "Edit" }
                    a href=(delete_url) class=(BUTTON_DELETE_STYLE) { "Delete" }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex justify-between items-center mb-4"
            {
                h1 class="text-xl font-bold" { "Expenses" }

                (link(endpoints::NEW_EXPENSE_VIEW, "Add Expense"))
            }

            @if let Some(alert) = alert {
                (alert.into_html())
            }

            form
                method="get"
                action=(endpoints::EXPENSES_VIEW)
                class="flex items-end gap-4 mb-4"
            {
                div
                {
                    label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                    select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value="" { "All categories" }

                        @for category in categories {
                            @if Some(category.id) == selected_category {
                                option value=(category.id) selected { (category.name) }
                            } @else {
                                option value=(category.id) { (category.name) }
                            }
                        }
                    }
                }

                button type="submit" class="px-4 py-2 rounded bg-blue-500 text-white" { "Filter" }
            }

            form method="post" action=(endpoints::BULK_DELETE_EXPENSES)
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Select" } }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class="px-6 py-4 text-right" { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Payment" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Receipt" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for expense in expenses {
                            (table_row(expense))
                        }

                        @if expenses.is_empty() {
                            tr
                            {
                                td colspan="8" class="px-6 py-4 text-center"
                                {
                                    "No expenses yet. "
                                    (link(endpoints::NEW_EXPENSE_VIEW, "Record your first expense"))
                                }
                            }
                        }
                    }

                    tfoot
                    {
                        tr class="font-semibold text-gray-900 dark:text-white"
                        {
                            th scope="row" colspan="4" class=(TABLE_CELL_STYLE) { "Total" }
                            td class="px-6 py-4 text-right" data-total { (format_currency(total.value())) }
                            td colspan="3" {}
                        }
                    }
                }

                @if !expenses.is_empty() {
                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Delete selected" }
                }
            }
        }
    );

    base("Expenses", &[], &content)
}
