//! Expenses: the domain types, their storage, the HTML pages and the JSON API.

mod amount;
mod api;
mod create;
mod db;
mod delete;
mod edit;
mod form;
mod list;
mod payment_method;

pub use amount::Amount;
pub use api::{
    bulk_delete_expenses_api, create_expense_api, delete_expense_api, list_expenses_api,
    update_expense_api,
};
pub use create::{create_expense_endpoint, get_new_expense_page};
pub use db::{
    DateRange, Expense, ExpenseFilter, ExpenseId, NewExpense, bulk_delete_expenses,
    create_expense, create_expense_table, delete_expense, get_expense, list_expenses,
    update_expense,
};
pub use delete::{bulk_delete_expenses_endpoint, delete_expense_endpoint, get_delete_expense_page};
pub use edit::{edit_expense_endpoint, get_edit_expense_page};
pub use form::{DateRangeQuery, ExpenseForm, ValidationErrors, format_date};
pub use list::get_expenses_page;
pub use payment_method::PaymentMethod;
