//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/{expense_id}/edit', use [format_endpoint].

/// The page listing expenses, newest first.
pub const EXPENSES_VIEW: &str = "/";
/// The page and form target for creating a new expense.
pub const NEW_EXPENSE_VIEW: &str = "/add";
/// The page and form target for editing an existing expense.
pub const EDIT_EXPENSE_VIEW: &str = "/{expense_id}/edit";
/// The confirmation page and form target for deleting an expense.
pub const DELETE_EXPENSE_VIEW: &str = "/{expense_id}/delete";
/// The form target for deleting a set of expenses.
pub const BULK_DELETE_EXPENSES: &str = "/bulk-delete";
/// The page summarising spending per category.
pub const SUMMARY_VIEW: &str = "/summary";
/// The page listing categories, also the form target for creating one.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The form target for deleting a category.
pub const DELETE_CATEGORY: &str = "/categories/{category_id}/delete";

/// The route for creating a user and receiving a token.
pub const SIGN_UP_API: &str = "/api/signup";
/// The route for exchanging credentials for a token.
pub const LOG_IN_API: &str = "/api/login";
/// The route for listing categories as JSON.
pub const CATEGORIES_API: &str = "/api/categories";
/// The route for listing and creating expenses as JSON.
pub const EXPENSES_API: &str = "/api/expenses";
/// The route for updating or deleting a single expense as JSON.
pub const EXPENSE_API: &str = "/api/expenses/{expense_id}";
/// The route for deleting a set of expenses as JSON.
pub const BULK_DELETE_EXPENSES_API: &str = "/api/expenses/bulk-delete";
/// The route for the spending summary as JSON.
pub const SUMMARY_API: &str = "/api/summary";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/{expense_id}/edit', '{expense_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
