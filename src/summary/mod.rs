//! Spending summaries: totals per category and overall as a page with cards and charts, and
//! as JSON.

mod aggregation;
mod api;
mod cards;
mod charts;
mod page;

use rusqlite::Connection;

pub use aggregation::{Summary, summarize};
pub use api::get_summary_api;
pub use page::get_summary_page;

use crate::{
    Error,
    auth::UserID,
    expense::{DateRange, ExpenseFilter, list_expenses},
};

/// Summarize the expenses dated within `date_range`, only counting those owned by `owner` if it
/// is given.
pub fn get_summary(
    date_range: DateRange,
    owner: Option<UserID>,
    connection: &Connection,
) -> Result<Summary, Error> {
    let filter = ExpenseFilter {
        owner,
        category: None,
        date_range,
    };
    let expenses = list_expenses(filter, connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve expenses for summary: {error}"))?;

    Ok(summarize(&expenses))
}
