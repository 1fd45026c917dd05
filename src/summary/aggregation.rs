//! Totals per category, per month and overall for a set of expenses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::expense::{Amount, Expense};

/// The spending for a set of expenses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// The total spent in each category, keyed and ordered by category name.
    pub per_category: BTreeMap<String, Amount>,
    /// The total spent across every category.
    pub overall: Amount,
}

/// Group `expenses` by category name and total them.
///
/// An empty set of expenses gives an empty summary with an overall total of zero.
pub fn summarize<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Summary {
    let mut per_category: BTreeMap<String, Amount> = BTreeMap::new();

    for expense in expenses {
        *per_category
            .entry(expense.category.name.to_string())
            .or_insert(Amount::ZERO) += expense.amount;
    }

    let overall = per_category.values().copied().sum();

    Summary {
        per_category,
        overall,
    }
}

/// A calendar month as `(year, month number)`, which orders chronologically.
pub type YearMonth = (i32, u8);

/// The calendar month that `date` falls in.
pub fn year_month(date: Date) -> YearMonth {
    (date.year(), u8::from(date.month()))
}

/// Total `expenses` per calendar month, in chronological order.
///
/// Months without expenses are absent.
pub fn monthly_totals<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> BTreeMap<YearMonth, Amount> {
    let mut totals: BTreeMap<YearMonth, Amount> = BTreeMap::new();

    for expense in expenses {
        *totals
            .entry(year_month(expense.date))
            .or_insert(Amount::ZERO) += expense.amount;
    }

    totals
}

/// Format a month as a short label, e.g. "Jan 2024".
pub fn format_month_label((year, month): YearMonth) -> String {
    let name = match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    };

    format!("{name} {year}")
}
