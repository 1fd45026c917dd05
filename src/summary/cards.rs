//! Headline figures for the summary page: all-time total, this month, categories used and the
//! average spend per month.

use std::collections::HashSet;

use maud::{Markup, html};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use time::Date;

use crate::{
    expense::{Amount, Expense},
    html::format_currency,
    summary::aggregation::{monthly_totals, year_month},
};

/// The figures shown on the summary cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct SummaryCards {
    /// The total of every expense.
    pub total: Amount,
    /// The total of the expenses dated in the same calendar month as today.
    pub this_month: Amount,
    /// The number of distinct categories with at least one expense.
    pub category_count: usize,
    /// The total divided by the number of months that have expenses.
    pub average_per_month: Amount,
}

impl SummaryCards {
    pub(super) fn new(expenses: &[Expense], today: Date) -> Self {
        let current_month = year_month(today);
        let monthly = monthly_totals(expenses);
        let total: Amount = monthly.values().copied().sum();
        let this_month = monthly
            .get(&current_month)
            .copied()
            .unwrap_or(Amount::ZERO);
        let category_count = expenses
            .iter()
            .map(|expense| expense.category.id)
            .collect::<HashSet<_>>()
            .len();

        let average_per_month = if monthly.is_empty() {
            Amount::ZERO
        } else {
            let cents = (Decimal::from(total.cents()) / Decimal::from(monthly.len())).round();
            Amount::from_cents(cents.to_i64().unwrap_or_default())
        };

        Self {
            total,
            this_month,
            category_count,
            average_per_month,
        }
    }
}

pub(super) fn summary_cards_view(cards: &SummaryCards) -> Markup {
    let figures = [
        ("total", "Total Expenses", format_currency(cards.total.value())),
        ("this-month", "This Month", format_currency(cards.this_month.value())),
        ("categories", "Categories", cards.category_count.to_string()),
        (
            "average-per-month",
            "Avg/Month",
            format_currency(cards.average_per_month.value()),
        ),
    ];

    html! {
        section class="w-full mx-auto mb-8"
        {
            div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
            {
                @for (key, title, value) in figures {
                    div
                        data-card=(key)
                        class="bg-white dark:bg-gray-800 border border-gray-200
                            dark:border-gray-700 rounded-lg p-4 shadow-md"
                    {
                        h4 class="text-sm text-gray-600 dark:text-gray-400 mb-1" { (title) }
                        p class="text-3xl font-bold text-gray-900 dark:text-white" { (value) }
                    }
                }
            }
        }
    }
}
