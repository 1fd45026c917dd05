//! Validation of submitted expense fields, shared by the HTML pages and the JSON API, and the
//! form markup for entering an expense.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use url::Url;

use crate::{
    auth::UserID,
    category::{Category, CategoryId},
    expense::{Amount, DateRange, Expense, NewExpense, PaymentMethod},
    html::{FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
};

/// Dates are entered and displayed as "YYYY-MM-DD".
pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

const REQUIRED: &str = "This field is required.";
const INVALID_DATE: &str = "Enter a valid date.";
const INVALID_CATEGORY: &str = "Select a valid category.";
const INVALID_PAYMENT_METHOD: &str = "Select a valid payment method.";
const INVALID_URL: &str = "Enter a valid URL.";

/// The URL schemes accepted for receipt links.
const RECEIPT_LINK_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// Field level error messages, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    /// Create a set of errors with a single message for `field`.
    pub fn from_field(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    /// Record `message` for `field`. The first message recorded for a field is kept.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// The error message for `field`, if there is one.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The messages keyed by field name, in field name order.
    pub fn as_map(&self) -> &BTreeMap<&'static str, String> {
        &self.0
    }

    /// Keep the value of a field check, or record its error and return `None`.
    fn check<T>(&mut self, field: &'static str, result: Result<T, String>) -> Option<T> {
        result.map_err(|message| self.add(field, message)).ok()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>();

        write!(f, "{}", messages.join("; "))
    }
}

/// The raw fields of an expense as submitted by a user.
///
/// Every field is kept as the submitted string so that a rejected form can be shown again
/// exactly as it was entered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseForm {
    pub date: String,
    /// The category ID for HTML forms, or the category name for the JSON API.
    pub category: String,
    pub description: String,
    pub amount: String,
    pub payment_method: String,
    pub receipt_link: String,
}

impl ExpenseForm {
    /// Validate every field, reading the category as a category ID.
    ///
    /// # Errors
    ///
    /// Returns the error message for each invalid field.
    pub fn validate(&self, owner: Option<UserID>) -> Result<NewExpense, ValidationErrors> {
        let category_id = match self.category.trim() {
            "" => Err(REQUIRED.to_owned()),
            raw_id => raw_id
                .parse::<CategoryId>()
                .map_err(|_| INVALID_CATEGORY.to_owned()),
        };

        self.validate_with_category(owner, category_id)
    }

    /// Validate every field except the category, which has already been resolved by the caller.
    ///
    /// # Errors
    ///
    /// Returns the error message for each invalid field, including `category_id` if it is an
    /// error.
    pub fn validate_with_category(
        &self,
        owner: Option<UserID>,
        category_id: Result<CategoryId, String>,
    ) -> Result<NewExpense, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let date = errors.check("date", parse_date(&self.date));
        let category_id = errors.check("category", category_id);
        let description = errors.check("description", parse_description(&self.description));
        let amount = errors.check("amount", parse_amount(&self.amount));
        let payment_method =
            errors.check("payment_method", parse_payment_method(&self.payment_method));
        let receipt_link = errors.check("receipt_link", parse_receipt_link(&self.receipt_link));

        match (
            date,
            category_id,
            description,
            amount,
            payment_method,
            receipt_link,
        ) {
            (
                Some(date),
                Some(category_id),
                Some(description),
                Some(amount),
                Some(payment_method),
                Some(receipt_link),
            ) => Ok(NewExpense {
                owner,
                date,
                category_id,
                description,
                amount,
                payment_method,
                receipt_link,
            }),
            _ => Err(errors),
        }
    }
}

impl From<&Expense> for ExpenseForm {
    fn from(expense: &Expense) -> Self {
        Self {
            date: format_date(expense.date),
            category: expense.category.id.to_string(),
            description: expense.description.clone(),
            amount: expense.amount.to_string(),
            payment_method: expense.payment_method.to_string(),
            receipt_link: expense
                .receipt_link
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_default(),
        }
    }
}

/// The optional `start_date` and `end_date` query parameters used to filter expenses.
///
/// Empty strings are treated the same as missing parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    /// Parse the query parameters into a [DateRange].
    ///
    /// # Errors
    ///
    /// Returns an error for each parameter that is not a valid "YYYY-MM-DD" date.
    pub fn date_range(&self) -> Result<DateRange, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let start = errors.check("start_date", parse_optional_date(self.start_date.as_deref()));
        let end = errors.check("end_date", parse_optional_date(self.end_date.as_deref()));

        match (start, end) {
            (Some(start), Some(end)) => Ok(DateRange { start, end }),
            _ => Err(errors),
        }
    }
}

/// Format `date` as "YYYY-MM-DD".
pub fn format_date(date: Date) -> String {
    // Formatting a complete date with a static description cannot fail.
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

fn parse_date(raw: &str) -> Result<Date, String> {
    match raw.trim() {
        "" => Err(REQUIRED.to_owned()),
        raw => Date::parse(raw, DATE_FORMAT).map_err(|_| INVALID_DATE.to_owned()),
    }
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<Date>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Date::parse(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| INVALID_DATE.to_owned()),
    }
}

fn parse_description(raw: &str) -> Result<String, String> {
    match raw.trim() {
        "" => Err(REQUIRED.to_owned()),
        description => Ok(description.to_owned()),
    }
}

fn parse_amount(raw: &str) -> Result<Amount, String> {
    match raw.trim() {
        "" => Err(REQUIRED.to_owned()),
        raw => Amount::from_str(raw).map_err(|error| error.to_string()),
    }
}

fn parse_payment_method(raw: &str) -> Result<PaymentMethod, String> {
    match raw.trim() {
        "" => Err(REQUIRED.to_owned()),
        raw => PaymentMethod::from_str(raw).map_err(|_| INVALID_PAYMENT_METHOD.to_owned()),
    }
}

fn parse_receipt_link(raw: &str) -> Result<Option<Url>, String> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Ok(None);
    }

    match Url::parse(raw) {
        Ok(url) if RECEIPT_LINK_SCHEMES.contains(&url.scheme()) && url.has_host() => Ok(Some(url)),
        _ => Err(INVALID_URL.to_owned()),
    }
}

/// Render the inputs for an expense form, filled in with `form` and annotated with `errors`.
pub fn expense_form_fields(
    form: &ExpenseForm,
    errors: &ValidationErrors,
    categories: &[Category],
) -> Markup {
    let field_error = |field: &str| {
        html! {
            @if let Some(message) = errors.get(field) {
                p class=(FORM_ERROR_STYLE) { (message) }
            }
        }
    };

    html! {
        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Date" }

            input
                name="date"
                id="date"
                type="date"
                value=(form.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);

            (field_error("date"))
        }

        div
        {
            label for="category" class=(FORM_LABEL_STYLE) { "Category" }

            select
                name="category"
                id="category"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" { "Select a category" }

                @for category in categories {
                    @if category.id.to_string() == form.category {
                        option value=(category.id) selected { (category.name) }
                    } @else {
                        option value=(category.id) { (category.name) }
                    }
                }
            }

            (field_error("category"))
        }

        div
        {
            label for="description" class=(FORM_LABEL_STYLE) { "Description" }

            textarea
                name="description"
                id="description"
                rows="2"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                (form.description)
            }

            (field_error("description"))
        }

        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

            input
                name="amount"
                id="amount"
                type="number"
                step="0.01"
                placeholder="0.00"
                value=(form.amount)
                required
                class=(FORM_TEXT_INPUT_STYLE);

            (field_error("amount"))
        }

        div
        {
            label for="payment_method" class=(FORM_LABEL_STYLE) { "Payment method" }

            select
                name="payment_method"
                id="payment_method"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                @for method in PaymentMethod::ALL {
                    @if method.as_str() == form.payment_method {
                        option value=(method) selected { (method) }
                    } @else {
                        option value=(method) { (method) }
                    }
                }
            }

            (field_error("payment_method"))
        }

        div
        {
            label for="receipt_link" class=(FORM_LABEL_STYLE) { "Receipt link" }

            input
                name="receipt_link"
                id="receipt_link"
                type="url"
                placeholder="https://"
                value=(form.receipt_link)
                class=(FORM_TEXT_INPUT_STYLE);

            (field_error("receipt_link"))
        }
    }
}
