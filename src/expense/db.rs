//! Expense types and the database operations on them.

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;
use url::Url;

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryId, CategoryName},
    expense::{Amount, PaymentMethod, ValidationErrors},
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Database identifier for an expense.
pub type ExpenseId = i64;

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// The user that created the expense through the API. Expenses created through the HTML pages
    /// have no owner.
    pub owner: Option<UserID>,
    /// When the expense was incurred.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// The category the expense is filed under.
    pub category: Category,
    /// What the money was spent on.
    pub description: String,
    /// How much was spent.
    pub amount: Amount,
    /// How the expense was paid.
    pub payment_method: PaymentMethod,
    /// An optional link to a scanned receipt.
    pub receipt_link: Option<Url>,
}

/// The validated fields for creating or updating an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// The owner of a new expense. Updates never change the owner.
    pub owner: Option<UserID>,
    pub date: Date,
    pub category_id: CategoryId,
    pub description: String,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub receipt_link: Option<Url>,
}

/// An inclusive range of dates. A missing bound leaves that side of the range open.
///
/// A range whose start is after its end contains no dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    /// Check whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start.is_none_or(|start| start <= date) && self.end.is_none_or(|end| date <= end)
    }
}

/// Restricts which expenses [list_expenses] returns. The default filter selects everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpenseFilter {
    /// Only select expenses owned by this user.
    pub owner: Option<UserID>,
    /// Only select expenses in this category.
    pub category: Option<CategoryId>,
    /// Only select expenses dated within this range.
    pub date_range: DateRange,
}

const SELECT_EXPENSE: &str = "SELECT expense.id, expense.owner_id, expense.date, \
    category.id, category.name, expense.description, expense.amount, \
    expense.payment_method, expense.receipt_link \
    FROM expense INNER JOIN category ON expense.category_id = category.id";

/// Create a new expense and return it with its generated ID and category.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(expense: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    let id: ExpenseId = connection
        .prepare(
            "INSERT INTO expense \
                (owner_id, date, category_id, description, amount, payment_method, receipt_link) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING id",
        )?
        .query_row(
            (
                expense.owner.map(|owner| owner.as_i64()),
                expense.date,
                expense.category_id,
                &expense.description,
                expense.amount,
                expense.payment_method,
                expense.receipt_link.as_ref().map(Url::as_str),
            ),
            |row| row.get(0),
        )
        .map_err(map_foreign_key_error)?;

    get_expense(id, None, connection)
}

/// Retrieve an expense by its `id`.
///
/// If `owner` is given, expenses belonging to anyone else are treated as missing.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a visible expense,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_expense(
    id: ExpenseId,
    owner: Option<UserID>,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE expense.id = ?1 AND (?2 IS NULL OR expense.owner_id = ?2)"
        ))?
        .query_one((id, owner.map(|owner| owner.as_i64())), map_expense_row)?;

    Ok(expense)
}

/// Retrieve the expenses selected by `filter`, newest first.
///
/// Expenses on the same date are ordered by descending ID so that the order is stable.
pub fn list_expenses(filter: ExpenseFilter, connection: &Connection) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} \
            WHERE (?1 IS NULL OR expense.owner_id = ?1) \
            AND (?2 IS NULL OR expense.category_id = ?2) \
            AND (?3 IS NULL OR expense.date >= ?3) \
            AND (?4 IS NULL OR expense.date <= ?4) \
            ORDER BY expense.date DESC, expense.id DESC"
        ))?
        .query_map(
            (
                filter.owner.map(|owner| owner.as_i64()),
                filter.category,
                filter.date_range.start,
                filter.date_range.end,
            ),
            map_expense_row,
        )?
        .map(|expense_result| expense_result.map_err(Error::from))
        .collect()
}

/// Replace every field of the expense `id` except its owner.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingExpense] if `id` does not refer to an expense visible to `owner`,
/// - [Error::Validation] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_expense(
    id: ExpenseId,
    expense: NewExpense,
    owner: Option<UserID>,
    connection: &Connection,
) -> Result<Expense, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE expense SET \
                date = ?1, category_id = ?2, description = ?3, amount = ?4, \
                payment_method = ?5, receipt_link = ?6 \
             WHERE id = ?7 AND (?8 IS NULL OR owner_id = ?8)",
            (
                expense.date,
                expense.category_id,
                &expense.description,
                expense.amount,
                expense.payment_method,
                expense.receipt_link.as_ref().map(Url::as_str),
                id,
                owner.map(|owner| owner.as_i64()),
            ),
        )
        .map_err(map_foreign_key_error)?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingExpense);
    }

    get_expense(id, owner, connection)
}

/// Delete the expense `id`.
///
/// # Errors
/// Returns [Error::DeleteMissingExpense] if `id` does not refer to an expense visible to `owner`.
pub fn delete_expense(
    id: ExpenseId,
    owner: Option<UserID>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND (?2 IS NULL OR owner_id = ?2)",
        (id, owner.map(|owner| owner.as_i64())),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingExpense);
    }

    Ok(())
}

/// Delete every expense in `ids` that is visible to `owner` and return how many were deleted.
///
/// IDs that do not refer to an expense are ignored.
pub fn bulk_delete_expenses(
    ids: &[ExpenseId],
    owner: Option<UserID>,
    connection: &Connection,
) -> Result<usize, Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    // A single JSON array parameter, SQLite caps the number of variables per statement.
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id IN (SELECT value FROM json_each(?1)) \
        AND (?2 IS NULL OR owner_id = ?2)",
        (json!(ids), owner.map(|owner| owner.as_i64())),
    )?;

    Ok(rows_affected)
}

/// Create the expense table in the database.
///
/// Deleting a category deletes its expenses. Deleting a user keeps their expenses but clears
/// the owner.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER,
                date TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                amount INTEGER NOT NULL,
                payment_method TEXT NOT NULL,
                receipt_link TEXT,
                FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_date ON expense(date);",
        (),
    )?;

    Ok(())
}

fn map_foreign_key_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => ValidationErrors::from_field("category", "Select a valid category.").into(),
        error => error.into(),
    }
}

/// Map a row selected with [SELECT_EXPENSE] to an [Expense].
fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_category_name: String = row.get(4)?;
    let receipt_link = row
        .get::<_, Option<String>>(8)?
        .map(|raw_url| Url::parse(&raw_url))
        .transpose()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(error)))?;

    Ok(Expense {
        id: row.get(0)?,
        owner: row.get::<_, Option<i64>>(1)?.map(UserID::new),
        date: row.get(2)?,
        category: Category {
            id: row.get(3)?,
            name: CategoryName::new_unchecked(&raw_category_name),
        },
        description: row.get(5)?,
        amount: row.get(6)?,
        payment_method: row.get(7)?,
        receipt_link,
    })
}
