//! Categories for grouping expenses.

mod api;
mod create;
mod db;
mod delete;
mod domain;
mod list;

pub use api::list_categories_api;
pub use create::create_category_endpoint;
pub use db::{
    count_expenses_per_category, create_category, create_category_table, delete_category,
    get_all_categories, get_category, get_category_by_name, get_or_create_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryId, CategoryName, MAX_CATEGORY_NAME_LENGTH};
pub use list::get_categories_page;
