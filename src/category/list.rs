//! The categories page: a table of categories with their expense counts and a form for adding
//! a new category.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, count_expenses_per_category, get_all_categories},
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_ERROR_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for the categories page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A category with the number of expenses filed under it.
#[derive(Debug, Clone)]
pub(super) struct CategoryWithCount {
    pub category: Category,
    pub expense_count: i64,
}

/// Route handler for the categories page.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories_with_counts(&connection)?;

    Ok(categories_view(&categories, "", "").into_response())
}

pub(super) fn get_categories_with_counts(
    connection: &Connection,
) -> Result<Vec<CategoryWithCount>, Error> {
    let categories = get_all_categories(connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let expenses_per_category = count_expenses_per_category(connection).inspect_err(|error| {
        tracing::error!("Could not count expenses per category: {error}")
    })?;

    Ok(categories
        .into_iter()
        .map(|category| CategoryWithCount {
            expense_count: *expenses_per_category.get(&category.id).unwrap_or(&0),
            category,
        })
        .collect())
}

/// Render the categories page.
///
/// `name` is used to refill the form when a submission is rejected with `error_message`.
pub(super) fn categories_view(
    categories: &[CategoryWithCount],
    name: &str,
    error_message: &str,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let table_row = |item: &CategoryWithCount| {
        let delete_url =
            endpoints::format_endpoint(endpoints::DELETE_CATEGORY, item.category.id);
        let filter_url = format!("{}?category={}", endpoints::EXPENSES_VIEW, item.category.id);

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    a href=(filter_url) class=(CATEGORY_BADGE_STYLE)
                    {
                        (item.category.name)
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (item.expense_count)
                }

                td class=(TABLE_CELL_STYLE)
                {
                    form method="post" action=(delete_url)
                    {
                        button type="submit" class=(BUTTON_DELETE_STYLE)
                        {
                            "Delete"
                        }
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Categories" }

            form
                method="post"
                action=(endpoints::CATEGORIES_VIEW)
                class="w-full max-w-md space-y-4 mb-8"
            {
                div
                {
                    label for="name" class=(FORM_LABEL_STYLE) { "Category Name" }

                    input
                        id="name"
                        type="text"
                        name="name"
                        value=(name)
                        placeholder="Category Name"
                        maxlength="50"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                @if !error_message.is_empty() {
                    p class=(FORM_ERROR_STYLE) { (error_message) }
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Category" }
            }

            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Expenses" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for item in categories {
                        (table_row(item))
                    }

                    @if categories.is_empty() {
                        tr
                        {
                            td colspan="3" class="px-6 py-4 text-center"
                            {
                                "No categories yet. "
                                a href="#name" class=(LINK_STYLE) { "Add your first category" }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Categories", &[], &content)
}

#[cfg(test)]
mod categories_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        category::{CategoryName, create_category, get_categories_page},
        db::initialize,
        endpoints,
        test_utils::{
            assert_form_action, assert_form_input, assert_form_submit_button, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::CategoriesPageState;

    fn get_test_state() -> CategoriesPageState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        CategoriesPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn page_has_create_form() {
        let state = get_test_state();

        let response = get_categories_page(State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_action(&form, endpoints::CATEGORIES_VIEW);
        assert_form_input(&form, "name", "text");
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn page_lists_categories_by_name() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            create_category(CategoryName::new_unchecked("Travel"), &connection).unwrap();
            create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
        }

        let response = get_categories_page(State(state)).await.unwrap();

        let html = parse_html_document(response).await;
        let names = html
            .select(&Selector::parse("tbody tr td:first-child a").unwrap())
            .map(|a| a.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Food", "Travel"]);
    }
}
