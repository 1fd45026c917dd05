//! The summary page: spending per category over an optional date range.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    expense::{DateRangeQuery, ExpenseFilter, ValidationErrors, list_expenses},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    navigation::NavBar,
    summary::{
        Summary,
        aggregation::{monthly_totals, summarize},
        cards::{SummaryCards, summary_cards_view},
        charts::{
            SummaryChart, category_chart, charts_head_elements, charts_view, monthly_chart,
        },
    },
    timezone::local_today,
};

/// The state needed for the summary page.
#[derive(Debug, Clone)]
pub struct SummaryPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for SummaryPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Route handler for the summary page.
///
/// The cards at the top always cover every expense. The table and charts cover the expenses
/// dated within the optional date range. Malformed dates are reported next to the date inputs
/// with status `400 Bad Request`.
pub async fn get_summary_page(
    State(state): State<SummaryPageState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let expenses = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        list_expenses(ExpenseFilter::default(), &connection)
            .inspect_err(|error| tracing::error!("Failed to retrieve expenses: {error}"))?
    };

    let cards = SummaryCards::new(&expenses, today);

    let date_range = match query.date_range() {
        Ok(date_range) => date_range,
        Err(errors) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                summary_view(&Summary::default(), &cards, &[], &query, &errors),
            )
                .into_response());
        }
    };

    let in_range = expenses
        .iter()
        .filter(|expense| date_range.contains(expense.date))
        .collect::<Vec<_>>();
    let summary = summarize(in_range.iter().copied());

    let charts = if summary.per_category.is_empty() {
        Vec::new()
    } else {
        vec![
            SummaryChart {
                id: "category-chart",
                options: category_chart(&summary).to_string(),
            },
            SummaryChart {
                id: "monthly-chart",
                options: monthly_chart(&monthly_totals(in_range.iter().copied())).to_string(),
            },
        ]
    };

    Ok(summary_view(
        &summary,
        &cards,
        &charts,
        &query,
        &ValidationErrors::default(),
    )
    .into_response())
}

fn summary_view(
    summary: &Summary,
    cards: &SummaryCards,
    charts: &[SummaryChart],
    query: &DateRangeQuery,
    errors: &ValidationErrors,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::SUMMARY_VIEW).into_html();
    let start_date = query.start_date.as_deref().unwrap_or_default();
    let end_date = query.end_date.as_deref().unwrap_or_default();

    let date_input = |name: &str, label: &str, value: &str| {
        html! {
            div
            {
                label for=(name) class=(FORM_LABEL_STYLE) { (label) }

                input
                    name=(name)
                    id=(name)
                    type="date"
                    value=(value)
                    class=(FORM_TEXT_INPUT_STYLE);

                @if let Some(message) = errors.get(name) {
                    p class=(FORM_ERROR_STYLE) { (message) }
                }
            }
        }
    };

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Summary" }

            (summary_cards_view(cards))

            form
                method="get"
                action=(endpoints::SUMMARY_VIEW)
                class="flex flex-wrap items-end gap-4 mb-8"
            {
                (date_input("start_date", "From", start_date))
                (date_input("end_date", "To", end_date))

                div
                {
                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Apply" }
                }
            }

            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class="px-6 py-4 text-right" { "Total" }
                    }
                }

                tbody
                {
                    @for (category, total) in &summary.per_category {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (category) }
                            td class="px-6 py-4 text-right" { (format_currency(total.value())) }
                        }
                    }

                    @if summary.per_category.is_empty() {
                        tr
                        {
                            td colspan="2" class="px-6 py-4 text-center"
                            {
                                "No expenses in this period."
                            }
                        }
                    }
                }

                tfoot
                {
                    tr class="font-semibold text-gray-900 dark:text-white"
                    {
                        th scope="row" class=(TABLE_CELL_STYLE) { "Overall" }
                        td class="px-6 py-4 text-right" data-total
                        {
                            (format_currency(summary.overall.value()))
                        }
                    }
                }
            }

            @if !charts.is_empty() {
                (charts_view(charts))
            }
        }
    };

    let head_elements = if charts.is_empty() {
        Vec::new()
    } else {
        charts_head_elements(charts)
    };

    base("Summary", &head_elements, &content)
}

#[cfg(test)]
mod summary_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        category::{CategoryName, create_category},
        db::initialize,
        expense::{Amount, DateRangeQuery, NewExpense, PaymentMethod, create_expense},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{SummaryPageState, get_summary_page};

    fn get_test_state() -> SummaryPageState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let food = create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
        let travel = create_category(CategoryName::new_unchecked("Travel"), &connection).unwrap();

        for (date, category_id, cents) in [
            (date!(2023 - 01 - 01), food.id, 1000),
            (date!(2023 - 02 - 01), travel.id, 2000),
            (date!(2023 - 03 - 01), travel.id, 123_456),
        ] {
            create_expense(
                NewExpense {
                    owner: None,
                    date,
                    category_id,
                    description: "Something".to_owned(),
                    amount: Amount::from_cents(cents),
                    payment_method: PaymentMethod::Online,
                    receipt_link: None,
                },
                &connection,
            )
            .unwrap();
        }

        SummaryPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    fn query(start_date: &str, end_date: &str) -> DateRangeQuery {
        DateRangeQuery {
            start_date: Some(start_date.to_owned()),
            end_date: Some(end_date.to_owned()),
        }
    }

    fn rows(html: &Html) -> Vec<(String, String)> {
        let cell = Selector::parse("td").unwrap();

        html.select(&Selector::parse("tbody tr").unwrap())
            .map(|row| {
                let cells = row
                    .select(&cell)
                    .map(|cell| cell.text().collect::<String>().trim().to_owned())
                    .collect::<Vec<_>>();
                (cells[0].clone(), cells.get(1).cloned().unwrap_or_default())
            })
            .collect()
    }

    fn overall(html: &Html) -> String {
        html.select(&Selector::parse("td[data-total]").unwrap())
            .next()
            .expect("Could not find overall total")
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[tokio::test]
    async fn summarizes_every_expense_without_dates() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(DateRangeQuery::default()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            rows(&html),
            vec![
                ("Food".to_owned(), "$10.00".to_owned()),
                ("Travel".to_owned(), "$1,254.56".to_owned()),
            ]
        );
        assert_eq!(overall(&html), "$1,264.56");
    }

    #[tokio::test]
    async fn filters_by_inclusive_date_range() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("2023-01-15", "2023-02-01")))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(
            rows(&html),
            vec![("Travel".to_owned(), "$20.00".to_owned())]
        );
        assert_eq!(overall(&html), "$20.00");
        let start_value = html
            .select(&Selector::parse("input[name=start_date]").unwrap())
            .next()
            .and_then(|input| input.value().attr("value"));
        assert_eq!(start_value, Some("2023-01-15"));
    }

    #[tokio::test]
    async fn empty_dates_are_unbounded() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("", "2023-01-31")))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(overall(&html), "$10.00");
    }

    #[tokio::test]
    async fn reversed_range_is_empty() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("2023-12-31", "2023-01-01")))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(
            rows(&html),
            vec![("No expenses in this period.".to_owned(), String::new())]
        );
        assert_eq!(overall(&html), "$0.00");
    }

    #[tokio::test]
    async fn malformed_date_is_reported() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("not-a-date", "")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let message = html
            .select(&Selector::parse("form p").unwrap())
            .next()
            .expect("Could not find error message")
            .text()
            .collect::<String>();
        assert_eq!(message, "Enter a valid date.");
    }

    #[tokio::test]
    async fn shows_all_time_cards_regardless_of_range() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("2023-01-15", "2023-02-01")))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let card = |key: &str| {
            html.select(&Selector::parse(&format!("[data-card={key}] p")).unwrap())
                .next()
                .unwrap_or_else(|| panic!("Could not find {key} card"))
                .text()
                .collect::<String>()
        };
        assert_eq!(card("total"), "$1,264.56");
        assert_eq!(card("this-month"), "$0.00");
        assert_eq!(card("categories"), "2");
        assert_eq!(card("average-per-month"), "$421.52");
    }

    #[tokio::test]
    async fn draws_charts_for_expenses_in_range() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("2023-01-15", "2023-02-01")))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        for id in ["#category-chart", "#monthly-chart"] {
            assert!(
                html.select(&Selector::parse(id).unwrap()).next().is_some(),
                "missing {id}"
            );
        }
        let script = html
            .select(&Selector::parse("head script:not([src])").unwrap())
            .map(|script| script.text().collect::<String>())
            .collect::<String>();
        assert!(script.contains("Feb 2023"), "got {script}");
        assert!(!script.contains("Jan 2023"), "got {script}");
    }

    #[tokio::test]
    async fn omits_charts_without_expenses() {
        let state = get_test_state();

        let response = get_summary_page(State(state), Query(query("2023-12-31", "2023-01-01")))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert!(html.select(&Selector::parse("#charts").unwrap()).next().is_none());
        assert!(
            html.select(&Selector::parse("script[src*=echarts]").unwrap())
                .next()
                .is_none()
        );
    }
}
