//! Alert system for displaying success and error messages to users.
//!
//! This module provides a unified way to display alert messages across the application
//! with proper styling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, link},
    navigation::NavBar,
};

/// An alert message shown at the top of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message without details.
    SuccessSimple { message: String },
    /// An error message with a suggestion for how to fix the problem.
    Error { message: String, details: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (container_style, message, details) = match self {
            Alert::SuccessSimple { message } => (SUCCESS_STYLE, message, String::new()),
            Alert::Error { message, details } => (ERROR_STYLE, message, details),
        };

        html! {
            div class=(container_style) role="alert"
            {
                p class="font-medium" { (message) }

                @if !details.is_empty() {
                    p class="text-sm" { (details) }
                }
            }
        }
    }

    /// Render the alert on its own page with a link back to the expenses list.
    pub fn into_page_response(self, status: StatusCode) -> Response {
        let title = match &self {
            Alert::SuccessSimple { .. } => "Success",
            Alert::Error { .. } => "Error",
        };
        let content = html! {
            (NavBar::new("").into_html())

            main class=(PAGE_CONTAINER_STYLE)
            {
                (self.into_html())
                p { (link(endpoints::EXPENSES_VIEW, "Back to expenses")) }
            }
        };

        (status, base(title, &[], &content)).into_response()
    }
}

const SUCCESS_STYLE: &str = "p-4 mb-4 rounded-lg text-green-800 bg-green-50 \
    dark:bg-gray-800 dark:text-green-400";

const ERROR_STYLE: &str = "p-4 mb-4 rounded-lg text-red-800 bg-red-50 \
    dark:bg-gray-800 dark:text-red-400";
