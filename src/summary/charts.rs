//! ECharts visualizations for the summary page: spending per category as a pie chart and
//! spending per month as a bar chart.

use std::collections::BTreeMap;

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger,
    },
    series::{Pie, bar::Bar},
};
use maud::{Markup, PreEscaped, html};
use rust_decimal::prelude::ToPrimitive;

use crate::{
    expense::Amount,
    html::HeadElement,
    summary::{
        Summary,
        aggregation::{YearMonth, format_month_label},
    },
};

/// The ECharts build loaded by pages with charts.
const ECHARTS_SCRIPT: &str = "https://cdn.jsdelivr.net/npm/echarts@6.0.0/dist/echarts.min.js";

/// A chart with its HTML container ID and ECharts configuration.
pub(super) struct SummaryChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

pub(super) fn charts_view(charts: &[SummaryChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mt-8 mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// The scripts that load ECharts and draw `charts` once the page has loaded.
pub(super) fn charts_head_elements(charts: &[SummaryChart]) -> Vec<HeadElement> {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        HeadElement::ScriptSource(PreEscaped(format!(
            "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
        ))),
    ]
}

pub(super) fn category_chart(summary: &Summary) -> Chart {
    let data = summary
        .per_category
        .iter()
        .map(|(category, total)| (to_chart_value(*total), category.as_str()))
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text("Spending by Category"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("1%"))
        .series(
            Pie::new()
                .name("Spending")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

pub(super) fn monthly_chart(monthly_totals: &BTreeMap<YearMonth, Amount>) -> Chart {
    let labels = monthly_totals
        .keys()
        .map(|month| format_month_label(*month))
        .collect::<Vec<_>>();
    let values = monthly_totals
        .values()
        .map(|total| to_chart_value(*total))
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text("Spending by Month"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Spending").data(values))
}

/// Charts only need display precision.
fn to_chart_value(amount: Amount) -> f64 {
    amount.value().to_f64().unwrap_or_default()
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}
