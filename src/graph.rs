use crate::axis::AxisModel;
use crate::chart::{Chart, ChartOptions};
use crate::condition::Condition;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::indicator::{Indicator, IndicatorKind, SumField};
use crate::ir::{ChartResult, FieldCatalog, GraphType, IndicatorResult, Record, YRange};
use crate::operator::Operator;
use crate::parser::{parse_document, Element};
use crate::timerange::Timerange;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

/// A parsed `<graph>` view.
#[derive(Debug, Clone, PartialEq)]
pub enum Graph {
    Chart(Chart),
    Indicator(Indicator),
}

/// Output of [`process_graph_data`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphResult {
    Chart(ChartResult),
    Indicator(IndicatorResult),
}

/// `"1"` and `"true"` in any case are true, everything else is false.
pub fn parse_bool_attribute(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

pub fn parse_graph(xml: &str) -> Result<Graph> {
    parse_graph_at(xml, Local::now().naive_local())
}

/// Parse the first `<graph>` element of `xml`. Conditions on the view read
/// `clock` as the current time.
pub fn parse_graph_at(xml: &str, clock: NaiveDateTime) -> Result<Graph> {
    let document = parse_document(xml)?;
    let element = document
        .find("graph")
        .ok_or_else(|| Error::Validation("No graph element found".to_string()))?;

    let type_attr = element.get("type").unwrap_or("None");
    let graph_type = GraphType::parse(type_attr)
        .ok_or_else(|| Error::Validation(format!("{} is not a valid graph", type_attr)))?;

    let string = element.get("string").map(str::to_string);
    let timerange = element
        .get_non_empty("timerange")
        .map(str::parse::<Timerange>)
        .transpose()?;
    let interval = parse_interval(element)?;
    let y_range = parse_y_range(element)?;

    let graph = if graph_type.is_chart() {
        Graph::Chart(Chart {
            graph_type,
            string,
            axes: AxisModel::parse(element)?,
            timerange,
            interval,
            y_range,
        })
    } else {
        let kind = match graph_type {
            GraphType::IndicatorField => IndicatorKind::FieldSum(parse_sum_fields(element)?),
            _ => IndicatorKind::Scalar,
        };
        let condition = |name: &str| {
            element
                .get_non_empty(name)
                .map(|text| Condition::parse_at(text, clock))
                .transpose()
        };
        Graph::Indicator(Indicator {
            kind,
            string,
            color: condition("color")?,
            icon: condition("icon")?,
            suffix: element.get_non_empty("suffix").map(str::to_string),
            total_domain: element.get("totalDomain").map(Domain::parse).transpose()?,
            show_percent: element.get("showPercent").map_or(false, parse_bool_attribute),
        })
    };

    debug!(graph_type = ?graph.graph_type(), fields = ?graph.fields(), "parsed graph");
    Ok(graph)
}

fn parse_interval(element: &Element) -> Result<u32> {
    match element.get_non_empty("interval") {
        None => Ok(1),
        Some(text) => match text.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(Error::Validation(format!(
                "Invalid interval '{}'. Must be a positive integer",
                text
            ))),
        },
    }
}

fn parse_y_range(element: &Element) -> Result<Option<YRange>> {
    match element.get_non_empty("y_range") {
        None | Some("default") => Ok(None),
        Some("auto") => Ok(Some(YRange::Auto)),
        Some("full") => Ok(Some(YRange::Full)),
        Some(other) => Err(Error::Validation(format!(
            "Invalid y_range '{}'. Must be 'auto', 'full' or 'default'",
            other
        ))),
    }
}

fn parse_sum_fields(element: &Element) -> Result<Vec<SumField>> {
    element
        .children_named("field")
        .map(|field| {
            let name = field
                .get_non_empty("name")
                .ok_or_else(|| Error::Validation("Missing name attribute for field".to_string()))?;
            let operator = field
                .get_non_empty("operator")
                .ok_or_else(|| Error::Validation(format!("Field {} doesn't have an operator", name)))?
                .parse::<Operator>()?;
            Ok(SumField {
                name: name.to_string(),
                operator,
            })
        })
        .collect()
}

impl Graph {
    pub fn graph_type(&self) -> GraphType {
        match self {
            Graph::Chart(chart) => chart.graph_type,
            Graph::Indicator(indicator) => indicator.graph_type(),
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            Graph::Chart(chart) => chart.string.as_deref(),
            Graph::Indicator(indicator) => indicator.string.as_deref(),
        }
    }

    /// Fields the caller has to fetch for every record.
    pub fn fields(&self) -> Vec<String> {
        match self {
            Graph::Chart(chart) => chart.fields(),
            Graph::Indicator(indicator) => indicator.fields(),
        }
    }
}

/// Turn `records` into the result of a record-driven view.
pub fn process_graph_data(
    graph: &Graph,
    records: &[Record],
    catalog: &FieldCatalog,
    options: &ChartOptions,
) -> Result<GraphResult> {
    match graph {
        Graph::Chart(chart) => Ok(GraphResult::Chart(chart.process(records, catalog, options)?)),
        Graph::Indicator(indicator) => match indicator.kind {
            IndicatorKind::FieldSum(_) => Ok(GraphResult::Indicator(indicator.process_records(records, &[])?)),
            IndicatorKind::Scalar => Err(Error::Validation(
                "indicator graphs are processed from a value and a total".to_string(),
            )),
        },
    }
}
