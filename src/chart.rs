use crate::axis::{AxisModel, YAxis};
use crate::error::{Error, Result};
use crate::ir::{
    as_number, display, is_truthy, ChartResult, FieldCatalog, GraphType, Record, SeriesPoint,
    SortKey, YRange,
};
use crate::operator::Operator;
use crate::scale::y_axis_props;
use crate::timerange::{process_timerange_data, Timerange};
use crate::transform::{all_entries, group_by, values_for_y_field};
use serde_json::Value as Json;
use tracing::debug;

pub const DEFAULT_UNINFORMED_STRING: &str = "Not informed";

/// Per-call rendering options.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    /// X label given to pie slices whose records have no x value
    pub uninformed_string: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            uninformed_string: DEFAULT_UNINFORMED_STRING.to_string(),
        }
    }
}

/// A line, bar or pie chart definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub graph_type: GraphType,
    pub string: Option<String>,
    pub axes: AxisModel,
    pub timerange: Option<Timerange>,
    pub interval: u32,
    pub y_range: Option<YRange>,
}

impl Chart {
    /// Fields to fetch for this chart: the x field, every y field that is
    /// not merely counted and every y label field.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = vec![self.axes.x.name.clone()];
        for y in &self.axes.y {
            if y.operator != Operator::Count && !fields.contains(&y.name) {
                fields.push(y.name.clone());
            }
            if let Some(label) = &y.label {
                if !fields.contains(label) {
                    fields.push(label.clone());
                }
            }
        }
        fields
    }

    pub fn process(&self, records: &[Record], catalog: &FieldCatalog, options: &ChartOptions) -> Result<ChartResult> {
        let by_x = group_by(&self.axes.x.name, catalog, records)?;
        let num_items = all_entries(&by_x).len();

        // 1. One point per (y axis, x bucket[, label bucket])
        let mut data = Vec::new();
        for y in &self.axes.y {
            for bucket in by_x.iter() {
                let x = if is_truthy(&bucket.label) {
                    bucket.label.clone()
                } else {
                    Json::Bool(false)
                };

                match &y.label {
                    None => {
                        let values = values_for_y_field(&bucket.entries, &y.name, catalog)?;
                        data.push(SeriesPoint {
                            x,
                            value: reduce_labels(y, &values)?,
                            series: Json::String(catalog.display_name(&y.name).to_string()),
                            operator: Some(y.operator),
                            stacked: y.stacked.clone(),
                        });
                    }
                    Some(label_field) => {
                        let by_label = group_by(label_field, catalog, bucket.entries.iter().copied())?;
                        for sub in by_label.iter() {
                            let values = values_for_y_field(&sub.entries, &y.name, catalog)?;
                            data.push(SeriesPoint {
                                x: x.clone(),
                                value: reduce_labels(y, &values)?,
                                series: sub.label.clone(),
                                operator: Some(y.operator),
                                stacked: y.stacked.clone(),
                            });
                        }
                    }
                }
            }
        }

        // 2. Order by x, missing x first
        data.sort_by_key(|p| SortKey::of(&p.x));

        // 3. Name series after their stack when several stacks are drawn
        if self.axes.stacked_keys().len() > 1 {
            for point in &mut data {
                let stacked = point.stacked.as_deref().unwrap_or("None");
                point.series = Json::String(format!("{} - {}", display(&point.series), stacked));
            }
        }

        // 4. Missing x: a labelled slice for pies, dropped otherwise
        let is_pie = self.graph_type == GraphType::Pie;
        if is_pie {
            for point in &mut data {
                if point.x == Json::Bool(false) {
                    point.x = Json::String(options.uninformed_string.clone());
                }
            }
        } else {
            data.retain(|p| p.x != Json::Bool(false));
        }

        // 5. Time buckets
        if let Some(timerange) = self.timerange {
            data = process_timerange_data(data, timerange, self.interval)?;
        }

        // 6. Final order
        if is_pie {
            data.sort_by(|a, b| b.value.total_cmp(&a.value));
        } else {
            data.sort_by_cached_key(|p| format!("{}-{}", display(&p.x), display(&p.series)));
        }

        let y_axis_props = match (self.graph_type, self.y_range) {
            (GraphType::Line, Some(mode)) => Some(y_axis_props(&data, mode)?),
            _ => None,
        };

        debug!(
            graph_type = ?self.graph_type,
            records = records.len(),
            points = data.len(),
            "processed chart"
        );

        Ok(ChartResult {
            data,
            is_group: self.axes.is_group() || self.axes.is_stack(),
            is_stack: self.axes.is_stack(),
            graph_type: self.graph_type,
            num_items,
            y_axis_props,
        })
    }
}

/// Reduce the resolved y labels of one bucket.
fn reduce_labels(y: &YAxis, labels: &[Json]) -> Result<f64> {
    if y.operator == Operator::Count {
        return Ok(labels.len() as f64);
    }
    let numbers = labels
        .iter()
        .map(|label| as_number(label).ok_or_else(|| Error::malformed(&y.name, label)))
        .collect::<Result<Vec<f64>>>()?;
    y.operator.reduce(&numbers)
}
