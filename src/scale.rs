use crate::error::{Error, Result};
use crate::ir::{SeriesPoint, ValueOpts, YAxisProps, YRange};

/// Fraction of the value span added on both sides of auto y ranges.
pub const DEFAULT_MARGIN: f64 = 0.1;

/// Y bounds of `points` widened by `margin` of their span.
/// Bounds truncate toward zero.
pub fn min_max(points: &[SeriesPoint], margin: f64) -> Result<ValueOpts> {
    if points.is_empty() {
        return Err(Error::EmptyInput("The values array cannot be empty.".to_string()));
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for point in points {
        if point.value < min { min = point.value; }
        if point.value > max { max = point.value; }
    }

    let padding = (max - min) * margin;
    Ok(ValueOpts {
        min: (min - padding).trunc() as i64,
        max: (max + padding).trunc() as i64,
    })
}

/// Axis properties for a line chart's final data.
pub fn y_axis_props(points: &[SeriesPoint], mode: YRange) -> Result<YAxisProps> {
    let value_opts = match mode {
        YRange::Full => None,
        YRange::Auto => Some(min_max(points, DEFAULT_MARGIN)?),
    };
    Ok(YAxisProps { mode, value_opts })
}
