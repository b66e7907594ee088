use crate::condition::Condition;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::ir::{as_number, number_to_json, GraphType, IndicatorResult, Record};
use crate::operator::{round_number, Operator};
use serde_json::{Map, Value as Json};
use tracing::debug;

/// One `(field, operator)` pair summed by a field indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumField {
    pub name: String,
    pub operator: Operator,
}

/// Where an indicator's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorKind {
    /// Value and total are handed in by the caller.
    Scalar,
    /// Value and total are reduced from records, one term per field.
    FieldSum(Vec<SumField>),
}

/// KPI definition: a value, optionally put in relation to a total and
/// decorated with conditional color and icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub string: Option<String>,
    pub color: Option<Condition>,
    pub icon: Option<Condition>,
    pub suffix: Option<String>,
    /// Filter the caller applies to fetch the records behind `total`
    pub total_domain: Option<Domain>,
    pub show_percent: bool,
}

impl Indicator {
    pub fn scalar() -> Self {
        Indicator {
            kind: IndicatorKind::Scalar,
            string: None,
            color: None,
            icon: None,
            suffix: None,
            total_domain: None,
            show_percent: false,
        }
    }

    pub fn field_sum(fields: Vec<SumField>) -> Self {
        Indicator {
            kind: IndicatorKind::FieldSum(fields),
            ..Self::scalar()
        }
    }

    pub fn graph_type(&self) -> GraphType {
        match self.kind {
            IndicatorKind::Scalar => GraphType::Indicator,
            IndicatorKind::FieldSum(_) => GraphType::IndicatorField,
        }
    }

    pub fn fields(&self) -> Vec<String> {
        match &self.kind {
            IndicatorKind::Scalar => Vec::new(),
            IndicatorKind::FieldSum(fields) => fields.iter().map(|f| f.name.clone()).collect(),
        }
    }

    /// Build the result for an already computed `value` and `total`.
    pub fn process(&self, value: f64, total: f64) -> Result<IndicatorResult> {
        let percent = if total != 0.0 {
            round_number(value / total * 100.0)
        } else {
            0.0
        };

        // color and icon see percent even when it is not shown
        let mut context = Map::new();
        context.insert("value".to_string(), number_to_json(value));
        context.insert("total".to_string(), number_to_json(total));
        context.insert("type".to_string(), Json::String(self.type_name().to_string()));
        context.insert("percent".to_string(), number_to_json(percent));
        if let Some(suffix) = &self.suffix {
            context.insert("suffix".to_string(), Json::String(suffix.clone()));
        }

        let color = self.color.as_ref().map(|c| c.evaluate(&context)).transpose()?;
        let icon = self.icon.as_ref().map(|c| c.evaluate(&context)).transpose()?;

        Ok(IndicatorResult {
            value,
            total,
            graph_type: self.graph_type(),
            percent: self.show_percent.then_some(percent),
            suffix: self.suffix.clone(),
            color,
            icon,
        })
    }

    /// Reduce `records` into the value and `total_records` into the total,
    /// then build the result.
    pub fn process_records(&self, records: &[Record], total_records: &[Record]) -> Result<IndicatorResult> {
        let fields = match &self.kind {
            IndicatorKind::FieldSum(fields) => fields,
            IndicatorKind::Scalar => {
                return Err(Error::Validation(
                    "A plain indicator is processed from a value and a total, not from records"
                        .to_string(),
                ))
            }
        };
        let value = sum_fields(fields, records)?;
        let total = sum_fields(fields, total_records)?;
        debug!(
            records = records.len(),
            total_records = total_records.len(),
            value,
            total,
            "processed indicator"
        );
        self.process(value, total)
    }

    fn type_name(&self) -> &'static str {
        match self.kind {
            IndicatorKind::Scalar => "indicator",
            IndicatorKind::FieldSum(_) => "indicatorField",
        }
    }
}

/// Sum over fields of the field's operator applied to its column.
fn sum_fields(fields: &[SumField], records: &[Record]) -> Result<f64> {
    let mut acc = 0.0;
    for field in fields {
        let column = records
            .iter()
            .map(|record| {
                let raw = record
                    .get(&field.name)
                    .ok_or_else(|| Error::FieldNotFound(field.name.clone()))?;
                if field.operator == Operator::Count {
                    return Ok(0.0);
                }
                as_number(raw).ok_or_else(|| Error::malformed(&field.name, raw))
            })
            .collect::<Result<Vec<f64>>>()?;
        acc += field.operator.reduce(&column)?;
    }
    Ok(acc)
}
