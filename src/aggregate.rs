use crate::error::{Error, Result};
use crate::ir::{as_number, number_to_json, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

/// Summary function of the list-view footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Sum,
    Count,
    Avg,
    Max,
    Min,
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFn::Sum => "sum",
            AggregateFn::Count => "count",
            AggregateFn::Avg => "avg",
            AggregateFn::Max => "max",
            AggregateFn::Min => "min",
        };
        f.write_str(name)
    }
}

/// Field → summary functions to compute over a record set.
pub type Definitions = BTreeMap<String, Vec<AggregateFn>>;

pub struct Aggregator<'r> {
    records: &'r [Record],
    definitions: Definitions,
}

impl<'r> Aggregator<'r> {
    pub fn new(records: &'r [Record], definitions: Definitions) -> Self {
        Aggregator { records, definitions }
    }

    /// `field → {fn → number}`, computed over the records that carry the field.
    pub fn process(&self) -> Result<Map<String, Json>> {
        let mut results = Map::new();
        for (field, functions) in &self.definitions {
            let values = self
                .records
                .iter()
                .filter_map(|record| record.get(field))
                .map(|raw| as_number(raw).ok_or_else(|| Error::malformed(field, raw)))
                .collect::<Result<Vec<f64>>>()?;

            let mut summary = Map::new();
            for function in functions {
                let value = match function {
                    AggregateFn::Sum => values.iter().sum(),
                    AggregateFn::Count => values.len() as f64,
                    AggregateFn::Avg if values.is_empty() => 0.0,
                    AggregateFn::Avg => values.iter().sum::<f64>() / values.len() as f64,
                    AggregateFn::Max => extreme(field, &values, f64::max)?,
                    AggregateFn::Min => extreme(field, &values, f64::min)?,
                };
                summary.insert(function.to_string(), number_to_json(value));
            }
            results.insert(field.clone(), Json::Object(summary));
        }
        Ok(results)
    }
}

fn extreme(field: &str, values: &[f64], pick: fn(f64, f64) -> f64) -> Result<f64> {
    values
        .iter()
        .copied()
        .reduce(pick)
        .ok_or_else(|| Error::EmptyInput(format!("no values for field '{}'", field)))
}
