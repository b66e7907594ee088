use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::parser::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XAxis {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YAxis {
    pub name: String,
    pub operator: Operator,
    /// Secondary grouping field: one series per value of this field
    pub label: Option<String>,
    pub stacked: Option<String>,
}

/// One x axis and at least one y axis, read from `<field>` children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisModel {
    pub x: XAxis,
    pub y: Vec<YAxis>,
}

impl AxisModel {
    pub fn parse(element: &Element) -> Result<Self> {
        let mut x = None;
        let mut y = Vec::new();

        for field in element.children_named("field") {
            let name = field.get_non_empty("name");
            let axis = match field.get_non_empty("axis") {
                Some(axis) => axis,
                None => {
                    return Err(Error::Validation(format!(
                        "Field {} doesn't have an axis",
                        name.unwrap_or("None")
                    )))
                }
            };
            let name = name
                .ok_or_else(|| Error::Validation("Missing name attribute for field".to_string()))?
                .to_string();

            match axis {
                // A repeated x axis replaces the previous one
                "x" => x = Some(XAxis { name }),
                "y" => {
                    let operator = field
                        .get_non_empty("operator")
                        .ok_or_else(|| {
                            Error::Validation(format!("Field {} doesn't have an operator", name))
                        })?
                        .parse::<Operator>()?;
                    y.push(YAxis {
                        name,
                        operator,
                        label: field.get_non_empty("label").map(str::to_string),
                        stacked: field.get_non_empty("stacked").map(str::to_string),
                    });
                }
                other => {
                    return Err(Error::Validation(format!(
                        "Invalid axis value '{}'. Must be 'x' or 'y'",
                        other
                    )))
                }
            }
        }

        let x = x.ok_or_else(|| Error::Validation("No x axis found".to_string()))?;
        if y.is_empty() {
            return Err(Error::Validation(
                "No y axis found. At least one y axis is required".to_string(),
            ));
        }
        Ok(AxisModel { x, y })
    }

    pub fn is_group(&self) -> bool {
        self.y.iter().any(|y| y.label.is_some())
    }

    pub fn is_stack(&self) -> bool {
        self.y.iter().any(|y| y.stacked.is_some())
    }

    /// Distinct stacked keys, in declaration order.
    pub fn stacked_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for key in self.y.iter().filter_map(|y| y.stacked.as_deref()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}
