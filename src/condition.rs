use crate::error::{Error, Result};
use crate::parser::{parse_expression, Expr};
use crate::runtime::{self, strftime, Scope, Value};
use chrono::{Local, NaiveDateTime};
use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;
use std::fmt;

/// One `label:expression` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionCase {
    pub label: String,
    /// Expression text as written
    pub source: String,
    expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Clauses {
    /// No `:` at all, the text is its own result
    Literal(String),
    Cases(Vec<ConditionCase>),
}

/// `"label:expr;label:expr;..."` selector used for conditional colors,
/// icons and row status.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    clauses: Clauses,
    clock: NaiveDateTime,
    current_date: String,
}

impl Condition {
    /// Parse with the clock frozen at the current local time.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_at(text, Local::now().naive_local())
    }

    /// Parse with an explicit clock; `current_date` and `time.strftime`
    /// read this instant for the lifetime of the condition.
    pub fn parse_at(text: &str, clock: NaiveDateTime) -> Result<Self> {
        let clauses = if !text.contains(':') {
            Clauses::Literal(text.to_string())
        } else {
            let mut cases = Vec::new();
            for sentence in text.trim().split(';') {
                if sentence.trim().is_empty() {
                    continue;
                }
                // Split on the first colon so expressions may contain more
                let (label, source) = sentence.split_once(':').ok_or_else(|| {
                    Error::Validation(format!("Condition clause '{}' has no label", sentence.trim()))
                })?;
                let source = source.trim();
                let expr = parse_expression(source)?;
                cases.push(ConditionCase {
                    label: label.trim().to_string(),
                    source: source.to_string(),
                    expr,
                });
            }
            Clauses::Cases(cases)
        };

        Ok(Condition {
            clauses,
            clock,
            current_date: strftime(&clock, "%Y-%m-%d")?,
        })
    }

    /// Clauses in declared order; empty for a bare literal.
    pub fn cases(&self) -> &[ConditionCase] {
        match &self.clauses {
            Clauses::Literal(_) => &[],
            Clauses::Cases(cases) => cases,
        }
    }

    fn base_scope(&self) -> Scope {
        let mut scope = Scope::new(self.clock);
        scope.bind("current_date", Value::Str(self.current_date.clone()));
        scope
    }

    /// Label of the first clause that holds for `context`, if any.
    pub fn evaluate(&self, context: &Map<String, Json>) -> Result<Option<String>> {
        let cases = match &self.clauses {
            Clauses::Literal(label) => return Ok(Some(label.clone())),
            Clauses::Cases(cases) => cases,
        };
        let mut scope = self.base_scope();
        scope.bind_all(context);
        for case in cases {
            if runtime::evaluate(&case.expr, &scope)?.is_truthy() {
                return Ok(Some(case.label.clone()));
            }
        }
        Ok(None)
    }

    /// Every name the clauses read from the context.
    pub fn involved_fields(&self) -> BTreeSet<String> {
        let scope = self.base_scope();
        self.cases()
            .iter()
            .flat_map(|case| runtime::unbound_names(&case.expr, &scope))
            .collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.clauses {
            Clauses::Literal(text) => f.write_str(text),
            Clauses::Cases(cases) => {
                let parts: Vec<String> = cases
                    .iter()
                    .map(|c| format!("{}:{}", c.label, c.source))
                    .collect();
                f.write_str(&parts.join(";"))
            }
        }
    }
}
