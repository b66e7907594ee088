use crate::error::Result;
use crate::parser::{parse_expression, Expr};
use crate::runtime::{self, Scope, Value};
use chrono::{Local, NaiveDateTime};
use serde_json::{Map, Value as Json};
use std::fmt;

/// Literal filter expression such as `[('user_id', '=', uid)]`.
///
/// The domain is only evaluated here; applying the filter belongs to
/// whoever queries the records.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    source: String,
    expr: Option<Expr>,
}

impl Domain {
    pub fn parse(text: &str) -> Result<Self> {
        let expr = if text.trim().is_empty() {
            None
        } else {
            Some(parse_expression(text)?)
        };
        Ok(Domain {
            source: text.to_string(),
            expr,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, context: &Map<String, Json>) -> Result<Json> {
        self.evaluate_at(context, Local::now().naive_local())
    }

    /// Evaluate against `context`. `true`, `false` and `null` are bound as
    /// aliases of the literals, shadowing context keys of the same name.
    /// An empty domain evaluates to `false`.
    ///
    /// Besides `bool` and `time.strftime`, domains may build dates with
    /// `datetime` (today and now read `clock`) and parse literals with `eval`.
    pub fn evaluate_at(&self, context: &Map<String, Json>, clock: NaiveDateTime) -> Result<Json> {
        let expr = match &self.expr {
            Some(expr) => expr,
            None => return Ok(Json::Bool(false)),
        };
        let mut scope = Scope::new(clock);
        scope.enable_domain_functions();
        scope.bind_all(context);
        scope.bind("true", Value::Bool(true));
        scope.bind("false", Value::Bool(false));
        scope.bind("null", Value::None);
        Ok(runtime::evaluate(expr, &scope)?.to_json())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
