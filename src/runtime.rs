// Runtime executor for the condition/domain expression language

use crate::error::{Error, Result};
use crate::parser::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Milliseconds per `datetime.timedelta` argument, in positional order.
const DELTA_UNITS: &[(&str, f64)] = &[
    ("days", 86_400_000.0),
    ("seconds", 1_000.0),
    ("microseconds", 0.001),
    ("milliseconds", 1.0),
    ("minutes", 60_000.0),
    ("hours", 3_600_000.0),
    ("weeks", 604_800_000.0),
];
const MAX_DELTA_DAYS: f64 = 999_999_999.0;

/// Longest string a repetition may build.
pub const MAX_STRING_LENGTH: usize = 100_000;

/// Runtime value of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// `datetime.timedelta`, millisecond precision
    Delta(Duration),
    /// Stand-in for an unbound name while collecting field dependencies.
    /// Every comparison against it holds.
    Placeholder,
}

impl Value {
    pub fn from_json(v: &Json) -> Value {
        match v {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Dict(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Tuples become arrays; placeholders become null. Dates render as
    /// `%Y-%m-%d [%H:%M:%S]` strings and deltas as whole seconds.
    pub fn to_json(&self) -> Json {
        match self {
            Value::None | Value::Placeholder => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) | Value::Tuple(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Dict(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Date(d) => Json::String(d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => Json::String(dt.format(DATETIME_FORMAT).to_string()),
            Value::Delta(delta) => Json::from(delta.num_seconds()),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
            Value::Date(_) | Value::DateTime(_) => true,
            Value::Delta(delta) => *delta != Duration::zero(),
            Value::Placeholder => true,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Delta(_) => "timedelta",
            Value::Placeholder => "placeholder",
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            other => other.as_int().map(|i| i as f64),
        }
    }
}

/// Names visible to an expression, plus the frozen clock read by `time.strftime`.
#[derive(Debug, Clone)]
pub struct Scope {
    vars: HashMap<String, Value>,
    clock: NaiveDateTime,
    domain_functions: bool,
}

impl Scope {
    pub fn new(clock: NaiveDateTime) -> Self {
        Scope {
            vars: HashMap::new(),
            clock,
            domain_functions: false,
        }
    }

    /// Also allow the `datetime` constructors (`datetime.date.today()`,
    /// `datetime.timedelta(days=7)`, ...) and literal-only `eval`. Today and
    /// now read the frozen clock.
    pub fn enable_domain_functions(&mut self) {
        self.domain_functions = true;
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    /// Bind every key of a JSON object, replacing earlier bindings.
    pub fn bind_all(&mut self, context: &serde_json::Map<String, Json>) {
        for (k, v) in context {
            self.bind(k, Value::from_json(v));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn clock(&self) -> NaiveDateTime {
        self.clock
    }
}

/// Evaluate `expr` in `scope`.
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value> {
    Interpreter {
        scope,
        unbound: None,
    }
    .eval(expr)
}

/// Names `expr` reads that `scope` does not bind.
///
/// Unbound names evaluate to [`Value::Placeholder`] so that both sides of
/// every `and`/`or` are visited. Evaluation errors end the walk early but
/// keep the names collected so far.
pub fn unbound_names(expr: &Expr, scope: &Scope) -> BTreeSet<String> {
    let mut interpreter = Interpreter {
        scope,
        unbound: Some(BTreeSet::new()),
    };
    let _ = interpreter.eval(expr);
    interpreter.unbound.unwrap_or_default()
}

/// Format `clock` with a strftime pattern, rejecting unknown directives.
pub(crate) fn strftime(clock: &NaiveDateTime, fmt: &str) -> Result<String> {
    use std::fmt::Write;
    let mut out = String::new();
    write!(out, "{}", clock.format(fmt))
        .map_err(|_| Error::Evaluation(format!("invalid time format '{}'", fmt)))?;
    Ok(out)
}

struct Interpreter<'s> {
    scope: &'s Scope,
    unbound: Option<BTreeSet<String>>,
}

impl<'s> Interpreter<'s> {
    fn tracking(&self) -> bool {
        self.unbound.is_some()
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::None),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            Expr::Attribute(base, attr) => attribute(self.eval(base)?, attr),
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Keyword(name, _) => Err(Error::Evaluation(format!(
                "keyword argument '{}' outside a call",
                name
            ))),
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                subscript(base, &index)
            }
            Expr::Unary(op, operand) => unary(*op, self.eval(operand)?),
            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs)
            }
            Expr::Compare(first, links) => self.compare_chain(first, links),
            Expr::And(lhs, rhs) => self.connective(lhs, rhs, false),
            Expr::Or(lhs, rhs) => self.connective(lhs, rhs, true),
            Expr::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.is_truthy())),
        }
    }

    fn eval_all(&mut self, items: &[Expr]) -> Result<Vec<Value>> {
        items.iter().map(|e| self.eval(e)).collect()
    }

    fn lookup(&mut self, name: &str) -> Result<Value> {
        if let Some(value) = self.scope.get(name) {
            return Ok(value.clone());
        }
        match &mut self.unbound {
            Some(names) => {
                names.insert(name.to_string());
                Ok(Value::Placeholder)
            }
            None => Err(Error::Evaluation(format!("name '{}' is not defined", name))),
        }
    }

    /// `and` / `or` with operand-returning semantics: `a and b` is `a` when
    /// `a` is falsy, otherwise `b`.
    fn connective(&mut self, lhs: &Expr, rhs: &Expr, is_or: bool) -> Result<Value> {
        if self.tracking() {
            let left = self.eval(lhs);
            let right = self.eval(rhs);
            let (left, right) = (left?, right?);
            return Ok(if left.is_truthy() == is_or { left } else { right });
        }
        let left = self.eval(lhs)?;
        if left.is_truthy() == is_or {
            return Ok(left);
        }
        self.eval(rhs)
    }

    fn compare_chain(&mut self, first: &Expr, links: &[(CompareOp, Expr)]) -> Result<Value> {
        let mut left = self.eval(first)?;
        let mut holds = true;
        for (op, rhs) in links {
            let right = self.eval(rhs)?;
            let link = if left == Value::Placeholder || right == Value::Placeholder {
                true
            } else {
                compare(*op, &left, &right)?
            };
            if !link {
                holds = false;
                if !self.tracking() {
                    break;
                }
            }
            left = right;
        }
        Ok(Value::Bool(holds))
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for arg in args {
            match arg {
                Expr::Keyword(name, value) => keywords.push((name.as_str(), self.eval(value)?)),
                other => positional.push(self.eval(other)?),
            }
        }
        let path = callee.dotted_path();
        if let Some(path) = &path {
            if let Some(value) = self.builtin(path, &positional, &keywords)? {
                return Ok(value);
            }
        }
        if let Expr::Attribute(base, method) = callee {
            if METHODS.contains(&method.as_str()) {
                let base = self.eval(base)?;
                return call_method(base, method, &positional, &keywords);
            }
        }
        match path {
            Some(path) => Err(Error::Evaluation(format!("function '{}' is not allowed", path))),
            None => Err(Error::Evaluation("expression is not callable".to_string())),
        }
    }

    /// Allow-listed functions by dotted name; `None` when `path` is not one.
    fn builtin(&self, path: &str, args: &[Value], keywords: &[(&str, Value)]) -> Result<Option<Value>> {
        let allowed = FUNCTIONS.contains(&path)
            || (self.scope.domain_functions && DOMAIN_FUNCTIONS.contains(&path));
        if !allowed {
            return Ok(None);
        }
        if path == "datetime.timedelta" {
            return timedelta(args, keywords).map(Some);
        }
        let invalid = || Error::Evaluation(format!("invalid arguments for {}()", path));
        if !keywords.is_empty() {
            return Err(invalid());
        }
        if args.contains(&Value::Placeholder) {
            return Ok(Some(Value::Placeholder));
        }
        let clock = self.scope.clock();
        let value = match (path, args) {
            ("bool", []) => Value::Bool(false),
            ("bool", [value]) => Value::Bool(value.is_truthy()),
            ("time.strftime", [Value::Str(fmt)]) => Value::Str(strftime(&clock, fmt)?),
            ("datetime.date.today", []) => Value::Date(clock.date()),
            ("datetime.datetime.now", []) | ("datetime.datetime.today", []) => Value::DateTime(clock),
            ("datetime.date", [y, m, d]) => Value::Date(ymd(y, m, d).ok_or_else(invalid)?),
            ("datetime.datetime", [y, m, d, time @ ..]) if time.len() <= 3 => {
                let date = ymd(y, m, d).ok_or_else(invalid)?;
                let mut hms = [0u32; 3];
                for (slot, part) in hms.iter_mut().zip(time) {
                    *slot = part.as_int().and_then(|i| u32::try_from(i).ok()).ok_or_else(invalid)?;
                }
                Value::DateTime(date.and_hms_opt(hms[0], hms[1], hms[2]).ok_or_else(invalid)?)
            }
            ("eval", [Value::Str(source)]) => literal_eval(source, clock)?,
            _ => return Err(invalid()),
        };
        Ok(Some(value))
    }
}

const FUNCTIONS: &[&str] = &["bool", "time.strftime"];
const DOMAIN_FUNCTIONS: &[&str] = &[
    "datetime.date",
    "datetime.date.today",
    "datetime.datetime",
    "datetime.datetime.now",
    "datetime.datetime.today",
    "datetime.timedelta",
    "eval",
];

/// Methods callable on a value, e.g. `datetime.date.today().strftime('%Y')`.
const METHODS: &[&str] = &["strftime", "isoformat"];

fn call_method(base: Value, method: &str, args: &[Value], keywords: &[(&str, Value)]) -> Result<Value> {
    let invalid = || Error::Evaluation(format!("invalid arguments for {}()", method));
    if base == Value::Placeholder || args.contains(&Value::Placeholder) {
        return Ok(Value::Placeholder);
    }
    if !keywords.is_empty() {
        return Err(invalid());
    }
    let moment = match &base {
        Value::DateTime(dt) => *dt,
        Value::Date(d) => d.and_hms_opt(0, 0, 0).ok_or_else(invalid)?,
        other => {
            return Err(Error::Evaluation(format!(
                "'{}' object has no attribute '{}'",
                other.type_name(),
                method
            )))
        }
    };
    match (method, args) {
        ("strftime", [Value::Str(fmt)]) => Ok(Value::Str(strftime(&moment, fmt)?)),
        ("isoformat", []) => Ok(match base {
            Value::Date(d) => Value::Str(d.format(DATE_FORMAT).to_string()),
            _ => Value::Str(moment.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }),
        _ => Err(invalid()),
    }
}

fn ymd(y: &Value, m: &Value, d: &Value) -> Option<NaiveDate> {
    let year = i32::try_from(y.as_int()?).ok()?;
    let month = u32::try_from(m.as_int()?).ok()?;
    let day = u32::try_from(d.as_int()?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn timedelta(args: &[Value], keywords: &[(&str, Value)]) -> Result<Value> {
    if args.len() > DELTA_UNITS.len() {
        return Err(Error::Evaluation("timedelta() takes at most 7 arguments".to_string()));
    }
    let named = keywords.iter().map(|(name, value)| {
        DELTA_UNITS
            .iter()
            .find(|(unit, _)| unit == name)
            .map(|(_, millis)| (*millis, value))
            .ok_or_else(|| {
                Error::Evaluation(format!(
                    "timedelta() got an unexpected keyword argument '{}'",
                    name
                ))
            })
    });
    let positional = DELTA_UNITS.iter().zip(args).map(|((_, millis), value)| Ok((*millis, value)));

    let mut total = 0.0;
    for part in positional.chain(named) {
        let (millis, value) = part?;
        if *value == Value::Placeholder {
            return Ok(Value::Placeholder);
        }
        let amount = value.as_f64().ok_or_else(|| {
            Error::Evaluation(format!(
                "unsupported type for timedelta component: '{}'",
                value.type_name()
            ))
        })?;
        total += amount * millis;
    }
    if !total.is_finite() || total.abs() > MAX_DELTA_DAYS * 86_400_000.0 {
        return Err(Error::Evaluation("timedelta out of range".to_string()));
    }
    Duration::try_milliseconds(total.round() as i64)
        .map(Value::Delta)
        .ok_or_else(|| Error::Evaluation("timedelta out of range".to_string()))
}

/// `eval` restricted to literals: numbers, strings, booleans, `None` and
/// lists or tuples of them.
fn literal_eval(source: &str, clock: NaiveDateTime) -> Result<Value> {
    fn is_literal(expr: &Expr) -> bool {
        match expr {
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::None => true,
            Expr::List(items) | Expr::Tuple(items) => items.iter().all(is_literal),
            Expr::Unary(_, operand) => matches!(**operand, Expr::Int(_) | Expr::Float(_)),
            _ => false,
        }
    }
    let expr = crate::parser::parse_expression(source.trim())
        .map_err(|_| Error::Evaluation(format!("malformed literal '{}'", source)))?;
    if !is_literal(&expr) {
        return Err(Error::Evaluation(format!("malformed literal '{}'", source)));
    }
    evaluate(&expr, &Scope::new(clock))
}

fn attribute(base: Value, attr: &str) -> Result<Value> {
    match base {
        Value::Placeholder => Ok(Value::Placeholder),
        Value::Dict(map) => map
            .get(attr)
            .cloned()
            .ok_or_else(|| Error::Evaluation(format!("'dict' object has no attribute '{}'", attr))),
        other => Err(Error::Evaluation(format!(
            "'{}' object has no attribute '{}'",
            other.type_name(),
            attr
        ))),
    }
}

fn subscript(base: Value, index: &Value) -> Result<Value> {
    if base == Value::Placeholder || *index == Value::Placeholder {
        return Ok(Value::Placeholder);
    }
    match (&base, index) {
        (Value::List(items) | Value::Tuple(items), i) if i.as_int().is_some() => {
            let i = i.as_int().unwrap_or(0);
            let len = items.len() as i64;
            let pos = if i < 0 { i + len } else { i };
            if pos < 0 || pos >= len {
                return Err(Error::Evaluation(format!("{} index out of range", base.type_name())));
            }
            Ok(items[pos as usize].clone())
        }
        (Value::Str(s), i) if i.as_int().is_some() => {
            let i = i.as_int().unwrap_or(0);
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let pos = if i < 0 { i + len } else { i };
            if pos < 0 || pos >= len {
                return Err(Error::Evaluation("string index out of range".to_string()));
            }
            Ok(Value::Str(chars[pos as usize].to_string()))
        }
        (Value::Dict(map), Value::Str(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Evaluation(format!("key '{}' not found", key))),
        (b, i) => Err(Error::Evaluation(format!(
            "'{}' object is not subscriptable by '{}'",
            b.type_name(),
            i.type_name()
        ))),
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match (op, operand) {
        (_, Value::Placeholder) => Ok(Value::Placeholder),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Value::Float(f)) => Ok(Value::Float(f)),
        (UnaryOp::Neg, Value::Delta(delta)) => Ok(Value::Delta(-delta)),
        (UnaryOp::Pos, Value::Delta(delta)) => Ok(Value::Delta(delta)),
        (op, v) => match v.as_int() {
            Some(i) if op == UnaryOp::Pos => Ok(Value::Int(i)),
            Some(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| Error::Evaluation("integer overflow".to_string())),
            None => Err(Error::Evaluation(format!(
                "bad operand type for unary operator: '{}'",
                v.type_name()
            ))),
        },
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    if lhs == Value::Placeholder || rhs == Value::Placeholder {
        return Ok(Value::Placeholder);
    }
    match (op, &lhs, &rhs) {
        (BinaryOp::BitAnd, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
        (BinaryOp::BitAnd, a, b) => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(Value::Int(x & y)),
            _ => Ok(Value::Bool(a.is_truthy() && b.is_truthy())),
        },
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(s), n) | (BinaryOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            repeat(s, n.as_int().unwrap_or(0))
        }
        (BinaryOp::Add | BinaryOp::Sub, Value::Date(_) | Value::DateTime(_) | Value::Delta(_), _)
        | (BinaryOp::Add, _, Value::Date(_) | Value::DateTime(_)) => calendar(op, &lhs, &rhs),
        _ => arithmetic(op, &lhs, &rhs),
    }
}

fn repeat(s: &str, times: i64) -> Result<Value> {
    let times = usize::try_from(times.max(0)).unwrap_or(usize::MAX);
    match s.len().checked_mul(times) {
        Some(len) if len <= MAX_STRING_LENGTH => Ok(Value::Str(s.repeat(times))),
        _ => Err(Error::Evaluation(format!(
            "string longer than {} bytes",
            MAX_STRING_LENGTH
        ))),
    }
}

/// `+`/`-` between dates, datetimes and deltas. A date moves by whole days
/// of the delta, rounded down.
fn calendar(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    let out_of_range = || Error::Evaluation("date value out of range".to_string());
    let shift_date = |date: &NaiveDate, delta: Duration| {
        Duration::try_days(delta.num_seconds().div_euclid(86_400))
            .and_then(|days| date.checked_add_signed(days))
            .map(Value::Date)
            .ok_or_else(out_of_range)
    };
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Date(d), Value::Delta(t)) | (BinaryOp::Add, Value::Delta(t), Value::Date(d)) => {
            shift_date(d, *t)
        }
        (BinaryOp::Sub, Value::Date(d), Value::Delta(t)) => shift_date(d, -*t),
        (BinaryOp::Add, Value::DateTime(dt), Value::Delta(t))
        | (BinaryOp::Add, Value::Delta(t), Value::DateTime(dt)) => dt
            .checked_add_signed(*t)
            .map(Value::DateTime)
            .ok_or_else(out_of_range),
        (BinaryOp::Sub, Value::DateTime(dt), Value::Delta(t)) => dt
            .checked_sub_signed(*t)
            .map(Value::DateTime)
            .ok_or_else(out_of_range),
        (BinaryOp::Sub, Value::Date(a), Value::Date(b)) => Ok(Value::Delta(a.signed_duration_since(*b))),
        (BinaryOp::Sub, Value::DateTime(a), Value::DateTime(b)) => {
            Ok(Value::Delta(a.signed_duration_since(*b)))
        }
        (BinaryOp::Add, Value::Delta(a), Value::Delta(b)) => {
            a.checked_add(b).map(Value::Delta).ok_or_else(out_of_range)
        }
        (BinaryOp::Sub, Value::Delta(a), Value::Delta(b)) => {
            a.checked_sub(b).map(Value::Delta).ok_or_else(out_of_range)
        }
        _ => Err(Error::Evaluation(format!(
            "unsupported operand types for {:?}: '{}' and '{}'",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    let unsupported = || {
        Error::Evaluation(format!(
            "unsupported operand types for {:?}: '{}' and '{}'",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))
    };
    let division_by_zero = || Error::Evaluation("division by zero".to_string());

    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        let checked = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(division_by_zero());
                }
                return Ok(Value::Float(a as f64 / b as f64));
            }
            BinaryOp::Mod => {
                if b == 0 {
                    return Err(division_by_zero());
                }
                // Result takes the sign of the divisor. Only MIN % -1 wraps,
                // and its remainder is 0.
                let r = a.wrapping_rem(b);
                Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
            }
            BinaryOp::BitAnd => return Err(unsupported()),
        };
        return checked
            .map(Value::Int)
            .ok_or_else(|| Error::Evaluation("integer overflow".to_string()));
    }

    let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported()),
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(division_by_zero()),
        BinaryOp::Div => a / b,
        BinaryOp::Mod if b == 0.0 => return Err(division_by_zero()),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::BitAnd => return Err(unsupported()),
    };
    Ok(Value::Float(result))
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(values_equal(lhs, rhs)),
        CompareOp::NotEq => Ok(!values_equal(lhs, rhs)),
        CompareOp::Lt => Ok(order(lhs, rhs, "<")? == Ordering::Less),
        CompareOp::LtE => Ok(order(lhs, rhs, "<=")? != Ordering::Greater),
        CompareOp::Gt => Ok(order(lhs, rhs, ">")? == Ordering::Greater),
        CompareOp::GtE => Ok(order(lhs, rhs, ">=")? != Ordering::Less),
        CompareOp::In => contains(rhs, lhs),
        CompareOp::NotIn => contains(rhs, lhs).map(|found| !found),
        CompareOp::Is => Ok(identical(lhs, rhs)),
        CompareOp::IsNot => Ok(!identical(lhs, rhs)),
    }
}

/// Equality where numbers compare by value across int/float/bool.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::DateTime(x), Value::DateTime(y)) => x == y,
        (Value::Delta(x), Value::Delta(y)) => x == y,
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| values_equal(v, w)))
        }
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        },
    }
}

fn order(a: &Value, b: &Value, symbol: &str) -> Result<Ordering> {
    let unorderable = || {
        Error::Evaluation(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            a.type_name(),
            b.type_name()
        ))
    };
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Ok(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Ok(x.cmp(y)),
        (Value::Delta(x), Value::Delta(y)) => Ok(x.cmp(y)),
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            for (p, q) in x.iter().zip(y) {
                if !values_equal(p, q) {
                    return order(p, q, symbol);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(x.cmp(&y)),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(unorderable),
                _ => Err(unorderable()),
            },
        },
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool> {
    match (container, item) {
        (Value::List(items) | Value::Tuple(items), _) => {
            Ok(items.iter().any(|v| values_equal(v, item)))
        }
        (Value::Str(hay), Value::Str(needle)) => Ok(hay.contains(needle.as_str())),
        (Value::Dict(map), Value::Str(key)) => Ok(map.contains_key(key)),
        (Value::Dict(_), _) => Ok(false),
        (c, i) => Err(Error::Evaluation(format!(
            "'in <{}>' requires a container, got '{}'",
            c.type_name(),
            i.type_name()
        ))),
    }
}

fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        _ => false,
    }
}
