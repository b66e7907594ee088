use crate::operator::Operator;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One input row: field name → raw value, exactly as the data source returned it.
pub type Record = serde_json::Map<String, Json>;

// =============================================================================
// Phase 0: Field catalog
// =============================================================================

/// How a raw record value must be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// The raw value is its own label.
    Scalar,
    /// The raw value is an `[id, label]` pair, or falsy when unset.
    Reference,
    /// The raw value is a key into the ordered `(key, label)` table.
    Selection(Vec<(Json, String)>),
}

/// Catalog entry describing one field of the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawFieldDescriptor")]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    /// Human readable name of the field
    pub string: Option<String>,
}

#[derive(Deserialize)]
struct RawFieldDescriptor {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    selection: Vec<(Json, String)>,
    #[serde(default)]
    string: Option<String>,
}

impl From<RawFieldDescriptor> for FieldDescriptor {
    fn from(raw: RawFieldDescriptor) -> Self {
        let kind = match raw.kind.as_deref() {
            Some("many2one") => FieldKind::Reference,
            Some("selection") => FieldKind::Selection(raw.selection),
            _ => FieldKind::Scalar,
        };
        FieldDescriptor {
            kind,
            string: raw.string,
        }
    }
}

impl FieldDescriptor {
    pub fn scalar() -> Self {
        FieldDescriptor {
            kind: FieldKind::Scalar,
            string: None,
        }
    }

    pub fn reference() -> Self {
        FieldDescriptor {
            kind: FieldKind::Reference,
            string: None,
        }
    }

    pub fn selection<K: Into<Json>>(pairs: Vec<(K, &str)>) -> Self {
        FieldDescriptor {
            kind: FieldKind::Selection(
                pairs
                    .into_iter()
                    .map(|(k, label)| (k.into(), label.to_string()))
                    .collect(),
            ),
            string: None,
        }
    }

    pub fn with_string(mut self, string: &str) -> Self {
        self.string = Some(string.to_string());
        self
    }
}

/// Field name → descriptor. Supplied by the caller, immutable per call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    fields: HashMap<String, FieldDescriptor>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(name.to_string(), descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Display string of a field, falling back to its technical name.
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.fields.get(name).and_then(|f| f.string.as_deref()) {
            Some(s) if !s.is_empty() => s,
            _ => name,
        }
    }
}

// =============================================================================
// Phase 1: Resolution
// =============================================================================

/// A record value resolved against its field descriptor.
///
/// `value` is the grouping key (`false` when the reference/selection is unset),
/// `label` is what gets displayed (`null` when unset).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub value: Json,
    pub label: Json,
}

impl ResolvedValue {
    pub fn missing() -> Self {
        ResolvedValue {
            value: Json::Bool(false),
            label: Json::Null,
        }
    }
}

// =============================================================================
// Phase 2: Series
// =============================================================================

/// Kind of view declared by the `type` attribute of `<graph>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphType {
    Indicator,
    IndicatorField,
    Line,
    Bar,
    Pie,
}

impl GraphType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "indicator" => Some(GraphType::Indicator),
            "indicatorField" => Some(GraphType::IndicatorField),
            "line" => Some(GraphType::Line),
            "bar" => Some(GraphType::Bar),
            "pie" => Some(GraphType::Pie),
            _ => None,
        }
    }

    pub fn is_chart(&self) -> bool {
        matches!(self, GraphType::Line | GraphType::Bar | GraphType::Pie)
    }
}

/// One output datum of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// X label, `false` when the record had no value for the x field.
    pub x: Json,
    #[serde(serialize_with = "serialize_number")]
    pub value: f64,
    /// Series name
    #[serde(rename = "type")]
    pub series: Json,
    /// Absent on gap-filling placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    pub stacked: Option<String>,
}

impl SeriesPoint {
    /// Zero-valued point inserted for a time bucket with no data.
    pub fn placeholder(x: String, like: &SeriesPoint) -> Self {
        SeriesPoint {
            x: Json::String(x),
            value: 0.0,
            series: like.series.clone(),
            operator: None,
            stacked: like.stacked.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YRange {
    Auto,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueOpts {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YAxisProps {
    pub mode: YRange,
    #[serde(rename = "valueOpts", skip_serializing_if = "Option::is_none")]
    pub value_opts: Option<ValueOpts>,
}

/// Final, rendering-ready chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartResult {
    pub data: Vec<SeriesPoint>,
    #[serde(rename = "isGroup")]
    pub is_group: bool,
    #[serde(rename = "isStack")]
    pub is_stack: bool,
    #[serde(rename = "type")]
    pub graph_type: GraphType,
    pub num_items: usize,
    #[serde(rename = "yAxisProps", skip_serializing_if = "Option::is_none")]
    pub y_axis_props: Option<YAxisProps>,
}

/// KPI summary produced by indicator views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResult {
    #[serde(serialize_with = "serialize_number")]
    pub value: f64,
    #[serde(serialize_with = "serialize_number")]
    pub total: f64,
    #[serde(rename = "type")]
    pub graph_type: GraphType,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_number"
    )]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// `Some(None)` when a color condition is configured but no clause matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
}

// =============================================================================
// JSON value helpers
// =============================================================================

/// Integral numbers become JSON integers, everything else a JSON float.
pub fn number_to_json(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Json::from(n as i64)
    } else {
        Json::from(n)
    }
}

fn serialize_number<S: Serializer>(n: &f64, s: S) -> Result<S::Ok, S::Error> {
    number_to_json(*n).serialize(s)
}

fn serialize_opt_number<S: Serializer>(n: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    n.map(number_to_json).serialize(s)
}

/// Truthiness of a raw value: null, false, 0, "" and empty containers are falsy.
pub fn is_truthy(v: &Json) -> bool {
    match v {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(a) => !a.is_empty(),
        Json::Object(o) => !o.is_empty(),
    }
}

/// Numeric view of a raw value. Booleans count as 0/1.
pub fn as_number(v: &Json) -> Option<f64> {
    match v {
        Json::Number(n) => n.as_f64(),
        Json::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Equality where `1`, `1.0` and `true` are the same key.
pub fn json_eq(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Number(_), Json::Number(_) | Json::Bool(_))
        | (Json::Bool(_), Json::Number(_)) => as_number(a) == as_number(b),
        _ => a == b,
    }
}

/// Text rendering used when values are composed into strings.
pub fn display(v: &Json) -> String {
    match v {
        Json::Null => "None".to_string(),
        Json::Bool(true) => "True".to_string(),
        Json::Bool(false) => "False".to_string(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Hashable identity of a grouping value; numerically equal values share a key.
pub(crate) fn canonical_key(v: &Json) -> String {
    match v {
        Json::Number(_) | Json::Bool(_) => match as_number(v) {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("#{}", f as i64),
            Some(f) => format!("#{}", f),
            None => format!("#{}", v),
        },
        Json::String(s) => format!("s:{}", s),
        other => other.to_string(),
    }
}

/// Ordering of x values; falsy values sort as the empty string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    pub fn of(v: &Json) -> Self {
        if !is_truthy(v) {
            return SortKey::Text(String::new());
        }
        match v {
            Json::Number(_) | Json::Bool(_) => SortKey::Number(as_number(v).unwrap_or(0.0)),
            Json::String(s) => SortKey::Text(s.clone()),
            other => SortKey::Text(other.to_string()),
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_deserializes_kinds() {
        let catalog: FieldCatalog = serde_json::from_value(json!({
            "partner": {"type": "many2one", "string": "Partner"},
            "state": {"type": "selection", "selection": [["draft", "Draft"], ["done", "Done"]]},
            "amount": {"type": "float"},
            "name": {}
        }))
        .unwrap();

        assert_eq!(catalog.get("partner").unwrap().kind, FieldKind::Reference);
        assert_eq!(catalog.get("amount").unwrap().kind, FieldKind::Scalar);
        assert_eq!(catalog.get("name").unwrap().kind, FieldKind::Scalar);
        match &catalog.get("state").unwrap().kind {
            FieldKind::Selection(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[1], (json!("done"), "Done".to_string()));
            }
            other => panic!("Expected selection, got {:?}", other),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_field_name() {
        let catalog = FieldCatalog::new()
            .with("sales", FieldDescriptor::scalar().with_string("Sales Amount"))
            .with("losses", FieldDescriptor::scalar().with_string(""))
            .with("inventory", FieldDescriptor::scalar());
        assert_eq!(catalog.display_name("sales"), "Sales Amount");
        assert_eq!(catalog.display_name("losses"), "losses");
        assert_eq!(catalog.display_name("inventory"), "inventory");
        assert_eq!(catalog.display_name("unknown"), "unknown");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!([1, "A"])));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(-2)));
    }

    #[test]
    fn test_number_serialization() {
        assert_eq!(number_to_json(8.0), json!(8));
        assert_eq!(number_to_json(77.72), json!(77.72));
        assert_eq!(number_to_json(-3.0), json!(-3));
    }

    #[test]
    fn test_canonical_key_merges_numeric_forms() {
        assert_eq!(canonical_key(&json!(1)), canonical_key(&json!(1.0)));
        assert_eq!(canonical_key(&json!(false)), canonical_key(&json!(0)));
        assert_ne!(canonical_key(&json!(1)), canonical_key(&json!("1")));
    }

    #[test]
    fn test_sort_key_orders_falsy_first() {
        let mut keys = vec![
            SortKey::of(&json!("2024-02")),
            SortKey::of(&json!(false)),
            SortKey::of(&json!("2024-01")),
        ];
        keys.sort();
        assert_eq!(keys[0], SortKey::Text(String::new()));
        assert_eq!(keys[1], SortKey::Text("2024-01".into()));
    }

    #[test]
    fn test_series_point_serialization() {
        let point = SeriesPoint {
            x: json!("A"),
            value: 2.0,
            series: json!("Tarifa"),
            operator: Some(Operator::Count),
            stacked: None,
        };
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({"x": "A", "value": 2, "type": "Tarifa", "operator": "count", "stacked": null})
        );

        let gap = SeriesPoint::placeholder("2024-05-02".into(), &point);
        assert_eq!(
            serde_json::to_value(&gap).unwrap(),
            json!({"x": "2024-05-02", "value": 0, "type": "Tarifa", "stacked": null})
        );
    }

    #[test]
    fn test_indicator_result_serialization_keeps_unmatched_color() {
        let result = IndicatorResult {
            value: 50.0,
            total: 100.0,
            graph_type: GraphType::Indicator,
            percent: None,
            suffix: None,
            color: Some(None),
            icon: None,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"value": 50, "total": 100, "type": "indicator", "color": null})
        );
    }
}
