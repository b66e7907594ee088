use ooui::chart::ChartOptions;
use ooui::graph::{parse_graph_at, process_graph_data, Graph, GraphResult};
use ooui::{Condition, FieldCatalog, Record};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

fn read_data(name: &str) -> String {
    fs::read_to_string(data_path(name)).expect("Failed to read test fixture")
}

fn load_records(name: &str) -> Vec<Record> {
    serde_json::from_str(&read_data(name)).expect("Invalid records fixture")
}

fn load_catalog(name: &str) -> FieldCatalog {
    serde_json::from_str(&read_data(name)).expect("Invalid field catalog fixture")
}

fn clock() -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// Helper function to run ooui with arguments and optional stdin
fn run_ooui(args: &[&str], stdin: Option<&str>) -> Result<Value, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ooui"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if let Some(mut handle) = child.stdin.take() {
        if let Some(content) = stdin {
            handle
                .write_all(content.as_bytes())
                .map_err(|e| format!("Failed to write to stdin: {}", e))?;
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        serde_json::from_slice(&output.stdout).map_err(|e| format!("Invalid JSON output: {}", e))
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

fn path_arg(name: &str) -> String {
    data_path(name).to_string_lossy().into_owned()
}

// =============================================================================
// Library
// =============================================================================

#[test]
fn test_pie_chart_with_not_informed_slice() {
    let graph = parse_graph_at(&read_data("tariff_pie.xml"), clock()).unwrap();
    let records = load_records("polissa_records.json");
    assert_eq!(records.len(), 13);

    let result = process_graph_data(
        &graph,
        &records,
        &load_catalog("polissa_fields.json"),
        &ChartOptions::default(),
    )
    .unwrap();

    let result = serde_json::to_value(result).unwrap();
    assert_eq!(result["isGroup"], json!(false));
    assert_eq!(result["isStack"], json!(false));
    assert_eq!(result["type"], json!("pie"));
    assert_eq!(result["num_items"], json!(13));

    let xs: Vec<&str> = result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["x"].as_str().unwrap())
        .collect();
    assert_eq!(
        xs,
        vec![
            "Hola (EUR)",
            "Adeu (CHF)",
            "Not informed",
            "TARIFAS ELECTRICIDAD (EUR)",
            "Mucha potencia (EUR)"
        ]
    );
    assert_eq!(
        result["data"][2],
        json!({
            "x": "Not informed",
            "value": 2,
            "type": "Tarifa Comercialitzadora",
            "operator": "count",
            "stacked": null
        })
    );
}

#[test]
fn test_indicator_field_percent_over_subset() {
    let graph = parse_graph_at(&read_data("potencia_indicator.xml"), clock()).unwrap();
    let indicator = match &graph {
        Graph::Indicator(indicator) => indicator,
        other => panic!("Expected indicator, got {:?}", other),
    };
    assert_eq!(indicator.total_domain.as_ref().map(|d| d.source()), Some("[]"));

    let result = indicator
        .process_records(
            &load_records("polissa_20a_records.json"),
            &load_records("polissa_records.json"),
        )
        .unwrap();
    assert_eq!(
        serde_json::to_value(result).unwrap(),
        json!({
            "value": 77.72,
            "total": 275.72,
            "type": "indicatorField",
            "percent": 28.19,
            "suffix": "kW",
            "color": "red",
            "icon": "slack"
        })
    );
}

#[test]
fn test_line_chart_fills_day_gaps_and_ranges() {
    let graph = parse_graph_at(&read_data("lectura_line.xml"), clock()).unwrap();
    let result = process_graph_data(
        &graph,
        &load_records("lectura_gaps.json"),
        &load_catalog("lectura_fields.json"),
        &ChartOptions::default(),
    )
    .unwrap();

    let chart = match result {
        GraphResult::Chart(chart) => chart,
        other => panic!("Expected chart, got {:?}", other),
    };
    let points: Vec<(String, f64)> = chart
        .data
        .iter()
        .map(|p| (p.x.as_str().unwrap().to_string(), p.value))
        .collect();
    assert_eq!(
        points,
        vec![
            ("2024-01-01".to_string(), 15.5),
            ("2024-01-02".to_string(), 0.0),
            ("2024-01-03".to_string(), 0.0),
            ("2024-01-04".to_string(), 30.0),
        ]
    );
    assert_eq!(
        serde_json::to_value(chart.y_axis_props).unwrap(),
        json!({"mode": "auto", "valueOpts": {"min": -3, "max": 33}})
    );
    assert_eq!(chart.num_items, 3);
}

#[test]
fn test_condition_precedence() {
    let condition =
        Condition::parse_at("red:active==0;black:active==1 and meter_type=='PF'", clock()).unwrap();
    let ctx = |v: Value| v.as_object().cloned().unwrap();

    assert_eq!(
        condition.evaluate(&ctx(json!({"active": true, "meter_type": "PF"}))).unwrap(),
        Some("black".to_string())
    );
    assert_eq!(
        condition.evaluate(&ctx(json!({"active": true, "meter_type": "X"}))).unwrap(),
        None
    );
    assert_eq!(
        condition.evaluate(&ctx(json!({"active": false, "meter_type": "X"}))).unwrap(),
        Some("red".to_string())
    );
    let fields: Vec<String> = condition.involved_fields().into_iter().collect();
    assert_eq!(fields, vec!["active", "meter_type"]);
}

// =============================================================================
// Command line
// =============================================================================

#[test]
fn test_cli_line_chart_auto_range() {
    let result = run_ooui(
        &[
            &path_arg("lectura_line.xml"),
            "--fields",
            &path_arg("lectura_fields.json"),
            "--records",
            &path_arg("lectura_records.json"),
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let result = result.unwrap();
    assert_eq!(result["type"], json!("line"));
    assert_eq!(result["data"].as_array().unwrap().len(), 3);
    assert_eq!(
        result["yAxisProps"],
        json!({"mode": "auto", "valueOpts": {"min": 8, "max": 32}})
    );
}

#[test]
fn test_cli_stacked_bar_from_csv() {
    let result = run_ooui(
        &[
            &path_arg("consum_bar.xml"),
            "--fields",
            &path_arg("consum_fields.json"),
            "--records",
            &path_arg("consum_records.csv"),
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let result = result.unwrap();
    assert_eq!(result["isGroup"], json!(true));
    assert_eq!(result["isStack"], json!(true));
    assert_eq!(result["num_items"], json!(5));

    let summary: Vec<(String, String, f64)> = result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            (
                p["x"].as_str().unwrap().to_string(),
                p["type"].as_str().unwrap().to_string(),
                p["value"].as_f64().unwrap(),
            )
        })
        .collect();
    let expected = vec![
        ("2025-01", "Punta - entrada", 11.75),
        ("2025-01", "Punta - sortida", 2.5),
        ("2025-01", "Vall - entrada", 4.0),
        ("2025-01", "Vall - sortida", 1.0),
        ("2025-02", "Punta - entrada", 8.0),
        ("2025-02", "Punta - sortida", 3.0),
        ("2025-03", "Vall - entrada", 6.25),
        ("2025-03", "Vall - sortida", 0.75),
    ];
    let expected: Vec<(String, String, f64)> = expected
        .into_iter()
        .map(|(x, t, v)| (x.to_string(), t.to_string(), v))
        .collect();
    assert_eq!(summary, expected);
}

#[test]
fn test_cli_records_from_stdin() {
    let records = read_data("polissa_records.json");
    let result = run_ooui(
        &[
            &path_arg("tariff_pie.xml"),
            "--fields",
            &path_arg("polissa_fields.json"),
            "--uninformed",
            "Sense informar",
        ],
        Some(&records),
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let result = result.unwrap();
    assert!(result["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["x"] == json!("Sense informar")));
}

#[test]
fn test_cli_indicator_field_with_total_records() {
    let result = run_ooui(
        &[
            &path_arg("potencia_indicator.xml"),
            "--records",
            &path_arg("polissa_20a_records.json"),
            "--total-records",
            &path_arg("polissa_records.json"),
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let result = result.unwrap();
    assert_eq!(result["value"], json!(77.72));
    assert_eq!(result["total"], json!(275.72));
    assert_eq!(result["percent"], json!(28.19));
}

#[test]
fn test_cli_plain_indicator() {
    let result = run_ooui(
        &[&path_arg("plain_indicator.xml"), "--value", "30", "--total", "120"],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert_eq!(
        result.unwrap(),
        json!({
            "value": 30,
            "total": 120,
            "type": "indicator",
            "percent": 25,
            "color": "orange",
            "icon": "alert"
        })
    );
}

#[test]
fn test_cli_plain_indicator_needs_value() {
    let result = run_ooui(&[&path_arg("plain_indicator.xml")], None);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("--value"));
}

#[test]
fn test_cli_tree_fields_in_conditions() {
    let result = run_ooui(&[&path_arg("factures_tree.xml"), "--tree"], None);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert_eq!(
        result.unwrap(),
        json!({"colors": ["state"], "status": ["active", "amount_total"]})
    );
}

#[test]
fn test_cli_invalid_graph_type() {
    let dir = std::env::temp_dir().join(format!("ooui-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let view = dir.join("table.xml");
    fs::write(&view, r#"<graph type="table"/>"#).unwrap();

    let result = run_ooui(&[&view.to_string_lossy()], None);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("table is not a valid graph"));
}

#[test]
fn test_cli_chart_without_catalog() {
    let result = run_ooui(&[&path_arg("tariff_pie.xml")], None);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("--fields"));
}
