use anyhow::{bail, Context, Result};
use clap::Parser;
use ooui::chart::ChartOptions;
use ooui::graph::{self, Graph, GraphResult};
use ooui::indicator::IndicatorKind;
use ooui::{csv_reader, FieldCatalog, Record, Tree};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ooui")]
#[command(about = "Process records through a graph or tree view definition", long_about = None)]
struct Args {
    #[arg(help = "XML view definition containing a <graph> (or <tree> with --tree)")]
    view: PathBuf,

    #[arg(long = "fields", help = "JSON field catalog: name -> {type, selection, string}")]
    fields: Option<PathBuf>,

    #[arg(long = "records", help = "Records file, JSON array or CSV (reads stdin when omitted)")]
    records: Option<PathBuf>,

    #[arg(long = "csv", help = "Parse records as CSV regardless of file extension")]
    csv: bool,

    #[arg(long = "total-records", help = "Records that make up the total of an indicatorField")]
    total_records: Option<PathBuf>,

    #[arg(long = "value", help = "Value of a plain indicator")]
    value: Option<f64>,

    #[arg(long = "total", default_value = "0", help = "Total of a plain indicator")]
    total: f64,

    #[arg(long = "uninformed", help = "Label for pie slices without an x value")]
    uninformed: Option<String>,

    #[arg(long = "tree", help = "Print the fields used by the tree view's conditions")]
    tree: bool,

    #[arg(long = "pretty", help = "Pretty-print the JSON output")]
    pretty: bool,

    #[arg(short = 'v', long = "verbose", help = "Log debug output to stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let xml = fs::read_to_string(&args.view)
        .with_context(|| format!("Failed to read view '{}'", args.view.display()))?;

    let output = if args.tree {
        let tree = Tree::parse(&xml).context("Failed to parse tree view")?;
        let fields = tree
            .fields_in_conditions()
            .context("Failed to parse tree conditions")?;
        serde_json::to_value(fields)?
    } else {
        let graph = graph::parse_graph(&xml).context("Failed to parse graph view")?;
        serde_json::to_value(run_graph(&graph, &args)?)?
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", rendered).context("Failed to write result to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_graph(graph: &Graph, args: &Args) -> Result<GraphResult> {
    if let Graph::Indicator(indicator) = graph {
        match indicator.kind {
            IndicatorKind::Scalar => {
                let value = match args.value {
                    Some(value) => value,
                    None => bail!("A plain indicator needs --value (and optionally --total)"),
                };
                let result = indicator
                    .process(value, args.total)
                    .context("Failed to process indicator")?;
                return Ok(GraphResult::Indicator(result));
            }
            IndicatorKind::FieldSum(_) => {
                let records = read_records(args.records.as_deref(), args.csv)?;
                let total_records = match &args.total_records {
                    Some(path) => read_records(Some(path.as_path()), args.csv)?,
                    None => Vec::new(),
                };
                let result = indicator
                    .process_records(&records, &total_records)
                    .context("Failed to process indicator records")?;
                return Ok(GraphResult::Indicator(result));
            }
        }
    }

    let catalog = match &args.fields {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read field catalog '{}'", path.display()))?;
            serde_json::from_str::<FieldCatalog>(&text).context("Failed to parse field catalog")?
        }
        None => bail!("Chart views need a field catalog (--fields)"),
    };
    let records = read_records(args.records.as_deref(), args.csv)?;
    let mut options = ChartOptions::default();
    if let Some(uninformed) = &args.uninformed {
        options.uninformed_string = uninformed.clone();
    }

    graph::process_graph_data(graph, &records, &catalog, &options).context("Failed to process chart data")
}

fn read_records(path: Option<&Path>, force_csv: bool) -> Result<Vec<Record>> {
    let (text, is_csv) = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read records '{}'", path.display()))?;
            let is_csv = force_csv || path.extension().map_or(false, |ext| ext == "csv");
            (text, is_csv)
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read records from stdin")?;
            (text, force_csv)
        }
    };

    let records = if is_csv {
        csv_reader::read_records(text.as_bytes()).context("Failed to parse CSV records")?
    } else {
        serde_json::from_str::<Vec<Record>>(&text).context("Failed to parse JSON records")?
    };
    debug!(records = records.len(), csv = is_csv, "read records");
    Ok(records)
}
