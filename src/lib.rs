// Library exports for ooui

pub mod csv_reader;
pub mod error;
pub mod parser;
pub mod runtime;

// Graph pipeline
pub mod ir;
pub mod operator;
pub mod resolve;
pub mod transform;
pub mod timerange;
pub mod axis;
pub mod scale;
pub mod chart;
pub mod indicator;
pub mod graph;

// Expressions on views
pub mod condition;
pub mod domain;
pub mod tree;
pub mod aggregate;

pub use chart::{Chart, ChartOptions};
pub use condition::Condition;
pub use domain::Domain;
pub use error::{Error, Result};
pub use graph::{parse_graph, parse_graph_at, process_graph_data, Graph, GraphResult};
pub use indicator::{Indicator, IndicatorKind};
pub use ir::{ChartResult, FieldCatalog, FieldDescriptor, GraphType, IndicatorResult, Record};
pub use operator::Operator;
pub use tree::Tree;
