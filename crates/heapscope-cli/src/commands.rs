//! CLI command implementations.

use crate::plan::{AnalysisPlan, Listing, PlanQuery};
use crate::render::{self, View};
use colored::Colorize;
use heapscope_core::{HeapId, Snapshot};
use heapscope_graph::{
    BuildReport, GraphBuilder, GraphError, HeapGraph, QueryConfig, TraceDirection, Verbosity,
    DEFAULT_USER_ID_THRESHOLD,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Options every command shares.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Settings {
    fn config(&self) -> QueryConfig {
        QueryConfig::default().with_verbosity(self.verbosity)
    }

    fn view(&self) -> View {
        View {
            verbosity: self.verbosity,
            user_id_threshold: DEFAULT_USER_ID_THRESHOLD,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reads the snapshot and builds the graph.
pub fn load_graph(path: &Path, settings: &Settings) -> Result<(HeapGraph, BuildReport)> {
    let start = Instant::now();

    let spinner = if settings.verbosity.is_silent() || settings.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Reading {}...", path.display()));

    let snapshot = Snapshot::from_path(path);
    spinner.set_message("Building graph...");
    let built = snapshot
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|s| GraphBuilder::from_snapshot(s).map_err(Into::into));

    spinner.finish_and_clear();

    let (graph, report) = built?;
    info!(
        "Loaded {} in {}ms",
        path.display(),
        start.elapsed().as_millis()
    );

    Ok((graph, report))
}

/// Print graph statistics and duplicate-edge conflicts.
pub fn summary(path: &Path, settings: &Settings) -> Result<()> {
    let (graph, report) = load_graph(path, settings)?;

    if settings.json {
        return print_json(&serde_json::json!({
            "stats": graph.stats(),
            "report": report,
        }));
    }

    render::build_report(&graph, &report, settings.view());
    Ok(())
}

/// Trace ancestors or descendants of a node.
pub fn trace(path: &Path, id: HeapId, direction: TraceDirection, settings: &Settings) -> Result<()> {
    let (graph, _) = load_graph(path, settings)?;
    let trace = graph.trace(id, direction, &settings.config())?;

    if settings.json {
        return print_json(&trace);
    }

    render::trace(&graph, &trace, settings.view());
    Ok(())
}

/// Compute the nodes a node retains.
pub fn retained(
    path: &Path,
    id: HeapId,
    max_queue: Option<usize>,
    settings: &Settings,
) -> Result<()> {
    let (graph, _) = load_graph(path, settings)?;

    let mut config = settings.config();
    if let Some(limit) = max_queue {
        config = config.with_max_queue_length(limit);
    }
    let set = graph.retained_set(id, &config)?;

    if settings.json {
        return print_json(&set);
    }

    render::retained(&graph, &set, settings.view());
    Ok(())
}

/// Find paths between two nodes.
pub fn paths(
    path: &Path,
    from: HeapId,
    to: HeapId,
    max_length: Option<usize>,
    settings: &Settings,
) -> Result<()> {
    let (graph, _) = load_graph(path, settings)?;
    let search = graph.find_paths(from, to, max_length, &settings.config())?;

    if settings.json {
        return print_json(&search);
    }

    render::paths(&search, settings.view());
    Ok(())
}

/// Find nodes reachable from both of two nodes.
pub fn common(
    path: &Path,
    first: HeapId,
    second: HeapId,
    direction: TraceDirection,
    settings: &Settings,
) -> Result<()> {
    let (graph, _) = load_graph(path, settings)?;
    let common = graph.find_common(first, second, direction, &settings.config())?;

    if settings.json {
        return print_json(&common);
    }

    render::common(&graph, &common, settings.view());
    Ok(())
}

/// Run a single filter listing.
pub fn list(path: &Path, listing: &Listing, settings: &Settings) -> Result<()> {
    let (graph, _) = load_graph(path, settings)?;

    match listing {
        Listing::Nodes(filter) => {
            let nodes = graph.filter_nodes(filter);
            if settings.json {
                return print_json(&serde_json::json!({
                    "filter": filter,
                    "count": nodes.len(),
                    "nodes": nodes,
                }));
            }
            render::node_listing(filter, &nodes, settings.view());
        }
        Listing::Edges(filter) => {
            let edges = graph.filter_edges(filter);
            if settings.json {
                return print_json(&serde_json::json!({
                    "filter": filter,
                    "count": edges.len(),
                    "edges": edges,
                }));
            }
            render::edge_listing(filter, &edges, settings.view());
        }
    }

    Ok(())
}

/// How a plan run went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    pub completed: usize,
    pub skipped: usize,
}

/// Run every query of an analysis plan.
pub fn analyze(path: &Path, plan_path: Option<&Path>, settings: &Settings) -> Result<()> {
    let (plan, source) = AnalysisPlan::discover(plan_path)?;
    match source {
        Some(ref source) => info!("Running plan {}", source.display()),
        None => info!("Running built-in plan"),
    }

    let (graph, report) = load_graph(path, settings)?;

    let mut config = settings.config();
    if let Some(limit) = plan.max_queue_length {
        config = config.with_max_queue_length(limit);
    }
    if let Some(limit) = plan.max_path_length {
        config = config.with_max_path_length(limit);
    }
    let view = View {
        verbosity: settings.verbosity,
        user_id_threshold: plan.user_id_threshold,
    };

    let outcome = run_plan(&graph, &report, &plan, &config, view)?;

    println!(
        "{} Finished: {} queries run, {} skipped.",
        "✓".green(),
        outcome.completed.to_string().cyan(),
        outcome.skipped
    );

    Ok(())
}

/// Runs the plan's queries in order against an already built graph.
///
/// Queries that fail with a per-query error are reported and skipped;
/// the rest still run.
pub fn run_plan(
    graph: &HeapGraph,
    report: &BuildReport,
    plan: &AnalysisPlan,
    config: &QueryConfig,
    view: View,
) -> Result<PlanOutcome> {
    let mut outcome = PlanOutcome::default();

    for query in &plan.queries {
        match run_query(graph, report, plan, query, config, view) {
            Ok(()) => outcome.completed += 1,
            Err(err) if err.is_query_error() => {
                render::skipped(&query_label(query), &err);
                outcome.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(outcome)
}

fn run_query(
    graph: &HeapGraph,
    report: &BuildReport,
    plan: &AnalysisPlan,
    query: &PlanQuery,
    config: &QueryConfig,
    view: View,
) -> std::result::Result<(), GraphError> {
    if let Some(listing) = query.listing(&plan.symbols) {
        match listing {
            Listing::Nodes(filter) => {
                render::node_listing(&filter, &graph.filter_nodes(&filter), view)
            }
            Listing::Edges(filter) => {
                render::edge_listing(&filter, &graph.filter_edges(&filter), view)
            }
        }
        return Ok(());
    }

    match query {
        PlanQuery::Summary => render::build_report(graph, report, view),
        PlanQuery::TraceUp { id } => render::trace(graph, &graph.trace_up(*id, config)?, view),
        PlanQuery::TraceDown { id } => {
            render::trace(graph, &graph.trace_down(*id, config)?, view)
        }
        PlanQuery::Retained { id } => {
            render::retained(graph, &graph.retained_set(*id, config)?, view)
        }
        PlanQuery::Common {
            first,
            second,
            direction,
        } => render::common(
            graph,
            &graph.find_common(*first, *second, *direction, config)?,
            view,
        ),
        PlanQuery::Paths {
            from,
            to,
            max_length,
        } => render::paths(&graph.find_paths(*from, *to, *max_length, config)?, view),
        // Listings were handled above.
        _ => {}
    }

    Ok(())
}

fn query_label(query: &PlanQuery) -> String {
    match query {
        PlanQuery::TraceUp { id } => format!("trace up from {}", id),
        PlanQuery::TraceDown { id } => format!("trace down from {}", id),
        PlanQuery::Retained { id } => format!("retained set of {}", id),
        PlanQuery::Common {
            first,
            second,
            direction,
        } => format!("common {} of {} and {}", direction, first, second),
        PlanQuery::Paths { from, to, .. } => format!("paths from {} to {}", from, to),
        other => format!("{:?}", other),
    }
}
