//! Text rendering of query results.
//!
//! Verbosity decides how many node and edge lines are printed. The counts
//! in each summary line always cover every result.

use colored::Colorize;
use heapscope_graph::{
    BuildReport, CommonNodes, EdgeFilter, HeapEdge, HeapGraph, HeapNode, NodeFilter, PathSearch,
    RetainedSet, Trace, TraceDirection, Verbosity,
};

const INDENT: &str = "   ";

/// Display settings shared by every renderer.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub verbosity: Verbosity,
    pub user_id_threshold: u64,
}

impl View {
    fn shows_detail(&self) -> bool {
        !self.verbosity.is_silent()
    }

    fn shows_node(&self, node: &HeapNode, hides_system: bool) -> bool {
        match self.verbosity {
            Verbosity::Silent => false,
            Verbosity::Normal => !hides_system || node.id >= self.user_id_threshold,
            Verbosity::Verbose => true,
        }
    }
}

fn node_line(node: &HeapNode, depth: Option<usize>) -> String {
    match depth {
        Some(depth) => format!("{} depth={}", node, depth),
        None => node.to_string(),
    }
}

fn print_node(node: &HeapNode) {
    println!("{}{}", INDENT, node_line(node, None));
}

fn print_edge(edge: &HeapEdge) {
    println!("{}{}", INDENT, edge);
}

fn footer(count: usize, noun: &str) {
    println!("{}({} {} found.)\n", INDENT, count.to_string().cyan(), noun);
}

pub fn build_report(graph: &HeapGraph, report: &BuildReport, view: View) {
    println!(
        "{} Found {} nodes.",
        "✓".green(),
        report.node_count.to_string().cyan()
    );
    println!("{}Total heap size: {} bytes.", INDENT, report.total_size);
    println!(
        "{} Found {} edges ({} of which are unique).",
        "✓".green(),
        report.raw_edge_count.to_string().cyan(),
        report.unique_edge_count
    );

    let stats = graph.stats();
    println!(
        "{}Roots: {}  Leaves: {}",
        INDENT, stats.roots, stats.leaves
    );

    if !report.conflicts.is_empty() {
        println!(
            "{} {} duplicate edge(s) disagree with the first copy:",
            "⚠".yellow(),
            report.conflicts.len()
        );
        if view.shows_detail() {
            let shown = if view.verbosity.is_verbose() { usize::MAX } else { 5 };
            for conflict in report.conflicts.iter().take(shown) {
                println!("{}kept    {}", INDENT, conflict.kept);
                println!("{}dropped {}", INDENT, conflict.dropped.to_string().dimmed());
            }
            if report.conflicts.len() > shown {
                println!("{}... and {} more", INDENT, report.conflicts.len() - shown);
            }
        }
    }
    println!();
}

pub fn node_listing(filter: &NodeFilter, nodes: &[&HeapNode], view: View) {
    println!("{}:", filter.to_string().bold());
    let hides_system = filter.hides_system_nodes();
    for node in nodes.iter().filter(|n| view.shows_node(n, hides_system)) {
        print_node(node);
    }
    footer(nodes.len(), "nodes");
}

pub fn edge_listing(filter: &EdgeFilter, edges: &[&HeapEdge], view: View) {
    println!("{}:", filter.to_string().bold());
    // Named edges run into the hundreds; only list them all when asked.
    let show = match filter {
        EdgeFilter::WithName => view.verbosity.is_verbose(),
        EdgeFilter::NameIn { .. } => view.shows_detail(),
    };
    if show {
        for edge in edges {
            print_edge(edge);
        }
    }
    footer(edges.len(), "edges");
}

fn direction_words(direction: TraceDirection) -> &'static str {
    match direction {
        TraceDirection::Up => "upwards (ie, through 'from' edges)",
        TraceDirection::Down => "downwards (ie, through 'to' edges)",
    }
}

pub fn trace(graph: &HeapGraph, trace: &Trace, view: View) {
    println!(
        "{} {} {}:",
        "Tracing node".bold(),
        trace.start.to_string().cyan(),
        direction_words(trace.direction)
    );
    if view.shows_detail() {
        for node in trace.nodes.iter().filter_map(|id| graph.get_by_id(*id)) {
            print_node(node);
        }
    }
    footer(trace.len(), "nodes");
}

pub fn retained(graph: &HeapGraph, set: &RetainedSet, view: View) {
    println!(
        "{} {} {}:",
        "Tracing node".bold(),
        set.root.to_string().cyan(),
        "down through retained children"
    );

    if view.shows_detail() {
        for retained in &set.nodes {
            let Some(node) = graph.get_by_id(retained.id) else {
                continue;
            };
            if retained.depth == 0 {
                println!("{}Starting node: {}", INDENT, node_line(node, Some(0)));
                continue;
            }
            // Zero-size retained nodes are mostly bookkeeping; show them when verbose.
            if node.size > 0 || view.verbosity.is_verbose() {
                println!(
                    "{}{} {}",
                    INDENT,
                    node_line(node, Some(retained.depth)),
                    "RETAINED".green()
                );
            }
        }
    }

    println!("{}Finished.", INDENT);
    println!("{}{}Nodes retained: {}", INDENT, INDENT, set.node_count());
    println!(
        "{}{}Nodes with non-zero size retained: {}",
        INDENT, INDENT, set.sized_node_count
    );
    println!(
        "{}{}Memory retained: {} bytes",
        INDENT,
        INDENT,
        set.retained_size.to_string().cyan()
    );
    println!("{}{}Maximum node depth: {}", INDENT, INDENT, set.max_depth);
    println!(
        "{}{}Maximum processing queue length: {}\n",
        INDENT, INDENT, set.max_queue_length
    );
}

pub fn paths(search: &PathSearch, view: View) {
    println!(
        "{} {} and {}:",
        "Finding paths between".bold(),
        search.start.to_string().cyan(),
        search.target.to_string().cyan()
    );

    if view.shows_detail() {
        for path in &search.paths {
            println!("{}Path found: {}", INDENT, path);
            if view.verbosity.is_verbose() {
                for hop in &path.hops {
                    println!("{}{}{}", INDENT, INDENT, hop.to_string().dimmed());
                }
            }
        }
    }

    println!("{}Finished.", INDENT);
    println!(
        "{}{}{} path(s) searched.",
        INDENT, INDENT, search.paths_searched
    );
    println!(
        "{}{}{} path(s) found between specified nodes (max length {}).\n",
        INDENT,
        INDENT,
        search.paths_found().to_string().cyan(),
        search.max_length
    );
}

pub fn common(graph: &HeapGraph, common: &CommonNodes, view: View) {
    println!(
        "{} '{}' edges of both {} and {}:",
        "Finding nodes reachable via".bold(),
        common.direction.edge_list(),
        common.first.to_string().cyan(),
        common.second.to_string().cyan()
    );
    if view.shows_detail() {
        for node in common.nodes.iter().filter_map(|id| graph.get_by_id(*id)) {
            print_node(node);
        }
    }
    footer(common.nodes.len(), "node(s)");
}

/// A query from a plan that could not run.
pub fn skipped(label: &str, reason: &dyn std::fmt::Display) {
    println!("{} {} skipped: {}\n", "⚠".yellow(), label, reason);
}
