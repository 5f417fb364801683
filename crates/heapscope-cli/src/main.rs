//! Heapscope CLI - Command-line interface for Heapscope
//!
//! Loads a heap snapshot and answers retention questions about it: what
//! holds a node, what it holds, what it retains, and how two nodes connect.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use heapscope_core::HeapId;
use heapscope_graph::{EdgeFilter, NodeFilter, TraceDirection, Verbosity};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod plan;
mod render;

use commands::Settings;
use plan::Listing;

#[derive(Parser)]
#[command(name = "heapscope")]
#[command(author = "Heapscope Contributors")]
#[command(version)]
#[command(about = "Retention analysis for heap snapshots", long_about = None)]
struct Cli {
    /// Only print results and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every node and edge, plus traversal diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Silent
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show node, edge and duplicate-edge counts
    Summary {
        snapshot: PathBuf,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// List every node reachable from a node
    Trace {
        snapshot: PathBuf,

        id: HeapId,

        /// up follows "from" edges, down follows "to" edges
        #[arg(short, long, default_value = "up")]
        direction: TraceDirection,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Compute the nodes freed along with a node
    Retained {
        snapshot: PathBuf,

        id: HeapId,

        /// Give up once the work queue grows past this many entries
        #[arg(long)]
        max_queue: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Find paths between two nodes, following edges either way
    Paths {
        snapshot: PathBuf,

        from: HeapId,

        to: HeapId,

        /// Longest path to report, in nodes
        #[arg(short, long)]
        max_length: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Find nodes reachable from both of two nodes
    Common {
        snapshot: PathBuf,

        first: HeapId,

        second: HeapId,

        /// up follows "from" edges, down follows "to" edges
        #[arg(short, long, default_value = "up")]
        direction: TraceDirection,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// List nodes or edges matching one filter
    List {
        snapshot: PathBuf,

        #[command(flatten)]
        filter: ListFilter,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Run an analysis plan over a snapshot
    Analyze {
        snapshot: PathBuf,

        /// Plan file (defaults to the user plan, then the built-in one)
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ListFilter {
    /// Nodes with a source representation
    #[arg(long)]
    with_repr: bool,

    /// Nodes whose representation is one of these symbols
    #[arg(long, value_delimiter = ',')]
    repr_in: Option<Vec<String>>,

    /// Nodes with a source position
    #[arg(long)]
    with_position: bool,

    /// Nodes of this type
    #[arg(long = "type")]
    kind: Option<String>,

    /// Edges with a name
    #[arg(long)]
    named_edges: bool,

    /// Edges whose name is one of these symbols
    #[arg(long, value_delimiter = ',')]
    edge_name_in: Option<Vec<String>>,

    /// Nodes with no incoming edges
    #[arg(long)]
    roots: bool,

    /// Nodes with no outgoing edges
    #[arg(long)]
    leaves: bool,

    /// Nodes with no edges at all
    #[arg(long)]
    unlinked: bool,

    /// Nodes with at least this many outgoing edges
    #[arg(long)]
    many_to: Option<usize>,

    /// Nodes with at least this many incoming edges
    #[arg(long)]
    many_from: Option<usize>,

    /// Nodes larger than this many bytes
    #[arg(long)]
    size_above: Option<u64>,
}

impl ListFilter {
    fn into_listing(self) -> Listing {
        if let Some(symbols) = self.repr_in {
            return Listing::Nodes(NodeFilter::ReprIn { symbols });
        }
        if let Some(kind) = self.kind {
            return Listing::Nodes(NodeFilter::OfType { kind });
        }
        if let Some(symbols) = self.edge_name_in {
            return Listing::Edges(EdgeFilter::NameIn { symbols });
        }
        if let Some(at_least) = self.many_to {
            return Listing::Nodes(NodeFilter::ManyTo { at_least });
        }
        if let Some(at_least) = self.many_from {
            return Listing::Nodes(NodeFilter::ManyFrom { at_least });
        }
        if let Some(bytes) = self.size_above {
            return Listing::Nodes(NodeFilter::SizeAbove { bytes });
        }

        if self.with_repr {
            Listing::Nodes(NodeFilter::WithRepr)
        } else if self.with_position {
            Listing::Nodes(NodeFilter::WithPosition)
        } else if self.named_edges {
            Listing::Edges(EdgeFilter::WithName)
        } else if self.roots {
            Listing::Nodes(NodeFilter::Roots)
        } else if self.leaves {
            Listing::Nodes(NodeFilter::Leaves)
        } else {
            Listing::Nodes(NodeFilter::Unlinked)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    let settings = |json| Settings { verbosity, json };

    let result = match cli.command {
        Commands::Summary { snapshot, json } => commands::summary(&snapshot, &settings(json)),
        Commands::Trace {
            snapshot,
            id,
            direction,
            json,
        } => commands::trace(&snapshot, id, direction, &settings(json)),
        Commands::Retained {
            snapshot,
            id,
            max_queue,
            json,
        } => commands::retained(&snapshot, id, max_queue, &settings(json)),
        Commands::Paths {
            snapshot,
            from,
            to,
            max_length,
            json,
        } => commands::paths(&snapshot, from, to, max_length, &settings(json)),
        Commands::Common {
            snapshot,
            first,
            second,
            direction,
            json,
        } => commands::common(&snapshot, first, second, direction, &settings(json)),
        Commands::List {
            snapshot,
            filter,
            json,
        } => commands::list(&snapshot, &filter.into_listing(), &settings(json)),
        Commands::Analyze { snapshot, plan } => {
            commands::analyze(&snapshot, plan.as_deref(), &settings(false))
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
