use clap::{Parser, Subcommand, ValueEnum};

use codexray::types::NodeKind;

#[derive(Debug, Parser)]
#[command(name = "codexray")]
#[command(about = "Local code-intelligence engine: ask your codebase, don't grep it.")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Filter for node kinds in search commands.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NodeKindFilter {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Enum,
    Variable,
    Constant,
    Module,
    Namespace,
    Struct,
    Trait,
    Component,
    Hook,
    Decorator,
    Property,
    Route,
    Middleware,
    Test,
}

impl From<NodeKindFilter> for NodeKind {
    fn from(f: NodeKindFilter) -> Self {
        match f {
            NodeKindFilter::Function => NodeKind::Function,
            NodeKindFilter::Method => NodeKind::Method,
            NodeKindFilter::Class => NodeKind::Class,
            NodeKindFilter::Interface => NodeKind::Interface,
            NodeKindFilter::Type => NodeKind::Type,
            NodeKindFilter::Enum => NodeKind::Enum,
            NodeKindFilter::Variable => NodeKind::Variable,
            NodeKindFilter::Constant => NodeKind::Constant,
            NodeKindFilter::Module => NodeKind::Module,
            NodeKindFilter::Namespace => NodeKind::Namespace,
            NodeKindFilter::Struct => NodeKind::Struct,
            NodeKindFilter::Trait => NodeKind::Trait,
            NodeKindFilter::Component => NodeKind::Component,
            NodeKindFilter::Hook => NodeKind::Hook,
            NodeKindFilter::Decorator => NodeKind::Decorator,
            NodeKindFilter::Property => NodeKind::Property,
            NodeKindFilter::Route => NodeKind::Route,
            NodeKindFilter::Middleware => NodeKind::Middleware,
            NodeKindFilter::Test => NodeKind::Test,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the .codexray/ storage directory and default config
    Init {
        /// Run a full index immediately after initializing
        #[arg(long)]
        index: bool,
    },

    /// Build or rebuild the code graph index
    Index {
        /// Force full re-index, bypassing the content-hash check
        #[arg(long)]
        force: bool,

        /// Suppress the summary line
        #[arg(long)]
        quiet: bool,
    },

    /// Incrementally sync the index with the working tree
    Sync {
        /// Suppress the summary line
        #[arg(long)]
        quiet: bool,
    },

    /// Watch the tree and re-index files as they change
    Watch,

    /// Show index status for this project
    Status,

    /// Keyword search over symbol names, signatures and docstrings
    Query {
        /// Query string
        query: String,

        /// Filter by node kind
        #[arg(long)]
        kind: Option<NodeKindFilter>,

        /// Maximum results to return
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Ranked TF-IDF semantic search
    Semantic {
        /// Query string
        query: String,

        /// Maximum results to return
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Assemble ranked context for a natural-language task
    Context {
        /// Task description
        query: String,

        /// Maximum symbols in the answer
        #[arg(long, default_value = "25")]
        max_nodes: usize,

        /// Emit the compact one-line-per-symbol listing
        #[arg(long)]
        compact: bool,
    },

    /// Project overview: stats, hotspots, languages
    Overview,

    /// Manage the git post-commit sync hook
    Hooks {
        #[command(subcommand)]
        action: HookAction,
    },

    /// Serve the tool surface over stdio for AI assistants
    Serve,

    /// Drop all indexed data (keeps config)
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum HookAction {
    /// Install the post-commit hook
    Install,
    /// Remove the post-commit hook
    Remove,
    /// Report whether the hook is installed
    Status,
}
