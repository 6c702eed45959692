//! doctree - Hierarchical versioned document store
//!
//! No daemon, no SQLite - just JSON and markdown files in .doctree/

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "doctree")]
#[command(about = "Hierarchical versioned document store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new doctree repository
    Init {
        /// Document ID prefix
        #[arg(long, default_value = "doc")]
        prefix: String,
    },

    /// Create a new document
    Create {
        /// Document title
        title: String,

        /// Document type (feature_list, architecture, tech_design,
        /// background, requirements, meeting, task)
        #[arg(short = 't', long, default_value = "task")]
        doc_type: String,

        /// Parent document ID (omit for a root document)
        #[arg(short, long)]
        parent: Option<String>,

        /// Initial content (markdown)
        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Show the document tree
    Tree {
        /// Root document ID (omit for the whole forest)
        #[arg(long)]
        root: Option<String>,

        /// Levels to descend (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        depth: u32,
    },

    /// Show document metadata
    Show {
        /// Document ID
        id: String,
    },

    /// Update document metadata
    Update {
        /// Document ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New document type
        #[arg(short = 't', long)]
        doc_type: Option<String>,
    },

    /// Replace document content (snapshots the previous version)
    Edit {
        /// Document ID
        id: String,

        /// New content (markdown)
        #[arg(short, long)]
        content: String,

        /// Expected current version; rejected if the document moved on
        #[arg(long)]
        version: Option<u64>,
    },

    /// Print document content
    Cat {
        /// Document ID
        id: String,

        /// Version to print (omit for the live version)
        #[arg(long)]
        version: Option<u64>,
    },

    /// Show version history
    History {
        /// Document ID
        id: String,

        /// Entries to show (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Compare two versions of a document
    Diff {
        /// Document ID
        id: String,

        /// Older version (0 = live)
        #[arg(long)]
        from: u64,

        /// Newer version (0 = live)
        #[arg(long, default_value = "0")]
        to: u64,
    },

    /// Move a document under a new parent
    Move {
        /// Document ID
        id: String,

        /// New parent ID (omit to make it a root document)
        #[arg(short, long)]
        parent: Option<String>,

        /// Position among the new siblings
        #[arg(long, default_value = "0")]
        position: u32,
    },

    /// Manage task references
    Ref {
        #[command(subcommand)]
        command: RefCommands,
    },

    /// Link two documents with a typed relationship
    Link {
        /// Source document ID
        from: String,

        /// Target document ID
        to: String,

        /// Relationship kind (parent_child, sibling, reference)
        #[arg(short, long, default_value = "reference")]
        kind: String,

        /// Dependency kind for reference edges (data, interface, config)
        #[arg(long)]
        dep_kind: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a relationship
    Unlink {
        /// Relationship ID
        id: String,
    },

    /// Full-text search over titles and content
    Search {
        /// Query string (literal unless --regex)
        query: String,

        /// Filter by document type (repeatable)
        #[arg(short = 't', long = "type")]
        doc_type: Vec<String>,

        /// Treat the query as a regular expression
        #[arg(long)]
        regex: bool,

        /// Match case exactly
        #[arg(long)]
        case_sensitive: bool,

        /// Match whole words only
        #[arg(short, long)]
        whole_word: bool,

        /// Results to return (0 = default of 50)
        #[arg(short, long, default_value = "0")]
        limit: usize,

        /// Print completion suggestions instead of results
        #[arg(long)]
        suggest: bool,
    },

    /// Analyze the impact of changing a document
    Impact {
        /// Document ID
        id: String,

        /// Modes to run (parents, children, references, dependencies, all)
        #[arg(short, long, default_value = "all")]
        mode: Vec<String>,
    },

    /// Delete old snapshots of a document
    Prune {
        /// Document ID
        id: String,

        /// Snapshots to retain (defaults to keep_versions from config)
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

#[derive(Subcommand)]
enum RefCommands {
    /// Record that a task references a document
    Add {
        /// Task ID
        task: String,

        /// Document ID
        document: String,

        /// Section anchor within the document
        #[arg(short, long)]
        anchor: Option<String>,

        /// Free-form note on why the task cares
        #[arg(short, long)]
        context: Option<String>,
    },

    /// List references for a task or a document
    List {
        /// Task ID
        #[arg(long, conflicts_with = "document")]
        task: Option<String>,

        /// Document ID
        #[arg(long)]
        document: Option<String>,
    },

    /// Set a reference's status
    Status {
        /// Reference ID
        id: String,

        /// New status (active, outdated, broken)
        status: String,
    },

    /// Delete a reference
    Rm {
        /// Reference ID
        id: String,
    },

    /// Show reference counts
    Stats,
}

fn init_tracing() {
    let filter = std::env::var("DOCTREE_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { prefix } => commands::init(&prefix),
        Commands::Create {
            title,
            doc_type,
            parent,
            content,
        } => commands::create(&title, &doc_type, parent.as_deref(), &content, cli.json),
        Commands::Tree { root, depth } => commands::tree(root.as_deref(), depth, cli.json),
        Commands::Show { id } => commands::show(&id, cli.json),
        Commands::Update {
            id,
            title,
            doc_type,
        } => commands::update(&id, title.as_deref(), doc_type.as_deref(), cli.json),
        Commands::Edit {
            id,
            content,
            version,
        } => commands::edit(&id, &content, version, cli.json),
        Commands::Cat { id, version } => commands::cat(&id, version),
        Commands::History { id, limit } => commands::history(&id, limit, cli.json),
        Commands::Diff { id, from, to } => commands::diff(&id, from, to, cli.json),
        Commands::Move {
            id,
            parent,
            position,
        } => commands::move_node(&id, parent.as_deref(), position, cli.json),
        Commands::Ref { command } => match command {
            RefCommands::Add {
                task,
                document,
                anchor,
                context,
            } => commands::ref_add(
                &task,
                &document,
                anchor.as_deref(),
                context.as_deref(),
                cli.json,
            ),
            RefCommands::List { task, document } => {
                commands::ref_list(task.as_deref(), document.as_deref(), cli.json)
            }
            RefCommands::Status { id, status } => commands::ref_status(&id, &status, cli.json),
            RefCommands::Rm { id } => commands::ref_rm(&id, cli.json),
            RefCommands::Stats => commands::ref_stats(cli.json),
        },
        Commands::Link {
            from,
            to,
            kind,
            dep_kind,
            description,
        } => commands::link(
            &from,
            &to,
            &kind,
            dep_kind.as_deref(),
            description.as_deref(),
            cli.json,
        ),
        Commands::Unlink { id } => commands::unlink(&id, cli.json),
        Commands::Search {
            query,
            doc_type,
            regex,
            case_sensitive,
            whole_word,
            limit,
            suggest,
        } => commands::search(
            &query,
            &doc_type,
            regex,
            case_sensitive,
            whole_word,
            limit,
            suggest,
            cli.json,
        ),
        Commands::Impact { id, mode } => commands::impact(&id, &mode, cli.json),
        Commands::Prune { id, keep } => commands::prune(&id, keep, cli.json),
    }
}
