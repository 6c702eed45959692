//! CLI command implementations

use anyhow::Result;
use colored::Colorize;
use doctree_core::{
    AnalysisMode, DependencyKind, DiffKind, DocumentNode, DocumentStore, DocumentType, Reference,
    ReferenceStatus, RelationKind, SearchOptions, TreeNode,
};

pub fn init(prefix: &str) -> Result<()> {
    let store = DocumentStore::init(prefix)?;
    println!(
        "{} Initialized doctree in {}",
        "✓".green(),
        store.doctree_dir().display()
    );
    println!("  Document prefix: {}", prefix);
    Ok(())
}

pub fn create(
    title: &str,
    doc_type: &str,
    parent: Option<&str>,
    content: &str,
    json: bool,
) -> Result<()> {
    let store = DocumentStore::open()?;
    let doc_type: DocumentType = doc_type.parse()?;
    let node = store.tree().create_node(parent, title, doc_type, content)?;

    if json {
        println!("{}", serde_json::to_string(&node)?);
    } else {
        println!("{} Created document: {}", "✓".green(), node.id.cyan());
        println!("  Title: {}", node.title);
        println!("  Type: {}", node.doc_type);
        println!("  Level: {}", node.level);
    }

    Ok(())
}

pub fn tree(root: Option<&str>, depth: u32, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let tree = store.tree().get_tree(root, depth)?;

    if json {
        println!("{}", serde_json::to_string(&tree)?);
    } else if tree.children.is_empty() && root.is_none() {
        println!("No documents found");
    } else {
        print_tree(&tree, 0, root.is_none());
    }

    Ok(())
}

fn print_tree(tree: &TreeNode, indent: usize, skip_self: bool) {
    if !skip_self {
        let pad = "  ".repeat(indent);
        println!(
            "{}{} [{}] v{} - {}",
            pad,
            tree.node.id.cyan(),
            tree.node.doc_type.to_string().blue(),
            tree.node.version,
            tree.node.title
        );
    }
    let child_indent = if skip_self { indent } else { indent + 1 };
    for child in &tree.children {
        print_tree(child, child_indent, false);
    }
}

pub fn show(id: &str, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let (content, node) = store.tree().get_content(id)?;

    if json {
        println!("{}", serde_json::to_string(&node)?);
    } else {
        print_node(&node, &store);
        if !content.is_empty() {
            let lines = content.lines().count();
            println!("  Content: {} lines", lines);
        }
    }

    Ok(())
}

fn print_node(node: &DocumentNode, store: &DocumentStore) {
    let date_format = &store.config().display.date_format;
    println!("{}", node.id.cyan().bold());
    println!("  Title: {}", node.title);
    println!("  Type: {}", node.doc_type.to_string().blue());
    match &node.parent_id {
        Some(p) => println!("  Parent: {}", p),
        None => println!("  Parent: {}", "(root)".dimmed()),
    }
    println!("  Level: {}  Position: {}", node.level, node.position);
    println!("  Version: {}", node.version);
    println!("  Created: {}", node.created_at.format(date_format));
    println!("  Updated: {}", node.updated_at.format(date_format));
}

pub fn update(id: &str, title: Option<&str>, doc_type: Option<&str>, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let doc_type: Option<DocumentType> = doc_type.map(str::parse).transpose()?;
    let node = store.tree().update_node(id, title, doc_type)?;

    if json {
        println!("{}", serde_json::to_string(&node)?);
    } else {
        println!("{} Updated {}", "✓".green(), node.id.cyan());
        println!("  Title: {}", node.title);
        println!("  Type: {}", node.doc_type);
    }

    Ok(())
}

pub fn edit(id: &str, content: &str, version: Option<u64>, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;

    // With no explicit --version, take the version just read as the basis;
    // a concurrent edit between these two calls is still rejected.
    let expected = match version {
        Some(v) => v,
        None => store.tree().get_content(id)?.1.version,
    };

    let new_version = store.versions().update_content(id, content, expected)?;
    let outdated = store.references().mark_document_outdated(id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": id,
                "version": new_version,
                "references_outdated": outdated,
            })
        );
    } else {
        println!("{} Updated {} to v{}", "✓".green(), id.cyan(), new_version);
        if outdated > 0 {
            println!(
                "  {} reference(s) marked {}",
                outdated,
                "outdated".yellow()
            );
        }
    }

    Ok(())
}

pub fn cat(id: &str, version: Option<u64>) -> Result<()> {
    let store = DocumentStore::open()?;
    let content = match version {
        Some(v) => store.versions().get_version_content(id, v)?,
        None => store.tree().get_content(id)?.0,
    };
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub fn history(id: &str, limit: usize, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let entries = store.versions().get_version_history(id, limit)?;

    if json {
        println!("{}", serde_json::to_string(&entries)?);
    } else if entries.is_empty() {
        println!("No versions found");
    } else {
        let date_format = &store.config().display.date_format;
        let live = entries.iter().map(|e| e.version).max().unwrap_or(0);
        for entry in &entries {
            let marker = if entry.version == live {
                " (live)".green().to_string()
            } else {
                String::new()
            };
            println!(
                "v{}{} - {} ({} bytes)",
                entry.version,
                marker,
                entry.created_at.format(date_format),
                entry.size
            );
        }
    }

    Ok(())
}

pub fn diff(id: &str, from: u64, to: u64, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let result = store.versions().compare_versions(id, from, to)?;

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        for line in &result.lines {
            match line.kind {
                DiffKind::Add => println!("{}", format!("+ {}", line.content).green()),
                DiffKind::Delete => println!("{}", format!("- {}", line.content).red()),
                DiffKind::Modify => println!("{}", format!("~ {}", line.content).yellow()),
                DiffKind::Equal => println!("  {}", line.content.dimmed()),
            }
        }
        println!(
            "{} +{} -{} ~{} ({} lines)",
            "Summary:".bold(),
            result.summary.added,
            result.summary.deleted,
            result.summary.modified,
            result.summary.total
        );
    }

    Ok(())
}

pub fn move_node(id: &str, parent: Option<&str>, position: u32, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    store.tree().move_node(id, parent, position)?;

    if json {
        let (_, node) = store.tree().get_content(id)?;
        println!("{}", serde_json::to_string(&node)?);
    } else {
        match parent {
            Some(p) => println!("{} Moved {} under {}", "✓".green(), id.cyan(), p.cyan()),
            None => println!("{} Moved {} to the root level", "✓".green(), id.cyan()),
        }
    }

    Ok(())
}

pub fn ref_add(
    task: &str,
    document: &str,
    anchor: Option<&str>,
    context: Option<&str>,
    json: bool,
) -> Result<()> {
    let store = DocumentStore::open()?;
    let reference = store
        .references()
        .create_reference(task, document, anchor, context)?;

    if json {
        println!("{}", serde_json::to_string(&reference)?);
    } else {
        println!("{} Created reference: {}", "✓".green(), reference.id.cyan());
        println!("  Task: {}  Document: {}", task, document);
        if let Some(a) = &reference.anchor {
            println!("  Anchor: {}", a);
        }
    }

    Ok(())
}

pub fn ref_list(task: Option<&str>, document: Option<&str>, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let refs = store.references();
    let list = match (task, document) {
        (Some(t), _) => refs.references_by_task(t),
        (None, Some(d)) => refs.references_by_document(d),
        (None, None) => refs.active_references(),
    };

    if json {
        println!("{}", serde_json::to_string(&list)?);
    } else if list.is_empty() {
        println!("No references found");
    } else {
        for r in &list {
            print_reference(r);
        }
    }

    Ok(())
}

fn print_reference(r: &Reference) {
    let status = match r.status {
        ReferenceStatus::Active => "active".green(),
        ReferenceStatus::Outdated => "outdated".yellow(),
        ReferenceStatus::Broken => "broken".red(),
    };
    let anchor = r
        .anchor
        .as_deref()
        .map(|a| format!(" #{}", a))
        .unwrap_or_default();
    println!(
        "{} [{}] {} -> {}{}",
        r.id.cyan(),
        status,
        r.task_id,
        r.document_id,
        anchor
    );
}

pub fn ref_status(id: &str, status: &str, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let status: ReferenceStatus = status.parse()?;
    let reference = store.references().update_status(id, status)?;

    if json {
        println!("{}", serde_json::to_string(&reference)?);
    } else {
        println!(
            "{} Reference {} is now {}",
            "✓".green(),
            reference.id.cyan(),
            reference.status
        );
    }

    Ok(())
}

pub fn ref_rm(id: &str, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    store.references().delete_reference(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("{} Deleted reference {}", "✓".green(), id.cyan());
    }

    Ok(())
}

pub fn ref_stats(json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let stats = store.references().stats();

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("{}", "References".bold());
        println!("  Total: {}", stats.total);
        println!("  Active: {}", stats.active.to_string().green());
        println!("  Outdated: {}", stats.outdated.to_string().yellow());
        println!("  Broken: {}", stats.broken.to_string().red());
        println!("  Tasks: {}  Documents: {}", stats.tasks, stats.documents);
    }

    Ok(())
}

pub fn link(
    from: &str,
    to: &str,
    kind: &str,
    dep_kind: Option<&str>,
    description: Option<&str>,
    json: bool,
) -> Result<()> {
    let store = DocumentStore::open()?;
    let kind: RelationKind = kind.parse()?;
    let dep_kind: Option<DependencyKind> = dep_kind.map(str::parse).transpose()?;
    let rel = store.relations().link(from, to, kind, dep_kind, description)?;

    if json {
        println!("{}", serde_json::to_string(&rel)?);
    } else {
        println!("{} Linked: {}", "✓".green(), rel.id.cyan());
        println!("  {} -> {} ({})", rel.from_id, rel.to_id, rel.kind);
    }

    Ok(())
}

pub fn unlink(id: &str, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    store.relations().unlink(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("{} Removed relationship {}", "✓".green(), id.cyan());
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn search(
    query: &str,
    doc_types: &[String],
    regex: bool,
    case_sensitive: bool,
    whole_word: bool,
    limit: usize,
    suggest: bool,
    json: bool,
) -> Result<()> {
    let store = DocumentStore::open()?;

    if suggest {
        let suggestions = store.search().suggestions(query, limit)?;
        if json {
            println!("{}", serde_json::to_string(&suggestions)?);
        } else if suggestions.is_empty() {
            println!("No suggestions");
        } else {
            for s in suggestions {
                println!("{}", s);
            }
        }
        return Ok(());
    }

    let mut options = SearchOptions::new(query);
    options.use_regex = regex;
    options.case_sensitive = case_sensitive;
    options.whole_word = whole_word;
    options.max_results = limit;
    options.doc_types = doc_types
        .iter()
        .map(|t| t.parse())
        .collect::<Result<_, _>>()?;

    let results = store.search().search(&options)?;
    if json {
        println!("{}", serde_json::to_string(&results)?);
    } else if results.is_empty() {
        println!("No matches found");
    } else {
        for r in &results {
            println!(
                "{} [{}] {} - {}",
                r.document_id.cyan(),
                r.score,
                r.title.bold(),
                format!(
                    "{} title / {} content match(es)",
                    r.title_matches.len(),
                    r.content_matches.len()
                )
                .dimmed()
            );
            if let Some(m) = r.content_matches.first() {
                println!("    ...{}{}{}...", m.before, m.text.yellow(), m.after);
            }
        }
    }

    Ok(())
}

pub fn impact(id: &str, modes: &[String], json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let modes: Vec<AnalysisMode> = modes
        .iter()
        .map(|m| m.parse())
        .collect::<Result<_, _>>()?;
    let result = store.impact().analyze(id, &modes)?;

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("{} {}", "Impact of".bold(), id.cyan());
        print_impact_group("Parents", &result.parents);
        print_impact_group("Children", &result.children);
        print_impact_group("References", &result.references);
        print_impact_group("Dependencies", &result.dependencies);
        for (node, depth) in &result.depth {
            let path = result
                .paths
                .get(node)
                .map(|p| p.join(" -> "))
                .unwrap_or_default();
            println!("  {} depth={} via {}", node.dimmed(), depth, path);
        }
    }

    Ok(())
}

fn print_impact_group(label: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    println!("  {}: {}", label.bold(), ids.join(", "));
}

pub fn prune(id: &str, keep: Option<usize>, json: bool) -> Result<()> {
    let store = DocumentStore::open()?;
    let keep = keep.unwrap_or(store.config().keep_versions);
    let removed = store.versions().cleanup_snapshots(id, keep)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": id, "removed": removed, "kept": keep })
        );
    } else {
        println!(
            "{} Removed {} snapshot(s) of {} (keeping {})",
            "✓".green(),
            removed,
            id.cyan(),
            keep
        );
    }

    Ok(())
}
