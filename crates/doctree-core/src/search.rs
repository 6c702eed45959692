//! Full-text search over document titles and content
//!
//! Linear scan, no persistent text index: the store is small enough that
//! walking every docs/{id}.md on demand beats maintaining an inverted index.
//! Metadata is cloned under the shared lock in one pass; content files are
//! read afterwards so writers are not blocked by disk I/O.

use crate::content::ContentStore;
use crate::index::DocumentIndex;
use crate::model::{DocumentNode, DocumentType};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEFAULT_MAX_RESULTS: usize = 50;
const DEFAULT_CONTEXT_CHARS: usize = 100;
const DEFAULT_SUGGESTIONS: usize = 10;
const EXCERPT_LEN: usize = 500;
const SUGGESTION_SCAN_BYTES: usize = 5000;

/// Search parameters; zero-valued limits fall back to defaults
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: String,
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub use_regex: bool,
    /// 0 means 50
    pub max_results: usize,
    /// Empty means no type filter
    pub doc_types: Vec<DocumentType>,
    /// Context characters around each match; 0 means 100
    pub context_chars: usize,
}

impl SearchOptions {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            case_sensitive: false,
            whole_word: false,
            use_regex: false,
            max_results: 0,
            doc_types: Vec::new(),
            context_chars: 0,
        }
    }
}

/// One match with its surrounding context (byte offsets into the source text)
#[derive(Debug, Clone, Serialize)]
pub struct MatchHighlight {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub before: String,
    pub after: String,
}

/// One matching document, score-ranked
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub title: String,
    /// Content truncated to roughly 500 bytes at a word boundary
    pub excerpt: String,
    pub score: u32,
    pub title_matches: Vec<MatchHighlight>,
    pub content_matches: Vec<MatchHighlight>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SearchEngine {
    index: Arc<DocumentIndex>,
    content: ContentStore,
}

impl SearchEngine {
    pub(crate) fn new(index: Arc<DocumentIndex>, content: ContentStore) -> Self {
        Self { index, content }
    }

    /// Scan every document for the query, ranked by score descending.
    /// A blank query matches nothing.
    pub fn search(&self, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        if options.query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let max_results = if options.max_results == 0 {
            DEFAULT_MAX_RESULTS
        } else {
            options.max_results
        };
        let context = if options.context_chars == 0 {
            DEFAULT_CONTEXT_CHARS
        } else {
            options.context_chars
        };
        let pattern = build_pattern(options)?;

        let nodes = self.snapshot_nodes();
        let mut results = Vec::new();
        for node in &nodes {
            if !options.doc_types.is_empty() && !options.doc_types.contains(&node.doc_type) {
                continue;
            }
            let content = self.content.read_or_empty(&node.id)?;

            let title_matches = find_matches(&node.title, &pattern, context);
            let content_matches = find_matches(&content, &pattern, context);
            if title_matches.is_empty() && content_matches.is_empty() {
                continue;
            }

            let score = score(&title_matches, &content_matches, &node.title, &content);
            results.push(SearchResult {
                document_id: node.id.clone(),
                title: node.title.clone(),
                excerpt: truncate_excerpt(&content, EXCERPT_LEN),
                score,
                title_matches,
                content_matches,
                created_at: node.created_at,
                updated_at: node.updated_at,
            });
        }

        // id tiebreak keeps equal scores in a reproducible order
        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        results.truncate(max_results);
        Ok(results)
    }

    /// Completion candidates: words (3+ chars) containing the query,
    /// ranked by how often they occur across titles and content.
    pub fn suggestions(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let limit = if limit == 0 { DEFAULT_SUGGESTIONS } else { limit };
        let query = query.trim().to_lowercase();
        if query.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let word = Regex::new(r"\b\w{3,}\b").map_err(pattern_error)?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.snapshot_nodes() {
            collect_suggestions(&node.title, &query, &word, &mut counts);
            let content = self.content.read_or_empty(&node.id)?;
            let capped = truncate_at_boundary(&content, SUGGESTION_SCAN_BYTES);
            collect_suggestions(capped, &query, &word, &mut counts);
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        // BTreeMap order breaks count ties alphabetically
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(ranked.into_iter().take(limit).map(|(w, _)| w).collect())
    }

    fn snapshot_nodes(&self) -> Vec<DocumentNode> {
        self.index.read(|state| state.docs.values().cloned().collect())
    }
}

fn build_pattern(options: &SearchOptions) -> Result<Regex> {
    let mut query = if options.use_regex {
        options.query.clone()
    } else {
        regex::escape(&options.query)
    };
    if options.whole_word {
        query = format!(r"\b{}\b", query);
    }
    RegexBuilder::new(&query)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(pattern_error)
}

fn pattern_error(e: regex::Error) -> Error {
    Error::Other(format!("invalid search pattern: {}", e))
}

fn find_matches(text: &str, pattern: &Regex, context_chars: usize) -> Vec<MatchHighlight> {
    pattern
        .find_iter(text)
        .map(|m| {
            let before_start = floor_boundary(text, m.start().saturating_sub(context_chars));
            let after_end = ceil_boundary(text, (m.end() + context_chars).min(text.len()));
            MatchHighlight {
                start: m.start(),
                end: m.end(),
                text: m.as_str().to_string(),
                before: text[before_start..m.start()].to_string(),
                after: text[m.end()..after_end].to_string(),
            }
        })
        .collect()
}

/// Title hits dominate; short titles and dense content matches earn a bonus
fn score(
    title_matches: &[MatchHighlight],
    content_matches: &[MatchHighlight],
    title: &str,
    content: &str,
) -> u32 {
    let mut score = title_matches.len() * 10 + content_matches.len() * 2;
    if !title.is_empty() && !title_matches.is_empty() {
        score += (100 / title.len()).max(1);
    }
    if !content.is_empty() && !content_matches.is_empty() {
        score += content_matches.len() * 1000 / content.len();
    }
    score as u32
}

fn collect_suggestions(
    text: &str,
    query: &str,
    word: &Regex,
    counts: &mut BTreeMap<String, usize>,
) {
    let lowered = text.to_lowercase();
    for m in word.find_iter(&lowered) {
        let w = m.as_str();
        if w != query && w.contains(query) {
            *counts.entry(w.to_string()).or_insert(0) += 1;
        }
    }
}

/// Cut to at most `max_len` bytes, preferring the last word boundary
fn truncate_excerpt(content: &str, max_len: usize) -> String {
    if content.len() <= max_len {
        return content.to_string();
    }
    let mut cut = truncate_at_boundary(content, max_len);
    if let Some(last_space) = cut.rfind(' ') {
        if last_space > max_len * 2 / 3 {
            cut = &cut[..last_space];
        }
    }
    format!("{}...", cut)
}

fn truncate_at_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    &text[..floor_boundary(text, max_len)]
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentStore;

    fn store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::init_at(dir.path(), "doc").unwrap();
        (dir, store)
    }

    fn doc(store: &DocumentStore, title: &str, doc_type: DocumentType, content: &str) -> String {
        store
            .tree()
            .create_node(None, title, doc_type, content)
            .unwrap()
            .id
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let (_dir, store) = store();
        doc(&store, "anything", DocumentType::Task, "body");
        let results = store.search().search(&SearchOptions::new("   ")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_title_match_outranks_content_match() {
        let (_dir, store) = store();
        let in_title = doc(&store, "Deploy pipeline", DocumentType::Task, "");
        // long enough that the match-density bonus stays negligible
        let body = format!("how we deploy services. {}", "filler text. ".repeat(100));
        let in_body = doc(&store, "Infra notes", DocumentType::Background, &body);

        let results = store
            .search()
            .search(&SearchOptions::new("deploy"))
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, [in_title.as_str(), in_body.as_str()]);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].title_matches.len(), 1);
        assert!(results[0].content_matches.is_empty());
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let (_dir, store) = store();
        doc(&store, "Weekly MEETING notes", DocumentType::Meeting, "");

        let search = store.search();
        assert_eq!(search.search(&SearchOptions::new("meeting")).unwrap().len(), 1);

        let mut strict = SearchOptions::new("meeting");
        strict.case_sensitive = true;
        assert!(search.search(&strict).unwrap().is_empty());
    }

    #[test]
    fn test_whole_word_and_regex_modes() {
        let (_dir, store) = store();
        doc(&store, "doc", DocumentType::Task, "cat and catalog");

        let mut whole = SearchOptions::new("cat");
        whole.whole_word = true;
        let results = store.search().search(&whole).unwrap();
        assert_eq!(results[0].content_matches.len(), 1);

        let mut re = SearchOptions::new(r"cat\w+");
        re.use_regex = true;
        let results = store.search().search(&re).unwrap();
        assert_eq!(results[0].content_matches[0].text, "catalog");

        let mut bad = SearchOptions::new("(unclosed");
        bad.use_regex = true;
        assert!(store.search().search(&bad).is_err());
    }

    #[test]
    fn test_type_filter_and_max_results() {
        let (_dir, store) = store();
        doc(&store, "alpha report", DocumentType::Task, "");
        doc(&store, "alpha design", DocumentType::TechDesign, "");

        let mut opts = SearchOptions::new("alpha");
        opts.doc_types = vec![DocumentType::TechDesign];
        let results = store.search().search(&opts).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "alpha design");

        let mut capped = SearchOptions::new("alpha");
        capped.max_results = 1;
        assert_eq!(store.search().search(&capped).unwrap().len(), 1);
    }

    #[test]
    fn test_match_context_window() {
        let (_dir, store) = store();
        let body = format!("{}needle{}", "x".repeat(200), "y".repeat(200));
        doc(&store, "doc", DocumentType::Task, &body);

        let mut opts = SearchOptions::new("needle");
        opts.context_chars = 10;
        let results = store.search().search(&opts).unwrap();
        let m = &results[0].content_matches[0];
        assert_eq!(m.text, "needle");
        assert_eq!(m.before, "xxxxxxxxxx");
        assert_eq!(m.after.len(), 10);
    }

    #[test]
    fn test_excerpt_truncated_at_word_boundary() {
        let (_dir, store) = store();
        let body = "word ".repeat(200);
        doc(&store, "long", DocumentType::Task, &body);

        let results = store.search().search(&SearchOptions::new("word")).unwrap();
        let excerpt = &results[0].excerpt;
        assert!(excerpt.len() <= EXCERPT_LEN + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_suggestions_ranked_by_frequency() {
        let (_dir, store) = store();
        doc(
            &store,
            "deployment guide",
            DocumentType::Background,
            "deployment deployment deploys",
        );

        let suggestions = store.search().suggestions("deploy", 10).unwrap();
        assert_eq!(suggestions[0], "deployment");
        assert!(suggestions.contains(&"deploys".to_string()));
        // the bare query itself is never suggested
        assert!(!suggestions.contains(&"deploy".to_string()));

        assert!(store.search().suggestions("d", 10).unwrap().is_empty());
    }
}
