//! Query normalization, ranking, and snippet generation.
//!
//! Queries already wrapped in double quotes pass through untouched;
//! otherwise a query containing FTS5 special characters or bare boolean
//! keywords is escaped as a single quoted phrase so it can't be
//! misinterpreted as FTS5 query syntax. Results are ranked by `bm25()`
//! and carry a `snippet()`-generated excerpt with `<mark>` highlights.

use crate::error::{IndexerError, Result};
use crate::store::Store;

const SPECIAL_CHARS: &[char] = &['"', '\'', '-', '*', ':', '.', '(', ')'];
const BOOLEAN_TOKENS: &[&str] = &["AND", "OR", "NOT"];

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub path: String,
    pub snippet: String,
    pub score: f64,
    pub last_modified: String,
}

/// Escape a user query for safe use as an FTS5 MATCH expression.
///
/// If the query is already phrase-quoted (starts and ends with `"`), it is
/// passed through unchanged. Otherwise, if it contains any FTS5 special
/// character or a bare boolean operator token, the whole query is wrapped
/// in double quotes (doubling any internal `"`), turning it into a literal
/// phrase match. A query with none of these is passed through unchanged,
/// letting FTS5's own tokenizer handle ordinary multi-word queries.
#[must_use]
pub fn escape_fts_query(query: &str) -> String {
    if query.starts_with('"') && query.ends_with('"') && query.len() >= 2 {
        return query.to_string();
    }

    let has_special = query.chars().any(|c| SPECIAL_CHARS.contains(&c));
    let has_boolean =
        query.split_whitespace().any(|tok| BOOLEAN_TOKENS.contains(&tok.to_uppercase().as_str()));

    if has_special || has_boolean {
        let doubled = query.replace('"', "\"\"");
        format!("\"{doubled}\"")
    } else {
        query.to_string()
    }
}

/// Search engine over a `Store`.
pub struct Search<'a> {
    store: &'a Store,
}

impl<'a> Search<'a> {
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Rank-ordered full-text search with `<mark>`-highlighted snippets.
    ///
    /// An empty or whitespace-only query returns `[]`. A query that FTS5
    /// rejects as malformed syntax also returns `[]` (logged), rather than
    /// propagating an error to the caller.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` for store failures other than a
    /// malformed-query operational error.
    pub fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let escaped = escape_fts_query(trimmed);

        let mut stmt = self
            .store
            .conn()
            .prepare_cached(
                "SELECT path, snippet(documents, 1, '<mark>', '</mark>', '...', 32) AS snippet,
                        bm25(documents) AS score, last_modified
                 FROM documents WHERE documents MATCH ?1 ORDER BY score LIMIT ?2",
            )
            .map_err(IndexerError::from_sqlite)?;

        let rows = stmt
            .query_map(rusqlite::params![escaped, limit], |row| {
                Ok(SearchResult {
                    path: row.get(0)?,
                    snippet: row.get(1)?,
                    score: row.get::<_, f64>(2)?.abs(),
                    last_modified: row.get(3)?,
                })
            })
            .map_err(IndexerError::from_sqlite)?
            .collect::<std::result::Result<Vec<_>, _>>();

        match rows {
            Ok(results) => Ok(results),
            Err(e) if is_query_syntax_error(&e) => {
                tracing::warn!(query = trimmed, error = %e, "search: invalid FTS5 query syntax");
                Ok(Vec::new())
            }
            Err(e) => Err(IndexerError::from_sqlite(e)),
        }
    }

    /// Substring match against stored paths, ordered alphabetically. Used
    /// as a fallback when full-text matching is too strict for a filename
    /// lookup.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn search_by_path(&self, pattern: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let like_pattern = format!("%{pattern}%");
        let mut stmt = self
            .store
            .conn()
            .prepare_cached(
                "SELECT path, content, last_modified FROM documents
                 WHERE path LIKE ?1 ORDER BY path LIMIT ?2",
            )
            .map_err(IndexerError::from_sqlite)?;

        let rows = stmt
            .query_map(rusqlite::params![like_pattern, limit], |row| {
                let path: String = row.get(0)?;
                let content: String = row.get(1)?;
                let last_modified: String = row.get(2)?;
                Ok((path, content, last_modified))
            })
            .map_err(IndexerError::from_sqlite)?;

        rows.map(|row| {
            let (path, content, last_modified) = row.map_err(IndexerError::from_sqlite)?;
            let truncated = content.chars().take(200).collect::<String>();
            let snippet =
                if truncated.len() < content.len() { format!("{truncated}...") } else { truncated };
            Ok(SearchResult { path, snippet, score: 0.0, last_modified })
        })
        .collect()
    }

    /// Total number of indexed documents.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn document_count(&self) -> Result<i64> {
        self.store.document_count()
    }
}

fn is_query_syntax_error(error: &rusqlite::Error) -> bool {
    matches!(error, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("fts5: syntax error"))
}
