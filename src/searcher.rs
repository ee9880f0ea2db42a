use futures_util::future;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

use crate::text::{self, MAX_LINES, Paragraphs, Sections, TextError};

pub const PHRASE_MODE: &str = "phr";
pub const ALL_WORDS_MODE: &str = "aw";

lazy_static! {
    static ref SIMPLIFY_RE: Regex = Regex::new(r"[',;.:\-]").unwrap();
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read corpus {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus layout: {0}")]
    Layout(#[from] TextError),
}

/// One search hit: an excerpt of the matching paragraph plus the title of
/// the work it was found in.
#[derive(Debug, Serialize)]
pub struct TextMatch {
    pub text: Vec<String>,
    pub work: String,
}

/// In-memory index over the corpus.
///
/// Two views of the text are kept: the normalized original for excerpts, and
/// a simplified (lowercased, punctuation-stripped) copy that matching runs
/// against. Blank-line runs survive simplification in any paragraph that
/// keeps at least one character, so the two views assign matching paragraph
/// ids. A paragraph of nothing but stripped punctuation would shift later
/// ids; real corpus text does not contain one.
pub struct Searcher {
    original: String,
    simplified: String,
    search_paragraphs: Paragraphs,
    result_paragraphs: Paragraphs,
    sections: Sections,
}

impl Searcher {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_text(&raw)
    }

    pub fn from_text(raw: &str) -> Result<Self, LoadError> {
        let original = raw
            .trim()
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            // mojibake apostrophes in the distributed corpus file
            .replace("â€™", "'");
        let simplified = simplify(&original);
        let search_paragraphs = Paragraphs::new(&simplified);
        let result_paragraphs = Paragraphs::new(&original);
        let sections = Sections::new(&original)?;
        Ok(Self {
            original,
            simplified,
            search_paragraphs,
            result_paragraphs,
            sections,
        })
    }

    /// Ids of the paragraphs containing the exact (simplified) phrase, plus
    /// the phrase itself as the single highlight word.
    pub fn search_phrase(&self, phrase: &str) -> (HashSet<usize>, Vec<String>) {
        let mut ids = HashSet::new();
        for (index, _) in self.simplified.match_indices(phrase) {
            match self.search_paragraphs.for_index(index) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => error!("phrase occurrence outside any paragraph: {e}"),
            }
        }
        (ids, vec![phrase.to_string()])
    }

    /// Excerpt for one matching paragraph. Long paragraphs are windowed
    /// around the middle occurrence of a highlight word; the excerpt is
    /// bracketed with `[...]` lines either way.
    pub fn result_text(&self, paragraph_id: usize, words: &[String]) -> Option<TextMatch> {
        let paragraph = self.result_paragraphs.get(paragraph_id)?;
        let body = &self.original[paragraph.from..paragraph.to.min(self.original.len())];
        let work = self
            .sections
            .find_work(paragraph.from)
            .map(|w| w.title.clone())
            .unwrap_or_default();

        let lines: Vec<&str> = body.split('\n').collect();
        let match_start = match text::middle_match(body, words) {
            Ok((start, _)) => start,
            Err(e) => {
                warn!("highlight lookup failed, excerpting from the top: {e}");
                0
            }
        };
        let target = text::line_for_index(match_start, &lines);
        let window: &[&str] = if lines.len() > MAX_LINES {
            text::balance_lines(&lines, target)
        } else {
            &lines
        };

        let mut excerpt = Vec::with_capacity(window.len() + 2);
        excerpt.push("[...]".to_string());
        excerpt.extend(window.iter().map(|line| (*line).to_string()));
        excerpt.push("[...]".to_string());
        Some(TextMatch {
            text: excerpt,
            work,
        })
    }
}

/// Ids of the paragraphs containing every word of the query, words matched
/// independently. Each word is searched on its own blocking task; an
/// unmatched word short-circuits to the empty set.
pub async fn search_all_words(
    searcher: &Arc<Searcher>,
    query: &str,
) -> (HashSet<usize>, Vec<String>) {
    let words: Vec<String> = query
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    let tasks: Vec<_> = words
        .iter()
        .map(|word| {
            let searcher = Arc::clone(searcher);
            let word = word.clone();
            tokio::task::spawn_blocking(move || searcher.search_phrase(&word).0)
        })
        .collect();

    let mut partials = Vec::with_capacity(words.len());
    for joined in future::join_all(tasks).await {
        match joined {
            Ok(ids) if ids.is_empty() => return (HashSet::new(), words),
            Ok(ids) => partials.push(ids),
            Err(e) => {
                error!("word search task failed: {e}");
                return (HashSet::new(), words);
            }
        }
    }
    (text::intersection(&partials), words)
}

/// Run a query in the given mode and build excerpts for every matching
/// paragraph, in ascending paragraph order.
pub async fn search(searcher: &Arc<Searcher>, query: &str, mode: &str) -> Vec<TextMatch> {
    let simplified = simplify(query);
    if simplified.is_empty() {
        return Vec::new();
    }
    let (paragraphs, words) = match mode {
        ALL_WORDS_MODE => search_all_words(searcher, &simplified).await,
        _ => searcher.search_phrase(&simplified),
    };

    let mut ids: Vec<usize> = paragraphs.into_iter().collect();
    ids.sort_unstable();
    ids.into_iter()
        .filter_map(|id| searcher.result_text(id, &words))
        .collect()
}

fn simplify(text: &str) -> String {
    SIMPLIFY_RE.replace_all(text, "").to_lowercase()
}

#[cfg(test)]
pub(crate) fn sample_corpus() -> String {
    let contents = "THE MOCK ANTHOLOGY\n\nContents\n\n FIRST WORK\n\n SECOND WORK";
    let first = "FIRST WORK\n\n\
the quick brown fox\njumps over the lazy dog\n\n\
another stanza about a fox\nroaming the hills at dusk";
    let long_paragraph: String = (1..=14)
        .map(|i| {
            if i == 7 {
                format!("line {i} hides the raven\n")
            } else {
                format!("line {i} of the long passage\n")
            }
        })
        .collect();
    let second = format!(
        "SECOND WORK\n\n\
the slow red fox naps, happily\n\n\
{}",
        long_paragraph.trim_end()
    );
    format!("{contents}\n\n\n\n\n\n{first}\n\n{second}")
}
