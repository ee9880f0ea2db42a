use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

lazy_static! {
    static ref PARAGRAPH_BREAK_RE: Regex = Regex::new(r"[\n\r]{2,}").unwrap();
}

/// Lines kept in a result excerpt.
pub const MAX_LINES: usize = 10;

/// Separator between the contents index and the body of the corpus.
const INDEX_SEPARATOR: &str = "\n\n\n\n\n\n";

#[derive(Error, Debug)]
pub enum TextError {
    #[error("no paragraph found for text index {0}")]
    NoParagraph(usize),
    #[error("none of {0:?} found in excerpt")]
    NoMatchInExcerpt(Vec<String>),
    #[error("failed to split contents index from body")]
    MalformedContents,
    #[error("bad highlight pattern: {0}")]
    BadPattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paragraph {
    pub id: usize,
    pub from: usize,
    pub to: usize,
}

impl Paragraph {
    pub fn includes(&self, index: usize) -> bool {
        self.from <= index && index <= self.to
    }
}

/// Byte ranges of the blank-line-separated paragraphs of a text.
///
/// Built once per corpus view; paragraph ids are assigned in text order, so
/// the simplified and original views of the same corpus agree on ids even
/// though their byte offsets differ.
#[derive(Debug)]
pub struct Paragraphs {
    paragraphs: Vec<Paragraph>,
}

impl Paragraphs {
    pub fn new(text: &str) -> Self {
        let mut paragraphs = Vec::new();
        let mut start = 0;
        for m in PARAGRAPH_BREAK_RE.find_iter(text) {
            paragraphs.push(Paragraph {
                id: paragraphs.len(),
                from: start,
                to: m.start(),
            });
            start = m.end();
        }
        paragraphs.push(Paragraph {
            id: paragraphs.len(),
            from: start,
            to: text.len(),
        });
        Self { paragraphs }
    }

    /// Id of the paragraph containing the given byte index.
    pub fn for_index(&self, index: usize) -> Result<usize, TextError> {
        // ranges are sorted and disjoint
        let candidate = self.paragraphs.partition_point(|p| p.to < index);
        match self.paragraphs.get(candidate) {
            Some(p) if p.includes(index) => Ok(p.id),
            _ => Err(TextError::NoParagraph(index)),
        }
    }

    pub fn get(&self, id: usize) -> Option<&Paragraph> {
        self.paragraphs.get(id)
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }
}

#[derive(Debug, Clone)]
pub struct Work {
    pub title: String,
    pub from: usize,
    pub to: usize,
}

impl Work {
    pub fn includes(&self, index: usize) -> bool {
        self.from <= index && index <= self.to
    }
}

/// Work boundaries recovered from the corpus contents index.
///
/// The corpus opens with a table of contents; each listed title reappears in
/// the body on a line of its own where that work begins.
#[derive(Debug)]
pub struct Sections {
    works: Vec<Work>,
}

impl Sections {
    pub fn new(text: &str) -> Result<Self, TextError> {
        let (index, body) = text
            .split_once(INDEX_SEPARATOR)
            .ok_or(TextError::MalformedContents)?;
        let titles = contents_titles(index);
        let body_offset = index.len() + INDEX_SEPARATOR.len();
        let works = find_works(body, &titles, body_offset)?;
        Ok(Self { works })
    }

    /// Work containing the given byte index into the full text, if any.
    pub fn find_work(&self, index: usize) -> Option<&Work> {
        self.works.iter().find(|w| w.includes(index))
    }
}

fn contents_titles(index: &str) -> Vec<String> {
    let Some((_, listing)) = index.split_once("Contents") else {
        return Vec::new();
    };
    listing
        .trim()
        .split("\n\n")
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}

fn find_works(body: &str, titles: &[String], shift: usize) -> Result<Vec<Work>, TextError> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }
    let alternatives: Vec<String> = titles.iter().map(|t| regex::escape(t)).collect();
    let pattern = format!(r"(?P<title>({}))[\n\r]{{2,}}", alternatives.join("|"));
    let title_re = Regex::new(&pattern)?;

    let matches: Vec<(usize, String)> = title_re
        .captures_iter(body)
        .filter_map(|caps| caps.name("title"))
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();

    let mut works = Vec::with_capacity(matches.len());
    for (i, (start, title)) in matches.iter().enumerate() {
        let to = matches.get(i + 1).map_or(body.len(), |next| next.0);
        works.push(Work {
            title: title.clone(),
            from: start + shift,
            to: to + shift,
        });
    }
    Ok(works)
}

/// Paragraph ids present in every set.
pub fn intersection(sets: &[HashSet<usize>]) -> HashSet<usize> {
    match sets {
        [] => HashSet::new(),
        [only] => only.clone(),
        [base, others @ ..] => base
            .iter()
            .filter(|id| others.iter().all(|s| s.contains(*id)))
            .copied()
            .collect(),
    }
}

/// Index of the line containing the given byte offset into the joined text.
pub fn line_for_index(index: usize, lines: &[&str]) -> usize {
    let mut offset = 0;
    for (i, line) in lines.iter().enumerate() {
        offset += line.len() + 1;
        if offset > index {
            return i;
        }
    }
    lines.len()
}

/// Centered window of `MAX_LINES` lines around the target line.
pub fn balance_lines<'a, 'b>(lines: &'a [&'b str], target: usize) -> &'a [&'b str] {
    let start = target.saturating_sub(MAX_LINES);
    let end = (target + MAX_LINES).min(lines.len());
    let half = (start + end) / 2;
    let lo = half.saturating_sub(MAX_LINES / 2);
    let hi = (half + MAX_LINES / 2).min(lines.len());
    &lines[lo..hi]
}

/// Byte range of the middle occurrence of any highlight word in the text,
/// matched case-insensitively.
pub fn middle_match(text: &str, words: &[String]) -> Result<(usize, usize), TextError> {
    let lowered = text.to_lowercase();
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    let pattern = format!("({})", alternatives.join("|"));
    let word_re = Regex::new(&pattern)?;

    let matches: Vec<(usize, usize)> = word_re
        .find_iter(&lowered)
        .map(|m| (m.start(), m.end()))
        .collect();
    if matches.is_empty() {
        return Err(TextError::NoMatchInExcerpt(words.to_vec()));
    }
    Ok(matches[matches.len() / 2])
}
