//! Title and author extraction.
//!
//! Every strategy contributes ranked [`MetadataCandidate`]s; the highest confidence wins and
//! ties keep the earliest candidate. Strategies run in this order:
//!
//! 1. document info fields
//! 2. type-aware layout heuristics (picked by the classified type)
//! 3. the general first-line heuristic (titles)
//! 4. wrapped multi-line titles
//! 5. explicit author markers such as `Autor:` or `written by`
//! 6. multi-author lines
//!
//! When nothing is found the current file name is parsed instead.

use crate::conformance;
use crate::models::{best_candidate, DocumentType, ExtractedMetadata, MetadataCandidate};
use crate::rules::NUMBERED_ITEM;
use crate::source::TextSource;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

pub const METADATA_CONFIDENCE: f32 = 90.0;
pub const AUTHOR_MARKER_CONFIDENCE: f32 = 85.0;
pub const GENERAL_BASE_CONFIDENCE: f32 = 60.0;
pub const TWO_LINE_TITLE_CONFIDENCE: f32 = 70.0;
pub const THREE_LINE_TITLE_CONFIDENCE: f32 = 65.0;

/// Pages scanned for author markers and multi-author lines.
const OPENING_PAGES: usize = 3;
const LEAD_LINES: usize = 10;

const CONNECTORS: &[&str] = &[
    "de", "da", "do", "das", "dos", "e", "em", "para", "com", "a", "o", "the", "of", "and", "in",
    "for", "on", "to", "with", "an",
];

const AFFILIATION_WORDS: &[&str] = &[
    "universi", "institut", "department", "departamento", "faculdade", "faculty", "school",
    "escola", "college", "laborat", "centro", "center", "centre", "research", "inc.", "ltd",
];

const NAME_PARTICLES: &[&str] = &[
    "de", "da", "do", "das", "dos", "e", "van", "von", "der", "di", "du", "del", "y",
];

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").unwrap();
    static ref ABSTRACT: Regex = Regex::new(r"(?i)abstract").unwrap();
    static ref AUTHOR_MARKER: Regex = Regex::new(
        r"(?i)(?:autor:|author:|by:|por:|escrito por|written by|autoria de|authored by|criado por|created by)\s*:?\s*(.*)$"
    )
    .unwrap();
    /// Author label leading a line, as in `Autores: Ana Lima, Rui Costa`.
    static ref AUTHOR_CONTEXT: Regex =
        Regex::new(r"(?i)^\s*(?:autor(?:es|as|a)?|authors?|by|por)\b\s*:?\s*").unwrap();
    static ref NAME_PAIR: Regex = Regex::new(r"\p{Lu}\p{Ll}+\s+\p{Lu}\p{Ll}+").unwrap();
    static ref PRESENTER: Regex =
        Regex::new(r"(?i)(?:apresentado por|presented by|palestrante|speaker)\s*[:\-]?\s*(.*)$").unwrap();
    static ref PAGE_NUMBER: Regex = Regex::new(
        r"(?i)^(?:\d+|[ivxlc]+|(?:page|página|pagina|pág\.?|pag\.?|p\.)\s*\d+(?:\s*(?:of|de)\s*\d+)?)$"
    )
    .unwrap();
}

pub struct MetadataExtractor {
    doc_type: DocumentType,
    info_title: Option<String>,
    info_author: Option<String>,
    /// Lines of the first page that carries any text.
    lead: Vec<String>,
    /// Raw text of the opening pages.
    opening: String,
    opening_lines: Vec<String>,
    file_name: String,
}

impl MetadataExtractor {
    /// Reads what the strategies need from `source`. `None` means the document could not be
    /// opened; only the file-name fallback can then resolve fields.
    pub fn new(source: Option<&dyn TextSource>, doc_type: DocumentType, file_name: &str) -> Self {
        let mut extractor = Self {
            doc_type,
            info_title: None,
            info_author: None,
            lead: Vec::new(),
            opening: String::new(),
            opening_lines: Vec::new(),
            file_name: file_name.to_string(),
        };
        let Some(source) = source else {
            return extractor;
        };

        extractor.info_title = source.info_title().map(|t| clean(&t)).filter(|t| !t.is_empty());
        extractor.info_author = source.info_author().map(|a| clean(&a)).filter(|a| !a.is_empty());

        let last = source.page_count().min(OPENING_PAGES);
        let mut pages = Vec::new();
        for page in 1..=last {
            match source.page_text(page) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    debug!(file = file_name, page, error = %e, "page text unavailable");
                    pages.push(String::new());
                }
            }
        }
        extractor.lead = pages
            .iter()
            .map(|p| text_lines(p))
            .find(|lines| !lines.is_empty())
            .unwrap_or_default();
        extractor.opening = pages.join("\n");
        extractor.opening_lines = text_lines(&extractor.opening);
        extractor
    }

    pub fn title_candidates(&self) -> Vec<MetadataCandidate> {
        let mut out = Vec::new();
        if let Some(title) = &self.info_title {
            out.push(MetadataCandidate::new(title, METADATA_CONFIDENCE, "metadata"));
        }
        match self.doc_type {
            DocumentType::ScientificPaper => {
                if let Some(c) = self.paper_title() {
                    out.push(c);
                }
            }
            DocumentType::Article => {
                if let Some((c, _)) = self.article_title() {
                    out.push(c);
                }
            }
            DocumentType::Ebook => out.extend(self.ebook_title()),
            DocumentType::Presentation => {
                if let Some((c, _)) = self.presentation_title() {
                    out.push(c);
                }
            }
            DocumentType::Newspaper | DocumentType::Magazine => out.extend(self.headline()),
            DocumentType::Generic => {}
        }
        out.extend(self.general_title());
        out.extend(self.multi_line_titles());
        out
    }

    pub fn author_candidates(&self) -> Vec<MetadataCandidate> {
        let mut out = Vec::new();
        if let Some(author) = &self.info_author {
            out.push(MetadataCandidate::new(author, METADATA_CONFIDENCE, "metadata"));
        }
        match self.doc_type {
            DocumentType::ScientificPaper => {
                let lines = self.lines_before_abstract();
                out.extend(author_blocks(&lines).into_iter().flat_map(|b| b.authors));
            }
            DocumentType::Article => out.extend(self.article_author()),
            DocumentType::Ebook => out.extend(self.ebook_authors()),
            DocumentType::Presentation => out.extend(self.presentation_authors()),
            _ => {}
        }
        out.extend(self.marked_authors());
        out.extend(self.multi_authors());
        out
    }

    /// Best title candidate, else the title segment of the file name.
    pub fn extract_title(&self) -> Option<String> {
        let candidates = self.title_candidates();
        match best_candidate(&candidates) {
            Some(c) => {
                debug!(file = %self.file_name, title = %c.value, method = c.method, confidence = c.confidence, "title resolved");
                Some(c.value.clone())
            }
            None => conformance::segment(&self.file_name, 2),
        }
    }

    /// Best author candidate, else the author segment of the file name.
    pub fn extract_author(&self) -> Option<String> {
        let candidates = self.author_candidates();
        match best_candidate(&candidates) {
            Some(c) => {
                debug!(file = %self.file_name, author = %c.value, method = c.method, confidence = c.confidence, "author resolved");
                Some(c.value.clone())
            }
            None => conformance::segment(&self.file_name, 1),
        }
    }

    pub fn extract(&self) -> ExtractedMetadata {
        ExtractedMetadata {
            title: self.extract_title(),
            author: self.extract_author(),
        }
    }

    fn lead_lines(&self, n: usize) -> impl Iterator<Item = (usize, &String)> {
        self.lead.iter().take(n).enumerate()
    }

    fn lines_before_abstract(&self) -> Vec<String> {
        match ABSTRACT.find(&self.opening) {
            Some(m) => text_lines(&self.opening[..m.start()]),
            None => Vec::new(),
        }
    }

    /// Nearest capitalized line above the first author block, or the last one before the
    /// abstract when no e-mail block exists.
    fn paper_title(&self) -> Option<MetadataCandidate> {
        let lines = self.lines_before_abstract();
        let end = author_blocks(&lines).first().map_or(lines.len(), |b| b.start);
        lines[..end]
            .iter()
            .rev()
            .find(|l| starts_uppercase(l) && !EMAIL.is_match(l))
            .map(|l| MetadataCandidate::new(l.as_str(), 80.0, "paper-before-abstract"))
    }

    fn article_title(&self) -> Option<(MetadataCandidate, usize)> {
        self.lead_lines(LEAD_LINES)
            .find(|(_, l)| {
                let len = l.chars().count();
                len > 10
                    && len < 150
                    && starts_uppercase(l)
                    && !l.ends_with(':')
                    && !NUMBERED_ITEM.is_match(l)
            })
            .map(|(i, l)| (MetadataCandidate::new(l.as_str(), 75.0, "article-first-line"), i))
    }

    fn article_author(&self) -> Option<MetadataCandidate> {
        let (_, title_idx) = self.article_title()?;
        self.lead_lines(LEAD_LINES)
            .skip(title_idx + 1)
            .find(|(_, l)| is_author_shaped(l))
            .map(|(_, l)| MetadataCandidate::new(l.as_str(), 70.0, "article-after-title"))
    }

    fn ebook_title(&self) -> Option<MetadataCandidate> {
        self.opening_lines
            .iter()
            .take(15)
            .find(|l| {
                let len = l.chars().count();
                (3..100).contains(&len)
                    && !is_copyright(l)
                    && !is_page_number(l)
                    && l.chars().any(char::is_alphabetic)
            })
            .map(|l| MetadataCandidate::new(l.as_str(), 70.0, "ebook-cover"))
    }

    fn ebook_authors(&self) -> Vec<MetadataCandidate> {
        let mut out = Vec::new();
        for line in self.opening_lines.iter().take(20) {
            let lower = line.to_lowercase();
            let rest = ["por ", "by "]
                .iter()
                .find(|p| lower.starts_with(*p))
                .map(|p| clean(&line[p.len()..]));
            if let Some(name) = rest.filter(|n| !n.is_empty() && n.chars().count() <= 100) {
                out.push(MetadataCandidate::new(name, 80.0, "ebook-byline"));
            }
        }
        if out.is_empty() {
            let title = self.ebook_title().map(|c| c.value);
            if let Some(name) = self
                .opening_lines
                .iter()
                .take(20)
                .find(|l| looks_like_name(l) && Some(l.as_str()) != title.as_deref())
            {
                out.push(MetadataCandidate::new(name.as_str(), 65.0, "ebook-name-line"));
            }
        }
        out
    }

    fn presentation_title(&self) -> Option<(MetadataCandidate, usize)> {
        self.lead_lines(5)
            .find(|(_, l)| {
                let len = l.chars().count();
                (3..150).contains(&len) && !is_page_number(l)
            })
            .map(|(i, l)| (MetadataCandidate::new(l.as_str(), 75.0, "presentation-title"), i))
    }

    fn presentation_authors(&self) -> Vec<MetadataCandidate> {
        let title_idx = self.presentation_title().map(|(_, i)| i);
        let lines: Vec<&String> = self.lead.iter().take(LEAD_LINES).collect();
        let mut out = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if Some(i) == title_idx {
                continue;
            }
            if let Some(name) = after_presenter_phrase(line) {
                out.push(MetadataCandidate::new(name, 75.0, "presentation-presenter"));
                continue;
            }
            if !looks_like_name(line) {
                continue;
            }
            let near_phrase = [i.checked_sub(1), Some(i + 1)]
                .into_iter()
                .flatten()
                .filter_map(|j| lines.get(j))
                .any(|l| has_presenter_phrase(l));
            let confidence = if near_phrase { 75.0 } else { 60.0 };
            out.push(MetadataCandidate::new(line.as_str(), confidence, "presentation-name"));
        }
        out
    }

    fn headline(&self) -> Option<MetadataCandidate> {
        self.lead_lines(LEAD_LINES)
            .find(|(_, l)| {
                let len = l.chars().count();
                (15..=120).contains(&len)
                    && starts_uppercase(l)
                    && !l.ends_with(':')
                    && digit_ratio(l) <= 0.25
                    && l.split_whitespace().count() >= 3
                    && !crate::rules::PT_DATE.is_match(l)
                    && !crate::rules::EN_DATE.is_match(l)
            })
            .map(|(_, l)| MetadataCandidate::new(l.as_str(), 65.0, "headline"))
    }

    fn general_title(&self) -> Option<MetadataCandidate> {
        let (_, line) = self.lead_lines(LEAD_LINES).find(|(_, l)| {
            let len = l.chars().count();
            (5..=200).contains(&len)
                && !l.ends_with('-')
                && l.chars().any(char::is_alphabetic)
                && !is_copyright(l)
                && !is_page_number(l)
        })?;
        let mut confidence = GENERAL_BASE_CONFIDENCE;
        if starts_uppercase(line) {
            confidence += 5.0;
        }
        if !ends_with_punctuation(line) {
            confidence += 5.0;
        }
        if line.chars().count() < 10 {
            confidence -= 10.0;
        }
        if digit_ratio(line) > 0.25 {
            confidence -= 10.0;
        }
        Some(MetadataCandidate::new(line.as_str(), confidence, "first-line"))
    }

    fn multi_line_titles(&self) -> Vec<MetadataCandidate> {
        let lines: Vec<&String> = self.lead.iter().take(LEAD_LINES).collect();
        for i in 0..lines.len().saturating_sub(1) {
            let (first, second) = (lines[i], lines[i + 1]);
            if !starts_uppercase(first)
                || !title_fragment(first)
                || !title_fragment(second)
                || !wraps_into(first, second)
            {
                continue;
            }
            let two = join_wrapped(first, second);
            if two.chars().count() > 200 {
                continue;
            }
            let mut out = vec![MetadataCandidate::new(
                two.as_str(),
                TWO_LINE_TITLE_CONFIDENCE,
                "multi-line-2",
            )];
            if let Some(third) = lines.get(i + 2) {
                if title_fragment(third) && wraps_into(second, third) {
                    let three = join_wrapped(&two, third);
                    if three.chars().count() <= 200 {
                        out.push(MetadataCandidate::new(
                            three,
                            THREE_LINE_TITLE_CONFIDENCE,
                            "multi-line-3",
                        ));
                    }
                }
            }
            return out;
        }
        Vec::new()
    }

    fn marked_authors(&self) -> Vec<MetadataCandidate> {
        self.opening_lines
            .iter()
            .filter_map(|line| {
                let caps = AUTHOR_MARKER.captures(line)?;
                let value = clean(caps.get(1)?.as_str().trim_start_matches(':'));
                (!value.is_empty() && value.chars().count() <= 100).then(|| {
                    MetadataCandidate::new(value, AUTHOR_MARKER_CONFIDENCE, "author-marker")
                })
            })
            .collect()
    }

    fn multi_authors(&self) -> Vec<MetadataCandidate> {
        self.opening_lines
            .iter()
            .take(30)
            .filter(|l| l.chars().count() <= 150 && has_author_separator(l) && !is_prose(l))
            .filter_map(|line| {
                if AUTHOR_CONTEXT.is_match(line) {
                    let value = clean(&AUTHOR_CONTEXT.replace(line, ""));
                    return (!value.is_empty())
                        .then(|| MetadataCandidate::new(value, 80.0, "multi-author-context"));
                }
                NAME_PAIR
                    .is_match(line)
                    .then(|| MetadataCandidate::new(line.as_str(), 65.0, "multi-author-names"))
            })
            .collect()
    }
}

/// Name and affiliation lines closed by an e-mail line in a paper header.
struct AuthorBlock {
    start: usize,
    authors: Vec<MetadataCandidate>,
}

/// The first line is never part of a block; a paper header opens with its title.
fn author_blocks(lines: &[String]) -> Vec<AuthorBlock> {
    let mut blocks = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !EMAIL.is_match(line) {
            continue;
        }
        let mut start = i;
        while start > 1 {
            let prev = &lines[start - 1];
            if EMAIL.is_match(prev) || !(looks_like_name(prev) || is_affiliation(prev)) {
                break;
            }
            start -= 1;
        }

        let mut authors = Vec::new();
        match lines[start..i].iter().find(|l| looks_like_name(l)) {
            Some(name) => authors.push(MetadataCandidate::new(name.as_str(), 75.0, "paper-email")),
            None if i > 1 => {
                let prev = &lines[i - 1];
                if !EMAIL.is_match(prev) && !is_affiliation(prev) && is_author_shaped(prev) {
                    authors.push(MetadataCandidate::new(prev.as_str(), 75.0, "paper-email"));
                    start = i - 1;
                }
            }
            None => {}
        }
        let stripped = clean(&EMAIL.replace_all(line, " "));
        let stripped = stripped.trim_matches(|c: char| !c.is_alphanumeric()).to_string();
        if stripped.split_whitespace().count() >= 2 && starts_uppercase(&stripped) {
            authors.push(MetadataCandidate::new(stripped, 75.0, "paper-email"));
        }
        blocks.push(AuthorBlock { start, authors });
    }
    blocks
}

fn text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(clean)
        .filter(|l| !l.is_empty())
        .collect()
}

fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_uppercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

fn ends_with_punctuation(text: &str) -> bool {
    text.chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
}

fn digit_ratio(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    text.chars().filter(char::is_ascii_digit).count() as f32 / total as f32
}

fn is_copyright(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["copyright", "©", "isbn", "todos os direitos", "all rights reserved"]
        .iter()
        .any(|m| lower.contains(m))
}

fn is_page_number(text: &str) -> bool {
    PAGE_NUMBER.is_match(text.trim())
}

fn last_word(text: &str) -> Option<String> {
    text.split_whitespace().last().map(str::to_lowercase)
}

fn title_fragment(line: &str) -> bool {
    !is_copyright(line)
        && !is_page_number(line)
        && !EMAIL.is_match(line)
        && !line.ends_with('.')
        && !NUMBERED_ITEM.is_match(line)
}

fn wraps_into(first: &str, second: &str) -> bool {
    first.ends_with('-')
        || last_word(first).is_some_and(|w| CONNECTORS.contains(&w.as_str()))
        || second.chars().next().is_some_and(char::is_lowercase)
}

fn join_wrapped(first: &str, second: &str) -> String {
    match first.strip_suffix('-') {
        Some(stem) => format!("{stem}{second}"),
        None => format!("{first} {second}"),
    }
}

fn is_author_shaped(line: &str) -> bool {
    let len = line.chars().count();
    (3..=100).contains(&len)
        && starts_uppercase(line)
        && !line.ends_with(':')
        && !line.ends_with('.')
        && !NUMBERED_ITEM.is_match(line)
        && !is_copyright(line)
        && digit_ratio(line) <= 0.25
}

/// Two to six capitalized words (particles like "da" or "van" allowed), no digits.
fn looks_like_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=6).contains(&words.len()) || line.chars().count() > 60 {
        return false;
    }
    if line.chars().any(|c| c.is_ascii_digit()) || !starts_uppercase(line) {
        return false;
    }
    words.iter().all(|w| {
        starts_uppercase(w) || NAME_PARTICLES.contains(&w.to_lowercase().as_str())
    })
}

fn has_presenter_phrase(line: &str) -> bool {
    PRESENTER.is_match(line)
}

/// `Presented by Ana Souza` -> `Ana Souza`.
fn after_presenter_phrase(line: &str) -> Option<String> {
    let rest = clean(PRESENTER.captures(line)?.get(1)?.as_str());
    (!rest.is_empty() && looks_like_name(&rest)).then_some(rest)
}

fn is_affiliation(line: &str) -> bool {
    let lower = line.to_lowercase();
    AFFILIATION_WORDS.iter().any(|w| lower.contains(w))
}

fn is_prose(line: &str) -> bool {
    line.ends_with('.') || line.split_whitespace().count() > 15
}

fn has_author_separator(line: &str) -> bool {
    line.contains(',') || line.contains(" e ") || line.contains(" and ") || line.contains(" & ")
}
