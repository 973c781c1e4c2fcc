//! Recognizes names already in `<Prefix> - <Author> - <Title>.pdf` form.

use crate::classifier::file_stem;
use crate::naming::SEGMENT_SEPARATOR;
use serde::Serialize;

pub const VALID_PREFIXES: &[&str] = &["Livro", "Revista", "Artigo", "Paper", "Jornal", "Documento"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    pub prefix: String,
    pub author: String,
    pub title: String,
}

fn segments(name: &str) -> Vec<String> {
    file_stem(name)
        .split('-')
        .map(|s| s.trim().to_string())
        .collect()
}

fn conforms(segments: &[String]) -> bool {
    segments.len() >= 3
        && VALID_PREFIXES
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&segments[0]))
        && !segments[1].is_empty()
        && !segments[2].is_empty()
}

pub fn is_standardized(name: &str) -> bool {
    conforms(&segments(name))
}

/// Trimmed segment `index` of any name, standardized or not. Blank segments are `None`.
pub fn segment(name: &str, index: usize) -> Option<String> {
    segments(name).into_iter().nth(index).filter(|s| !s.is_empty())
}

/// Splits a standardized name. Segments past the third belong to the title.
pub fn parse(name: &str) -> Option<ParsedName> {
    let segments = segments(name);
    if !conforms(&segments) {
        return None;
    }
    Some(ParsedName {
        prefix: segments[0].clone(),
        author: segments[1].clone(),
        title: segments[2..].join(SEGMENT_SEPARATOR),
    })
}
