//! Proposed file names of the form `<Prefix> - <Author> - <Title>.pdf`.

use crate::models::DocumentType;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLACEHOLDER: &str = "Desconhecido";
pub const MAX_NAME_LENGTH: usize = 240;
pub const EXTENSION: &str = ".pdf";
pub const SEGMENT_SEPARATOR: &str = " - ";
const MAX_AUTHOR_CHARS: usize = 100;

/// Characters that cannot appear in a file name on Windows, the strictest common target.
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

lazy_static! {
    static ref HYPHEN_RUN: Regex = Regex::new(r"-[\s-]*-").unwrap();
}

pub fn type_prefix(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::Ebook => "Livro",
        DocumentType::Magazine => "Revista",
        DocumentType::Article => "Artigo",
        DocumentType::ScientificPaper => "Paper",
        DocumentType::Newspaper => "Jornal",
        DocumentType::Presentation | DocumentType::Generic => "Documento",
    }
}

/// Replaces reserved and control characters with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NameSynthesizer {
    pub placeholder: String,
    pub max_length: usize,
}

impl Default for NameSynthesizer {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            max_length: MAX_NAME_LENGTH,
        }
    }
}

impl NameSynthesizer {
    pub fn new(placeholder: impl Into<String>, max_length: usize) -> Self {
        Self {
            placeholder: placeholder.into(),
            max_length,
        }
    }

    /// Builds the sanitized name. Unresolved or blank fields become the placeholder.
    pub fn compose(
        &self,
        doc_type: DocumentType,
        author: Option<&str>,
        title: Option<&str>,
    ) -> String {
        let author = self.field(author, Some(MAX_AUTHOR_CHARS));
        let title = self.field(title, None);
        let name = format!(
            "{}{sep}{author}{sep}{title}{EXTENSION}",
            type_prefix(doc_type),
            sep = SEGMENT_SEPARATOR
        );
        self.truncate(sanitize_file_name(&name))
    }

    /// One name segment: collapsed whitespace, no hyphen runs, no hyphens at either end.
    fn field(&self, value: Option<&str>, max_chars: Option<usize>) -> String {
        let collapsed = value
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let collapsed = HYPHEN_RUN.replace_all(&collapsed, "-");
        let mut field = collapsed
            .trim_matches(|c: char| c == '-' || c.is_whitespace())
            .to_string();
        if let Some(max) = max_chars.filter(|max| field.chars().count() > *max) {
            let capped: String = field.chars().take(max).collect();
            field = capped.trim_end_matches([' ', '-']).to_string();
        }
        if field.is_empty() {
            self.placeholder.clone()
        } else {
            field
        }
    }

    fn truncate(&self, name: String) -> String {
        if name.chars().count() <= self.max_length {
            return name;
        }
        let mut cut: String = name.chars().take(self.max_length).collect();
        cut.push_str(EXTENSION);
        cut
    }
}
