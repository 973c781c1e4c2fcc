use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document categories, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Ebook,
    Magazine,
    Article,
    ScientificPaper,
    Newspaper,
    Presentation,
    Generic,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::Ebook,
        DocumentType::Magazine,
        DocumentType::Article,
        DocumentType::ScientificPaper,
        DocumentType::Newspaper,
        DocumentType::Presentation,
        DocumentType::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Ebook => "Ebook",
            DocumentType::Magazine => "Magazine",
            DocumentType::Article => "Article",
            DocumentType::ScientificPaper => "ScientificPaper",
            DocumentType::Newspaper => "Newspaper",
            DocumentType::Presentation => "Presentation",
            DocumentType::Generic => "Generic",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown document type: {s}"))
    }
}

/// Confidence (0..=100) that a document belongs to `doc_type`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentTypeResult {
    pub doc_type: DocumentType,
    pub confidence: f32,
}

/// One guess for a metadata field. `method` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataCandidate {
    pub value: String,
    pub confidence: f32,
    pub method: &'static str,
}

impl MetadataCandidate {
    pub fn new(value: impl Into<String>, confidence: f32, method: &'static str) -> Self {
        Self {
            value: value.into(),
            confidence,
            method,
        }
    }
}

/// Highest confidence wins; on ties the earliest candidate is kept.
pub fn best_candidate(candidates: &[MetadataCandidate]) -> Option<&MetadataCandidate> {
    let mut best: Option<&MetadataCandidate> = None;
    for c in candidates {
        match best {
            Some(b) if c.confidence <= b.confidence => {}
            _ => best = Some(c),
        }
    }
    best
}

/// Title and author as resolved for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_candidate_prefers_confidence_then_insertion_order() {
        let cands = vec![
            MetadataCandidate::new("a", 70.0, "x"),
            MetadataCandidate::new("b", 80.0, "y"),
            MetadataCandidate::new("c", 80.0, "z"),
        ];
        assert_eq!(best_candidate(&cands).unwrap().value, "b");
        assert!(best_candidate(&[]).is_none());
    }

    #[test]
    fn type_labels_parse_back() {
        for t in DocumentType::ALL {
            assert_eq!(t.as_str().parse::<DocumentType>().unwrap(), t);
        }
        assert!("pamphlet".parse::<DocumentType>().is_err());
    }
}
