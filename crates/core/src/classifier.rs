//! Confidence-scored document type classification.

use crate::models::{DocumentType, DocumentTypeResult};
use crate::rules::{self, Signal, TypeRule, LIST_ITEM, SAMPLE_PAGES, TYPE_THRESHOLD};
use crate::source::TextSource;
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

/// What the scorer looks at: page count, the opening pages, and the file name.
#[derive(Debug, Clone, Default)]
pub struct DocumentProfile {
    pub page_count: usize,
    pub sample: String,
    pub sampled_pages: usize,
    pub file_stem: String,
}

impl DocumentProfile {
    pub fn from_source(source: &dyn TextSource, file_name: &str) -> Self {
        let page_count = source.page_count();
        let sampled_pages = page_count.min(SAMPLE_PAGES);
        let sample = match source.text_range(1, sampled_pages) {
            Ok(text) => text,
            Err(e) => {
                debug!(file = file_name, error = %e, "sample text unavailable");
                String::new()
            }
        };
        Self {
            page_count,
            sample,
            sampled_pages,
            file_stem: file_stem(file_name),
        }
    }
}

pub(crate) fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Scores for every type, best first.
#[derive(Debug, Clone)]
pub struct Classification {
    results: Vec<DocumentTypeResult>,
}

impl Classification {
    fn from_scores(mut results: Vec<DocumentTypeResult>) -> Self {
        // stable sort: equal scores keep declaration order
        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        Self { results }
    }

    /// The result for a document that could not be read: only the fallback type scores.
    pub fn unreadable() -> Self {
        let results = DocumentType::ALL
            .into_iter()
            .map(|doc_type| DocumentTypeResult {
                doc_type,
                confidence: rules::rule_for(doc_type).base,
            })
            .collect();
        Self::from_scores(results)
    }

    pub fn results(&self) -> &[DocumentTypeResult] {
        &self.results
    }

    pub fn best(&self) -> DocumentTypeResult {
        self.results.first().copied().unwrap_or(DocumentTypeResult {
            doc_type: DocumentType::Generic,
            confidence: rules::GENERIC_CONFIDENCE,
        })
    }

    pub fn confidence(&self, doc_type: DocumentType) -> f32 {
        self.results
            .iter()
            .find(|r| r.doc_type == doc_type)
            .map(|r| r.confidence)
            .unwrap_or(0.0)
    }

    pub fn is_type(&self, doc_type: DocumentType) -> bool {
        self.confidence(doc_type) >= TYPE_THRESHOLD
    }
}

pub fn classify(profile: &DocumentProfile) -> Classification {
    let lowered = profile.sample.to_lowercase();
    let stem = profile.file_stem.to_lowercase();
    let results: Vec<DocumentTypeResult> = rules::RULES
        .iter()
        .map(|rule| DocumentTypeResult {
            doc_type: rule.doc_type,
            confidence: score(rule, profile, &lowered, &stem),
        })
        .collect();
    let classification = Classification::from_scores(results);
    debug!(
        file = %profile.file_stem,
        best = %classification.best().doc_type,
        confidence = classification.best().confidence,
        "classified document"
    );
    classification
}

/// Classifies an opened document, or falls back to Generic when it could not be opened.
pub fn classify_source(source: Option<&dyn TextSource>, file_name: &str) -> Classification {
    match source {
        Some(src) => classify(&DocumentProfile::from_source(src, file_name)),
        None => Classification::unreadable(),
    }
}

pub fn confidence(profile: &DocumentProfile, doc_type: DocumentType) -> f32 {
    let rule = rules::rule_for(doc_type);
    score(
        rule,
        profile,
        &profile.sample.to_lowercase(),
        &profile.file_stem.to_lowercase(),
    )
}

pub fn is_type(profile: &DocumentProfile, doc_type: DocumentType) -> bool {
    confidence(profile, doc_type) >= TYPE_THRESHOLD
}

fn score(rule: &TypeRule, profile: &DocumentProfile, lowered: &str, stem: &str) -> f32 {
    let mut total = rule.base;

    for band in &rule.bands {
        if band.pages.contains(&profile.page_count) {
            total += band.delta;
        }
    }

    if !rule.keywords.is_empty() {
        let found = rule.keywords.iter().filter(|k| lowered.contains(*k)).count();
        total += found as f32 / rule.keywords.len() as f32 * 100.0 * rule.keyword_weight;
    }

    for signal in &rule.signals {
        total += signal_score(signal, profile, lowered);
    }

    if rule.filename_hints.iter().any(|h| stem.contains(h)) {
        total += rules::FILENAME_BONUS;
    }

    total.clamp(0.0, 100.0)
}

fn signal_score(signal: &Signal, profile: &DocumentProfile, lowered: &str) -> f32 {
    match signal {
        Signal::Sections { sections, bonus } => {
            let present = sections
                .iter()
                .filter(|alts| alts.iter().any(|a| lowered.contains(a)))
                .count();
            present as f32 * bonus
        }
        Signal::Pattern { patterns, bonus } => {
            if patterns.iter().any(|p| p.is_match(&profile.sample)) {
                *bonus
            } else {
                0.0
            }
        }
        Signal::ListDensity { min_ratio, bonus } => {
            let lines: Vec<&str> = profile
                .sample
                .lines()
                .filter(|l| !l.trim().is_empty())
                .collect();
            if lines.is_empty() {
                return 0.0;
            }
            let items = lines.iter().filter(|l| LIST_ITEM.is_match(l)).count();
            if items as f32 / lines.len() as f32 >= *min_ratio {
                *bonus
            } else {
                0.0
            }
        }
        Signal::SparsePages {
            max_avg_chars,
            bonus,
        } => {
            let chars = profile.sample.chars().filter(|c| !c.is_whitespace()).count();
            if profile.sampled_pages == 0 || chars == 0 {
                return 0.0;
            }
            if chars / profile.sampled_pages < *max_avg_chars {
                *bonus
            } else {
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryDocument;

    fn filler(phrases: usize) -> String {
        std::iter::repeat("lorem ipsum dolor sit amet")
            .take(phrases)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn profile(pages: usize, sample: &str, file_name: &str) -> DocumentProfile {
        DocumentProfile {
            page_count: pages,
            sample: sample.to_string(),
            sampled_pages: pages.min(SAMPLE_PAGES),
            file_stem: file_stem(file_name),
        }
    }

    #[test]
    fn paper_sections_beat_page_count_bands() {
        let mut pages = vec![
            format!("Deep Results\nAbstract\n{}", filler(40)),
            format!("1 Introduction\n{}", filler(40)),
            format!("{}\n5 Conclusion\n{}", filler(40), filler(5)),
            format!("References\n{}", filler(40)),
            filler(40),
        ];
        pages.extend((0..35).map(|_| filler(40)));
        let doc = InMemoryDocument::new(pages);

        let classification = classify_source(Some(&doc as &dyn TextSource), "download.pdf");
        assert_eq!(classification.best().doc_type, DocumentType::ScientificPaper);
        assert!(classification.is_type(DocumentType::ScientificPaper));
        assert!(!classification.is_type(DocumentType::Ebook));
    }

    #[test]
    fn unreadable_document_falls_back_to_generic() {
        let classification = classify_source(None, "scan.pdf");
        let best = classification.best();
        assert_eq!(best.doc_type, DocumentType::Generic);
        assert_eq!(best.confidence, 10.0);
        for r in classification.results().iter().skip(1) {
            assert_eq!(r.confidence, 0.0);
        }
    }

    #[test]
    fn blank_single_page_is_generic() {
        let c = classify(&profile(1, "", "x.pdf"));
        assert_eq!(c.best().doc_type, DocumentType::Generic);
    }

    #[test]
    fn long_ebook_gets_band_bonus_and_keywords() {
        let sample = "Copyright 2020\nISBN 978-85-000-0000-0\nTodos os direitos reservados\nSumário\nCapítulo 1";
        let c = classify(&profile(250, sample, "meu-livro.pdf"));
        assert_eq!(c.best().doc_type, DocumentType::Ebook);
        assert!(c.confidence(DocumentType::Ebook) >= 40.0);
    }

    #[test]
    fn ebook_score_does_not_drop_with_more_pages() {
        let sample = "plain text without any hints";
        let mut previous = confidence(&profile(31, sample, "a.pdf"), DocumentType::Ebook);
        for pages in [40, 100, 500, 5000] {
            let current = confidence(&profile(pages, sample, "a.pdf"), DocumentType::Ebook);
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 20.0);
    }

    #[test]
    fn newspaper_date_line_and_band() {
        let sample = "Folha da Manhã\nSão Paulo, 3 de maio de 2022\nManchete do dia\nNotícias";
        let c = classify(&profile(24, sample, "folha-sp.pdf"));
        assert_eq!(c.best().doc_type, DocumentType::Newspaper);
    }

    #[test]
    fn bullet_heavy_sparse_deck_is_presentation() {
        let slide = "Agenda\n• Contexto\n• Objetivos\n• Resultados\nObrigado";
        let sample = vec![slide; 5].join("\n");
        let c = classify(&profile(24, &sample, "kickoff.pdf"));
        assert_eq!(c.best().doc_type, DocumentType::Presentation);
        assert!(is_type(&profile(24, &sample, "kickoff.pdf"), DocumentType::Presentation));
    }

    #[test]
    fn filename_hint_adds_fixed_bonus() {
        let plain = confidence(&profile(12, "", "notes.pdf"), DocumentType::Magazine);
        let hinted = confidence(&profile(12, "", "revista-abril.pdf"), DocumentType::Magazine);
        assert_eq!(hinted - plain, rules::FILENAME_BONUS);
    }

    #[test]
    fn scores_are_clamped() {
        let sample = format!(
            "{} ISBN capítulo 1",
            rules::EBOOK_KEYWORDS.join(" ")
        );
        let c = classify(&profile(400, &sample, "livro ebook.pdf"));
        assert!(c.confidence(DocumentType::Ebook) <= 100.0);
        let short = classify(&profile(1, "", "x.pdf"));
        assert_eq!(short.confidence(DocumentType::Newspaper), 0.0);
    }

    #[test]
    fn exact_ties_resolve_to_declaration_order() {
        // Assumption: equal maxima go to the first declared type.
        let c = Classification::from_scores(vec![
            DocumentTypeResult { doc_type: DocumentType::Magazine, confidence: 30.0 },
            DocumentTypeResult { doc_type: DocumentType::Ebook, confidence: 20.0 },
            DocumentTypeResult { doc_type: DocumentType::Newspaper, confidence: 30.0 },
        ]);
        assert_eq!(c.best().doc_type, DocumentType::Magazine);
        assert_eq!(c.results()[1].doc_type, DocumentType::Newspaper);
    }
}
