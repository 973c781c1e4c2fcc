//! Per-type scoring rules for the document classifier.
//!
//! Every type is scored by the same function (see [`crate::classifier`]); the rule table below
//! carries everything that differs between types.

use crate::models::DocumentType;
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::RangeInclusive;

/// Pages read from the start of a document to score it.
pub const SAMPLE_PAGES: usize = 5;
/// `is_type` threshold.
pub const TYPE_THRESHOLD: f32 = 40.0;
/// Flat score of the fallback type.
pub const GENERIC_CONFIDENCE: f32 = 10.0;
pub const FILENAME_BONUS: f32 = 20.0;
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.4;
pub const ARTICLE_KEYWORD_WEIGHT: f32 = 0.5;

pub const EBOOK_KEYWORDS: &[&str] = &[
    "capítulo",
    "chapter",
    "isbn",
    "editora",
    "publisher",
    "edição",
    "edition",
    "copyright",
    "todos os direitos reservados",
    "all rights reserved",
    "sumário",
    "contents",
    "prefácio",
    "preface",
    "índice",
    "epílogo",
];

pub const MAGAZINE_KEYWORDS: &[&str] = &[
    "revista",
    "magazine",
    "edição",
    "issue",
    "assinatura",
    "subscribe",
    "reportagem",
    "entrevista",
    "interview",
    "editorial",
    "anúncio",
    "publicidade",
];

pub const ARTICLE_KEYWORDS: &[&str] = &[
    "artigo",
    "article",
    "autor",
    "author",
    "palavras-chave",
    "keywords",
    "publicado",
    "published",
    "introdução",
    "conclusão",
];

pub const PAPER_KEYWORDS: &[&str] = &[
    "abstract",
    "resumo",
    "introduction",
    "introdução",
    "methodology",
    "metodologia",
    "results",
    "resultados",
    "discussion",
    "discussão",
    "conclusion",
    "conclusão",
    "references",
    "referências",
    "doi",
    "et al",
];

pub const NEWSPAPER_KEYWORDS: &[&str] = &[
    "jornal",
    "newspaper",
    "notícias",
    "news",
    "editorial",
    "manchete",
    "headline",
    "caderno",
    "edição",
    "classificados",
    "reportagem",
    "correspondente",
];

pub const PRESENTATION_KEYWORDS: &[&str] = &[
    "apresentação",
    "presentation",
    "slide",
    "agenda",
    "obrigado",
    "thank you",
    "perguntas",
    "questions",
    "palestrante",
    "speaker",
];

/// Adds `delta` when the page count falls inside `pages`.
#[derive(Debug, Clone)]
pub struct PageBand {
    pub pages: RangeInclusive<usize>,
    pub delta: f32,
}

impl PageBand {
    pub const fn new(min: usize, max: usize, delta: f32) -> Self {
        Self {
            pages: min..=max,
            delta,
        }
    }

    pub const fn below(limit: usize, delta: f32) -> Self {
        Self::new(0, limit - 1, delta)
    }

    pub const fn above(limit: usize, delta: f32) -> Self {
        Self::new(limit + 1, usize::MAX, delta)
    }
}

/// Structural evidence looked for in the sample text.
#[derive(Debug, Clone)]
pub enum Signal {
    /// `bonus` for every section where at least one of the alternative headings appears.
    Sections {
        sections: &'static [&'static [&'static str]],
        bonus: f32,
    },
    /// `bonus` when any of the patterns matches.
    Pattern { patterns: Vec<Regex>, bonus: f32 },
    /// `bonus` when at least `min_ratio` of the non-empty lines are bullets or numbered items.
    ListDensity { min_ratio: f32, bonus: f32 },
    /// `bonus` when pages carry text but fewer than `max_avg_chars` characters on average.
    SparsePages { max_avg_chars: usize, bonus: f32 },
}

#[derive(Debug, Clone)]
pub struct TypeRule {
    pub doc_type: DocumentType,
    pub base: f32,
    pub bands: Vec<PageBand>,
    pub keywords: &'static [&'static str],
    pub keyword_weight: f32,
    pub signals: Vec<Signal>,
    pub filename_hints: &'static [&'static str],
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

lazy_static! {
    /// Bullet glyphs or `1.` / `2)` style list markers at line start.
    pub static ref LIST_ITEM: Regex = regex(r"^\s*(?:[•●▪◦▸►➢➤\-\*–]|\d{1,2}[.)])\s+");
    pub static ref NUMBERED_ITEM: Regex = regex(r"^\s*\d+[.)]\s");
    pub static ref PT_DATE: Regex = regex(
        r"(?i)\b\d{1,2}\s+de\s+(?:janeiro|fevereiro|março|marco|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro)\s+de\s+\d{4}\b"
    );
    pub static ref EN_DATE: Regex = regex(
        r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},\s*\d{4}\b"
    );

    pub static ref RULES: Vec<TypeRule> = vec![
        TypeRule {
            doc_type: DocumentType::Ebook,
            base: 0.0,
            bands: vec![PageBand::below(5, -30.0), PageBand::above(30, 20.0)],
            keywords: EBOOK_KEYWORDS,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            signals: vec![
                Signal::Pattern { patterns: vec![regex(r"(?i)\bisbn\b")], bonus: 15.0 },
                Signal::Pattern {
                    patterns: vec![regex(r"(?i)\b(?:capítulo|capitulo|chapter)\s+(?:\d+|[ivxlc]+)\b")],
                    bonus: 10.0,
                },
            ],
            filename_hints: &["livro", "ebook", "e-book", "book"],
        },
        TypeRule {
            doc_type: DocumentType::Magazine,
            base: 0.0,
            bands: vec![
                PageBand::below(10, -20.0),
                PageBand::above(300, -20.0),
                PageBand::new(20, 200, 20.0),
            ],
            keywords: MAGAZINE_KEYWORDS,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            signals: vec![
                Signal::Pattern { patterns: vec![regex(r"(?i)\bvol\.?\s*\d+")], bonus: 10.0 },
                Signal::Pattern { patterns: vec![regex(r"(?i)\bissue\s*\d+")], bonus: 10.0 },
                Signal::Pattern { patterns: vec![regex(r"(?i)\bno\.\s*\d+")], bonus: 10.0 },
            ],
            filename_hints: &["revista", "magazine", "edicao", "edição"],
        },
        TypeRule {
            doc_type: DocumentType::Article,
            base: 0.0,
            bands: vec![
                PageBand::below(2, -10.0),
                PageBand::new(2, 25, 10.0),
                PageBand::above(50, -30.0),
            ],
            keywords: ARTICLE_KEYWORDS,
            keyword_weight: ARTICLE_KEYWORD_WEIGHT,
            signals: Vec::new(),
            filename_hints: &["artigo", "article"],
        },
        TypeRule {
            doc_type: DocumentType::ScientificPaper,
            base: 0.0,
            bands: vec![
                PageBand::below(3, -20.0),
                PageBand::above(50, -20.0),
                PageBand::new(5, 30, 15.0),
            ],
            keywords: PAPER_KEYWORDS,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            signals: vec![
                Signal::Sections {
                    sections: &[
                        &["abstract", "resumo"],
                        &["introduction", "introdução"],
                        &["conclusion", "conclusão"],
                        &["references", "referências"],
                    ],
                    bonus: 10.0,
                },
                Signal::Pattern { patterns: vec![regex(r"(?i)\b10\.\d{4,9}/\S+")], bonus: 10.0 },
            ],
            filename_hints: &["paper", "tese", "thesis", "dissertacao", "dissertação", "journal"],
        },
        TypeRule {
            doc_type: DocumentType::Newspaper,
            base: 0.0,
            bands: vec![PageBand::below(4, -30.0), PageBand::new(8, usize::MAX, 15.0)],
            keywords: NEWSPAPER_KEYWORDS,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            signals: vec![Signal::Pattern {
                patterns: vec![PT_DATE.clone(), EN_DATE.clone()],
                bonus: 15.0,
            }],
            filename_hints: &["jornal", "newspaper", "gazeta", "diario", "diário", "folha"],
        },
        TypeRule {
            doc_type: DocumentType::Presentation,
            base: 0.0,
            bands: vec![
                PageBand::below(5, -10.0),
                PageBand::new(10, 60, 20.0),
                PageBand::above(100, -30.0),
            ],
            keywords: PRESENTATION_KEYWORDS,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            signals: vec![
                Signal::ListDensity { min_ratio: 0.15, bonus: 10.0 },
                Signal::ListDensity { min_ratio: 0.30, bonus: 10.0 },
                Signal::SparsePages { max_avg_chars: 600, bonus: 15.0 },
            ],
            filename_hints: &[
                "apresentacao",
                "apresentação",
                "slides",
                "presentation",
                "palestra",
                "deck",
            ],
        },
        TypeRule {
            doc_type: DocumentType::Generic,
            base: GENERIC_CONFIDENCE,
            bands: Vec::new(),
            keywords: &[],
            keyword_weight: 0.0,
            signals: Vec::new(),
            filename_hints: &[],
        },
    ];
}

pub fn rule_for(doc_type: DocumentType) -> &'static TypeRule {
    RULES
        .iter()
        .find(|r| r.doc_type == doc_type)
        .unwrap_or_else(|| &RULES[RULES.len() - 1])
}
