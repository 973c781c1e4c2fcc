//! Document text access. The analyzer only ever sees documents through [`TextSource`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("failed to read page {page}: {message}")]
    Page { page: usize, message: String },
    #[error("failed to write document info for {path}: {message}")]
    Write { path: PathBuf, message: String },
}

pub trait TextSource {
    fn page_count(&self) -> usize;

    /// Text of a 1-based page.
    fn page_text(&self, page: usize) -> Result<String, SourceError>;

    /// Pages `start..=end` joined by line breaks, clamped to the page count.
    fn text_range(&self, start: usize, end: usize) -> Result<String, SourceError> {
        let end = end.min(self.page_count());
        let mut parts = Vec::new();
        for page in start.max(1)..=end {
            parts.push(self.page_text(page)?);
        }
        Ok(parts.join("\n"))
    }

    fn info_title(&self) -> Option<String>;

    fn info_author(&self) -> Option<String>;
}

pub trait DocumentLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn TextSource>, SourceError>;

    /// Writes title/author into `<stem>_updated.pdf` beside `path` and returns that path.
    fn write_info(&self, path: &Path, title: &str, author: &str) -> Result<PathBuf, SourceError>;
}

pub fn updated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_updated.pdf"))
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    pub pages: Vec<String>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl InMemoryDocument {
    pub fn new<S: Into<String>>(pages: impl IntoIterator<Item = S>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_info(mut self, title: Option<&str>, author: Option<&str>) -> Self {
        self.title = title.map(str::to_string);
        self.author = author.map(str::to_string);
        self
    }
}

impl TextSource for InMemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String, SourceError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .cloned()
            .ok_or_else(|| SourceError::Page {
                page,
                message: "out of range".into(),
            })
    }

    fn info_title(&self) -> Option<String> {
        self.title.clone()
    }

    fn info_author(&self) -> Option<String> {
        self.author.clone()
    }
}

/// Serves [`InMemoryDocument`]s by path. Paths it does not know fail to open.
#[derive(Default)]
pub struct MemoryLoader {
    docs: Mutex<HashMap<PathBuf, InMemoryDocument>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, doc: InMemoryDocument) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(path.into(), doc);
        }
    }

    pub fn get(&self, path: &Path) -> Option<InMemoryDocument> {
        self.docs.lock().ok()?.get(path).cloned()
    }
}

impl DocumentLoader for MemoryLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn TextSource>, SourceError> {
        self.get(path)
            .map(|d| Box::new(d) as Box<dyn TextSource>)
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))
    }

    fn write_info(&self, path: &Path, title: &str, author: &str) -> Result<PathBuf, SourceError> {
        let doc = self
            .get(path)
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))?;
        let target = updated_path(path);
        self.insert(
            target.clone(),
            doc.with_info(Some(title), Some(author)),
        );
        Ok(target)
    }
}

#[cfg(feature = "pdf")]
pub use pdf::{PdfDocument, PdfLoader};

#[cfg(feature = "pdf")]
mod pdf {
    use super::{updated_path, DocumentLoader, SourceError, TextSource};
    use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
    use std::path::{Path, PathBuf};

    pub struct PdfDocument {
        doc: Document,
        pages: Vec<u32>,
    }

    impl PdfDocument {
        pub fn load(path: &Path) -> Result<Self, SourceError> {
            let doc = Document::load(path).map_err(|e| SourceError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let pages = doc.get_pages().keys().copied().collect();
            Ok(Self { doc, pages })
        }

        fn info_dict(&self) -> Option<&Dictionary> {
            match self.doc.trailer.get(b"Info").ok()? {
                Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            }
        }

        fn info_entry(&self, key: &[u8]) -> Option<String> {
            let bytes = self.info_dict()?.get(key).ok()?.as_str().ok()?;
            let text = decode_pdf_string(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }

    impl TextSource for PdfDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page: usize) -> Result<String, SourceError> {
            let number = page
                .checked_sub(1)
                .and_then(|i| self.pages.get(i))
                .copied()
                .ok_or_else(|| SourceError::Page {
                    page,
                    message: "out of range".into(),
                })?;
            self.doc
                .extract_text(&[number])
                .map_err(|e| SourceError::Page {
                    page,
                    message: e.to_string(),
                })
        }

        fn info_title(&self) -> Option<String> {
            self.info_entry(b"Title")
        }

        fn info_author(&self) -> Option<String> {
            self.info_entry(b"Author")
        }
    }

    /// Loads documents from disk with lopdf.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PdfLoader;

    impl DocumentLoader for PdfLoader {
        fn open(&self, path: &Path) -> Result<Box<dyn TextSource>, SourceError> {
            if !path.exists() {
                return Err(SourceError::NotFound(path.to_path_buf()));
            }
            Ok(Box::new(PdfDocument::load(path)?))
        }

        fn write_info(
            &self,
            path: &Path,
            title: &str,
            author: &str,
        ) -> Result<PathBuf, SourceError> {
            let write_err = |message: String| SourceError::Write {
                path: path.to_path_buf(),
                message,
            };
            let mut doc = Document::load(path).map_err(|e| write_err(e.to_string()))?;
            let info_id = info_object_id(&mut doc);
            let info = doc
                .get_object_mut(info_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| write_err(e.to_string()))?;
            info.set("Title", encode_pdf_string(title));
            info.set("Author", encode_pdf_string(author));

            let target = updated_path(path);
            doc.save(&target).map_err(|e| write_err(e.to_string()))?;
            Ok(target)
        }
    }

    fn info_object_id(doc: &mut Document) -> ObjectId {
        if let Ok(Object::Reference(id)) = doc.trailer.get(b"Info") {
            let id = *id;
            if doc.get_dictionary(id).is_ok() {
                return id;
            }
        }
        let existing = match doc.trailer.get(b"Info") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let id = doc.add_object(existing);
        doc.trailer.set("Info", Object::Reference(id));
        id
    }

    fn decode_pdf_string(bytes: &[u8]) -> String {
        if bytes.starts_with(&[0xFE, 0xFF]) {
            let units: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            return String::from_utf16_lossy(&units);
        }
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            // PDFDocEncoding overlaps Latin-1 for printable text
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    fn encode_pdf_string(value: &str) -> Object {
        if value.is_ascii() {
            return Object::string_literal(value);
        }
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn decodes_utf16_and_latin1_strings() {
            let mut utf16 = vec![0xFE, 0xFF];
            for unit in "Ação".encode_utf16() {
                utf16.extend_from_slice(&unit.to_be_bytes());
            }
            assert_eq!(decode_pdf_string(&utf16), "Ação");
            assert_eq!(decode_pdf_string(b"Plain"), "Plain");
            assert_eq!(decode_pdf_string(&[0x43, 0xE9]), "Cé");
        }

        #[test]
        fn non_ascii_values_are_written_as_utf16() {
            match encode_pdf_string("José") {
                Object::String(bytes, StringFormat::Hexadecimal) => {
                    assert_eq!(decode_pdf_string(&bytes), "José");
                }
                other => panic!("unexpected encoding: {other:?}"),
            }
        }

        #[test]
        fn missing_file_is_not_found() {
            let err = PdfLoader.open(Path::new("/definitely/not/here.pdf")).err();
            assert!(matches!(err, Some(SourceError::NotFound(_))));
        }
    }
}

/// The loader used when nothing else is configured.
#[cfg(feature = "pdf")]
pub fn default_loader() -> std::sync::Arc<dyn DocumentLoader> {
    std::sync::Arc::new(PdfLoader)
}

#[cfg(not(feature = "pdf"))]
pub fn default_loader() -> std::sync::Arc<dyn DocumentLoader> {
    // Without a PDF backend every document is unreadable and classifies as Generic.
    std::sync::Arc::new(MemoryLoader::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_range_joins_and_clamps() {
        let doc = InMemoryDocument::new(["one", "two", "three"]);
        assert_eq!(doc.text_range(1, 2).unwrap(), "one\ntwo");
        assert_eq!(doc.text_range(2, 10).unwrap(), "two\nthree");
        assert_eq!(doc.text_range(0, 1).unwrap(), "one");
        assert!(doc.page_text(4).is_err());
    }

    #[test]
    fn updated_path_is_a_sibling() {
        let p = updated_path(Path::new("/lib/Livro - A - B.pdf"));
        assert_eq!(p, PathBuf::from("/lib/Livro - A - B_updated.pdf"));
    }

    #[test]
    fn memory_loader_writes_updated_copy() {
        let loader = MemoryLoader::new();
        loader.insert("/lib/x.pdf", InMemoryDocument::new(["body"]));
        let out = loader.write_info(Path::new("/lib/x.pdf"), "T", "A").unwrap();
        let copy = loader.get(&out).unwrap();
        assert_eq!(copy.title.as_deref(), Some("T"));
        assert_eq!(copy.author.as_deref(), Some("A"));
        assert!(loader.get(Path::new("/lib/x.pdf")).unwrap().title.is_none());
        assert!(loader.write_info(Path::new("/lib/y.pdf"), "T", "A").is_err());
    }
}
