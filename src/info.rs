use lopdf::{Document, Object};
use std::fmt;

/// What `--info` prints about a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub pages: usize,
    pub version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl DocumentSummary {
    pub fn of(doc: &Document) -> Self {
        let info = doc
            .trailer
            .get(b"Info")
            .and_then(|r| r.as_reference())
            .and_then(|id| doc.get_dictionary(id))
            .ok();

        let field = |key: &[u8]| match info.and_then(|d| d.get(key).ok()) {
            Some(Object::String(value, _)) => Some(String::from_utf8_lossy(value).to_string()),
            _ => None,
        };

        DocumentSummary {
            pages: doc.get_pages().len(),
            version: doc.version.clone(),
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
        }
    }
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Pages: {}", self.pages)?;
        write!(f, "   Version: {}", self.version)?;
        if let Some(title) = &self.title {
            write!(f, "\n   Title: {}", title)?;
        }
        if let Some(author) = &self.author {
            write!(f, "\n   Author: {}", author)?;
        }
        if let Some(subject) = &self.subject {
            write!(f, "\n   Subject: {}", subject)?;
        }
        Ok(())
    }
}
