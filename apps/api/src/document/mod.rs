//! DOCX package handling and the WordprocessingML document model the fill
//! engine edits.

pub mod model;
pub mod package;
pub mod xml;

use std::path::PathBuf;

use thiserror::Error;

pub use model::Document;
pub use package::DocxPackage;
pub use xml::XmlError;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid DOCX package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("DOCX package has no word/document.xml part")]
    MissingDocumentPart,

    #[error("Malformed document XML: {0}")]
    Xml(#[from] XmlError),

    #[error("Document has no body")]
    MissingBody,

    #[error("Placeholder token must not be empty")]
    EmptyToken,

    #[error("More than one option selected in a single-choice group: {}", .0.join(", "))]
    AmbiguousSelection(Vec<String>),
}
