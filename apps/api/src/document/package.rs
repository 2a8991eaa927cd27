use std::io::{Cursor, Read, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::model::Document;
use super::DocumentError;

pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// An opened `.docx` zip package, held fully in memory.
///
/// Entries keep their original order so Word sees the same layout it wrote.
/// Only the main document part is ever rewritten.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DocumentError::TemplateNotFound(path.to_path_buf())
            } else {
                DocumentError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let package = Self::from_bytes(&bytes)?;
        debug!(
            "Opened DOCX package {} ({} parts)",
            path.display(),
            package.entries.len()
        );
        Ok(package)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|source| DocumentError::Io {
                    path: name.clone().into(),
                    source,
                })?;
            entries.push((name, data));
        }

        if !entries.iter().any(|(name, _)| name == MAIN_DOCUMENT_PART) {
            return Err(DocumentError::MissingDocumentPart);
        }

        Ok(Self { entries })
    }

    /// Parses the main document part into a fresh, independently editable
    /// document.
    pub fn document(&self) -> Result<Document, DocumentError> {
        let (_, xml) = self
            .entries
            .iter()
            .find(|(name, _)| name == MAIN_DOCUMENT_PART)
            .ok_or(DocumentError::MissingDocumentPart)?;
        Document::from_xml(xml)
    }

    pub fn set_document(&mut self, document: &Document) -> Result<(), DocumentError> {
        let xml = document.to_xml()?;
        let (_, data) = self
            .entries
            .iter_mut()
            .find(|(name, _)| name == MAIN_DOCUMENT_PART)
            .ok_or(DocumentError::MissingDocumentPart)?;
        *data = xml;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, data) in &self.entries {
            // Media is already compressed.
            let options = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data).map_err(|source| DocumentError::Io {
                path: name.clone().into(),
                source,
            })?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Writes the package to `path`. Fails rather than overwrite an existing file.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = self.to_bytes()?;
        let io_error = |source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}
