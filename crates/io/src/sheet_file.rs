// Sheet specification files
//
// The on-disk format is the engine's spec JSON: a single object with a
// "sheet-content" array in depth-first order. Loading validates structure;
// saving always writes the pretty-printed canonical form.

use std::fmt;
use std::fs;
use std::path::Path;

use bridgesheet_engine::document::{DocumentError, SheetDocument};

#[derive(Debug)]
pub enum SheetFileError {
    Io(std::io::Error),
    Format(DocumentError),
}

impl fmt::Display for SheetFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetFileError::Io(e) => write!(f, "{}", e),
            SheetFileError::Format(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SheetFileError {}

impl From<std::io::Error> for SheetFileError {
    fn from(e: std::io::Error) -> Self {
        SheetFileError::Io(e)
    }
}

impl From<DocumentError> for SheetFileError {
    fn from(e: DocumentError) -> Self {
        SheetFileError::Format(e)
    }
}

/// Load and validate a sheet specification file.
pub fn load(path: &Path) -> Result<SheetDocument, SheetFileError> {
    let contents = fs::read_to_string(path)?;
    Ok(SheetDocument::parse_spec(&contents)?)
}

/// Write a document as canonical spec JSON.
pub fn save(doc: &SheetDocument, path: &Path) -> Result<(), SheetFileError> {
    fs::write(path, doc.to_spec_string())?;
    Ok(())
}
