//! Offline catalog seeding from CSV exports.
//!
//! Expected header: `id,name,type,abilities,adopted,photo`. `type` and `abilities` hold
//! `;`-separated lists; `adopted` and `photo` may be left empty.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::workflows::adoption::domain::Adoptable;
use crate::workflows::adoption::store::{EntityStore, StoreError};

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Csv(csv::Error),
    DuplicateId(String),
    Store(StoreError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "failed to read catalog: {}", err),
            CatalogError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogError::DuplicateId(id) => {
                write!(f, "catalog lists adoptable '{}' more than once", id)
            }
            CatalogError::Store(err) => write!(f, "could not store catalog entry: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Csv(err) => Some(err),
            CatalogError::DuplicateId(_) => None,
            CatalogError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Adoptable>, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Adoptable>, CatalogError> {
        let adoptables = parser::parse_catalog(reader)?;

        let mut seen = HashSet::new();
        for adoptable in &adoptables {
            if !seen.insert(adoptable.id.0.as_str()) {
                return Err(CatalogError::DuplicateId(adoptable.id.0.clone()));
            }
        }

        Ok(adoptables)
    }

    /// Writes every entry into the store, returning how many were loaded.
    pub fn load_into<S: EntityStore + ?Sized>(
        store: &S,
        adoptables: Vec<Adoptable>,
    ) -> Result<usize, CatalogError> {
        let total = adoptables.len();
        for adoptable in adoptables {
            store.insert_adoptable(adoptable)?;
        }
        info!(total, "catalog loaded");
        Ok(total)
    }
}
