//! CSV archiving of cyclic records
//!
//! Records must be flat structs (no nested structs or sequences) as required by the `csv` crate's
//! serializer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::File;
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,

    /// Number of records written so far
    num_records: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Could not write the record: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the archive: {0}")]
    FlushError(std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInit,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        let file = File::create(session_path)
            .map_err(ArchiveError::CreateError)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w),
            num_records: 0
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        let w = self.writer.as_mut().ok_or(ArchiveError::NotInit)?;

        w.serialize(record).map_err(ArchiveError::WriteError)?;
        self.num_records += 1;

        // Flush once a second's worth of cycles has built up
        if self.num_records % 10 == 0 {
            w.flush().map_err(ArchiveError::FlushError)?;
        }

        Ok(())
    }

    /// Flush any buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => w.flush().map_err(ArchiveError::FlushError),
            None => Err(ArchiveError::NotInit)
        }
    }

    /// Number of records written by this archiver.
    pub fn num_records(&self) -> u64 {
        self.num_records
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Rec {
        time_s: f64,
        phase: String,
    }

    #[test]
    fn test_uninit_archiver() {
        let mut arch = Archiver::default();

        match arch.serialise(Rec { time_s: 0.0, phase: "Off".into() }) {
            Err(ArchiveError::NotInit) => (),
            r => panic!("Expected NotInit, got {:?}", r),
        }
        assert_eq!(arch.num_records(), 0);
    }
}
