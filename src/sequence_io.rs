use std::path::Path;

use needletail::{parse_fastx_file, parser::SequenceRecord as FastxRecord, FastxReader};

use crate::error::Result;

/// A decoded sequence: its identifier and raw nucleotide characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    fn from_fastx(record: &FastxRecord) -> Self {
        // The identifier ends at the first whitespace of the header.
        let header = String::from_utf8_lossy(record.id());
        let id = header
            .split(|character: char| character.is_ascii_whitespace())
            .next()
            .unwrap_or_default();

        // Alignment gaps carry no composition signal.
        let sequence: Vec<u8> = record
            .seq()
            .iter()
            .copied()
            .filter(|&symbol| symbol != b'-' && symbol != b'.' && !symbol.is_ascii_whitespace())
            .collect();

        Self::new(id, sequence)
    }
}

/// Streams the records of a FASTA (or FASTQ) file, one at a time.
pub struct FastaReader {
    reader: Box<dyn FastxReader>,
}

impl FastaReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            reader: parse_fastx_file(path)?,
        })
    }
}

impl Iterator for FastaReader {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.reader
                .next()?
                .map(|record| SequenceRecord::from_fastx(&record))
                .map_err(Into::into),
        )
    }
}

/// Reads all records of a FASTA file into memory.
pub fn read_fasta_file(path: impl AsRef<Path>) -> Result<Vec<SequenceRecord>> {
    FastaReader::open(path)?.collect()
}
