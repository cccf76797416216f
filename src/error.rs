use std::path::PathBuf;

use thiserror::Error;

use crate::taxonomy::RANK_COUNT;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("FASTA parsing error: {0}")]
    Fasta(#[from] needletail::errors::ParseError),

    #[error("k-mer length {0} is not supported, it must be between 1 and {max}", max = crate::kmer_encoder::MAX_WORD_LENGTH)]
    UnsupportedWordLength(usize),

    #[error("sequence {id} has length {length} which is shorter than the k-mer length {word_length}")]
    SequenceShorterThanWordLength {
        id: String,
        length: usize,
        word_length: usize,
    },

    #[error("sequence {id} is from strain {actual:?}, expecting sequences from strain {expected:?}")]
    TaxonomyMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("the model has already been finalised")]
    ModelFinalized,

    #[error("the model has not been finalised yet")]
    ModelNotFinalized,

    #[error("corrupt model: {0}")]
    CorruptModel(String),

    #[error("failed to load model {path:?}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("model {path:?} has k-mer length {actual}, but the catalog uses k-mer length {expected}")]
    WordLengthMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("the model catalog {0:?} lists no models")]
    EmptyCatalog(PathBuf),

    #[error("taxonomy string has {0} ranks, but at most {max} are supported", max = RANK_COUNT)]
    TaxonomyRankCount(usize),

    #[error("line {line} of taxonomy file {path:?} is not of the form <sequence id>\\t<taxonomy>")]
    MalformedTaxonomyLine { path: PathBuf, line: usize },

    #[error("the batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("failed to process result shard {path:?}: {source}")]
    Shard {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Errors that reject a single training sequence without invalidating the model.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::SequenceShorterThanWordLength { .. } | Error::TaxonomyMismatch { .. }
        )
    }
}
