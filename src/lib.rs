//! Composition-based classification of nucleotide fragments.
//!
//! Each reference taxon is described by a Naive Bayes model over its k-mers.
//! A fragment is scored against a model by summing the log probabilities of its k-mers,
//! and assigned to the models with the highest scores.

pub mod catalog;
pub mod classify;
pub mod error;
pub mod kmer_encoder;
pub mod kmer_model;
pub mod sequence_io;
pub mod taxonomy;
pub mod train;

pub use error::{Error, Result};
