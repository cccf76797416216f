use crate::{
    error::{Error, Result},
    kmer_encoder::{KmerCode, KmerEncoder},
    sequence_io::SequenceRecord,
    taxonomy::Taxonomy,
};

mod io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Empty,
    Accumulating,
    Finalized,
}

/// The table holds raw counts until the model is finalised, then log probabilities.
#[derive(Debug, Clone)]
enum ProbabilityTable {
    Counts(Vec<u32>),
    LogProbabilities(Vec<f32>),
}

/// A Naive Bayes model over the k-mers of the sequences of one taxon.
#[derive(Debug, Clone)]
pub struct KmerModel {
    name: String,
    taxonomy: Taxonomy,
    encoder: KmerEncoder,
    valid_kmers: u64,
    sequences: u64,
    table: ProbabilityTable,
}

impl KmerModel {
    pub fn new(name: impl Into<String>, word_length: usize) -> Result<Self> {
        let encoder = KmerEncoder::new(word_length)?;
        Ok(Self {
            name: name.into(),
            taxonomy: Taxonomy::default(),
            encoder,
            valid_kmers: 0,
            sequences: 0,
            table: ProbabilityTable::Counts(vec![0; encoder.kmer_count()]),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn word_length(&self) -> usize {
        self.encoder.word_length()
    }

    pub fn encoder(&self) -> &KmerEncoder {
        &self.encoder
    }

    /// The number of k-mers counted so far, both strands included.
    pub fn valid_kmers(&self) -> u64 {
        self.valid_kmers
    }

    pub fn sequences(&self) -> u64 {
        self.sequences
    }

    pub fn state(&self) -> ModelState {
        match self.table {
            ProbabilityTable::LogProbabilities(_) => ModelState::Finalized,
            ProbabilityTable::Counts(_) if self.sequences == 0 => ModelState::Empty,
            ProbabilityTable::Counts(_) => ModelState::Accumulating,
        }
    }

    /// The natural logarithm of the probability of each k-mer code, if finalised.
    pub fn log_probabilities(&self) -> Option<&[f32]> {
        match &self.table {
            ProbabilityTable::LogProbabilities(log_probabilities) => Some(log_probabilities),
            ProbabilityTable::Counts(_) => None,
        }
    }

    /// Counts the k-mers of both strands of the sequence.
    ///
    /// The first accepted sequence with a strain determines the taxonomy of the model.
    /// Once it is set, all further sequences must be of the same strain.
    /// A rejected sequence leaves the model unchanged.
    /// Returns the number of k-mers that were counted.
    pub fn accumulate(&mut self, record: &SequenceRecord, taxonomy: &Taxonomy) -> Result<usize> {
        let ProbabilityTable::Counts(counts) = &mut self.table else {
            return Err(Error::ModelFinalized);
        };

        if record.len() < self.encoder.word_length() {
            return Err(Error::SequenceShorterThanWordLength {
                id: record.id.clone(),
                length: record.len(),
                word_length: self.encoder.word_length(),
            });
        }

        // An empty strain means the model has no label yet.
        if self.taxonomy.strain().is_empty() {
            self.taxonomy = taxonomy.clone();
        } else if taxonomy.strain() != self.taxonomy.strain() {
            return Err(Error::TaxonomyMismatch {
                id: record.id.clone(),
                expected: self.taxonomy.strain().to_string(),
                actual: taxonomy.strain().to_string(),
            });
        }

        let kmers = self.encoder.extract_with_reverse_complement(&record.sequence);
        for &kmer in &kmers {
            let count = &mut counts[kmer as usize];
            *count = count.saturating_add(1);
        }

        self.valid_kmers += kmers.len() as u64;
        self.sequences += 1;
        Ok(kmers.len())
    }

    /// Replaces the counts with Laplace-smoothed log probabilities.
    ///
    /// A code with count `c` gets `ln((c + 1) / (N + 4^k))`,
    /// where `N` is the number of counted k-mers.
    pub fn finalize(&mut self) -> Result<()> {
        let ProbabilityTable::Counts(counts) = &self.table else {
            return Err(Error::ModelFinalized);
        };

        let denominator = self.valid_kmers as f64 + self.encoder.kmer_count() as f64;
        let log_probabilities = counts
            .iter()
            .map(|&count| ((f64::from(count) + 1.0) / denominator).ln() as f32)
            .collect();
        self.table = ProbabilityTable::LogProbabilities(log_probabilities);

        Ok(())
    }

    /// The log likelihood of the observed strand of the sequence.
    pub fn score(&self, sequence: &[u8]) -> Result<f64> {
        self.score_kmers(&self.encoder.extract_forward(sequence))
    }

    /// The log likelihood of a sequence given by its k-mer codes.
    ///
    /// The codes must come from an encoder with the same k-mer length as this model.
    pub fn score_kmers(&self, kmers: &[KmerCode]) -> Result<f64> {
        let log_probabilities = self.log_probabilities().ok_or(Error::ModelNotFinalized)?;
        Ok(kmers.iter().fold(0.0, |score, &kmer| {
            score + f64::from(log_probabilities[kmer as usize])
        }))
    }
}
