use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, trace};

use crate::{
    catalog::{load_model, ModelCatalog},
    error::{Error, Result},
    kmer_encoder::{KmerCode, KmerEncoder},
    sequence_io::{read_fasta_file, SequenceRecord},
};

pub use top_models::{rank, RankedModel, TopModels};

mod top_models;

pub const DEFAULT_BATCH_SIZE: usize = 50_000;

#[derive(Debug, Clone)]
pub struct ClassificationParameters {
    /// The number of query sequences classified per pass over the catalog.
    pub batch_size: usize,
    /// The number of best models reported per query, or zero to report every model.
    pub top_models: usize,
    pub shard_extension: String,
}

impl Default for ClassificationParameters {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            top_models: 0,
            shard_extension: "txt".to_string(),
        }
    }
}

/// A query sequence together with the k-mer codes of its observed strand.
pub struct QueryProfile<'record> {
    pub record: &'record SequenceRecord,
    pub kmers: Vec<KmerCode>,
}

impl QueryProfile<'_> {
    pub fn valid_kmers(&self) -> usize {
        self.kmers.len()
    }
}

/// The scores of one batch of queries against the whole catalog.
pub struct BatchScores {
    pub model_names: Vec<String>,
    pub rankings: Rankings,
}

pub enum Rankings {
    /// One score per query for each model, in catalog order.
    Dense(Vec<Vec<f64>>),
    /// The best models of each query.
    Top(Vec<TopModels>),
}

/// Classifies queries in batches, streaming the model catalog once per batch.
pub struct BatchOrchestrator {
    catalog: PathBuf,
    encoder: KmerEncoder,
    parameters: ClassificationParameters,
}

impl BatchOrchestrator {
    /// Prepares classification against the catalog.
    /// The k-mer length of the first catalog model determines how queries are encoded.
    pub fn new(catalog: impl AsRef<Path>, parameters: ClassificationParameters) -> Result<Self> {
        let catalog = catalog.as_ref().to_path_buf();
        if parameters.batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }

        info!("Determining n-mer length...");
        let first_model = ModelCatalog::open(&catalog)?
            .next()
            .ok_or_else(|| Error::EmptyCatalog(catalog.clone()))??;
        let word_length = load_model(&first_model)?.word_length();
        info!("  n-mer length: {word_length}");

        Ok(Self {
            catalog,
            encoder: KmerEncoder::new(word_length)?,
            parameters,
        })
    }

    pub fn word_length(&self) -> usize {
        self.encoder.word_length()
    }

    pub fn classify_file(
        &self,
        queries: impl AsRef<Path>,
        results: impl AsRef<Path>,
    ) -> Result<()> {
        info!("Reading query fragments...");
        let queries = read_fasta_file(queries)?;
        info!("  Number of query fragments: {}", queries.len());
        self.classify(&queries, results)
    }

    /// Writes one result row per query to `results`, in query order.
    ///
    /// Each batch is written to a shard file next to `results`.
    /// The shards are concatenated in batch order and removed afterwards.
    pub fn classify(&self, queries: &[SequenceRecord], results: impl AsRef<Path>) -> Result<()> {
        let results = results.as_ref();
        info!(
            "Processing query fragments in batches of {}.",
            self.parameters.batch_size
        );

        let mut shards = Vec::new();
        for (batch_index, batch) in queries.chunks(self.parameters.batch_size).enumerate() {
            info!("Batch #{}", batch_index + 1);

            debug!("  Calculating n-mers of {} query fragments", batch.len());
            let profiles: Vec<_> = batch
                .iter()
                .map(|record| {
                    trace!("{}", record.id);
                    QueryProfile {
                        record,
                        kmers: self.encoder.extract_forward(&record.sequence),
                    }
                })
                .collect();

            info!("  Applying models to query fragments");
            let scores = self.score_batch(&profiles)?;

            let shard = shard_path(results, batch_index, &self.parameters.shard_extension);
            info!("  Writing out classification results to {shard:?}");
            write_shard(&shard, batch_index == 0, &profiles, &scores)?;
            shards.push(shard);
        }

        info!("Building results file {results:?}");
        concatenate_shards(&shards, results)?;
        for shard in &shards {
            fs::remove_file(shard).map_err(|source| Error::Shard {
                path: shard.clone(),
                source,
            })?;
        }
        info!("Done.");

        Ok(())
    }

    /// Scores every query of the batch against every catalog model.
    pub fn score_batch(&self, profiles: &[QueryProfile]) -> Result<BatchScores> {
        let mut model_names = Vec::new();
        let mut rankings = match self.parameters.top_models {
            0 => Rankings::Dense(Vec::new()),
            top_models => Rankings::Top(vec![TopModels::new(top_models); profiles.len()]),
        };

        for (model_index, path) in ModelCatalog::open(&self.catalog)?.enumerate() {
            let path = path?;
            if model_index % 200 == 0 {
                info!("  {model_index} models applied");
            }

            let model = load_model(&path)?;
            if model.word_length() != self.encoder.word_length() {
                return Err(Error::WordLengthMismatch {
                    path,
                    expected: self.encoder.word_length(),
                    actual: model.word_length(),
                });
            }
            debug!(
                "Model name: {}, taxonomy: {}, n-mer length: {}",
                model.name(),
                model.taxonomy(),
                model.word_length()
            );

            match &mut rankings {
                Rankings::Dense(scores) => scores.push(
                    profiles
                        .iter()
                        .map(|profile| model.score_kmers(&profile.kmers))
                        .collect::<Result<_>>()?,
                ),
                Rankings::Top(top_models) => {
                    for (profile, top_models) in profiles.iter().zip(top_models.iter_mut()) {
                        top_models.insert(model_index, model.score_kmers(&profile.kmers)?);
                    }
                }
            }
            model_names.push(model.name().to_string());
        }

        if model_names.is_empty() {
            return Err(Error::EmptyCatalog(self.catalog.clone()));
        }

        Ok(BatchScores {
            model_names,
            rankings,
        })
    }
}

/// Writes the tab-separated result rows of one batch.
///
/// In dense mode the first batch starts with a header naming the models.
pub fn write_rows(
    mut output: impl Write,
    write_header: bool,
    profiles: &[QueryProfile],
    scores: &BatchScores,
) -> io::Result<()> {
    match &scores.rankings {
        Rankings::Dense(model_scores) => {
            if write_header {
                write!(output, "Fragment Id\tLength\tValid n-mers")?;
                for name in &scores.model_names {
                    write!(output, "\t{name}")?;
                }
                writeln!(output)?;
            }

            for (query_index, profile) in profiles.iter().enumerate() {
                write_row_prefix(&mut output, profile)?;
                for scores_of_model in model_scores {
                    write!(output, "\t{}", scores_of_model[query_index])?;
                }
                writeln!(output)?;
            }
        }
        Rankings::Top(top_models) => {
            for (profile, top_models) in profiles.iter().zip(top_models) {
                write_row_prefix(&mut output, profile)?;
                for entry in top_models.entries() {
                    write!(
                        output,
                        "\t{}\t{}",
                        scores.model_names[entry.model_index], entry.score
                    )?;
                }
                writeln!(output)?;
            }
        }
    }

    Ok(())
}

fn write_row_prefix(output: &mut impl Write, profile: &QueryProfile) -> io::Result<()> {
    write!(
        output,
        "{}\t{}\t{}",
        profile.record.id,
        profile.record.len(),
        profile.valid_kmers()
    )
}

fn shard_path(results: &Path, batch_index: usize, extension: &str) -> PathBuf {
    let file_name = results
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    results.with_file_name(format!("{file_name}.batch_{batch_index}.{extension}"))
}

fn write_shard(
    path: &Path,
    write_header: bool,
    profiles: &[QueryProfile],
    scores: &BatchScores,
) -> Result<()> {
    let shard_error = |source| Error::Shard {
        path: path.to_path_buf(),
        source,
    };

    let mut output = BufWriter::new(File::create(path).map_err(shard_error)?);
    write_rows(&mut output, write_header, profiles, scores).map_err(shard_error)?;
    output.flush().map_err(shard_error)
}

fn concatenate_shards(shards: &[PathBuf], results: &Path) -> Result<()> {
    let mut output = BufWriter::new(File::create(results)?);
    for shard in shards {
        let shard_error = |source| Error::Shard {
            path: shard.clone(),
            source,
        };
        let mut input = File::open(shard).map_err(shard_error)?;
        io::copy(&mut input, &mut output).map_err(shard_error)?;
    }
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    use tempfile::{tempdir, TempDir};

    use super::{BatchOrchestrator, ClassificationParameters};
    use crate::{
        catalog::write_catalog, error::Error, kmer_model::KmerModel,
        sequence_io::SequenceRecord, taxonomy::Taxonomy,
    };

    fn write_model(directory: &Path, name: &str, word_length: usize, training: &str) -> PathBuf {
        let mut model = KmerModel::new(name, word_length).unwrap();
        model
            .accumulate(&SequenceRecord::new(name, training), &Taxonomy::default())
            .unwrap();
        model.finalize().unwrap();

        let path = directory.join(format!("{name}.model"));
        model.write_file(&path).unwrap();
        path
    }

    /// Three models with distinct compositions; `gc` and `gc_copy` are identical.
    fn catalog(directory: &TempDir) -> PathBuf {
        let models = vec![
            write_model(directory.path(), "at", 3, "AAAATTTTAAATTTATATAAT"),
            write_model(directory.path(), "gc", 3, "GGGGCCCCGGGCCCGCGCGGC"),
            write_model(directory.path(), "gc_copy", 3, "GGGGCCCCGGGCCCGCGCGGC"),
        ];
        let path = directory.path().join("models.txt");
        write_catalog(&path, &models).unwrap();
        path
    }

    fn queries() -> Vec<SequenceRecord> {
        vec![
            SequenceRecord::new("q_at", "ATATAAATTT"),
            SequenceRecord::new("q_gc", "GCGCGGGCCC"),
            SequenceRecord::new("q_short", "AT"),
            SequenceRecord::new("q_mixed", "ATNGCGCGC"),
            SequenceRecord::new("q_gc2", "CCCGGG"),
        ]
    }

    fn classify(
        catalog: &Path,
        directory: &TempDir,
        parameters: ClassificationParameters,
    ) -> String {
        let results = directory.path().join("results.txt");
        BatchOrchestrator::new(catalog, parameters)
            .unwrap()
            .classify(&queries(), &results)
            .unwrap();
        fs::read_to_string(results).unwrap()
    }

    #[test]
    fn test_top_models() {
        let directory = tempdir().unwrap();
        let catalog = catalog(&directory);
        let output = classify(
            &catalog,
            &directory,
            ClassificationParameters {
                batch_size: 2,
                top_models: 2,
                ..Default::default()
            },
        );

        let rows: Vec<Vec<&str>> = output.lines().map(|line| line.split('\t').collect()).collect();
        assert_eq!(rows.len(), 5);

        assert_eq!(&rows[0][..3], &["q_at", "10", "8"]);
        assert_eq!(rows[0].len(), 7);
        assert_eq!(rows[0][3], "at");

        // Ties between identical models are resolved by catalog order.
        assert_eq!(rows[1][3], "gc");
        assert_eq!(rows[1][5], "gc_copy");
        assert_eq!(rows[1][4], rows[1][6]);

        assert_eq!(&rows[2][..3], &["q_short", "2", "0"]);
        assert_eq!(rows[2][4], "0");
        assert_eq!(&rows[3][..3], &["q_mixed", "9", "4"]);
        assert_eq!(rows[4][0], "q_gc2");

        // Shards are removed.
        let leftovers: Vec<_> = fs::read_dir(directory.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".batch_"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[test]
    fn test_dense() {
        let directory = tempdir().unwrap();
        let catalog = catalog(&directory);
        let output = classify(
            &catalog,
            &directory,
            ClassificationParameters {
                batch_size: 3,
                ..Default::default()
            },
        );

        let rows: Vec<Vec<&str>> = output.lines().map(|line| line.split('\t').collect()).collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(
            rows[0],
            vec!["Fragment Id", "Length", "Valid n-mers", "at", "gc", "gc_copy"]
        );
        for row in &rows[1..] {
            assert_eq!(row.len(), 6);
        }

        let scores: Vec<f64> = rows[1][3..].iter().map(|score| score.parse().unwrap()).collect();
        assert!(scores[0] > scores[1]);
        assert_eq!(scores[1], scores[2]);
        assert_eq!(rows[3][3..], ["0", "0", "0"]);
    }

    #[test]
    fn test_batch_size_does_not_change_output() {
        let directory = tempdir().unwrap();
        let catalog = catalog(&directory);

        for top_models in [0, 1, 3] {
            let outputs: Vec<_> = [1, 2, 5, 100]
                .into_iter()
                .map(|batch_size| {
                    classify(
                        &catalog,
                        &directory,
                        ClassificationParameters {
                            batch_size,
                            top_models,
                            ..Default::default()
                        },
                    )
                })
                .collect();
            assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
        }
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let directory = tempdir().unwrap();
        let catalog = catalog(&directory);
        let parameters = ClassificationParameters {
            top_models: 2,
            ..Default::default()
        };

        let first = classify(&catalog, &directory, parameters.clone());
        let second = classify(&catalog, &directory, parameters);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_word_length_mismatch() {
        let directory = tempdir().unwrap();
        let models = vec![
            write_model(directory.path(), "k3", 3, "ACGTACGT"),
            write_model(directory.path(), "k4", 4, "ACGTACGT"),
        ];
        let catalog = directory.path().join("models.txt");
        write_catalog(&catalog, &models).unwrap();

        let orchestrator =
            BatchOrchestrator::new(&catalog, ClassificationParameters::default()).unwrap();
        assert_eq!(orchestrator.word_length(), 3);
        let error = orchestrator
            .classify(&queries(), directory.path().join("results.txt"))
            .unwrap_err();
        assert!(matches!(
            error,
            Error::WordLengthMismatch {
                expected: 3,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_model_aborts() {
        let directory = tempdir().unwrap();
        let good = write_model(directory.path(), "good", 3, "ACGTACGT");
        let bad = directory.path().join("bad.model");
        fs::write(&bad, [3, 0, 0, 0, 1]).unwrap();
        let catalog = directory.path().join("models.txt");
        write_catalog(&catalog, &[good, bad]).unwrap();

        let error = BatchOrchestrator::new(&catalog, ClassificationParameters::default())
            .unwrap()
            .classify(&queries(), directory.path().join("results.txt"))
            .unwrap_err();
        match error {
            Error::ModelLoad { source, .. } => {
                assert!(matches!(*source, Error::CorruptModel(_)))
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let directory = tempdir().unwrap();
        let catalog = catalog(&directory);
        assert!(matches!(
            BatchOrchestrator::new(
                &catalog,
                ClassificationParameters {
                    batch_size: 0,
                    ..Default::default()
                }
            ),
            Err(Error::InvalidBatchSize)
        ));

        let empty = directory.path().join("empty.txt");
        fs::write(&empty, "\n").unwrap();
        assert!(matches!(
            BatchOrchestrator::new(&empty, ClassificationParameters::default()),
            Err(Error::EmptyCatalog(_))
        ));
    }
}
