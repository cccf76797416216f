use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    catalog::write_catalog,
    error::Result,
    kmer_model::KmerModel,
    sequence_io::FastaReader,
    taxonomy::{Taxonomy, TaxonomyMap},
};

pub const DEFAULT_WORD_LENGTH: usize = 10;
pub const DEFAULT_NULL_MODEL_WORD_LENGTH: usize = 8;
pub const MODEL_EXTENSION: &str = "model";
pub const CATALOG_FILE_NAME: &str = "models.txt";
pub const NULL_MODEL_NAME: &str = "Null Model";

/// Trains one model per FASTA file listed in `sequence_list`.
///
/// Each model is named after its FASTA file and written to `output_directory`,
/// together with a catalog of all written models.
/// Returns the paths of the written models.
pub fn train_models(
    sequence_list: impl AsRef<Path>,
    taxonomy: Option<&Path>,
    output_directory: impl AsRef<Path>,
    word_length: usize,
) -> Result<Vec<PathBuf>> {
    let output_directory = output_directory.as_ref();

    let taxonomy = if let Some(taxonomy) = taxonomy {
        info!("Reading taxonomy file...");
        let taxonomy = TaxonomyMap::read_file(taxonomy)?;
        info!("  Number of strains: {}", taxonomy.strain_count());
        taxonomy
    } else {
        TaxonomyMap::default()
    };

    fs::create_dir_all(output_directory)?;

    info!("Training models...");
    let mut models = Vec::new();
    for fasta in read_sequence_list(sequence_list)? {
        let name = model_name(&fasta);
        info!("  Processing model {name}");

        let mut model = KmerModel::new(name.clone(), word_length)?;
        accumulate_fasta(&mut model, &fasta, &taxonomy)?;
        model.finalize()?;

        let path = output_directory.join(format!("{name}.{MODEL_EXTENSION}"));
        model.write_file(&path)?;
        models.push(path);
    }

    write_catalog(output_directory.join(CATALOG_FILE_NAME), &models)?;
    info!("Number of models: {}", models.len());

    Ok(models)
}

/// Trains a single model from all sequences of a FASTA file.
pub fn train_null_model(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    word_length: usize,
) -> Result<()> {
    info!("Building null model...");
    let mut model = KmerModel::new(NULL_MODEL_NAME, word_length)?;
    accumulate_fasta(&mut model, input.as_ref(), &TaxonomyMap::default())?;
    model.finalize()?;
    model.write_file(output)
}

/// Adds every sequence of the FASTA file to the model.
///
/// Sequences that fail validation are skipped with a warning.
fn accumulate_fasta(model: &mut KmerModel, fasta: &Path, taxonomy: &TaxonomyMap) -> Result<()> {
    let unknown_taxonomy = Taxonomy::default();

    for record in FastaReader::open(fasta)? {
        let record = record?;
        let sequence_taxonomy = taxonomy.get(&record.id).unwrap_or(&unknown_taxonomy);

        match model.accumulate(&record, sequence_taxonomy) {
            Ok(kmers) => debug!("    {}: {kmers} n-mers", record.id),
            Err(error) if error.is_validation() => warn!("Skipping sequence: {error}"),
            Err(error) => return Err(error),
        }
    }

    if model.sequences() == 0 {
        warn!(
            "Model {} contains no sequences, all n-mers are equally likely",
            model.name()
        );
    }

    Ok(())
}

/// Reads the non-blank lines of a file, each naming a FASTA file.
fn read_sequence_list(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }
    Ok(paths)
}

/// The file name without directory and extension.
fn model_name(fasta: &Path) -> String {
    fasta
        .file_stem()
        .unwrap_or(fasta.as_os_str())
        .to_string_lossy()
        .into_owned()
}
