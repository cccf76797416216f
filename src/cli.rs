use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use nbclassify::{
    classify::{ClassificationParameters, DEFAULT_BATCH_SIZE},
    train::{DEFAULT_NULL_MODEL_WORD_LENGTH, DEFAULT_WORD_LENGTH},
};

#[derive(Parser)]
#[command(version, about = "Naive Bayes classification of nucleotide fragments by their k-mer composition.")]
pub struct Cli {
    /// The amount of logging output.
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info, global = true)]
    pub log_level: CliLogLevel,

    #[command(subcommand)]
    pub command: CliCommands,
}

#[derive(Subcommand)]
pub enum CliCommands {
    /// Train one model per FASTA file listed in a sequence list.
    Train(TrainCommand),

    /// Train a single null model from all sequences of a FASTA file.
    NullModel(NullModelCommand),

    /// Score query fragments against a catalog of models.
    Classify(ClassifyCommand),

    /// Print the name, taxonomy and k-mer length of models.
    ModelInfo(ModelInfoCommand),
}

#[derive(Args)]
pub struct TrainCommand {
    /// File listing the path of each FASTA file for which a model should be built, one per line.
    #[arg(short, long)]
    pub sequence_list: PathBuf,

    /// Directory to write the models and their catalog to.
    #[arg(short = 'm', long)]
    pub output_directory: PathBuf,

    /// Tab-separated file assigning a taxonomy `kingdom;...;strain;` to each sequence id.
    #[arg(short, long)]
    pub taxonomy: Option<PathBuf>,

    /// The k-mer length.
    #[arg(short = 'n', long, default_value_t = DEFAULT_WORD_LENGTH)]
    pub word_length: usize,
}

#[derive(Args)]
pub struct NullModelCommand {
    /// FASTA file containing the sequences of the null model.
    #[arg(short, long)]
    pub input: PathBuf,

    /// File to write the null model to.
    #[arg(short, long)]
    pub output: PathBuf,

    /// The k-mer length.
    #[arg(short = 'n', long, default_value_t = DEFAULT_NULL_MODEL_WORD_LENGTH)]
    pub word_length: usize,
}

#[derive(Args)]
pub struct ClassifyCommand {
    /// Multi-FASTA file containing the query fragments.
    #[arg(short, long)]
    pub queries: PathBuf,

    /// File listing the model files to classify against, one per line.
    #[arg(short = 'm', long)]
    pub catalog: PathBuf,

    /// File to write the classification results to.
    #[arg(short, long)]
    pub results: PathBuf,

    /// Number of fragments to classify at a time.
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Report the log likelihood of the best T models per fragment.
    /// With T = 0 the log likelihood of every model is reported.
    #[arg(short, long, default_value_t = 0)]
    pub top_models: usize,

    /// Extension of the temporary per-batch result files.
    #[arg(short = 'e', long, default_value = "txt")]
    pub shard_extension: String,
}

impl ClassifyCommand {
    pub fn parameters(&self) -> ClassificationParameters {
        ClassificationParameters {
            batch_size: self.batch_size,
            top_models: self.top_models,
            shard_extension: self.shard_extension.clone(),
        }
    }
}

#[derive(Args)]
pub struct ModelInfoCommand {
    /// The model files.
    #[arg(required = true)]
    pub models: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Off => LevelFilter::Off,
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}
