use clap::Parser;
use cli::{ClassifyCommand, Cli, CliCommands, ModelInfoCommand, NullModelCommand, TrainCommand};
use log::{error, info};
use nbclassify::{catalog::load_model, classify::BatchOrchestrator, train, Result};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;

fn main() {
    let cli = Cli::parse();

    if let Err(error) = TermLogger::init(
        cli.log_level.into(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialise logging: {error}");
    }

    let result = match cli.command {
        CliCommands::Train(train_command) => run_train(train_command),
        CliCommands::NullModel(null_model_command) => run_null_model(null_model_command),
        CliCommands::Classify(classify_command) => run_classify(classify_command),
        CliCommands::ModelInfo(model_info_command) => run_model_info(model_info_command),
    };

    if let Err(error) = result {
        error!("{error}");
        std::process::exit(1);
    }
}

fn run_train(train_command: TrainCommand) -> Result<()> {
    train::train_models(
        &train_command.sequence_list,
        train_command.taxonomy.as_deref(),
        &train_command.output_directory,
        train_command.word_length,
    )?;
    Ok(())
}

fn run_null_model(null_model_command: NullModelCommand) -> Result<()> {
    train::train_null_model(
        &null_model_command.input,
        &null_model_command.output,
        null_model_command.word_length,
    )
}

fn run_classify(classify_command: ClassifyCommand) -> Result<()> {
    let orchestrator =
        BatchOrchestrator::new(&classify_command.catalog, classify_command.parameters())?;
    orchestrator.classify_file(&classify_command.queries, &classify_command.results)
}

fn run_model_info(model_info_command: ModelInfoCommand) -> Result<()> {
    for path in &model_info_command.models {
        let model = load_model(path)?;
        info!("Model file: {}", path.display());
        info!("  Model name: {}", model.name());
        info!("  Model taxonomy: {}", model.taxonomy());
        info!("  N-mer length: {}", model.word_length());
    }
    Ok(())
}
