// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains every candidate on the TCO dataset
//   2. `classify` — loads the artifacts and classifies one
//                   measurement
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassifyArgs, Commands, TrainArgs};

use crate::domain::feature_schema::FEATURES;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::inferencer::{capture_all, parse_feature_text};

#[derive(Parser, Debug)]
#[command(
    name = "tco-classifier",
    version,
    about = "Classify transparent conducting oxide films from optical measurements."
)]
pub struct Cli {
    /// The subcommand to run (train or classify)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. The CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Classify(args) => run_classify(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.dataset);
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("Trained on {} rows ({} skipped as incomplete)", summary.n_rows, summary.skipped_incomplete);
    println!(
        "Train {} (+{} synthetic) / test {}",
        summary.n_train, summary.n_synthetic, summary.n_test
    );
    println!("\n{:<14} {:>8}", "Model", "Accuracy");
    for (name, acc) in &summary.accuracy_table {
        println!("{:<14} {:>8.4}", name, acc);
    }
    println!(
        "\nSelected {} ({:.4}); artifacts in '{}' (pair {:016x}), reports in '{}'",
        summary.selected,
        summary.accuracy,
        summary.artifact_dir.display(),
        summary.pair_id,
        summary.report_dir.display()
    );
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    use crate::application::classify_use_case::ClassifierService;

    let mut values = [None; 4];
    for ((slot, text), spec) in values.iter_mut().zip(args.values()).zip(&FEATURES) {
        *slot = parse_feature_text(text, spec)?;
    }
    let inputs = capture_all(values);

    let service = ClassifierService::start(ArtifactStore::new(&args.artifact_dir))?;
    let result  = service.classify(&inputs)?;

    for (input, spec) in inputs.iter().zip(&FEATURES) {
        if let (true, Some(raw), Some(shown)) = (input.was_clamped(), input.raw, input.display_value()) {
            println!(
                "note: {} {}{} is outside {}–{}{}; displayed as {}{} but classified as entered",
                spec.label, raw, spec.unit, spec.min, spec.max, spec.unit, shown, spec.unit
            );
        }
    }

    println!(
        "Material: {} ({:.1}%)",
        result.label,
        result.probability_of(&result.label).unwrap_or_default() * 100.0
    );
    for p in &result.probabilities {
        println!("  {:<6} {:.4}", p.class, p.probability);
    }
    Ok(())
}
