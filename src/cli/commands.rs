// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `classify`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model_bank::SelectionPolicy;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train every candidate model and persist the selected one
    Train(TrainArgs),

    /// Classify one measurement with the persisted model
    Classify(ClassifyArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV with Material, Wavelength, AbsorptionRate, Transmission, OpticalDensity
    #[arg(long, default_value = "data/TCO.csv")]
    pub dataset: String,

    /// Where pipeline.json and label_codec.json are written
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Where accuracy tables, ROC and learning curves are written
    #[arg(long, default_value = "reports")]
    pub report_dir: String,

    /// Seed for the split, SMOTE and every stochastic model
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Neighbours considered when synthesising SMOTE samples
    #[arg(long, default_value_t = 5)]
    pub smote_k: usize,

    /// Rows per class after balancing (default: majority class size)
    #[arg(long)]
    pub balance_target: Option<usize>,

    /// Persist this candidate instead of the most accurate one
    /// (SVC, KNN, "Decision Tree", "Random Forest", XGBoost, MLP)
    #[arg(long)]
    pub select: Option<String>,

    /// JSON file overriding candidate hyperparameters
    #[arg(long)]
    pub model_config: Option<String>,

    /// Folds used for the learning curves
    #[arg(long, default_value_t = 5)]
    pub cv_folds: usize,

    /// Skip the learning-curve computation
    #[arg(long)]
    pub no_learning_curves: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset:         a.dataset,
            artifact_dir:    a.artifact_dir,
            report_dir:      a.report_dir,
            seed:            a.seed,
            test_fraction:   a.test_fraction,
            smote_k:         a.smote_k,
            balance_target:  a.balance_target,
            selection:       a.select.map_or(SelectionPolicy::BestAccuracy, SelectionPolicy::Fixed),
            model_config:    a.model_config,
            cv_folds:        a.cv_folds,
            learning_curves: !a.no_learning_curves,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `classify` command.
/// Values are taken as text so an empty or missing one can be
/// reported together with every other missing feature.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Wavelength in nm (300–800)
    #[arg(long, allow_hyphen_values = true)]
    pub wavelength: Option<String>,

    /// Absorbance (0–1)
    #[arg(long, allow_hyphen_values = true)]
    pub absorbance: Option<String>,

    /// Transmission in % (0–100)
    #[arg(long, allow_hyphen_values = true)]
    pub transmission: Option<String>,

    /// Optical density (0–100000)
    #[arg(long, allow_hyphen_values = true)]
    pub optical_density: Option<String>,

    /// Directory written by `train`
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,
}

impl ClassifyArgs {
    /// The four text values in feature order.
    pub fn values(&self) -> [Option<&str>; 4] {
        [
            self.wavelength.as_deref(),
            self.absorbance.as_deref(),
            self.transmission.as_deref(),
            self.optical_density.as_deref(),
        ]
    }
}
