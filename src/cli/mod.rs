//! Command-line parsing for the photometric calibration tool.
//!
//! Argument parsing and command dispatch stay separate from the calibration code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "photocal", version, about = "Photometric zero-point calibration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the zero point of a matched-catalog bundle and print diagnostics.
    Fit(FitArgs),
    /// Write a synthetic matched-catalog bundle with a known zero point.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Matched-catalog bundle (JSON).
    #[arg(short, long, value_name = "JSON")]
    pub input: PathBuf,

    /// Instrumental flux field of the source catalog.
    #[arg(long, default_value = "base_PsfFlux_flux")]
    pub flux_field: String,

    /// Fraction of candidates held out of the fit, in [0, 1).
    #[arg(long, default_value_t = 0.0)]
    pub reserve_fraction: f64,

    /// Seed for choosing the reserved sample.
    #[arg(long, default_value_t = 1)]
    pub reserve_seed: u64,

    /// Correct reference magnitudes with colour terms.
    #[arg(long)]
    pub apply_color_terms: bool,

    /// Colour-term library (JSON).
    #[arg(long, value_name = "JSON")]
    pub colorterms: Option<PathBuf>,

    /// Reference catalog name matched against the library patterns.
    #[arg(long)]
    pub photo_cat_name: Option<String>,

    /// Clipping threshold in units of the robust scatter.
    #[arg(long, default_value_t = 3.0)]
    pub n_sigma: f64,

    /// Maximum clipping iterations.
    #[arg(long, default_value_t = 20)]
    pub n_iter: usize,

    /// Centre on the inverse-variance weighted mean instead of the median.
    #[arg(long)]
    pub mean: bool,

    /// Minimum sources that must survive clipping.
    #[arg(long, default_value_t = 3)]
    pub min_used: usize,

    /// Drop candidates with a reference magnitude fainter than this.
    #[arg(long)]
    pub mag_limit: Option<f64>,

    /// Drop candidates with this source flag set (repeatable).
    #[arg(long = "bad-flag", value_name = "FLAG")]
    pub bad_flags: Vec<String>,

    /// Minimum instrumental signal-to-noise.
    #[arg(long)]
    pub min_snr: Option<f64>,

    /// Render an ASCII residual plot.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Show the N largest residuals.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Number of matched stars.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub count: usize,

    /// Extra catalog rows with no reference match.
    #[arg(long, default_value_t = 0)]
    pub unmatched: usize,

    /// True zero point of the simulated exposure.
    #[arg(long, default_value_t = 31.0)]
    pub zero_point: f64,

    /// Gaussian magnitude scatter.
    #[arg(long, default_value_t = 0.05)]
    pub scatter: f64,

    /// Probability of a gross outlier.
    #[arg(long, default_value_t = 0.05)]
    pub outlier_prob: f64,

    /// Minimum outlier jump (mag).
    #[arg(long, default_value_t = 1.0)]
    pub outlier_mag: f64,

    /// Probability of an unusable flux.
    #[arg(long, default_value_t = 0.0)]
    pub bad_flux_prob: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Exposure filter band.
    #[arg(long, default_value = "i")]
    pub filter: String,

    #[arg(long)]
    pub exposure_id: Option<u64>,

    /// Output bundle path.
    #[arg(short, long, value_name = "JSON")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fit_with_repeated_flags() {
        let cli = Cli::try_parse_from([
            "photocal",
            "fit",
            "--input",
            "bundle.json",
            "--reserve-fraction",
            "0.2",
            "--bad-flag",
            "flag_edge",
            "--bad-flag",
            "flag_saturated",
            "--mean",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.reserve_fraction, 0.2);
        assert_eq!(args.bad_flags, vec!["flag_edge", "flag_saturated"]);
        assert!(args.mean);
        assert!(!args.plot);
        assert_eq!(args.flux_field, "base_PsfFlux_flux");
    }

    #[test]
    fn simulate_requires_output() {
        assert!(Cli::try_parse_from(["photocal", "simulate"]).is_err());
        let cli = Cli::try_parse_from(["photocal", "simulate", "-n", "50", "-o", "out.json"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.count, 50);
        assert_eq!(args.filter, "i");
    }
}
