//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real entry point:
//! - parses CLI arguments
//! - reads matched-catalog bundles and colour-term libraries
//! - runs the calibration task
//! - prints the summary, residual table, and optional plot
//! - writes simulated bundles

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, FitArgs, SimulateArgs};
use crate::colorterm::ColortermLibrary;
use crate::data::{SimulationConfig, simulate_matches};
use crate::domain::{CalibrationConfig, ClipConfig, SelectionConfig};
use crate::error::PhotoCalError;
use crate::io::{MatchBundle, read_colorterm_library, read_match_bundle, write_match_bundle};

pub mod pipeline;

/// Entry point for the `photocal` binary.
pub fn run() -> Result<(), PhotoCalError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), PhotoCalError> {
    let config = config_from_args(&args)?;
    let bundle = read_match_bundle(&args.input)?;
    let run = pipeline::run_calibration(&config, bundle)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingested, &run.result, &config)
    );

    if args.top > 0 {
        let rows = crate::report::largest_residuals(&run.result, args.top);
        println!("{}", crate::report::format_residual_table(&rows));
    }

    if args.plot {
        let plot = crate::plot::render_residual_plot(&run.result, args.width, args.height);
        println!("{plot}");
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), PhotoCalError> {
    let config = simulation_config_from_args(&args);
    let sim = simulate_matches(&config)?;
    let bundle = MatchBundle::from_pairs(sim.exposure.clone(), &sim.catalog, &sim.pairs);
    write_match_bundle(&args.output, &bundle)?;

    info!(
        "wrote {} matches ({} outliers, {} bad rows) to {}",
        sim.pairs.len(),
        sim.outliers.len(),
        sim.bad_rows.len(),
        args.output.display()
    );
    Ok(())
}

/// Build the calibration config from `fit` arguments.
///
/// Only the colour-term library is read here; validation happens when the task runs.
pub fn config_from_args(args: &FitArgs) -> Result<CalibrationConfig, PhotoCalError> {
    let colorterms = match &args.colorterms {
        Some(path) => read_colorterm_library(path)?,
        None => ColortermLibrary::default(),
    };

    Ok(CalibrationConfig {
        flux_field: args.flux_field.clone(),
        apply_color_terms: args.apply_color_terms,
        colorterms,
        photo_cat_name: args.photo_cat_name.clone(),
        reserve_fraction: args.reserve_fraction,
        reserve_seed: args.reserve_seed,
        selection: SelectionConfig {
            bad_flags: args.bad_flags.clone(),
            mag_limit: args.mag_limit,
            min_snr: args.min_snr,
        },
        clip: ClipConfig {
            n_sigma: args.n_sigma,
            n_iter: args.n_iter,
            use_median: !args.mean,
            min_used: args.min_used,
            ..ClipConfig::default()
        },
    })
}

pub fn simulation_config_from_args(args: &SimulateArgs) -> SimulationConfig {
    SimulationConfig {
        count: args.count,
        unmatched: args.unmatched,
        zero_point: args.zero_point,
        scatter: args.scatter,
        outlier_prob: args.outlier_prob,
        outlier_mag: args.outlier_mag,
        bad_flux_prob: args.bad_flux_prob,
        filter: args.filter.clone(),
        exposure_id: args.exposure_id,
        seed: args.seed,
        ..SimulationConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "photocal",
            "fit",
            "-i",
            "bundle.json",
            "--reserve-fraction",
            "0.25",
            "--mean",
            "--n-sigma",
            "2.5",
            "--mag-limit",
            "21.5",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = config_from_args(&args).unwrap();
        assert_eq!(config.reserve_fraction, 0.25);
        assert!(!config.clip.use_median);
        assert_eq!(config.clip.n_sigma, 2.5);
        assert_eq!(config.selection.mag_limit, Some(21.5));
        assert!(config.colorterms.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_colorterm_library_is_io_error() {
        let cli = Cli::try_parse_from([
            "photocal",
            "fit",
            "-i",
            "bundle.json",
            "--colorterms",
            "/nonexistent/colorterms.json",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(matches!(config_from_args(&args), Err(PhotoCalError::Io(_))));
    }
}
