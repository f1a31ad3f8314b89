//! Formatted terminal output for calibration runs.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes stay local.

use crate::domain::{CalibrationConfig, CalibrationResult, CandidateResidual, CandidateStatus};
use crate::io::IngestedMatches;

/// Format the run summary: inputs, counts, fitted zero point, and validation.
pub fn format_run_summary(
    ingested: &IngestedMatches,
    result: &CalibrationResult,
    config: &CalibrationConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== photocal - photometric zero point ===\n");
    match ingested.exposure.id {
        Some(id) => out.push_str(&format!("Exposure: {id} | filter={}\n", ingested.exposure.filter)),
        None => out.push_str(&format!("Exposure: - | filter={}\n", ingested.exposure.filter)),
    }
    out.push_str(&format!(
        "Flux: {} | reference: {}\n",
        config.flux_field,
        result.arrays.ref_flux_field_list.join(", ")
    ));
    if config.apply_color_terms {
        out.push_str(&format!(
            "Colour terms: {}\n",
            config.photo_cat_name.as_deref().unwrap_or("-")
        ));
    }
    out.push_str(&format!(
        "Sources: {} | matches: {} | unresolved links: {}\n",
        ingested.catalog.len(),
        ingested.pairs.len(),
        ingested.link_errors.len()
    ));
    out.push_str(&format!(
        "Candidates: {} | reserved: {} | used: {} | clipped: {}\n",
        result.counts.candidates,
        result.counts.reserved,
        result.counts.used,
        result.counts.candidates - result.counts.reserved - result.counts.used
    ));

    out.push_str("\nZero point:\n");
    out.push_str(&format!(
        "- zp    : {:.4} +/- {:.4} mag\n",
        result.zero_point, result.zero_point_error
    ));
    out.push_str(&format!("- sigma : {:.4} mag\n", result.sigma));
    out.push_str(&format!("- iters : {}\n", result.iterations));
    out.push_str(&format!("- flux0 : {:.6e}\n", result.calib.flux_mag0()));

    if let Some(v) = &result.validation {
        out.push_str("\nReserved sample:\n");
        out.push_str(&format!("- n={} mean={:+.4} rms={:.4} mag\n", v.n, v.mean, v.rms));
    }
    out.push('\n');

    out
}

/// Format the largest-residual table.
pub fn format_residual_table(rows: &[CandidateResidual]) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals (src_mag + zp - ref_mag):\n");
    out.push_str(format!("{:<12} {:>9} {:>10} {:<9}\n", "source", "ref_mag", "residual", "status").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<9} {:-<10} {:-<9}\n", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<12} {:>9.3} {:>+10.4} {:<9}\n",
                truncate(&r.source_id.to_string(), 12),
                r.ref_mag,
                r.residual,
                status_label(r.status),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn status_label(status: CandidateStatus) -> &'static str {
    match status {
        CandidateStatus::Used => "used",
        CandidateStatus::Clipped => "clipped",
        CandidateStatus::Reserved => "reserved",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
