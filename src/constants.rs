//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available —
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Remote semantic-search endpoint (GET with a `query` parameter).
  pub search_endpoint: String,

  /// Cap for the "Showing top N results" label.
  pub display_cap: usize,

  // Cosmetic loading progress
  pub progress_ceiling: f64,
  pub progress_rate: f64,

  /// Query substrings that trigger the canned sample set when the live call fails.
  pub fallback_keywords: Vec<String>,

  /// UMLS semantic types surfaced as tag chips.
  pub medical_semantic_types: Vec<String>,

  // Pipeline form
  pub submit_delay_ms: u64,

  pub error_dismiss_secs: u64,

  /// Canonical diagnosis facet vocabulary (independent of the bundled dataset).
  pub diagnosis_list: Vec<String>,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
