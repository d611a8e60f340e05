//! Result reconciliation & faceted filtering.
//!
//! Pure functions of `(search matches, facet selection, reference index)`.
//! The display mode is always computed from the data, never stored, so the
//! "exactly one mode active" invariant cannot drift out of sync with state.

use crate::constants::constants;
use crate::reference::{ReferenceIndex, ReferenceRecord, normalize_url, split_topics, strip_display};
use crate::search::{ExtractedEntity, SearchMatch};

/// One independent filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
  Diagnosis,
  Complaint,
  Topic,
}

impl Facet {
  pub const ALL: [Facet; 3] = [Facet::Diagnosis, Facet::Complaint, Facet::Topic];

  pub fn label(self) -> &'static str {
    match self {
      Facet::Diagnosis => "Diagnosis",
      Facet::Complaint => "Chief Complaint",
      Facet::Topic => "Topics",
    }
  }
}

/// User-chosen facet values: three independent sets, mutated only by
/// explicit add/remove/clear actions.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
  diagnoses: Vec<String>,
  complaints: Vec<String>,
  topics: Vec<String>,
}

impl FilterSelection {
  pub fn selected(&self, facet: Facet) -> &[String] {
    match facet {
      Facet::Diagnosis => &self.diagnoses,
      Facet::Complaint => &self.complaints,
      Facet::Topic => &self.topics,
    }
  }

  fn selected_mut(&mut self, facet: Facet) -> &mut Vec<String> {
    match facet {
      Facet::Diagnosis => &mut self.diagnoses,
      Facet::Complaint => &mut self.complaints,
      Facet::Topic => &mut self.topics,
    }
  }

  pub fn add(&mut self, facet: Facet, value: &str) {
    let set = self.selected_mut(facet);
    if !set.iter().any(|v| v == value) {
      set.push(value.to_string());
    }
  }

  pub fn remove(&mut self, facet: Facet, value: &str) {
    self.selected_mut(facet).retain(|v| v != value);
  }

  pub fn clear_all(&mut self) {
    self.diagnoses.clear();
    self.complaints.clear();
    self.topics.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.diagnoses.is_empty() && self.complaints.is_empty() && self.topics.is_empty()
  }

  /// Total selected values across facets (the filter-badge count).
  pub fn total(&self) -> usize {
    self.diagnoses.len() + self.complaints.len() + self.topics.len()
  }
}

/// Which list the UI is showing. Search results always win over facet
/// browsing, which wins over the empty landing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsMode {
  Search,
  Browse,
  Empty,
}

pub fn results_mode(matches: &[SearchMatch], selection: &FilterSelection) -> ResultsMode {
  if !matches.is_empty() {
    ResultsMode::Search
  } else if !selection.is_empty() {
    ResultsMode::Browse
  } else {
    ResultsMode::Empty
  }
}

/// A fully merged, display-ready result card. Clinical fields are already
/// stripped of bracket/quote noise.
#[derive(Debug, Clone, Default)]
pub struct DisplayCard {
  /// Watch link (timestamped for search results with a start time).
  pub link: String,
  pub title: Option<String>,
  pub description: Option<String>,
  pub thumbnail: Option<String>,
  pub upload_date: Option<String>,
  /// Relevance score, present only for live search results.
  pub score: Option<f64>,
  pub final_dx: Option<String>,
  pub chief_complaint: Option<String>,
  pub topics: Vec<String>,
  pub patient_age: Option<String>,
  pub patient_sex: Option<String>,
  /// Medical tag chips from the title-extracted entities.
  pub tags: Vec<String>,
  /// Transcript excerpt, shown on demand.
  pub transcript: Option<String>,
  pub start_time: Option<f64>,
}

/// Build the watch link: strip newlines and trim, then append
/// `t=<rounded seconds>` with `&` if the URL already has a query, else `?`.
pub fn watch_url(url: &str, start_time: Option<f64>) -> String {
  let clean = normalize_url(url);
  match start_time {
    Some(secs) => {
      let separator = if clean.contains('?') { '&' } else { '?' };
      format!("{}{}t={}", clean, separator, secs.round() as i64)
    }
    None => clean,
  }
}

/// Project tag chips from extracted entities: keep only the allow-listed
/// semantic types (sign/symptom, disease/disorder), strip the text.
pub fn medical_tags(entities: &[ExtractedEntity]) -> Vec<String> {
  entities
    .iter()
    .filter(|e| constants().medical_semantic_types.iter().any(|t| t == &e.semantic_type))
    .map(|e| strip_display(&e.text))
    .filter(|t| !t.is_empty())
    .collect()
}

fn strip_opt(field: &Option<String>) -> Option<String> {
  field.as_deref().map(strip_display).filter(|s| !s.is_empty())
}

/// Case-insensitive facet match against the raw record fields: at least one
/// selected value must appear in each non-empty facet (OR within a facet,
/// AND across facets). Empty facets pass vacuously.
pub fn record_matches_selection(record: &ReferenceRecord, selection: &FilterSelection) -> bool {
  let field_contains_any = |field: &Option<String>, wanted: &[String]| {
    if wanted.is_empty() {
      return true;
    }
    let haystack = field.as_deref().unwrap_or("").to_lowercase();
    wanted.iter().any(|v| haystack.contains(&v.to_lowercase()))
  };

  field_contains_any(&record.final_dx, &selection.diagnoses)
    && field_contains_any(&record.chief_complaint, &selection.complaints)
    && field_contains_any(&record.topics, &selection.topics)
}

fn search_card(m: &SearchMatch, index: &ReferenceIndex) -> DisplayCard {
  let mut card = DisplayCard {
    link: watch_url(&m.url, m.start_time),
    title: m.metadata.title.clone(),
    description: m.metadata.description.clone(),
    thumbnail: m.metadata.thumbnail.clone(),
    upload_date: m.metadata.upload_date.clone(),
    score: Some(m.score),
    tags: medical_tags(&m.metadata.title_extracted_entities),
    transcript: m.text.clone(),
    start_time: m.start_time,
    ..DisplayCard::default()
  };

  match index.lookup(&m.url) {
    Some(record) => {
      card.final_dx = strip_opt(&record.final_dx);
      card.chief_complaint = strip_opt(&record.chief_complaint);
      card.topics = record.topics.as_deref().map(split_topics).unwrap_or_default();
      card.patient_age = strip_opt(&record.patient_age);
      card.patient_sex = strip_opt(&record.patient_sex);
    }
    // No reference record: the match's own diagnosis string is the only enrichment.
    None => card.final_dx = strip_opt(&m.final_dx),
  }
  card
}

fn browse_card(record: &ReferenceRecord) -> DisplayCard {
  DisplayCard {
    link: record.url.trim().to_string(),
    final_dx: strip_opt(&record.final_dx),
    chief_complaint: strip_opt(&record.chief_complaint),
    topics: record.topics.as_deref().map(split_topics).unwrap_or_default(),
    patient_age: strip_opt(&record.patient_age),
    patient_sex: strip_opt(&record.patient_sex),
    ..DisplayCard::default()
  }
}

/// Produce the ordered card list for the current mode.
///
/// Search mode keeps the service's ranking order untouched; browse mode
/// keeps the dataset's declaration order. No re-sorting, no truncation —
/// the display cap is a label concern, handled by [`visible_count`].
pub fn build_cards(matches: &[SearchMatch], selection: &FilterSelection, index: &ReferenceIndex) -> Vec<DisplayCard> {
  match results_mode(matches, selection) {
    ResultsMode::Search => matches.iter().map(|m| search_card(m, index)).collect(),
    ResultsMode::Browse => {
      index.records().iter().filter(|r| record_matches_selection(r, selection)).map(browse_card).collect()
    }
    ResultsMode::Empty => Vec::new(),
  }
}

/// Count for the "Showing top N results" label.
pub fn visible_count(total: usize) -> usize {
  total.min(constants().display_cap)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::reference::ReferenceIndex;

  fn test_index() -> ReferenceIndex {
    ReferenceIndex::from_json_str(
      r#"{
        "https://www.youtube.com/watch?v=AAA111": {
          "Final Dx": "Autoimmune hemolytic anemia",
          "Chief Complaint": "fatigue",
          "Topics": "hematology, immunology"
        },
        "https://www.youtube.com/watch?v=BBB222": {
          "Final Dx": "Pulmonary embolism",
          "Chief Complaint": "chest pain",
          "Topics": "cardiology; pulmonology"
        },
        "https://www.youtube.com/watch?v=CCC333": {
          "Final Dx": "Iron deficiency anemia",
          "Chief Complaint": "dyspnea",
          "Topics": "hematology"
        }
      }"#,
    )
  }

  fn search_match(url: &str, score: f64) -> SearchMatch {
    SearchMatch { url: url.to_string(), score, ..SearchMatch::default() }
  }

  fn selection(diagnoses: &[&str], complaints: &[&str], topics: &[&str]) -> FilterSelection {
    let mut sel = FilterSelection::default();
    for d in diagnoses {
      sel.add(Facet::Diagnosis, d);
    }
    for c in complaints {
      sel.add(Facet::Complaint, c);
    }
    for t in topics {
      sel.add(Facet::Topic, t);
    }
    sel
  }

  // --- watch_url ---

  #[test]
  fn watch_url_appends_rounded_timestamp() {
    assert_eq!(watch_url("https://youtu.be/abc", Some(90.6)), "https://youtu.be/abc?t=91");
    assert_eq!(watch_url("https://youtu.be/abc?x=1", Some(90.6)), "https://youtu.be/abc?x=1&t=91");
  }

  #[test]
  fn watch_url_without_start_time_only_cleans() {
    assert_eq!(watch_url(" https://youtu.be/abc\n", None), "https://youtu.be/abc");
  }

  #[test]
  fn watch_url_rounds_half_up() {
    assert_eq!(watch_url("https://youtu.be/abc", Some(0.5)), "https://youtu.be/abc?t=1");
    assert_eq!(watch_url("https://youtu.be/abc", Some(0.4)), "https://youtu.be/abc?t=0");
  }

  // --- mode precedence ---

  #[test]
  fn search_matches_always_win() {
    let matches = vec![search_match("https://youtu.be/abc", 0.9)];
    let sel = selection(&["anemia"], &[], &[]);
    assert_eq!(results_mode(&matches, &sel), ResultsMode::Search);
  }

  #[test]
  fn clearing_matches_falls_through_to_browse() {
    let sel = selection(&["anemia"], &[], &[]);
    assert_eq!(results_mode(&[], &sel), ResultsMode::Browse);
    assert_eq!(results_mode(&[], &FilterSelection::default()), ResultsMode::Empty);
  }

  // --- browse-mode facet law ---

  #[test]
  fn and_across_facets_or_within() {
    let index = test_index();
    // Only AAA111 has both an "anemia" diagnosis and a "fatigue" complaint.
    let sel = selection(&["anemia"], &["fatigue"], &[]);
    let cards = build_cards(&[], &sel, &index);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].final_dx.as_deref(), Some("Autoimmune hemolytic anemia"));
  }

  #[test]
  fn empty_facet_is_vacuously_true() {
    let index = test_index();
    let sel = selection(&["anemia"], &[], &[]);
    // Both anemia records qualify; the complaint facet is empty.
    assert_eq!(build_cards(&[], &sel, &index).len(), 2);
  }

  #[test]
  fn multiple_values_in_one_facet_are_or() {
    let index = test_index();
    let sel = selection(&[], &["fatigue", "chest pain"], &[]);
    assert_eq!(build_cards(&[], &sel, &index).len(), 2);
  }

  #[test]
  fn topic_matching_is_substring_on_the_raw_field() {
    let index = test_index();
    let sel = selection(&[], &[], &["pulmo"]);
    let cards = build_cards(&[], &sel, &index);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].final_dx.as_deref(), Some("Pulmonary embolism"));
  }

  #[test]
  fn facet_match_is_case_insensitive() {
    let index = test_index();
    let sel = selection(&["ANEMIA"], &[], &[]);
    assert_eq!(build_cards(&[], &sel, &index).len(), 2);
  }

  #[test]
  fn browse_keeps_dataset_declaration_order() {
    let index = test_index();
    let sel = selection(&[], &[], &["hematology"]);
    let cards = build_cards(&[], &sel, &index);
    assert_eq!(cards.len(), 2);
    assert!(cards[0].link.contains("AAA111"));
    assert!(cards[1].link.contains("CCC333"));
  }

  #[test]
  fn no_selection_and_no_matches_is_empty() {
    let index = test_index();
    assert!(build_cards(&[], &FilterSelection::default(), &index).is_empty());
  }

  // --- search-mode reconciliation ---

  #[test]
  fn matched_reference_record_supplies_clinical_fields() {
    let index = test_index();
    let mut m = search_match("https://www.youtube.com/watch?v=AAA111&t=5", 0.8);
    m.final_dx = Some("service-side dx".to_string());
    m.start_time = Some(12.2);
    let cards = build_cards(&[m], &FilterSelection::default(), &index);
    assert_eq!(cards.len(), 1);
    // Reference record wins over the match's own diagnosis string.
    assert_eq!(cards[0].final_dx.as_deref(), Some("Autoimmune hemolytic anemia"));
    assert_eq!(cards[0].chief_complaint.as_deref(), Some("fatigue"));
    assert_eq!(cards[0].topics, vec!["hematology", "immunology"]);
    assert_eq!(cards[0].score, Some(0.8));
    assert_eq!(cards[0].link, "https://www.youtube.com/watch?v=AAA111&t=5&t=12");
  }

  #[test]
  fn lookup_miss_falls_back_to_final_dx_only() {
    let index = test_index();
    let mut m = search_match("https://www.youtube.com/watch?v=ZZZ999", 0.4);
    m.final_dx = Some("[\"Sarcoidosis\"]".to_string());
    let cards = build_cards(&[m], &FilterSelection::default(), &index);
    assert_eq!(cards[0].final_dx.as_deref(), Some("Sarcoidosis"));
    assert!(cards[0].chief_complaint.is_none());
    assert!(cards[0].topics.is_empty());
    assert!(cards[0].patient_age.is_none());
  }

  #[test]
  fn search_keeps_service_ranking_order() {
    let index = test_index();
    let matches =
      vec![search_match("https://youtu.be/low", 0.1), search_match("https://youtu.be/high", 0.9)];
    let cards = build_cards(&matches, &FilterSelection::default(), &index);
    assert_eq!(cards[0].score, Some(0.1));
    assert_eq!(cards[1].score, Some(0.9));
  }

  // --- medical tags ---

  #[test]
  fn tags_keep_only_allow_listed_semantic_types() {
    let entities = vec![
      ExtractedEntity { semantic_type: "T033".into(), text: "severe".into(), umls_cui: None },
      ExtractedEntity { semantic_type: "T047".into(), text: "[anemia]".into(), umls_cui: None },
      ExtractedEntity { semantic_type: "T184".into(), text: "chest pain".into(), umls_cui: None },
    ];
    assert_eq!(medical_tags(&entities), vec!["anemia", "chest pain"]);
  }

  // --- selection & counts ---

  #[test]
  fn selection_add_is_idempotent() {
    let mut sel = FilterSelection::default();
    sel.add(Facet::Topic, "hematology");
    sel.add(Facet::Topic, "hematology");
    assert_eq!(sel.selected(Facet::Topic).len(), 1);
    sel.remove(Facet::Topic, "hematology");
    assert!(sel.is_empty());
  }

  #[test]
  fn clear_all_empties_every_facet() {
    let mut sel = selection(&["a"], &["b"], &["c"]);
    assert_eq!(sel.total(), 3);
    sel.clear_all();
    assert!(sel.is_empty());
  }

  #[test]
  fn visible_count_caps_at_ten() {
    assert_eq!(visible_count(3), 3);
    assert_eq!(visible_count(10), 10);
    assert_eq!(visible_count(57), 10);
  }
}
