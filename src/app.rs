use ratatui::widgets::ListState;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::engine::{self, DisplayCard, Facet, FilterSelection, ResultsMode};
use crate::pipeline::PipelineForm;
use crate::reference::ReferenceIndex;
use crate::search::{SearchMatch, search_with_fallback};
use crate::theme::THEMES;

// --- Types ---

/// A search response tagged with the sequence number of the request that
/// produced it, so stale responses can be recognized and dropped.
pub type SearchOutcome = (u64, Vec<SearchMatch>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Filter,
  Pipeline,
}

/// State of the facet-filter modal: the active tab, a narrowing input, and
/// the highlighted row of the candidate list.
pub struct FilterModal {
  pub tab: Facet,
  pub input: String,
  pub option_idx: usize,
}

impl Default for FilterModal {
  fn default() -> Self {
    Self { tab: Facet::Diagnosis, input: String::new(), option_idx: 0 }
  }
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) search_rx: Option<oneshot::Receiver<SearchOutcome>>,
  pub(crate) submit_rx: Option<oneshot::Receiver<String>>,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  /// Live search results, replaced wholesale on every response.
  pub matches: Vec<SearchMatch>,
  /// Active facet selections.
  pub selection: FilterSelection,
  /// Merged display cards for the current mode, rebuilt on every state change.
  pub cards: Vec<DisplayCard>,
  pub list_state: ListState,
  /// The query the current results belong to (for the summary label).
  pub last_query: String,
  pub index: &'static ReferenceIndex,
  pub endpoint: String,
  pub http_client: Client,
  pub loading: bool,
  /// When the in-flight search started; drives the cosmetic progress bar.
  search_started: Option<Instant>,
  /// Monotonic tag for outbound searches; responses with an older tag lose.
  search_seq: u64,
  pub filter_modal: FilterModal,
  pub pipeline: PipelineForm,
  /// Whether the transcript pane replaces the detail pane for the selected card.
  pub transcript_visible: bool,
  pub last_error: Option<String>,
  pub info_message: Option<String>,
  pub should_quit: bool,
  pub(crate) tasks: AsyncTasks,
  /// When the last error was set, for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(endpoint_override: Option<String>) -> Self {
    let config = Config::load();
    let theme_index =
      if let Some(ref name) = config.theme_name { THEMES.iter().position(|t| t.name == name).unwrap_or(0) } else { 0 };
    let endpoint = endpoint_override
      .or(config.search_endpoint)
      .unwrap_or_else(|| constants().search_endpoint.clone());
    let index = ReferenceIndex::bundled();
    if index.is_empty() {
      warn!("reference dataset is empty; browse facets and enrichment are unavailable");
    }

    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Input,
      theme_index,
      matches: Vec::new(),
      selection: FilterSelection::default(),
      cards: Vec::new(),
      list_state: ListState::default(),
      last_query: String::new(),
      index,
      endpoint,
      http_client: Client::new(),
      loading: false,
      search_started: None,
      search_seq: 0,
      filter_modal: FilterModal::default(),
      pipeline: PipelineForm::new(),
      transcript_visible: false,
      last_error: None,
      info_message: None,
      should_quit: false,
      tasks: AsyncTasks::default(),
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    // Safety: theme_index is always bounded by modular arithmetic in next_theme()
    // and clamped to THEMES.len() - 1 on initialization.
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  fn save_config(&self) {
    let config = Config {
      theme_name: Some(self.theme().name.to_string()),
      search_endpoint: if self.endpoint == constants().search_endpoint { None } else { Some(self.endpoint.clone()) },
    };
    config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the dismiss window.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  // --- Display state ---

  /// The computed display mode. Never stored: search results win over facet
  /// browsing, which wins over the landing state.
  pub fn results_mode(&self) -> ResultsMode {
    engine::results_mode(&self.matches, &self.selection)
  }

  /// Rebuild the card list from the current matches/selection and clamp the
  /// list selection into range.
  pub fn refresh_cards(&mut self) {
    self.cards = engine::build_cards(&self.matches, &self.selection, self.index);
    if self.cards.is_empty() {
      self.list_state.select(None);
    } else {
      let sel = self.list_state.selected().unwrap_or(0);
      if sel >= self.cards.len() {
        self.list_state.select(Some(self.cards.len() - 1));
      } else if self.list_state.selected().is_none() {
        self.list_state.select(Some(0));
      }
    }
  }

  pub fn selected_card(&self) -> Option<&DisplayCard> {
    self.cards.get(self.list_state.selected()?)
  }

  /// The "Showing top N results" label for the active list, if any.
  pub fn results_summary(&self) -> Option<String> {
    if self.cards.is_empty() {
      return None;
    }
    let shown = engine::visible_count(self.cards.len());
    match self.results_mode() {
      ResultsMode::Search => Some(format!("Showing top {} results for \"{}\"", shown, self.last_query)),
      ResultsMode::Browse => Some(format!("Showing top {} filtered cases", shown)),
      ResultsMode::Empty => None,
    }
  }

  /// Cosmetic loading progress percentage. Advances with elapsed time only —
  /// it says nothing about the actual request and never gates completion.
  pub fn progress_percent(&self) -> f64 {
    let Some(started) = self.search_started else { return 0.0 };
    (started.elapsed().as_secs_f64() * constants().progress_rate).min(constants().progress_ceiling)
  }

  // --- Search ---

  pub fn trigger_search(&mut self) {
    let query = self.input.trim().to_string();
    if query.is_empty() {
      self.set_error("Enter a search term.".to_string());
      return;
    }
    info!(query = %query, seq = self.search_seq + 1, "search triggered");
    self.clear_error();
    self.info_message = None;
    self.loading = true;
    self.search_started = Some(Instant::now());
    self.last_query = query.clone();

    // A new sequence number makes any in-flight response stale.
    self.search_seq += 1;
    let seq = self.search_seq;
    let client = self.http_client.clone();
    let endpoint = self.endpoint.clone();

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let matches = search_with_fallback(&client, &endpoint, &query).await;
      let _ = tx.send((seq, matches));
    });
    self.tasks.search_rx = Some(rx);
  }

  /// Apply a completed search. Responses tagged with anything but the latest
  /// issued sequence number are dropped.
  pub fn accept_search_results(&mut self, seq: u64, results: Vec<SearchMatch>) {
    if seq != self.search_seq {
      debug!(seq, latest = self.search_seq, "discarding stale search response");
      return;
    }
    self.loading = false;
    self.search_started = None;
    let count = results.len();
    self.matches = results;
    self.refresh_cards();
    if count == 0 {
      self.info_message = Some(format!("No results for \"{}\".", self.last_query));
      // Facet browsing (if active) shows through; otherwise back to the landing state.
      if self.cards.is_empty() {
        self.mode = AppMode::Input;
      }
    } else {
      self.list_state.select(Some(0));
      self.mode = AppMode::Results;
    }
  }

  /// Reset to the landing state: no results, no query, no facet selections.
  pub fn go_home(&mut self) {
    self.matches.clear();
    self.selection.clear_all();
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.last_query.clear();
    self.filter_modal = FilterModal::default();
    self.transcript_visible = false;
    self.info_message = None;
    self.clear_error();
    self.refresh_cards();
    self.mode = AppMode::Input;
  }

  // --- Facet filtering ---

  /// Candidate values for the modal's active tab: the fixed diagnosis
  /// vocabulary, or the dataset-derived complaint/topic vocabularies,
  /// narrowed by the modal input and minus already-selected values.
  pub fn filter_candidates(&self) -> Vec<&str> {
    let pool: &[String] = match self.filter_modal.tab {
      Facet::Diagnosis => &constants().diagnosis_list,
      Facet::Complaint => self.index.chief_complaints(),
      Facet::Topic => self.index.topics(),
    };
    let needle = self.filter_modal.input.to_lowercase();
    let selected = self.selection.selected(self.filter_modal.tab);
    pool
      .iter()
      .filter(|option| option.to_lowercase().contains(&needle))
      .filter(|option| !selected.iter().any(|s| s == *option))
      .map(String::as_str)
      .collect()
  }

  /// Add the highlighted candidate to the selection.
  pub fn add_highlighted_candidate(&mut self) {
    let Some(option) = self.filter_candidates().get(self.filter_modal.option_idx).map(|s| s.to_string()) else {
      return;
    };
    self.selection.add(self.filter_modal.tab, &option);
    self.filter_modal.option_idx = 0;
    self.refresh_cards();
  }

  /// Remove the most recently selected value of the active facet.
  pub fn pop_selected_value(&mut self) {
    let facet = self.filter_modal.tab;
    if let Some(last) = self.selection.selected(facet).last().cloned() {
      self.selection.remove(facet, &last);
      self.refresh_cards();
    }
  }

  pub fn clear_all_filters(&mut self) {
    self.selection.clear_all();
    self.refresh_cards();
  }

  pub fn next_filter_tab(&mut self) {
    let idx = Facet::ALL.iter().position(|f| *f == self.filter_modal.tab).unwrap_or(0);
    self.filter_modal.tab = Facet::ALL[(idx + 1) % Facet::ALL.len()];
    self.filter_modal.input.clear();
    self.filter_modal.option_idx = 0;
  }

  /// Close the modal and land on whichever view the selection implies.
  pub fn apply_filters(&mut self) {
    self.refresh_cards();
    self.mode = if self.cards.is_empty() { AppMode::Input } else { AppMode::Results };
  }

  // --- Transcript pane ---

  pub fn transcript_toggle(&mut self) {
    if self.selected_card().is_some_and(|c| c.transcript.is_some()) {
      self.transcript_visible = !self.transcript_visible;
    }
  }

  // --- Pipeline form ---

  pub fn trigger_submit(&mut self) {
    if self.pipeline.submitting {
      return;
    }
    if let Some(err) = self.pipeline.validation_error() {
      self.set_error(err.to_string());
      return;
    }
    self.pipeline.submitting = true;
    let summary = self.pipeline.summary();
    info!("pipeline submission (mock)");

    // Simulated processing delay; no backend call is made.
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(constants().submit_delay_ms)).await;
      let _ = tx.send(summary);
    });
    self.tasks.submit_rx = Some(rx);
  }

  // --- Async task polling ---

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.search_rx.take() {
      match rx.try_recv() {
        Ok((seq, results)) => {
          self.accept_search_results(seq, results);
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.search_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          warn!("search task dropped its channel");
          self.loading = false;
          self.search_started = None;
          self.set_error("Search task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.submit_rx.take() {
      match rx.try_recv() {
        Ok(summary) => {
          self.pipeline.reset();
          self.info_message = Some(summary);
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.submit_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.pipeline.submitting = false;
          self.set_error("Submission task failed.".to_string());
        }
      }
    }

    self.expire_error();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::Facet;
  use crate::search::sample_matches;

  fn app() -> App {
    App::new(None)
  }

  /// Put the app into the state `trigger_search` leaves behind, without
  /// spawning the actual network task.
  fn begin_search(app: &mut App, query: &str) {
    app.last_query = query.to_string();
    app.loading = true;
    app.search_started = Some(Instant::now());
    app.search_seq += 1;
  }

  // --- stale-response correlation ---

  #[test]
  fn stale_search_response_is_discarded() {
    let mut app = app();
    begin_search(&mut app, "anemia");
    begin_search(&mut app, "chest pain");

    app.accept_search_results(1, sample_matches());
    assert!(app.matches.is_empty(), "stale response must not replace state");
    assert!(app.loading);

    app.accept_search_results(2, sample_matches());
    assert_eq!(app.matches.len(), 2);
    assert!(!app.loading);
    assert_eq!(app.mode, AppMode::Results);
  }

  #[test]
  fn empty_search_response_returns_to_landing() {
    let mut app = app();
    begin_search(&mut app, "fracture");
    app.accept_search_results(1, Vec::new());
    assert_eq!(app.mode, AppMode::Input);
    assert!(app.cards.is_empty());
    assert!(app.info_message.is_some());
  }

  #[test]
  fn empty_search_response_with_active_facets_shows_browse() {
    let mut app = app();
    app.selection.add(Facet::Topic, "hematology");
    begin_search(&mut app, "fracture");
    app.accept_search_results(1, Vec::new());
    assert_eq!(app.results_mode(), ResultsMode::Browse);
    assert!(!app.cards.is_empty());
  }

  // --- mode precedence through the app ---

  #[test]
  fn search_results_take_precedence_over_facets() {
    let mut app = app();
    app.selection.add(Facet::Diagnosis, "anemia");
    begin_search(&mut app, "anemia");
    app.accept_search_results(1, sample_matches());
    assert_eq!(app.results_mode(), ResultsMode::Search);

    // Clearing the matches falls through to browse mode.
    app.matches.clear();
    app.refresh_cards();
    assert_eq!(app.results_mode(), ResultsMode::Browse);
  }

  #[test]
  fn go_home_resets_everything() {
    let mut app = app();
    app.selection.add(Facet::Topic, "hematology");
    begin_search(&mut app, "anemia");
    app.accept_search_results(1, sample_matches());
    app.go_home();
    assert_eq!(app.results_mode(), ResultsMode::Empty);
    assert!(app.input.is_empty());
    assert!(app.cards.is_empty());
    assert_eq!(app.mode, AppMode::Input);
  }

  // --- filter modal candidates ---

  #[test]
  fn filter_candidates_narrow_and_exclude_selected() {
    let mut app = app();
    app.filter_modal.tab = Facet::Topic;
    app.filter_modal.input = "hema".to_string();
    let before = app.filter_candidates();
    assert!(before.contains(&"hematology"));

    app.selection.add(Facet::Topic, "hematology");
    let after = app.filter_candidates();
    assert!(!after.contains(&"hematology"));
  }

  #[test]
  fn diagnosis_candidates_come_from_the_fixed_vocabulary() {
    let mut app = app();
    app.filter_modal.tab = Facet::Diagnosis;
    app.filter_modal.input = "hodgkin".to_string();
    assert_eq!(app.filter_candidates(), vec!["Hodgkin lymphoma"]);
  }

  // --- cosmetic progress ---

  #[test]
  fn progress_is_zero_when_idle_and_capped_when_loading() {
    let mut app = app();
    assert_eq!(app.progress_percent(), 0.0);
    begin_search(&mut app, "anemia");
    assert!(app.progress_percent() <= constants().progress_ceiling);
  }

  // --- summary label ---

  #[test]
  fn summary_uses_the_display_cap() {
    let mut app = app();
    begin_search(&mut app, "anemia");
    let mut many = Vec::new();
    for i in 0..25 {
      many.push(SearchMatch { url: format!("https://youtu.be/v{}", i), score: 0.5, ..SearchMatch::default() });
    }
    app.accept_search_results(1, many);
    let summary = app.results_summary().expect("summary present");
    assert!(summary.starts_with("Showing top 10 results"), "got: {summary}");
    // The underlying list is not truncated.
    assert_eq!(app.cards.len(), 25);
  }
}
