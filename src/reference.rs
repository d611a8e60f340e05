use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::{info, warn};

/// One entry of the bundled clinical-metadata dataset, keyed by video URL.
/// All fields are raw free text; bracket/quote noise is stripped at display time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceRecord {
  #[serde(skip)]
  pub url: String,
  #[serde(rename = "Final Dx")]
  pub final_dx: Option<String>,
  #[serde(rename = "Chief Complaint")]
  pub chief_complaint: Option<String>,
  #[serde(rename = "Topics")]
  pub topics: Option<String>,
  #[serde(rename = "Patient Age")]
  pub patient_age: Option<String>,
  #[serde(rename = "Patient Sex")]
  pub patient_sex: Option<String>,
}

/// Remove quote/bracket noise from a raw dataset field and trim.
pub fn strip_display(s: &str) -> String {
  s.chars().filter(|c| !matches!(c, '"' | '[' | ']')).collect::<String>().trim().to_string()
}

/// Strip embedded newlines and surrounding whitespace from a URL.
pub fn normalize_url(url: &str) -> String {
  url.chars().filter(|c| *c != '\n' && *c != '\r').collect::<String>().trim().to_string()
}

/// Split a raw topics field on `,` `;` `|`, strip each segment, discard empties.
pub fn split_topics(raw: &str) -> Vec<String> {
  raw.split([',', ';', '|']).map(strip_display).filter(|t| !t.is_empty()).collect()
}

/// Extract the video-ID token from common YouTube URL shapes.
/// The ID runs up to the next `&`, `?`, `#`, or newline.
pub fn extract_video_id(url: &str) -> Option<&str> {
  let rest = ["youtube.com/watch?v=", "youtu.be/"].iter().find_map(|marker| {
    let start = url.find(marker)? + marker.len();
    Some(&url[start..])
  })?;
  let end = rest.find(['&', '?', '#', '\n']).unwrap_or(rest.len());
  let id = &rest[..end];
  if id.is_empty() { None } else { Some(id) }
}

/// The Reference Dataset Index: the bundled url → clinical metadata mapping
/// plus derived facet vocabularies and a URL/video-ID resolver.
///
/// Records keep the insertion order of the source JSON object. Duplicate
/// video IDs across keys resolve to whichever key comes first in that order —
/// a known limitation of the dataset, not something this index papers over.
pub struct ReferenceIndex {
  records: Vec<ReferenceRecord>,
  by_url: HashMap<String, usize>,
  chief_complaints: Vec<String>,
  topics: Vec<String>,
}

static BUNDLED: LazyLock<ReferenceIndex> =
  LazyLock::new(|| ReferenceIndex::from_json_str(include_str!("../assets/dx.json")));

impl ReferenceIndex {
  /// The dataset shipped with the binary.
  pub fn bundled() -> &'static ReferenceIndex {
    &BUNDLED
  }

  pub fn empty() -> Self {
    Self { records: Vec::new(), by_url: HashMap::new(), chief_complaints: Vec::new(), topics: Vec::new() }
  }

  /// Build the index from the JSON object text. A malformed document yields
  /// an empty index (no facet options, always-miss lookup) — the app must
  /// stay usable without the dataset.
  pub fn from_json_str(json: &str) -> Self {
    let parsed: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(json) {
      Ok(map) => map,
      Err(e) => {
        warn!(err = %e, "reference dataset malformed, starting with an empty index");
        return Self::empty();
      }
    };

    let mut records = Vec::with_capacity(parsed.len());
    let mut by_url = HashMap::with_capacity(parsed.len());
    let mut complaints = BTreeSet::new();
    let mut topics = BTreeSet::new();

    for (raw_url, value) in parsed {
      // Entries with unexpected shapes degrade to absent fields, never errors.
      let mut record: ReferenceRecord = serde_json::from_value(value).unwrap_or_default();
      record.url = normalize_url(&raw_url);

      if let Some(ref complaint) = record.chief_complaint {
        let clean = strip_display(complaint);
        if !clean.is_empty() {
          complaints.insert(clean);
        }
      }
      if let Some(ref raw_topics) = record.topics {
        topics.extend(split_topics(raw_topics));
      }

      by_url.entry(record.url.clone()).or_insert(records.len());
      records.push(record);
    }

    info!(records = records.len(), complaints = complaints.len(), topics = topics.len(), "reference dataset loaded");
    Self {
      records,
      by_url,
      chief_complaints: complaints.into_iter().collect(),
      topics: topics.into_iter().collect(),
    }
  }

  /// Resolve a video URL to its reference record: exact match on the
  /// normalized URL first, then a linear scan for video-ID containment in
  /// insertion order.
  pub fn lookup(&self, url: &str) -> Option<&ReferenceRecord> {
    let clean = normalize_url(url);
    if let Some(&idx) = self.by_url.get(&clean) {
      return Some(&self.records[idx]);
    }
    let video_id = extract_video_id(&clean)?;
    self.records.iter().find(|r| r.url.contains(video_id))
  }

  /// All records in dataset insertion order.
  pub fn records(&self) -> &[ReferenceRecord] {
    &self.records
  }

  /// Sorted unique chief complaints (stripped), computed at load.
  pub fn chief_complaints(&self) -> &[String] {
    &self.chief_complaints
  }

  /// Sorted unique topics (split and stripped), computed at load.
  pub fn topics(&self) -> &[String] {
    &self.topics
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
