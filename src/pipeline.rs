//! The video-submission ("pipeline") form.
//!
//! A non-functional mock: nothing is sent anywhere. Submitting validates the
//! URL, simulates a short processing delay, then surfaces a success summary
//! and clears the form.

/// Fields of the submission form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineField {
  Url,
  ChiefComplaint,
  Tags,
  Topics,
}

impl PipelineField {
  pub const ALL: [PipelineField; 4] =
    [PipelineField::Url, PipelineField::ChiefComplaint, PipelineField::Tags, PipelineField::Topics];

  pub fn label(self) -> &'static str {
    match self {
      PipelineField::Url => "YouTube URL",
      PipelineField::ChiefComplaint => "Chief Complaint",
      PipelineField::Tags => "Tags (comma to add)",
      PipelineField::Topics => "Topics",
    }
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }

  pub fn prev(self) -> Self {
    let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

#[derive(Debug, Default)]
pub struct PipelineForm {
  pub youtube_url: String,
  pub chief_complaint: String,
  /// Text being typed into the tags field; a trailing comma commits it.
  pub tags_input: String,
  pub tags: Vec<String>,
  pub topics: String,
  pub focus: Option<PipelineField>,
  pub submitting: bool,
}

impl PipelineForm {
  pub fn new() -> Self {
    Self { focus: Some(PipelineField::Url), ..Self::default() }
  }

  fn field_mut(&mut self, field: PipelineField) -> &mut String {
    match field {
      PipelineField::Url => &mut self.youtube_url,
      PipelineField::ChiefComplaint => &mut self.chief_complaint,
      PipelineField::Tags => &mut self.tags_input,
      PipelineField::Topics => &mut self.topics,
    }
  }

  pub fn field(&self, field: PipelineField) -> &str {
    match field {
      PipelineField::Url => &self.youtube_url,
      PipelineField::ChiefComplaint => &self.chief_complaint,
      PipelineField::Tags => &self.tags_input,
      PipelineField::Topics => &self.topics,
    }
  }

  /// Type a character into the focused field. In the tags field a comma
  /// commits the pending text as a chip instead of being inserted.
  pub fn push_char(&mut self, c: char) {
    let Some(focus) = self.focus else { return };
    if focus == PipelineField::Tags && c == ',' {
      self.commit_tag();
      return;
    }
    self.field_mut(focus).push(c);
  }

  /// Backspace: delete the last character, or in an empty tags field pop
  /// the most recent chip.
  pub fn backspace(&mut self) {
    let Some(focus) = self.focus else { return };
    if focus == PipelineField::Tags && self.tags_input.is_empty() {
      self.tags.pop();
      return;
    }
    self.field_mut(focus).pop();
  }

  /// Commit the pending tags text as a chip. Blank or duplicate tags are dropped.
  pub fn commit_tag(&mut self) {
    let tag = self.tags_input.trim().to_string();
    if !tag.is_empty() && !self.tags.iter().any(|t| *t == tag) {
      self.tags.push(tag);
    }
    self.tags_input.clear();
  }

  pub fn focus_next(&mut self) {
    self.focus = Some(self.focus.map_or(PipelineField::Url, PipelineField::next));
  }

  pub fn focus_prev(&mut self) {
    self.focus = Some(self.focus.map_or(PipelineField::Url, PipelineField::prev));
  }

  /// Returns the validation error keeping the form from being submitted, if any.
  pub fn validation_error(&self) -> Option<&'static str> {
    if self.youtube_url.trim().is_empty() { Some("Please enter a YouTube URL") } else { None }
  }

  /// The success message shown once the simulated processing completes.
  pub fn summary(&self) -> String {
    format!(
      "Video added to database successfully! URL: {} | Chief Complaint: {} | Tags: {} | Topics: {}",
      self.youtube_url.trim(),
      self.chief_complaint.trim(),
      self.tags.join(", "),
      self.topics.trim(),
    )
  }

  pub fn reset(&mut self) {
    *self = Self::new();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn comma_commits_a_tag_chip() {
    let mut form = PipelineForm::new();
    form.focus = Some(PipelineField::Tags);
    for c in " fever ,".chars() {
      form.push_char(c);
    }
    assert_eq!(form.tags, vec!["fever"]);
    assert!(form.tags_input.is_empty());
  }

  #[test]
  fn duplicate_and_blank_tags_are_dropped() {
    let mut form = PipelineForm::new();
    form.tags_input = "fever".to_string();
    form.commit_tag();
    form.tags_input = "fever".to_string();
    form.commit_tag();
    form.tags_input = "   ".to_string();
    form.commit_tag();
    assert_eq!(form.tags, vec!["fever"]);
  }

  #[test]
  fn backspace_pops_chip_when_tags_input_is_empty() {
    let mut form = PipelineForm::new();
    form.focus = Some(PipelineField::Tags);
    form.tags = vec!["fever".to_string(), "rash".to_string()];
    form.tags_input = "x".to_string();
    form.backspace();
    assert_eq!(form.tags.len(), 2);
    form.backspace();
    assert_eq!(form.tags, vec!["fever"]);
  }

  #[test]
  fn submit_requires_a_url() {
    let mut form = PipelineForm::new();
    assert_eq!(form.validation_error(), Some("Please enter a YouTube URL"));
    form.youtube_url = "https://youtu.be/abc".to_string();
    assert!(form.validation_error().is_none());
  }

  #[test]
  fn summary_collects_all_fields() {
    let mut form = PipelineForm::new();
    form.youtube_url = "https://youtu.be/abc".to_string();
    form.chief_complaint = "fever".to_string();
    form.tags = vec!["id".to_string(), "heme".to_string()];
    form.topics = "sepsis".to_string();
    let summary = form.summary();
    assert!(summary.contains("https://youtu.be/abc"));
    assert!(summary.contains("Chief Complaint: fever"));
    assert!(summary.contains("Tags: id, heme"));
    assert!(summary.contains("Topics: sepsis"));
  }

  #[test]
  fn focus_cycles_through_fields() {
    let mut form = PipelineForm::new();
    assert_eq!(form.focus, Some(PipelineField::Url));
    form.focus_next();
    assert_eq!(form.focus, Some(PipelineField::ChiefComplaint));
    form.focus_prev();
    form.focus_prev();
    assert_eq!(form.focus, Some(PipelineField::Topics));
  }

  #[test]
  fn reset_clears_everything() {
    let mut form = PipelineForm::new();
    form.youtube_url = "https://youtu.be/abc".to_string();
    form.tags = vec!["fever".to_string()];
    form.submitting = true;
    form.reset();
    assert!(form.youtube_url.is_empty());
    assert!(form.tags.is_empty());
    assert!(!form.submitting);
    assert_eq!(form.focus, Some(PipelineField::Url));
  }
}
