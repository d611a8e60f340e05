use chrono::NaiveDate;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode};
use crate::engine::{Facet, ResultsMode};
use crate::pipeline::PipelineField;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Render a compact `YYYYMMDD` upload date as e.g. "Mar 04, 2021".
/// Anything unparsable is shown as-is.
fn format_upload_date(raw: &str) -> String {
  NaiveDate::parse_from_str(raw, "%Y%m%d").map_or_else(|_| raw.to_string(), |d| d.format("%b %d, %Y").to_string())
}

/// Format a start time in seconds as m:ss.
fn format_timestamp(secs: f64) -> String {
  let total = secs.round() as i64;
  format!("{}:{:02}", total / 60, total % 60)
}

/// A centered sub-rectangle, for the filter modal.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
  let [_, vertical, _] = Layout::vertical([
    Constraint::Percentage((100 - percent_y) / 2),
    Constraint::Percentage(percent_y),
    Constraint::Percentage((100 - percent_y) / 2),
  ])
  .areas(area);
  let [_, horizontal, _] = Layout::horizontal([
    Constraint::Percentage((100 - percent_x) / 2),
    Constraint::Percentage(percent_x),
    Constraint::Percentage((100 - percent_x) / 2),
  ])
  .areas(vertical);
  horizontal
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if app.mode == AppMode::Filter {
    render_filter_modal(frame, app, main_area);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans =
    vec![Span::styled(" ⚕ SearchCPS ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  let filters = app.selection.total();
  if filters > 0 {
    spans.push(Span::styled(format!(" filters: {} ", filters), Style::default().fg(theme.bg).bg(theme.accent)));
  }
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.mode == AppMode::Pipeline {
    render_pipeline(frame, app, area);
  } else if app.loading {
    render_loading(frame, app, area);
  } else if !app.cards.is_empty() {
    render_results(frame, app, area);
  } else {
    render_welcome(frame, app.theme(), area);
  }
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("⚕  SearchCPS", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Find the Case. Master the Reasoning.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(
      "Semantic search over the Clinical Problem Solvers video library.",
      Style::default().fg(theme.muted),
    )),
    Line::from(""),
    Line::from(Span::styled("Type a query below and press Enter,", Style::default().fg(theme.muted))),
    Line::from(Span::styled("or press ^f to browse cases by diagnosis, complaint, or topic.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered()
      .border_type(ratatui::widgets::BorderType::Rounded)
      .border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = Block::bordered()
    .title(format!(" Searching for \"{}\" ", app.last_query))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(theme.border));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let [_, gauge_area, _] =
    Layout::vertical([Constraint::Fill(1), Constraint::Length(1), Constraint::Fill(1)]).areas(inner);
  let gauge_area = Rect {
    x: gauge_area.x + gauge_area.width / 4,
    width: gauge_area.width / 2,
    ..gauge_area
  };
  let percent = app.progress_percent().round() as u16;
  let gauge = Gauge::default()
    .gauge_style(Style::default().fg(theme.accent).bg(theme.stripe_bg))
    .label(format!("{}%", percent))
    .percent(percent.min(100));
  frame.render_widget(gauge, gauge_area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let [list_area, detail_area] =
    Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = list_area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = app
    .cards
    .iter()
    .enumerate()
    .map(|(i, card)| {
      let is_selected = Some(i) == app.list_state.selected();
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let name = card
        .title
        .as_deref()
        .or(card.final_dx.as_deref())
        .unwrap_or(card.link.as_str());

      // Right-side metadata: "87%  Mar 04, 2021", either part optional.
      let score_str = card.score.map(|s| format!("{:.0}%", s * 100.0)).unwrap_or_default();
      let date_str = card.upload_date.as_deref().map(format_upload_date).unwrap_or_default();
      let right = match (!score_str.is_empty(), !date_str.is_empty()) {
        (true, true) => format!("{}  {}", score_str, date_str),
        (true, false) => score_str.clone(),
        (false, true) => date_str.clone(),
        (false, false) => String::new(),
      };

      let line = if right.is_empty() {
        Line::from(Span::styled(truncate_str(name, inner_w), Style::default().fg(fg)))
      } else {
        let right_w = right.chars().count();
        let name_max = inner_w.saturating_sub(right_w + 2);
        let name = truncate_str(name, name_max);
        let name_w = name.chars().count();
        let gap = inner_w.saturating_sub(name_w + right_w);

        let padding: String = " ".repeat(gap);
        let mut spans = vec![Span::styled(name, Style::default().fg(fg)), Span::raw(padding)];
        if !score_str.is_empty() {
          spans.push(Span::styled(score_str, Style::default().fg(theme.accent)));
          if !date_str.is_empty() {
            spans.push(Span::raw("  "));
          }
        }
        if !date_str.is_empty() {
          spans.push(Span::styled(date_str, Style::default().fg(theme.muted)));
        }
        Line::from(spans)
      };

      ListItem::new(line).bg(bg)
    })
    .collect();

  let title = app.results_summary().map_or(" Results ".to_string(), |s| format!(" {} ", s));

  let list = List::new(items)
    .block(
      Block::bordered()
        .title(title)
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(theme.border)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, list_area, &mut app.list_state);

  if app.transcript_visible {
    render_transcript(frame, app, detail_area);
  } else {
    render_detail(frame, app, detail_area);
  }
}

fn clinical_line<'a>(theme: &Theme, label: &'a str, value: &str, inner_w: usize) -> Line<'a> {
  let value_w = inner_w.saturating_sub(label.len());
  Line::from(vec![
    Span::styled(label, Style::default().fg(theme.muted)),
    Span::styled(truncate_str(value, value_w), Style::default().fg(theme.fg)),
  ])
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let detail_block = Block::bordered()
    .title(" Case ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));

  let Some(card) = app.selected_card() else {
    frame.render_widget(detail_block, area);
    return;
  };

  let inner_w = area.width.saturating_sub(4) as usize;
  let mut lines = vec![Line::from("")];

  if let Some(title) = &card.title {
    lines.push(Line::from(Span::styled(
      truncate_str(title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
  }
  if let Some(dx) = &card.final_dx {
    lines.push(clinical_line(theme, "Final Dx         ", dx, inner_w));
  }
  if let Some(complaint) = &card.chief_complaint {
    lines.push(clinical_line(theme, "Chief Complaint  ", complaint, inner_w));
  }
  if !card.topics.is_empty() {
    lines.push(clinical_line(theme, "Topics           ", &card.topics.join(", "), inner_w));
  }
  if let Some(age) = &card.patient_age {
    lines.push(clinical_line(theme, "Age              ", age, inner_w));
  }
  if let Some(sex) = &card.patient_sex {
    lines.push(clinical_line(theme, "Sex              ", sex, inner_w));
  }
  if let Some(date) = &card.upload_date {
    lines.push(clinical_line(theme, "Uploaded         ", &format_upload_date(date), inner_w));
  }
  if let Some(start) = card.start_time {
    lines.push(clinical_line(theme, "Starts at        ", &format_timestamp(start), inner_w));
  }

  if !card.tags.is_empty() {
    lines.push(Line::from(""));
    let mut spans = Vec::new();
    for (i, tag) in card.tags.iter().enumerate() {
      if i > 0 {
        spans.push(Span::raw(" "));
      }
      spans.push(Span::styled(format!(" {} ", tag), Style::default().fg(theme.chip_fg).bg(theme.chip_bg)));
    }
    lines.push(Line::from(spans));
  }

  if let Some(description) = &card.description {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(truncate_str(description, inner_w * 3), Style::default().fg(theme.muted))));
  }

  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    truncate_str(&card.link, inner_w),
    Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
  )));
  if card.transcript.is_some() {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("t — transcript", Style::default().fg(theme.muted))));
  }

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(detail_block);
  frame.render_widget(paragraph, area);
}

fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = Block::bordered()
    .title(" Transcript ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));

  let Some(card) = app.selected_card() else {
    frame.render_widget(block, area);
    return;
  };

  let mut lines = vec![Line::from("")];
  if let Some(start) = card.start_time {
    lines.push(Line::from(Span::styled(
      format!("▶ {}", format_timestamp(start)),
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
  }
  match &card.transcript {
    Some(text) => lines.push(Line::from(Span::styled(text.clone(), Style::default().fg(theme.fg)))),
    None => lines.push(Line::from(Span::styled("No transcript for this result.", Style::default().fg(theme.muted)))),
  }

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
  frame.render_widget(paragraph, area);
}

fn render_filter_modal(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let modal_area = centered_rect(70, 80, area);
  frame.render_widget(Clear, modal_area);

  let block = Block::bordered()
    .title(" Filter Cases ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(theme.accent))
    .padding(Padding::horizontal(1))
    .style(Style::default().bg(theme.bg));
  let inner = block.inner(modal_area);
  frame.render_widget(block, modal_area);

  let [tabs_area, chips_area, input_area, list_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(2),
    Constraint::Length(1),
    Constraint::Min(1),
  ])
  .areas(inner);

  // Tabs, with per-facet selection counts.
  let mut tab_spans = Vec::new();
  for (i, facet) in Facet::ALL.iter().enumerate() {
    if i > 0 {
      tab_spans.push(Span::raw("  "));
    }
    let count = app.selection.selected(*facet).len();
    let label =
      if count > 0 { format!(" {} ({}) ", facet.label(), count) } else { format!(" {} ", facet.label()) };
    let style = if *facet == app.filter_modal.tab {
      Style::default().fg(theme.key_fg).bg(theme.key_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.muted)
    };
    tab_spans.push(Span::styled(label, style));
  }
  frame.render_widget(Line::from(tab_spans), tabs_area);

  // Selected values of the active facet, as chips.
  let selected = app.selection.selected(app.filter_modal.tab);
  let mut chip_spans = Vec::new();
  for (i, value) in selected.iter().enumerate() {
    if i > 0 {
      chip_spans.push(Span::raw(" "));
    }
    chip_spans.push(Span::styled(format!(" {} ✕ ", value), Style::default().fg(theme.chip_fg).bg(theme.chip_bg)));
  }
  if chip_spans.is_empty() {
    chip_spans.push(Span::styled("(nothing selected)", Style::default().fg(theme.muted)));
  }
  frame.render_widget(Paragraph::new(Line::from(chip_spans)).wrap(Wrap { trim: false }), chips_area);

  let prompt = Line::from(vec![
    Span::styled("> ", Style::default().fg(theme.accent)),
    Span::styled(app.filter_modal.input.as_str(), Style::default().fg(theme.fg)),
    Span::styled("▏", Style::default().fg(theme.accent)),
  ]);
  frame.render_widget(prompt, input_area);

  let candidates = app.filter_candidates();
  let items: Vec<ListItem> = candidates
    .iter()
    .enumerate()
    .map(|(i, option)| {
      let style = if i == app.filter_modal.option_idx {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.fg)
      };
      ListItem::new(Line::from(Span::styled(format!(" {}", option), style)))
    })
    .collect();
  if items.is_empty() {
    let empty = Paragraph::new(Span::styled(" no matching options", Style::default().fg(theme.muted)));
    frame.render_widget(empty, list_area);
  } else {
    frame.render_widget(List::new(items), list_area);
  }
}

fn render_pipeline(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = Block::bordered()
    .title(" Add a Video ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let [_, form_area] = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);
  let rows = Layout::vertical([
    Constraint::Length(3),
    Constraint::Length(3),
    Constraint::Length(3),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .split(form_area);

  for (i, field) in PipelineField::ALL.iter().enumerate() {
    let focused = app.pipeline.focus == Some(*field);
    let border_color = if focused { theme.accent } else { theme.border };
    let field_block = Block::bordered()
      .title(format!(" {} ", field.label()))
      .title_style(Style::default().fg(border_color))
      .border_type(ratatui::widgets::BorderType::Rounded)
      .border_style(Style::default().fg(border_color))
      .padding(Padding::horizontal(1));

    let mut spans = Vec::new();
    if *field == PipelineField::Tags {
      for tag in &app.pipeline.tags {
        spans.push(Span::styled(format!(" {} ", tag), Style::default().fg(theme.chip_fg).bg(theme.chip_bg)));
        spans.push(Span::raw(" "));
      }
    }
    spans.push(Span::styled(app.pipeline.field(*field).to_string(), Style::default().fg(theme.fg)));
    if focused {
      spans.push(Span::styled("▏", Style::default().fg(theme.accent)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(field_block);
    frame.render_widget(paragraph, rows[i]);
  }

  let hint = if app.pipeline.submitting {
    Span::styled("⏳ Processing…", Style::default().fg(theme.status))
  } else {
    Span::styled("Enter — submit    Tab — next field    Esc — back", Style::default().fg(theme.muted))
  };
  frame.render_widget(Line::from(hint), rows[4]);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.loading {
    (format!(" ⏳ Searching for \"{}\"…", app.last_query), Style::default().fg(theme.status))
  } else if let Some(info) = &app.info_message {
    (format!(" ✓ {}", info), Style::default().fg(theme.info))
  } else {
    match app.results_mode() {
      ResultsMode::Browse => {
        (format!(" Browsing {} cases", app.cards.len()), Style::default().fg(theme.status))
      }
      _ => (" Ready".to_string(), Style::default().fg(theme.muted)),
    }
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search Cases ")
    .title_style(Style::default().fg(border_color))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_results = !app.cards.is_empty();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("^f", "Filter"), ("^p", "Add video"), ("^t", "Theme")];
      if has_results {
        k.push(("↓", "Results"));
        k.push(("Esc", "Results"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Results => {
      let mut k = vec![("Enter", "Open"), ("j/k", "Navigate"), ("f", "Filter")];
      if app.selected_card().is_some_and(|c| c.transcript.is_some()) {
        k.push(("t", "Transcript"));
      }
      k.push(("h", "Home"));
      k.push(("Esc", "Back"));
      k
    }
    AppMode::Filter => {
      vec![("Tab", "Facet"), ("↑/↓", "Highlight"), ("Enter", "Select"), ("^l", "Clear all"), ("Esc", "Apply")]
    }
    AppMode::Pipeline => {
      vec![("Enter", "Submit"), ("Tab", "Next field"), ("Esc", "Back")]
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
