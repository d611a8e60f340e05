use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::debug;

use crate::app::{App, AppMode};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Open a URL in the default browser.
fn open_in_browser(app: &mut App, url: &str) {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  match std::process::Command::new(cmd)
    .arg(url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()
  {
    Ok(mut child) => {
      debug!(url = %url, "opening watch link");
      // Reap the child in a background thread to avoid zombie processes.
      std::thread::spawn(move || {
        let _ = child.wait();
      });
    }
    Err(e) => {
      app.set_error(format!("Failed to open browser: {}", e));
    }
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  // Ctrl+F — facet filter modal
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('f') {
    app.mode = AppMode::Filter;
    return;
  }

  // Ctrl+P — toggle the pipeline submission form
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('p') {
    app.mode = if app.mode == AppMode::Pipeline { AppMode::Input } else { AppMode::Pipeline };
    return;
  }

  // Ctrl+L — clear every facet selection
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
    app.clear_all_filters();
    return;
  }

  // Ctrl+G — back to the landing state
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('g') {
    app.go_home();
    return;
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Results => handle_results_key(app, key),
    AppMode::Filter => handle_filter_key(app, key),
    AppMode::Pipeline => handle_pipeline_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.trigger_search();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if !app.cards.is_empty() {
        app.mode = AppMode::Results;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if !app.cards.is_empty() {
        app.mode = AppMode::Results;
      }
    }
    _ => {}
  }
}

fn handle_results_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      if let Some(link) = app.selected_card().map(|c| c.link.clone())
        && !link.is_empty()
      {
        open_in_browser(app, &link);
      }
    }
    KeyCode::Char('t') => {
      app.transcript_toggle();
    }
    KeyCode::Char('/') | KeyCode::Char('f') => {
      app.mode = AppMode::Filter;
    }
    KeyCode::Char('h') => {
      app.go_home();
    }
    KeyCode::Down | KeyCode::Char('j') => {
      let count = app.cards.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let count = app.cards.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Esc => {
      if app.transcript_visible {
        app.transcript_visible = false;
      } else {
        app.mode = AppMode::Input;
      }
    }
    _ => {}
  }
}

fn handle_filter_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Tab => {
      app.next_filter_tab();
    }
    KeyCode::Enter => {
      app.add_highlighted_candidate();
    }
    KeyCode::Char(c) => {
      app.filter_modal.input.push(c);
      app.filter_modal.option_idx = 0;
    }
    KeyCode::Backspace => {
      if app.filter_modal.input.is_empty() {
        app.pop_selected_value();
      } else {
        app.filter_modal.input.pop();
        app.filter_modal.option_idx = 0;
      }
    }
    KeyCode::Down => {
      let count = app.filter_candidates().len();
      if count > 0 {
        app.filter_modal.option_idx = (app.filter_modal.option_idx + 1) % count;
      }
    }
    KeyCode::Up => {
      let count = app.filter_candidates().len();
      if count > 0 {
        app.filter_modal.option_idx =
          if app.filter_modal.option_idx == 0 { count - 1 } else { app.filter_modal.option_idx - 1 };
      }
    }
    KeyCode::Esc => {
      app.filter_modal.input.clear();
      app.filter_modal.option_idx = 0;
      app.apply_filters();
    }
    _ => {}
  }
}

fn handle_pipeline_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.trigger_submit();
    }
    KeyCode::Tab | KeyCode::Down => {
      app.pipeline.focus_next();
    }
    KeyCode::BackTab | KeyCode::Up => {
      app.pipeline.focus_prev();
    }
    KeyCode::Char(c) => {
      app.pipeline.push_char(c);
    }
    KeyCode::Backspace => {
      app.pipeline.backspace();
    }
    KeyCode::Esc => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
}
