use crate::cache::QueryResult;
use crate::ui::renderfns::{age, fetch_label, status_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::users::{TransportError, User, UserStore};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// What the detail panel should show for the current query state
#[derive(Debug, Clone, PartialEq, Eq)]
enum DetailState {
  Loading,
  NotFound,
  Failed(String),
  /// Data is shown; a failed refresh keeps it and reports the error
  Loaded { refresh_error: Option<String> },
}

fn detail_state(result: &QueryResult<User>) -> DetailState {
  if result.data.is_some() {
    return DetailState::Loaded {
      refresh_error: result.error_message(),
    };
  }
  match &result.error {
    Some(error) => {
      let not_found = error
        .downcast_ref::<TransportError>()
        .is_some_and(TransportError::is_not_found);
      if not_found {
        DetailState::NotFound
      } else {
        DetailState::Failed(error.to_string())
      }
    }
    // Idle covers id 0, which never resolves to a user
    None if result.is_fetching => DetailState::Loading,
    None => DetailState::NotFound,
  }
}

/// Detail view for a single user
pub struct UserDetailView {
  id: u64,
  store: UserStore,
  scroll: u16,
}

impl UserDetailView {
  pub fn new(id: u64, store: UserStore) -> Self {
    store.select_detail(id);
    Self {
      id,
      store,
      scroll: 0,
    }
  }

  fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
      title,
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
  }

  fn field(label: &'static str, value: &str) -> Line<'static> {
    Line::from(vec![
      Span::styled(format!("  {:<12}", label), Style::default().fg(Color::DarkGray)),
      Span::raw(value.to_string()),
    ])
  }

  fn user_lines(user: &User) -> Vec<Line<'static>> {
    let address = &user.address;
    vec![
      Line::from(vec![
        Span::styled(user.name.clone(), Style::default().fg(Color::White).bold()),
        Span::styled(format!("  @{}", user.username), Style::default().fg(Color::Yellow)),
      ]),
      Line::raw(""),
      Self::section("Contact Information"),
      Self::field("Email", &user.email),
      Self::field("Phone", &user.phone),
      Self::field("Website", &user.website),
      Line::raw(""),
      Self::section("Address"),
      Self::field("Street", &format!("{}, {}", address.street, address.suite)),
      Self::field("City", &format!("{}, {}", address.city, address.zipcode)),
      Self::field(
        "Coordinates",
        &format!("{}, {}", address.geo.lat, address.geo.lng),
      ),
      Line::raw(""),
      Self::section("Company"),
      Self::field("Name", &user.company.name),
      Self::field("Catchphrase", &user.company.catch_phrase),
      Self::field("Business", &user.company.bs),
    ]
  }

  fn title(&self, result: &QueryResult<User>) -> String {
    let mut title = format!(" User #{} ", self.id);
    if let Some(label) = fetch_label(result) {
      title.push_str(&format!("[{}] ", label));
    } else if let Some(updated_at) = result.updated_at {
      title.push_str(&format!("[{}] ", age(updated_at, Utc::now())));
    }
    if result.is_error {
      title.push_str("[error] ");
    }
    title
  }
}

impl View for UserDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
      }
      KeyCode::Char('r') => {
        // Fetch runs on its own task, the handle is not needed
        let _ = self.store.refetch_detail();
      }
      KeyCode::Char('q') | KeyCode::Esc => {
        self.store.clear_detail();
        return ViewAction::Pop;
      }
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let result = self.store.detail();

    let block = Block::default()
      .title(self.title(&result))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(status_color(result.status())));

    let (lines, style) = match detail_state(&result) {
      DetailState::Loaded { refresh_error } => {
        let mut lines = Vec::new();
        if let Some(message) = refresh_error {
          lines.push(Line::styled(
            format!("Refresh failed: {}. Press 'r' to retry.", message),
            Style::default().fg(Color::Red),
          ));
          lines.push(Line::raw(""));
        }
        if let Some(user) = result.data() {
          lines.extend(Self::user_lines(user));
        }
        (lines, Style::default())
      }
      DetailState::Loading => (
        vec![Line::raw("Loading user details...")],
        Style::default().fg(Color::DarkGray),
      ),
      DetailState::NotFound => (
        vec![Line::raw(format!("User with ID \"{}\" was not found.", self.id))],
        Style::default().fg(Color::Red),
      ),
      DetailState::Failed(message) => (
        vec![
          Line::raw(format!("Failed to load user: {}", message)),
          Line::raw(""),
          Line::raw("Press 'r' to retry."),
        ],
        Style::default().fg(Color::Red),
      ),
    };

    let paragraph = Paragraph::new(lines)
      .block(block)
      .style(style)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.store.detail().data() {
      Some(user) => user.name.clone(),
      None => format!("User #{}", self.id),
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryError;
  use crate::users::NewUser;
  use std::sync::Arc;

  #[derive(Debug, thiserror::Error)]
  #[error("connection reset")]
  struct Reset;

  #[test]
  fn test_detail_state_loaded() {
    let result = QueryResult {
      data: Some(Arc::new(NewUser::default().with_id(1))),
      is_success: true,
      ..QueryResult::idle()
    };
    assert_eq!(detail_state(&result), DetailState::Loaded { refresh_error: None });
  }

  #[test]
  fn test_failed_refresh_keeps_data_and_reports_error() {
    let result = QueryResult {
      data: Some(Arc::new(NewUser::default().with_id(1))),
      error: Some(QueryError::new(Reset, 4)),
      is_error: true,
      ..QueryResult::idle()
    };
    assert_eq!(
      detail_state(&result),
      DetailState::Loaded {
        refresh_error: Some("connection reset".to_string())
      }
    );
  }

  #[test]
  fn test_detail_state_loading() {
    let result: QueryResult<User> = QueryResult {
      is_loading: true,
      is_fetching: true,
      ..QueryResult::idle()
    };
    assert_eq!(detail_state(&result), DetailState::Loading);
  }

  #[test]
  fn test_detail_state_not_found() {
    let error = TransportError::NotFound {
      url: "https://example.com/users/99".to_string(),
    };
    let result: QueryResult<User> = QueryResult {
      error: Some(QueryError::new(error, 4)),
      is_error: true,
      ..QueryResult::idle()
    };
    assert_eq!(detail_state(&result), DetailState::NotFound);

    // Disabled detail (id 0) never produces a user
    assert_eq!(detail_state(&QueryResult::<User>::idle()), DetailState::NotFound);
  }

  #[test]
  fn test_detail_state_failed() {
    let result: QueryResult<User> = QueryResult {
      error: Some(QueryError::new(Reset, 4)),
      is_error: true,
      ..QueryResult::idle()
    };
    assert_eq!(
      detail_state(&result),
      DetailState::Failed("connection reset".to_string())
    );
  }
}
