use crate::cache::QueryResult;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{fetch_label, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{AddUserView, UserDetailView};
use crate::users::filter::{filter_users, sort_by_name};
use crate::users::{User, UserStore};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Root view: every user, filterable by name or email
pub struct UserListView {
  store: UserStore,
  list_state: ListState,
  search: SearchInput,
  filter: String,
}

impl UserListView {
  pub fn new(store: UserStore) -> Self {
    // Mounting the list starts the first fetch
    store.load_list();

    Self {
      store,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
    }
  }

  /// Rows currently shown: filtered, then ordered by name
  fn visible<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
    let mut rows = filter_users(users, &self.filter);
    sort_by_name(&mut rows);
    rows
  }

  fn selected_id(&self) -> Option<u64> {
    let result = self.store.list();
    let users = result.data()?;
    let idx = self.list_state.selected()?;
    self.visible(users).get(idx).map(|u| u.id)
  }

  fn title(&self, result: &QueryResult<Vec<User>>, shown: usize) -> String {
    let total = result.data().map(|u| u.len()).unwrap_or(0);
    let mut title = if self.filter.is_empty() {
      format!(" Users ({}) ", total)
    } else {
      format!(" Users /{} ({}/{}) ", self.filter, shown, total)
    };

    let local = self.store.local_users().len();
    if local > 0 {
      title.push_str(&format!("[{} local] ", local));
    }
    if let Some(label) = fetch_label(result) {
      title.push_str(&format!("[{}] ", label));
    }
    if result.is_error {
      title.push_str("[error] ");
    }
    title
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let result = self.store.list();
    let users: &[User] = result.data().map(|v| v.as_slice()).unwrap_or(&[]);
    let rows = self.visible(users);
    ensure_valid_selection(&mut self.list_state, rows.len());

    let block = Block::default()
      .title(self.title(&result, rows.len()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(status_color(result.status())));

    if rows.is_empty() {
      let content = if result.is_loading {
        "Loading users...".to_string()
      } else if let Some(message) = result.error_message() {
        format!("Failed to load users: {}\n\nPress 'r' to retry.", message)
      } else if !self.filter.is_empty() {
        format!("No users match \"{}\".", self.filter)
      } else {
        "No users found.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .map(|user| {
        let line = Line::from(vec![
          Span::styled(format!("{:>4}", user.id), Style::default().fg(Color::Cyan)),
          Span::raw("  "),
          Span::styled(
            format!("{:<24}", truncate(&user.name, 24)),
            Style::default().fg(Color::White).bold(),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<28}", truncate(&user.email, 28)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(" "),
          Span::styled(
            truncate(&user.company.name, 30),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for UserListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let search component try to handle first
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.filter = query;
        self.list_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      KeyCode::Char('r') => {
        // Fetch runs on its own task, the handle is not needed
        let _ = self.store.refetch_list();
      }
      KeyCode::Char('a') => {
        return ViewAction::Push(Box::new(AddUserView::new(self.store.clone())));
      }
      KeyCode::Enter => {
        if let Some(id) = self.selected_id() {
          return ViewAction::Push(Box::new(UserDetailView::new(id, self.store.clone())));
        }
      }
      KeyCode::Esc if !self.filter.is_empty() => {
        self.filter.clear();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Users".to_string()
  }

  fn on_resume(&mut self) {
    // Coming back from a detail or the form counts as a fresh mount
    self.store.load_list();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search").with_priority(10),
      ShortcutInfo::new("enter", "details").with_priority(20),
      ShortcutInfo::new("a", "add").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
