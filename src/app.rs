use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{sorted_shortcuts, View, ViewAction};
use crate::ui::views::UserListView;
use crate::users::{UserClient, UserStore};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Navigation stack, the user list is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Base URL shown in the header
  api_url: String,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = UserClient::new(&config.api)
      .map_err(|e| eyre!("Failed to create API client: {}", e))?;
    let api_url = client.base_url().to_string();

    // One store for the whole session, shared by every view
    let store = UserStore::new(Arc::new(client), config.cache.query_options());
    info!(api_url = %api_url, "Starting userdeck");

    Ok(Self {
      view_stack: vec![Box::new(UserListView::new(store))],
      api_url,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {
          if let Some(view) = self.view_stack.last_mut() {
            view.tick();
          }
        }
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Current view
        Constraint::Length(1), // Breadcrumb
      ])
      .split(frame.area());

    let shortcuts = self
      .view_stack
      .last()
      .map(|view| sorted_shortcuts(view.as_ref()))
      .unwrap_or_default();
    draw_header(frame, chunks[0], &self.api_url, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    draw_footer(frame, chunks[2], &self.breadcrumb());
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        // Popping the root quits
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.on_resume();
          }
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }
}
