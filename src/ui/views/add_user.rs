use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::users::validate::{FormField, UserForm, ValidationErrors};
use crate::users::UserStore;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Create-user form. Valid submissions are added to the local list only.
pub struct AddUserView {
  store: UserStore,
  inputs: Vec<(FormField, TextInput)>,
  focused: usize,
  errors: ValidationErrors,
}

impl AddUserView {
  pub fn new(store: UserStore) -> Self {
    Self {
      store,
      inputs: FormField::ALL
        .iter()
        .map(|field| (*field, TextInput::new()))
        .collect(),
      focused: 0,
      errors: ValidationErrors::default(),
    }
  }

  fn focused_field(&self) -> FormField {
    self.inputs[self.focused].0
  }

  fn focus_next(&mut self) {
    self.focused = (self.focused + 1) % self.inputs.len();
  }

  fn focus_prev(&mut self) {
    self.focused = (self.focused + self.inputs.len() - 1) % self.inputs.len();
  }

  fn form(&self) -> UserForm {
    self
      .inputs
      .iter()
      .fold(UserForm::new(), |form, (field, input)| {
        form.with(*field, input.value())
      })
  }

  fn submit(&mut self) -> ViewAction {
    match self.form().into_new_user() {
      Ok(new_user) => {
        self.store.add_local_user(new_user);
        ViewAction::Pop
      }
      Err(errors) => {
        // Jump to the first field that needs attention
        if let Some((field, _)) = errors.fields().next() {
          if let Some(idx) = self.inputs.iter().position(|(f, _)| *f == field) {
            self.focused = idx;
          }
        }
        self.errors = errors;
        ViewAction::None
      }
    }
  }

  fn field_lines(&self) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, (field, input)) in self.inputs.iter().enumerate() {
      let focused = idx == self.focused;
      let marker = if field.is_required() { "*" } else { " " };
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };

      let mut spans = vec![
        Span::styled(if focused { "> " } else { "  " }, label_style),
        Span::styled(format!("{:<14}{} ", field.label(), marker), label_style),
        Span::raw(input.value().to_string()),
      ];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      if let Some(message) = self.errors.get(*field) {
        spans.push(Span::styled(
          format!("  {}", message),
          Style::default().fg(Color::Red),
        ));
      }
      lines.push(Line::from(spans));
    }
    lines
  }
}

impl View for AddUserView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus_next();
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus_prev();
        return ViewAction::None;
      }
      _ => {}
    }

    let field = self.focused_field();
    match self.inputs[self.focused].1.handle_key(key) {
      InputResult::Submitted(_) => self.submit(),
      InputResult::Cancelled => ViewAction::Pop,
      InputResult::Consumed => {
        self.errors.clear(field);
        ViewAction::None
      }
      InputResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.errors.is_empty() {
      " Add New User ".to_string()
    } else {
      format!(" Add New User ({}) ", self.errors)
    };
    let border = if self.errors.is_empty() {
      Color::Blue
    } else {
      Color::Red
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    frame.render_widget(Paragraph::new(self.field_lines()).block(block), area);
  }

  fn breadcrumb_label(&self) -> String {
    "Add User".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("enter", "save").with_priority(20),
      ShortcutInfo::new("esc", "cancel").with_priority(90),
    ]
  }
}
