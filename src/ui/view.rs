use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views own their input modes (search, form editing) and return actions
/// for the App to execute. Data comes from the shared `UserStore`: views
/// read it on construction and `peek` it when rendering, so a render pass
/// never starts a request.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick, before render
  fn tick(&mut self) {}

  /// Called when the view above this one is popped
  fn on_resume(&mut self) {}

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back").with_priority(90)]
  }
}

/// Shortcuts sorted for display
pub fn sorted_shortcuts(view: &dyn View) -> Vec<ShortcutInfo> {
  let mut shortcuts = view.shortcuts();
  shortcuts.sort_by_key(|s| s.priority);
  shortcuts
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Plain;

  impl View for Plain {
    fn handle_key(&mut self, _key: KeyEvent) -> ViewAction {
      ViewAction::None
    }

    fn render(&mut self, _frame: &mut Frame, _area: Rect) {}

    fn breadcrumb_label(&self) -> String {
      "Plain".to_string()
    }

    fn shortcuts(&self) -> Vec<ShortcutInfo> {
      vec![
        ShortcutInfo::new("q", "back").with_priority(90),
        ShortcutInfo::new("r", "refresh"),
        ShortcutInfo::new("/", "search").with_priority(10),
      ]
    }
  }

  #[test]
  fn test_sorted_shortcuts() {
    let keys: Vec<_> = sorted_shortcuts(&Plain).iter().map(|s| s.key).collect();
    assert_eq!(keys, vec!["/", "q", "r"]);
  }
}
