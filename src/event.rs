use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized, redraw on next pass
  Resize,
  /// Periodic tick so views pick up cache updates
  Tick,
}

/// Produces events from terminal input and a fixed-rate tick
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || {
      let mut last_tick = Instant::now();
      loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).unwrap_or(false) {
          let forwarded = match event::read() {
            // Release events arrive on some platforms, only presses count
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
            Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
            Ok(_) => None,
            Err(e) => {
              debug!(error = %e, "Failed to read terminal event");
              None
            }
          };
          if let Some(evt) = forwarded {
            if tx.send(evt).is_err() {
              break;
            }
          }
        }

        if last_tick.elapsed() >= tick_rate {
          if tx.send(Event::Tick).is_err() {
            break;
          }
          last_tick = Instant::now();
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
