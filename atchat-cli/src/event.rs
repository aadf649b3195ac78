use atchat::SessionEvent;
use crossterm::event::Event as TermEvent;

/// Unified event type for the main loop.
pub enum AppEvent {
    Terminal(TermEvent),
    Session(SessionEvent),
    Tick,
    Quit,
}
