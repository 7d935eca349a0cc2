use crate::error::Error;

/// Coarse pipeline milestones.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    /// Targets resolved and validated.
    SelectionDone { sections: usize },
    /// One section extracted.
    ElementParsed { section: usize, items: usize },
    RenderStart { items: usize },
    RenderDone { pages: usize },
    SaveStart,
    SaveDone { bytes: usize },
}

/// Receives progress and error events. Both default to no-ops.
pub trait Observer {
    fn on_progress(&self, _event: &Progress) {}

    fn on_error(&self, _error: &Error) {}
}

/// Forwards events to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_progress(&self, event: &Progress) {
        log::debug!("progress: {event:?}");
    }

    fn on_error(&self, error: &Error) {
        log::warn!("[{}] {error}", error.code());
    }
}
