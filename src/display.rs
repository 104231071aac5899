use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::ResponseEnvelope;

/// Shown when the backend replies without a message.
pub const DEFAULT_MESSAGE: &str = "Request succeeded, but no message was provided.";

/// Blocking notice raised once a retry sequence is exhausted.
pub const FAILURE_NOTICE: &str = "Failed to send the request. Check the URL and try again.";

/// Appended to a log preview that was cut short.
pub const TRUNCATION_MARKER: &str = "...";

/// Status class carried by the display area.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum StatusClass {
    #[default]
    Neutral,
    Success,
    Error,
}

impl StatusClass {
    /// CSS class name applied to the display element.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "log",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Text and class derived from one envelope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub class: StatusClass,
}

/// Keeps the first `limit` characters of `log`, marking the cut.
pub fn truncate_log(log: &str, limit: usize) -> String {
    match log.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &log[..cut]),
        None => log.to_owned(),
    }
}

pub fn render_envelope(envelope: &ResponseEnvelope, log_limit: usize) -> Rendered {
    let message = envelope.message.as_deref().unwrap_or(DEFAULT_MESSAGE);
    let log = truncate_log(envelope.log.as_deref().unwrap_or_default(), log_limit);
    Rendered {
        text: format!("{message}\n{log}"),
        class: if envelope.success {
            StatusClass::Success
        } else {
            StatusClass::Error
        },
    }
}

/// Where submission results end up.
///
/// A surface is owned by a single consumer task, so implementations need no
/// internal locking of their own.
pub trait Surface: Send + 'static {
    /// Replaces the area's text and class.
    fn render(&mut self, rendered: &Rendered);
    fn set_class(&mut self, class: StatusClass);
    /// Raises a blocking notice to the user.
    fn notify_failure(&mut self, notice: &str);
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SurfaceSnapshot {
    pub text: String,
    pub class: StatusClass,
    pub notices: Vec<String>,
    /// Every class the area carried, in order.
    pub class_history: Vec<StatusClass>,
}

/// In-memory surface; clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<SurfaceSnapshot>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut SurfaceSnapshot)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }
}

impl Surface for MemorySurface {
    fn render(&mut self, rendered: &Rendered) {
        self.update(|state| {
            state.text = rendered.text.clone();
            state.class = rendered.class;
            state.class_history.push(rendered.class);
        });
    }

    fn set_class(&mut self, class: StatusClass) {
        self.update(|state| {
            state.class = class;
            state.class_history.push(class);
        });
    }

    fn notify_failure(&mut self, notice: &str) {
        self.update(|state| state.notices.push(notice.to_owned()));
    }
}

#[derive(Debug)]
pub(crate) enum UpdateKind {
    Rendered(Rendered),
    Failed,
    Reset,
}

/// Display change produced by a submission, stamped with its generation.
#[derive(Debug)]
pub(crate) struct DisplayUpdate {
    pub generation: u64,
    pub kind: UpdateKind,
}

pub(crate) type UpdateSender = mpsc::UnboundedSender<DisplayUpdate>;
pub(crate) type UpdateReceiver = mpsc::UnboundedReceiver<DisplayUpdate>;

/// Single consumer applying updates to a surface.
///
/// Results from a generation older than the newest one seen are dropped, and
/// a reset only clears the class of the generation currently shown.
pub(crate) struct Display<S> {
    surface: S,
    newest: u64,
    shown: Option<u64>,
}

impl<S: Surface> Display<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            newest: 0,
            shown: None,
        }
    }

    pub fn apply(&mut self, update: DisplayUpdate) {
        let DisplayUpdate { generation, kind } = update;
        match kind {
            UpdateKind::Rendered(rendered) => {
                if self.is_stale(generation) {
                    return;
                }
                self.newest = generation;
                self.shown = Some(generation);
                self.surface.render(&rendered);
            }
            UpdateKind::Failed => {
                if self.is_stale(generation) {
                    return;
                }
                self.newest = generation;
                self.surface.notify_failure(FAILURE_NOTICE);
            }
            UpdateKind::Reset => {
                if self.shown == Some(generation) {
                    self.surface.set_class(StatusClass::Neutral);
                }
            }
        }
    }

    /// Drains `updates` until every sender is gone, then hands the surface back.
    pub async fn run(mut self, mut updates: UpdateReceiver) -> S {
        while let Some(update) = updates.recv().await {
            self.apply(update);
        }
        self.surface
    }

    fn is_stale(&self, generation: u64) -> bool {
        if generation >= self.newest {
            return false;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(generation, newest = self.newest, "dropping stale display update");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{
        render_envelope, truncate_log, Display, DisplayUpdate, MemorySurface, Rendered,
        StatusClass, UpdateKind, DEFAULT_MESSAGE, FAILURE_NOTICE,
    };
    use crate::ResponseEnvelope;

    fn rendered(generation: u64, text: &str, class: StatusClass) -> DisplayUpdate {
        DisplayUpdate {
            generation,
            kind: UpdateKind::Rendered(Rendered {
                text: text.to_owned(),
                class,
            }),
        }
    }

    fn reset(generation: u64) -> DisplayUpdate {
        DisplayUpdate {
            generation,
            kind: UpdateKind::Reset,
        }
    }

    #[test]
    fn short_log_is_kept_whole() {
        let log = "x".repeat(500);
        assert_eq!(truncate_log(&log, 500), log);
    }

    #[test]
    fn long_log_is_cut_with_marker() {
        let log = "y".repeat(501);
        let preview = truncate_log(&log, 500);
        assert_eq!(preview.len(), 503);
        assert!(preview.starts_with(&"y".repeat(500)));
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let log = "日志".repeat(300);
        let preview = truncate_log(&log, 500);
        assert_eq!(preview.chars().count(), 503);
    }

    #[test]
    fn render_uses_placeholders_for_missing_fields() {
        let rendered = render_envelope(&ResponseEnvelope::default(), 500);
        assert_eq!(rendered.text, format!("{DEFAULT_MESSAGE}\n"));
        assert_eq!(rendered.class, StatusClass::Error);
    }

    #[test]
    fn render_marks_success() {
        let envelope = ResponseEnvelope {
            success: true,
            message: Some("done".to_owned()),
            log: Some("status 200".to_owned()),
        };
        let rendered = render_envelope(&envelope, 500);
        assert_eq!(rendered.text, "done\nstatus 200");
        assert_eq!(rendered.class, StatusClass::Success);
        assert_eq!(rendered.class.as_str(), "success");
    }

    #[test]
    fn stale_generation_is_dropped() {
        let surface = MemorySurface::new();
        let mut display = Display::new(surface.clone());

        display.apply(rendered(2, "newer", StatusClass::Success));
        display.apply(rendered(1, "older", StatusClass::Error));
        display.apply(DisplayUpdate {
            generation: 1,
            kind: UpdateKind::Failed,
        });

        let snapshot = surface.snapshot();
        assert_eq!(snapshot.text, "newer");
        assert_eq!(snapshot.class, StatusClass::Success);
        assert!(snapshot.notices.is_empty());
    }

    #[test]
    fn reset_only_applies_to_shown_generation() {
        let surface = MemorySurface::new();
        let mut display = Display::new(surface.clone());

        display.apply(rendered(1, "first", StatusClass::Error));
        display.apply(rendered(2, "second", StatusClass::Success));
        display.apply(reset(1));
        assert_eq!(surface.snapshot().class, StatusClass::Success);

        display.apply(reset(2));
        assert_eq!(surface.snapshot().class, StatusClass::Neutral);
        assert_eq!(StatusClass::Neutral.as_str(), "log");
    }

    #[test]
    fn failure_raises_notice() {
        let surface = MemorySurface::new();
        let mut display = Display::new(surface.clone());
        display.apply(DisplayUpdate {
            generation: 1,
            kind: UpdateKind::Failed,
        });
        assert_eq!(surface.snapshot().notices, vec![FAILURE_NOTICE.to_owned()]);
    }
}
