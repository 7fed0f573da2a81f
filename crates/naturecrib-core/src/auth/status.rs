//! User-facing status reporting.

/// Classification of the last outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Failed,
}

/// Last user-facing outcome text plus its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

/// Holds the single status slot read by the presentation layer on every
/// render. Overwritten on every outcome, cleared at the start of a new
/// attempt.
#[derive(Debug, Default)]
pub struct StatusReporter {
    current: Option<StatusMessage>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.current = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }
}
