//! receiver/continuity.rs
//! Decides whether the next part continues the live receive stream.

use crate::parts::PartName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// Same stream, next part number: keep writing into the live downstream.
    Continue,
    /// Nothing consumed yet: open the first downstream.
    StartFirst,
    /// New stream or a gap: close the live downstream and open a fresh one.
    Rotate,
}

impl Continuity {
    pub fn needs_new_downstream(self) -> bool {
        !matches!(self, Continuity::Continue)
    }
}

#[derive(Debug, Default)]
pub struct ContinuityTracker {
    previous: Option<PartName>,
}

impl ContinuityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, next: &PartName) -> Continuity {
        match &self.previous {
            None => Continuity::StartFirst,
            Some(prev) if next.follows(prev) => Continuity::Continue,
            Some(_) => Continuity::Rotate,
        }
    }

    /// Record a fully consumed part.
    pub fn commit(&mut self, part: PartName) {
        self.previous = Some(part);
    }

    pub fn previous(&self) -> Option<&PartName> {
        self.previous.as_ref()
    }
}
