use std::fmt;

use serde::Serialize;

use super::playfield::MoveCommand;

/// Write-only record of executed opponent moves, one character per move.
///
/// Tags come from [`MoveCommand::tag`]. The log keeps at most `limit` entries,
/// dropping the oldest ones first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MoveLog {
    tags: String,
    #[serde(skip)]
    limit: Option<usize>,
}

impl MoveLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            tags: String::new(),
            limit: Some(limit),
        }
    }

    pub fn record(&mut self, command: MoveCommand) {
        self.tags.push(command.tag());
        if let Some(limit) = self.limit
            && self.tags.len() > limit
        {
            // Tags are ASCII, so byte offsets are char offsets.
            self.tags.drain(..self.tags.len() - limit);
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.tags
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of logged moves with the given tag.
    #[must_use]
    pub fn count(&self, tag: char) -> usize {
        self.tags.chars().filter(|c| *c == tag).count()
    }
}

impl fmt::Display for MoveLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tags)
    }
}
