use serde::Serialize;

/// Arena statistics: locked pieces and cleared lines.
///
/// # Example
///
/// ```
/// use escape_engine::ArenaStats;
///
/// let mut stats = ArenaStats::new();
/// stats.complete_piece_drop(4, false);
/// stats.complete_piece_drop(0, true);
///
/// assert_eq!(stats.completed_pieces(), 2);
/// assert_eq!(stats.sabotaged_pieces(), 1);
/// assert_eq!(stats.line_cleared_counter()[4], 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    completed_pieces: usize,
    sabotaged_pieces: usize,
    total_cleared_lines: usize,
    line_cleared_counter: [usize; 5],
}

impl ArenaStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            completed_pieces: 0,
            sabotaged_pieces: 0,
            total_cleared_lines: 0,
            line_cleared_counter: [0; 5],
        }
    }

    /// Total number of pieces locked into place.
    #[must_use]
    pub const fn completed_pieces(&self) -> usize {
        self.completed_pieces
    }

    /// Pieces that locked while a sabotage timer was steering them.
    #[must_use]
    pub const fn sabotaged_pieces(&self) -> usize {
        self.sabotaged_pieces
    }

    #[must_use]
    pub const fn total_cleared_lines(&self) -> usize {
        self.total_cleared_lines
    }

    /// Histogram of lock events by number of lines cleared (index 0 to 4).
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[usize; 5] {
        &self.line_cleared_counter
    }

    /// Updates statistics after a piece locks.
    pub const fn complete_piece_drop(&mut self, cleared_lines: usize, sabotaged: bool) {
        self.completed_pieces += 1;
        if sabotaged {
            self.sabotaged_pieces += 1;
        }
        self.total_cleared_lines += cleared_lines;
        if cleared_lines < self.line_cleared_counter.len() {
            self.line_cleared_counter[cleared_lines] += 1;
        }
    }
}
