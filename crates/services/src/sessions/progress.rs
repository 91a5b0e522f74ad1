/// Position within a quiz, for the question progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// Zero-based index of the question on screen.
    pub question: usize,
    pub total: usize,
    pub answered: usize,
    /// `round(100 * (question + 1) / total)`.
    pub percent: u8,
}

/// Position within a reading step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingProgress {
    pub section: usize,
    pub total: usize,
    pub read: usize,
    pub percent: u8,
    pub all_read: bool,
}
