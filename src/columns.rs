//! Column directory: the in-memory list of dataset column names and the
//! filter/selection logic behind the column picker.
//!
//! Matching rules: case-insensitive substring for filtering, case-sensitive
//! equality for exact selection.

/// What pressing Enter in the picker resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The highlighted dropdown entry
    Active(String),
    /// No highlight; the trimmed free-text input is committed as-is
    Typed(String),
    /// Nothing to commit (no highlight and empty input)
    None,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnDirectory {
    columns: Vec<String>,
    filter: String,
    filtered: Vec<String>,
    active: Option<usize>,
}

impl ColumnDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory wholesale (successful fetch or upload)
    pub fn replace(&mut self, columns: Vec<String>) {
        self.columns = columns;
        self.refilter();
    }

    /// Fetch failures clear the directory rather than erroring out
    pub fn clear(&mut self) {
        self.columns.clear();
        self.refilter();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn filtered(&self) -> &[String] {
        &self.filtered
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Exact membership, case-sensitive
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.to_string();
        self.refilter();
    }

    fn refilter(&mut self) {
        let term = self.filter.trim().to_lowercase();
        self.filtered = self
            .columns
            .iter()
            .filter(|c| c.to_lowercase().contains(&term))
            .cloned()
            .collect();
        self.active = None;
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_value(&self) -> Option<&str> {
        self.active
            .and_then(|i| self.filtered.get(i))
            .map(String::as_str)
    }

    /// Move the highlight down one entry; clamps at the end, never wraps
    pub fn move_down(&mut self) {
        self.set_active(self.active.map_or(0, |i| i as isize + 1));
    }

    /// Move the highlight up one entry; clamps at the start, never wraps
    pub fn move_up(&mut self) {
        self.set_active(self.active.map_or(0, |i| i as isize - 1));
    }

    fn set_active(&mut self, index: isize) {
        if self.filtered.is_empty() {
            return;
        }
        let bounded = index.clamp(0, self.filtered.len() as isize - 1) as usize;
        self.active = Some(bounded);
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Resolve Enter against the current highlight and free-text input
    pub fn commit(&self, raw_input: &str) -> Commit {
        if let Some(value) = self.active_value() {
            return Commit::Active(value.to_string());
        }
        let typed = raw_input.trim();
        if typed.is_empty() {
            return Commit::None;
        }
        Commit::Typed(typed.to_string())
    }
}
