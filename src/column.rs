use serde::Serialize;

/// One screen column: an ordered list of windows with a focus index.
///
/// When `split` is set every client is shown, stacked top to bottom in
/// insertion order. Otherwise only the focused client is shown and it fills
/// the whole column.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowColumn<W> {
    clients: Vec<W>,
    current_index: usize,
    split: bool,
}

/// Snapshot of a single column, as reported by the layout's `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub clients: Vec<String>,
    pub current: usize,
    pub split: bool,
}

impl<W: Copy + PartialEq> WindowColumn<W> {
    pub fn new(split: bool) -> Self {
        Self {
            clients: Vec::new(),
            current_index: 0,
            split,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn contains(&self, window: W) -> bool {
        self.clients.contains(&window)
    }

    pub fn index_of(&self, window: W) -> Option<usize> {
        self.clients.iter().position(|&w| w == window)
    }

    pub fn clients(&self) -> &[W] {
        &self.clients
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The focused client, if the column holds any.
    pub fn current(&self) -> Option<W> {
        self.clients.get(self.current_index).copied()
    }

    pub fn is_split(&self) -> bool {
        self.split
    }

    pub fn set_split(&mut self, split: bool) {
        self.split = split;
    }

    pub fn toggle_split(&mut self) {
        self.split = !self.split;
    }

    /// Appends `window` and focuses it.
    pub fn add(&mut self, window: W) {
        self.clients.push(window);
        self.current_index = self.clients.len() - 1;
    }

    /// Removes `window`, returning whether it was present.
    ///
    /// The focused client keeps focus unless it is the one removed, in which
    /// case focus lands on its successor (or the new last client).
    pub fn remove(&mut self, window: W) -> bool {
        let Some(pos) = self.index_of(window) else {
            return false;
        };
        self.clients.remove(pos);
        if pos < self.current_index {
            self.current_index -= 1;
        }
        if self.current_index >= self.clients.len() {
            self.current_index = self.clients.len().saturating_sub(1);
        }
        true
    }

    pub fn focus(&mut self, window: W) {
        if let Some(idx) = self.index_of(window) {
            self.current_index = idx;
        }
    }

    pub fn focus_first(&mut self) -> Option<W> {
        if self.is_empty() {
            return None;
        }
        self.current_index = 0;
        self.current()
    }

    pub fn focus_last(&mut self) -> Option<W> {
        if self.is_empty() {
            return None;
        }
        self.current_index = self.clients.len() - 1;
        self.current()
    }

    /// Focuses the client after `window`. `None` when `window` is the last
    /// client (or absent) and the caller has to move on to the next column.
    pub fn focus_next(&mut self, window: W) -> Option<W> {
        let idx = self.index_of(window)?;
        if idx + 1 < self.clients.len() {
            self.current_index = idx + 1;
            return self.current();
        }
        None
    }

    /// Focuses the client before `window`. `None` when `window` is the first
    /// client (or absent).
    pub fn focus_previous(&mut self, window: W) -> Option<W> {
        let idx = self.index_of(window)?;
        if idx > 0 {
            self.current_index = idx - 1;
            return self.current();
        }
        None
    }

    /// Moves focus one client down, wrapping to the top.
    pub fn focus_down(&mut self) -> Option<W> {
        if self.is_empty() {
            return None;
        }
        self.current_index = (self.current_index + 1) % self.clients.len();
        self.current()
    }

    /// Moves focus one client up, wrapping to the bottom.
    pub fn focus_up(&mut self) -> Option<W> {
        if self.is_empty() {
            return None;
        }
        let len = self.clients.len();
        self.current_index = (self.current_index + len - 1) % len;
        self.current()
    }

    /// Rotates the stacking order so the last client becomes the first.
    pub fn shuffle_up(&mut self) {
        let focused = self.current();
        if self.clients.len() > 1 {
            self.clients.rotate_right(1);
        }
        self.refocus(focused);
    }

    /// Rotates the stacking order so the first client becomes the last.
    pub fn shuffle_down(&mut self) {
        let focused = self.current();
        if self.clients.len() > 1 {
            self.clients.rotate_left(1);
        }
        self.refocus(focused);
    }

    fn refocus(&mut self, focused: Option<W>) {
        if let Some(w) = focused {
            self.focus(w);
        }
    }

    pub fn info(&self, name_of: impl Fn(&W) -> String) -> ColumnInfo {
        ColumnInfo {
            clients: self.clients.iter().map(name_of).collect(),
            current: self.current_index,
            split: self.split,
        }
    }
}
