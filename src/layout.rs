use crate::column::{ColumnInfo, WindowColumn};
use crate::config::{Color, LayoutConfig};
use serde::Serialize;
use std::fmt;

/// Anything the host hands us as a window reference.
pub trait Handle: Copy + PartialEq + fmt::Debug {}

impl<T: Copy + PartialEq + fmt::Debug> Handle for T {}

/// Screen area available to a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn clamped(x: i64, y: i64, width: i64, height: i64) -> Self {
        let coord = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        let size = |v: i64| v.clamp(0, i64::from(u32::MAX)) as u32;
        Self::new(coord(x), coord(y), size(width), size(height))
    }
}

/// What the host should do with one managed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Hidden,
    Place {
        rect: Rect,
        border_width: u32,
        border_color: u32,
        /// Gap the host leaves inside `rect` on every side.
        margin: u32,
    },
}

/// Capabilities a layout needs from the window manager driving it.
pub trait LayoutHost<W> {
    fn request_focus(&mut self, window: W);
    /// Recompute and apply placements for every managed window.
    fn layout_all(&mut self);
    fn resolve_color(&self, color: &Color) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutCommand {
    ToggleSplit,
    FocusDown,
    FocusUp,
    ShuffleUp,
    ShuffleDown,
    Rotate,
    NextColumn,
    PreviousColumn,
    ClientToNext,
    ClientToPrevious,
}

impl LayoutCommand {
    #[cfg(test)]
    pub const ALL: [LayoutCommand; 10] = [
        LayoutCommand::ToggleSplit,
        LayoutCommand::FocusDown,
        LayoutCommand::FocusUp,
        LayoutCommand::ShuffleUp,
        LayoutCommand::ShuffleDown,
        LayoutCommand::Rotate,
        LayoutCommand::NextColumn,
        LayoutCommand::PreviousColumn,
        LayoutCommand::ClientToNext,
        LayoutCommand::ClientToPrevious,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ToggleSplit" => Some(Self::ToggleSplit),
            "FocusDown" => Some(Self::FocusDown),
            "FocusUp" => Some(Self::FocusUp),
            "ShuffleUp" => Some(Self::ShuffleUp),
            "ShuffleDown" => Some(Self::ShuffleDown),
            "Rotate" => Some(Self::Rotate),
            "NextColumn" => Some(Self::NextColumn),
            "PreviousColumn" => Some(Self::PreviousColumn),
            "ClientToNext" => Some(Self::ClientToNext),
            "ClientToPrevious" => Some(Self::ClientToPrevious),
            _ => None,
        }
    }
}

/// Serializable status snapshot of a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutInfo {
    pub name: String,
    pub column_count: usize,
    pub stacks: Vec<ColumnInfo>,
    pub current_stack: usize,
    pub clients: Vec<String>,
}

/// A pluggable tiling layout.
pub trait Layout<W: Handle> {
    fn name(&self) -> &'static str;

    fn add(&mut self, window: W);
    /// Forgets `window` and returns the window that should be focused next.
    fn remove(&mut self, window: W) -> Option<W>;
    /// Host notification that `window` received input focus.
    fn focus(&mut self, window: W);
    fn focus_first(&mut self) -> Option<W>;
    fn focus_last(&mut self) -> Option<W>;
    fn focus_next(&mut self, window: W) -> Option<W>;
    fn focus_previous(&mut self, window: W) -> Option<W>;

    fn clients(&self) -> Vec<W>;
    fn configure(&self, window: W, screen: Rect, host: &dyn LayoutHost<W>) -> Placement;
    fn command(&mut self, command: LayoutCommand, host: &mut dyn LayoutHost<W>);
    fn info(&self, name_of: &dyn Fn(&W) -> String) -> LayoutInfo;

    fn arrange(&self, screen: Rect, host: &dyn LayoutHost<W>) -> Vec<(W, Placement)> {
        self.clients()
            .into_iter()
            .map(|w| (w, self.configure(w, screen, host)))
            .collect()
    }
}

/// At most two side-by-side columns of windows.
///
/// Columns are created on demand: the first window opens the left column and
/// a second column only appears when a window is moved out of a column
/// holding several. A column disappears as soon as it is emptied, unless the
/// other column is split and can hand over its focused window.
#[derive(Debug, Clone, PartialEq)]
pub struct StackLayout<W> {
    config: LayoutConfig,
    columns: Vec<WindowColumn<W>>,
    current: usize,
}

impl<W: Handle> StackLayout<W> {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            columns: Vec::new(),
            current: 0,
        }
    }

    pub fn columns(&self) -> &[WindowColumn<W>] {
        &self.columns
    }

    /// Index of the column holding input focus.
    pub fn current_column(&self) -> usize {
        self.current
    }

    pub fn current_window(&self) -> Option<W> {
        self.columns.get(self.current).and_then(WindowColumn::current)
    }

    pub fn contains(&self, window: W) -> bool {
        self.column_of(window).is_some()
    }

    fn column_of(&self, window: W) -> Option<usize> {
        self.columns.iter().position(|c| c.contains(window))
    }

    fn new_column(&self, slot: usize) -> WindowColumn<W> {
        WindowColumn::new(self.config.autosplit[slot])
    }

    fn delete_column(&mut self, idx: usize) {
        self.columns.remove(idx);
        if self.columns.len() == 1 {
            self.columns[0].set_split(self.config.autosplit[0]);
        }
    }

    /// Leftmost column with the fewest clients.
    fn fewest_clients(&self) -> usize {
        let mut best = 0;
        for (i, column) in self.columns.iter().enumerate() {
            if column.len() < self.columns[best].len() {
                best = i;
            }
        }
        best
    }

    fn check_invariants(&self) {
        debug_assert!(self.columns.len() <= 2, "more than two columns");
        debug_assert!(
            self.columns.is_empty() || self.current < self.columns.len(),
            "active column out of range"
        );
        for column in &self.columns {
            debug_assert!(!column.is_empty(), "empty column survived");
            debug_assert!(column.current_index() < column.len());
        }
    }

    pub fn focus_next_column(&mut self, host: &mut dyn LayoutHost<W>) {
        if self.columns.len() > 1 && self.current + 1 < self.columns.len() {
            self.current += 1;
            if let Some(w) = self.current_window() {
                host.request_focus(w);
            }
        }
    }

    pub fn focus_previous_column(&mut self, host: &mut dyn LayoutHost<W>) {
        if self.columns.len() > 1 && self.current > 0 {
            self.current -= 1;
            if let Some(w) = self.current_window() {
                host.request_focus(w);
            }
        }
    }

    /// Sends the focused window towards the right.
    pub fn move_client_to_next_column(&mut self) {
        let Some(window) = self.current_window() else {
            return;
        };
        match (self.columns.len(), self.current) {
            (1, _) if self.columns[0].len() > 1 => {
                self.columns[0].remove(window);
                let mut column = self.new_column(1);
                column.add(window);
                self.columns.push(column);
                self.current = 1;
                log::debug!("{:?} opened the right column", window);
            }
            (2, 0) if self.columns[0].len() > 1 => {
                self.columns[0].remove(window);
                self.columns[1].add(window);
                self.current = 1;
                log::debug!("{:?} moved to the right column", window);
            }
            (2, 0) => {
                self.columns[0].remove(window);
                self.delete_column(0);
                self.collapse_into_sole_column(window);
            }
            _ => log::trace!("no column right of {:?}", window),
        }
        self.check_invariants();
    }

    /// Sends the focused window towards the left.
    pub fn move_client_to_previous_column(&mut self) {
        let Some(window) = self.current_window() else {
            return;
        };
        match (self.columns.len(), self.current) {
            (1, _) if self.columns[0].len() > 1 => {
                self.columns[0].remove(window);
                let mut column = self.new_column(0);
                column.add(window);
                self.columns.insert(0, column);
                self.current = 0;
                log::debug!("{:?} opened the left column", window);
            }
            (2, 1) if self.columns[1].len() > 1 => {
                self.columns[1].remove(window);
                self.columns[0].add(window);
                self.current = 0;
                log::debug!("{:?} moved to the left column", window);
            }
            (2, 1) => {
                self.columns[1].remove(window);
                self.delete_column(1);
                self.collapse_into_sole_column(window);
            }
            _ => log::trace!("no column left of {:?}", window),
        }
        self.check_invariants();
    }

    fn collapse_into_sole_column(&mut self, window: W) {
        let survivor = &mut self.columns[0];
        survivor.set_split(false);
        survivor.add(window);
        self.current = 0;
        log::debug!("{:?} collapsed the layout into one column", window);
    }

    pub fn toggle_split_active_column(&mut self, host: &mut dyn LayoutHost<W>) {
        if let Some(column) = self.columns.get_mut(self.current) {
            column.toggle_split();
        }
        host.layout_all();
    }

    pub fn shuffle_up_active_column(&mut self, host: &mut dyn LayoutHost<W>) {
        if let Some(column) = self.columns.get_mut(self.current) {
            column.shuffle_up();
        }
        host.layout_all();
    }

    pub fn shuffle_down_active_column(&mut self, host: &mut dyn LayoutHost<W>) {
        if let Some(column) = self.columns.get_mut(self.current) {
            column.shuffle_down();
        }
        host.layout_all();
    }

    /// Swaps the left and right column. The active column moves along.
    pub fn rotate_columns(&mut self, host: &mut dyn LayoutHost<W>) {
        if self.columns.len() > 1 {
            self.columns.rotate_right(1);
            self.current = (self.current + 1) % self.columns.len();
        }
        host.layout_all();
    }

    pub fn focus_down(&mut self, host: &mut dyn LayoutHost<W>) {
        if let Some(w) = self.columns.get_mut(self.current).and_then(WindowColumn::focus_down) {
            host.request_focus(w);
        }
    }

    pub fn focus_up(&mut self, host: &mut dyn LayoutHost<W>) {
        if let Some(w) = self.columns.get_mut(self.current).and_then(WindowColumn::focus_up) {
            host.request_focus(w);
        }
    }
}

impl<W: Handle> Layout<W> for StackLayout<W> {
    fn name(&self) -> &'static str {
        "stack"
    }

    fn add(&mut self, window: W) {
        if self.contains(window) {
            log::warn!("{:?} is already managed", window);
            return;
        }
        let target = match self.columns.len() {
            0 => {
                let column = self.new_column(0);
                self.columns.push(column);
                0
            }
            1 => 0,
            _ if self.config.fair => self.fewest_clients(),
            _ => self.current,
        };
        self.columns[target].add(window);
        self.current = target;
        log::debug!("added {:?} to column {}", window, target);
        self.check_invariants();
    }

    fn remove(&mut self, window: W) -> Option<W> {
        let Some(idx) = self.column_of(window) else {
            return self.current_window();
        };
        let active_before = self.current;
        self.columns[idx].remove(window);
        log::debug!("removed {:?} from column {}", window, idx);

        if !self.columns[idx].is_empty() {
            let next = self
                .columns
                .get(active_before)
                .and_then(WindowColumn::current)
                .or_else(|| self.columns.first().and_then(WindowColumn::current));
            self.current = next.and_then(|w| self.column_of(w)).unwrap_or(0);
            self.check_invariants();
            return next;
        }

        if self.columns.len() == 1 {
            self.columns.clear();
            self.current = 0;
            return None;
        }

        let other = 1 - idx;
        if self.columns[other].is_split() && self.columns[other].len() > 1 {
            if let Some(moved) = self.columns[other].current() {
                self.columns[other].remove(moved);
                self.columns[idx].add(moved);
                self.current = idx;
                log::debug!("{:?} took over the emptied column {}", moved, idx);
                self.check_invariants();
                return Some(moved);
            }
        }

        self.delete_column(idx);
        let next = self.columns.first().and_then(WindowColumn::current);
        self.current = 0;
        self.check_invariants();
        next
    }

    fn focus(&mut self, window: W) {
        if let Some(idx) = self.column_of(window) {
            self.columns[idx].focus(window);
            self.current = idx;
        }
    }

    fn focus_first(&mut self) -> Option<W> {
        let idx = self.columns.iter().position(|c| !c.is_empty())?;
        self.current = idx;
        self.columns[idx].focus_first()
    }

    fn focus_last(&mut self) -> Option<W> {
        let idx = self.columns.iter().rposition(|c| !c.is_empty())?;
        self.current = idx;
        self.columns[idx].focus_last()
    }

    fn focus_next(&mut self, window: W) -> Option<W> {
        let idx = self.column_of(window)?;
        if let Some(next) = self.columns[idx].focus_next(window) {
            self.current = idx;
            return Some(next);
        }
        let offset = self.columns[idx + 1..].iter().position(|c| !c.is_empty())?;
        self.current = idx + 1 + offset;
        self.columns[self.current].focus_first()
    }

    fn focus_previous(&mut self, window: W) -> Option<W> {
        let idx = self.column_of(window)?;
        if let Some(previous) = self.columns[idx].focus_previous(window) {
            self.current = idx;
            return Some(previous);
        }
        let target = self.columns[..idx].iter().rposition(|c| !c.is_empty())?;
        self.current = target;
        self.columns[target].focus_last()
    }

    fn clients(&self) -> Vec<W> {
        self.columns
            .iter()
            .flat_map(|c| c.clients().iter().copied())
            .collect()
    }

    fn configure(&self, window: W, screen: Rect, host: &dyn LayoutHost<W>) -> Placement {
        let Some(col_idx) = self.column_of(window) else {
            return Placement::Hidden;
        };
        let column = &self.columns[col_idx];
        let column_count = self.columns.len() as i64;

        let (border_width, margin) = if self.config.max_single && column_count == 1 {
            (0, 0)
        } else {
            (self.config.border_width, self.config.margin)
        };
        let bw = i64::from(border_width);
        let half_margin = i64::from(margin / 2);

        let column_width = i64::from(screen.width) / column_count;
        let mut x = i64::from(screen.x) + col_idx as i64 * column_width;
        let mut width = column_width - 2 * bw;

        // Both columns carry a margin at the shared edge; reclaim half of each.
        if column_count == 2 {
            width += half_margin;
            if col_idx == 1 {
                x -= half_margin;
            }
        }

        let (y, height) = if column.is_split() {
            let Some(row) = column.index_of(window) else {
                return Placement::Hidden;
            };
            let row = row as i64;
            let rows = column.len() as i64;
            let mut row_height = i64::from(screen.height) / rows;
            let mut y = i64::from(screen.y) + row * row_height;

            if row == 0 {
                if rows > 1 {
                    row_height += half_margin;
                }
            } else if row == rows - 1 {
                row_height += half_margin;
                y -= half_margin;
            } else {
                row_height += i64::from(margin);
                y -= half_margin;
            }
            (y, row_height - 2 * bw)
        } else if column.current() == Some(window) {
            (i64::from(screen.y), i64::from(screen.height) - 2 * bw)
        } else {
            return Placement::Hidden;
        };

        let color = if self.current_window() == Some(window) {
            &self.config.border_focus
        } else {
            &self.config.border_normal
        };

        Placement::Place {
            rect: Rect::clamped(x, y, width, height),
            border_width,
            border_color: host.resolve_color(color),
            margin,
        }
    }

    fn command(&mut self, command: LayoutCommand, host: &mut dyn LayoutHost<W>) {
        log::trace!("layout command {:?}", command);
        match command {
            LayoutCommand::ToggleSplit => self.toggle_split_active_column(host),
            LayoutCommand::FocusDown => self.focus_down(host),
            LayoutCommand::FocusUp => self.focus_up(host),
            LayoutCommand::ShuffleUp => self.shuffle_up_active_column(host),
            LayoutCommand::ShuffleDown => self.shuffle_down_active_column(host),
            LayoutCommand::Rotate => self.rotate_columns(host),
            LayoutCommand::NextColumn => self.focus_next_column(host),
            LayoutCommand::PreviousColumn => self.focus_previous_column(host),
            LayoutCommand::ClientToNext => {
                self.move_client_to_next_column();
                host.layout_all();
            }
            LayoutCommand::ClientToPrevious => {
                self.move_client_to_previous_column();
                host.layout_all();
            }
        }
    }

    fn info(&self, name_of: &dyn Fn(&W) -> String) -> LayoutInfo {
        LayoutInfo {
            name: self.name().to_string(),
            column_count: self.columns.len(),
            stacks: self.columns.iter().map(|c| c.info(name_of)).collect(),
            current_stack: self.current,
            clients: self.clients().iter().map(name_of).collect(),
        }
    }
}
