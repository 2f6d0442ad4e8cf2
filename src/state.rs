use crate::config::{Color, Config};
use crate::layout::{Layout, LayoutCommand, LayoutHost, Placement, Rect};
use crate::workspace::Workspace;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt, EnterNotifyEvent, EventMask,
    InputFocus, Screen, Window,
};

pub enum FocusDirection {
    Next,
    Prev,
}

/// Collects what the layout asks of us while it is mutably borrowed.
#[derive(Default)]
struct PendingRequests {
    focus: Option<Window>,
    relayout: bool,
}

impl LayoutHost<Window> for PendingRequests {
    fn request_focus(&mut self, window: Window) {
        self.focus = Some(window);
    }

    fn layout_all(&mut self) {
        self.relayout = true;
    }

    fn resolve_color(&self, color: &Color) -> u32 {
        color.pixel()
    }
}

/// What a map request means for the window that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapTarget {
    /// Unknown window, adopt it into the active workspace.
    Adopt,
    /// Already tiled on the active workspace.
    Show,
    /// Owned by another workspace; it stays unmapped until that one is shown.
    Elsewhere(usize),
}

pub struct WindowManager {
    workspaces: Vec<Workspace>,
    active: usize,
    focused_window: Option<Window>,
    screen: Rect,
}

impl WindowManager {
    pub fn new(screen: &Screen, config: &Config) -> Self {
        let area = Rect::new(0, 0, screen.width_in_pixels.into(), screen.height_in_pixels.into());
        Self::with_area(area, config)
    }

    fn with_area(screen: Rect, config: &Config) -> Self {
        let workspaces = (1..=9)
            .map(|i| Workspace::new(i.to_string(), &config.layout))
            .collect();
        Self {
            workspaces,
            active: 0,
            focused_window: None,
            screen,
        }
    }

    fn workspace(&self) -> &Workspace {
        &self.workspaces[self.active]
    }

    fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.active]
    }

    fn owner_of(&self, window: Window) -> Option<usize> {
        self.workspaces.iter().position(|ws| ws.contains(window))
    }

    fn map_target(&self, window: Window) -> MapTarget {
        match self.owner_of(window) {
            None => MapTarget::Adopt,
            Some(idx) if idx == self.active => MapTarget::Show,
            Some(idx) => MapTarget::Elsewhere(idx),
        }
    }

    pub fn handle_map_request<C: Connection>(
        &mut self,
        conn: &C,
        window: Window,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match self.map_target(window) {
            MapTarget::Adopt => {
                let attrs = ChangeWindowAttributesAux::new().event_mask(EventMask::ENTER_WINDOW);
                conn.change_window_attributes(window, &attrs)?;
                self.workspace_mut().layout.add(window);
            }
            MapTarget::Show => {}
            MapTarget::Elsewhere(idx) => {
                log::debug!(
                    "{:#x} belongs to workspace {}, keeping it hidden",
                    window,
                    self.workspaces[idx].name
                );
                return Ok(());
            }
        }

        conn.map_window(window)?;

        // Focus the new window
        self.set_focus(conn, window)?;
        Ok(())
    }

    pub fn handle_destroy_notify<C: Connection>(
        &mut self,
        conn: &C,
        window: Window,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Some(idx) = self.owner_of(window) else {
            return Ok(());
        };

        let next = self.workspaces[idx].layout.remove(window);
        if idx != self.active {
            return Ok(());
        }

        match next {
            Some(win) => self.set_focus(conn, win)?,
            None => {
                self.focused_window = None;
                self.refresh_layout(conn)?;
            }
        }
        Ok(())
    }

    pub fn handle_enter_notify<C: Connection>(
        &mut self,
        conn: &C,
        evt: EnterNotifyEvent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.focused_window != Some(evt.event) && self.workspace().contains(evt.event) {
            self.set_focus(conn, evt.event)?;
        }
        Ok(())
    }

    /// Walks focus through every window of the workspace, column by column.
    pub fn cycle_focus<C: Connection>(
        &mut self,
        conn: &C,
        dir: FocusDirection,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let layout = &mut self.workspaces[self.active].layout;
        let next = match (self.focused_window, dir) {
            (Some(w), FocusDirection::Next) => layout.focus_next(w).or_else(|| layout.focus_first()),
            (Some(w), FocusDirection::Prev) => {
                layout.focus_previous(w).or_else(|| layout.focus_last())
            }
            (None, _) => layout.focus_first(),
        };

        if let Some(win) = next {
            self.set_focus(conn, win)?;
        }
        Ok(())
    }

    pub fn layout_command<C: Connection>(
        &mut self,
        conn: &C,
        command: LayoutCommand,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut pending = PendingRequests::default();
        self.workspace_mut().layout.command(command, &mut pending);

        match pending.focus {
            Some(win) => self.set_focus(conn, win)?,
            None if pending.relayout => self.refresh_layout(conn)?,
            None => {}
        }
        Ok(())
    }

    pub fn switch_workspace<C: Connection>(
        &mut self,
        conn: &C,
        idx: usize,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if idx >= self.workspaces.len() || idx == self.active {
            return Ok(());
        }

        for window in self.workspace().windows() {
            conn.unmap_window(window)?;
        }
        self.active = idx;
        log::info!("Switched to workspace {}", self.workspace().name);

        match self.workspace().layout.current_window() {
            Some(win) => self.set_focus(conn, win)?,
            None => {
                self.focused_window = None;
                self.refresh_layout(conn)?;
            }
        }
        Ok(())
    }

    pub fn move_window_to_workspace<C: Connection>(
        &mut self,
        conn: &C,
        idx: usize,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Some(window) = self.focused_window else {
            return Ok(());
        };
        if idx >= self.workspaces.len() || idx == self.active {
            return Ok(());
        }

        let next = self.workspace_mut().layout.remove(window);
        self.workspaces[idx].layout.add(window);
        conn.unmap_window(window)?;

        match next {
            Some(win) => self.set_focus(conn, win)?,
            None => {
                self.focused_window = None;
                self.refresh_layout(conn)?;
            }
        }
        Ok(())
    }

    pub fn kill_focused_window<C: Connection>(
        &self,
        conn: &C,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // We only try to kill if we actually have a focused window
        if let Some(window) = self.focused_window {
            conn.kill_client(window)?;
        }
        Ok(())
    }

    pub fn kill_all_windows<C: Connection>(
        &self,
        conn: &C,
    ) -> Result<(), Box<dyn std::error::Error>> {
        for window in self.workspaces.iter().flat_map(Workspace::windows) {
            conn.kill_client(window)?;
        }
        Ok(())
    }

    /// Logs the active workspace's layout snapshot as JSON.
    pub fn log_info(&self) -> Result<(), Box<dyn std::error::Error>> {
        let info = self.workspace().layout.info(&|w| format!("{:#x}", w));
        log::info!(
            "Workspace {}: {}",
            self.workspace().name,
            serde_json::to_string(&info)?
        );
        Ok(())
    }

    fn set_focus<C: Connection>(
        &mut self,
        conn: &C,
        window: Window,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.focused_window = Some(window);
        self.workspace_mut().layout.focus(window);
        conn.set_input_focus(InputFocus::POINTER_ROOT, window, 0u32)?;
        // Border colours follow focus.
        self.refresh_layout(conn)
    }

    fn refresh_layout<C: Connection>(&self, conn: &C) -> Result<(), Box<dyn std::error::Error>> {
        let host = PendingRequests::default();
        for (window, placement) in self.workspace().layout.arrange(self.screen, &host) {
            apply_placement(conn, window, placement)?;
        }
        Ok(())
    }
}

fn apply_placement<C: Connection>(
    conn: &C,
    window: Window,
    placement: Placement,
) -> Result<(), Box<dyn std::error::Error>> {
    match placement {
        Placement::Hidden => {
            conn.unmap_window(window)?;
        }
        Placement::Place {
            rect,
            border_width,
            border_color,
            margin,
        } => {
            let inner = inset(rect, margin);
            let changes = ConfigureWindowAux::new()
                .x(inner.x)
                .y(inner.y)
                .width(inner.width)
                .height(inner.height)
                .border_width(border_width);
            conn.configure_window(window, &changes)?;

            let attrs = ChangeWindowAttributesAux::new().border_pixel(border_color);
            conn.change_window_attributes(window, &attrs)?;
            conn.map_window(window)?;
        }
    }
    Ok(())
}

/// The window's own geometry once `margin` is taken off every side.
fn inset(rect: Rect, margin: u32) -> Rect {
    let shrink = margin.saturating_mul(2);
    let offset = i32::try_from(margin).unwrap_or(i32::MAX);
    Rect::new(
        rect.x.saturating_add(offset),
        rect.y.saturating_add(offset),
        rect.width.saturating_sub(shrink).max(1),
        rect.height.saturating_sub(shrink).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manager() -> WindowManager {
        WindowManager::with_area(Rect::new(0, 0, 800, 600), &Config::default())
    }

    #[test]
    fn map_request_target_follows_workspace_ownership() {
        let mut wm = manager();
        wm.workspaces[0].layout.add(0x400001);
        wm.workspaces[2].layout.add(0x400002);

        assert_eq!(wm.map_target(0x400001), MapTarget::Show);
        assert_eq!(wm.map_target(0x400002), MapTarget::Elsewhere(2));
        assert_eq!(wm.map_target(0x400003), MapTarget::Adopt);

        wm.active = 2;
        assert_eq!(wm.map_target(0x400001), MapTarget::Elsewhere(0));
        assert_eq!(wm.map_target(0x400002), MapTarget::Show);
    }

    #[test]
    fn windows_are_owned_by_one_workspace() {
        let mut wm = manager();
        wm.workspaces[4].layout.add(0x400005);
        assert_eq!(wm.owner_of(0x400005), Some(4));
        assert_eq!(wm.owner_of(0x400006), None);
    }

    #[test]
    fn margin_is_taken_off_every_side() {
        assert_eq!(inset(Rect::new(10, 20, 400, 300), 8), Rect::new(18, 28, 384, 284));
        assert_eq!(inset(Rect::new(0, 0, 400, 300), 0), Rect::new(0, 0, 400, 300));
    }

    #[test]
    fn oversized_margin_saturates() {
        assert_eq!(
            inset(Rect::new(0, 0, 800, 600), u32::MAX),
            Rect::new(i32::MAX, i32::MAX, 1, 1)
        );
    }
}
