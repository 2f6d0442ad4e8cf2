use crate::config::LayoutConfig;
use crate::layout::{Layout, StackLayout};
use x11rb::protocol::xproto::Window;

/// A numbered group of windows arranged by its own stack layout.
pub struct Workspace {
    pub name: String,
    pub layout: StackLayout<Window>,
}

impl Workspace {
    pub fn new(name: String, config: &LayoutConfig) -> Self {
        Self {
            name,
            layout: StackLayout::new(config.clone()),
        }
    }

    pub fn contains(&self, window: Window) -> bool {
        self.layout.contains(window)
    }

    pub fn windows(&self) -> Vec<Window> {
        self.layout.clients()
    }
}
