mod column;
mod config;
mod layout;
mod state;
mod workspace;

use config::Config;
use layout::LayoutCommand;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, LevelFilter, TermLogger, TerminalMode,
    WriteLogger,
};
use state::WindowManager;
use std::collections::HashMap;
use std::fs::File;
use std::process::Command;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{self, ConnectionExt, ModMask};

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Spawn(String),
    KillFocused,
    Quit,
    FocusNext,
    FocusPrev,
    Info,
    Layout(LayoutCommand),
    Workspace(usize),
    MoveToWorkspace(usize),
}

fn parse_action(cmd: &str) -> Option<Action> {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    match parts[0] {
        "Spawn" => Some(Action::Spawn(parts[1..].join(" "))),
        "KillFocused" => Some(Action::KillFocused),
        "Quit" => Some(Action::Quit),
        "FocusNext" => Some(Action::FocusNext),
        "FocusPrev" => Some(Action::FocusPrev),
        "Info" => Some(Action::Info),
        "Workspace" => parts
            .get(1)
            .and_then(|s| s.parse().ok())
            .filter(|&i| i >= 1)
            .map(Action::Workspace),
        "MoveToWorkspace" => parts
            .get(1)
            .and_then(|s| s.parse().ok())
            .filter(|&i| i >= 1)
            .map(Action::MoveToWorkspace),
        name => match LayoutCommand::from_name(name) {
            Some(command) => Some(Action::Layout(command)),
            None => {
                log::warn!("Unknown action: {}", cmd);
                None
            }
        },
    }
}

fn keysym_from_name(name: &str) -> u32 {
    match name {
        "Return" => 0xff0d,
        "Space" => 0x0020,
        "BackSpace" => 0xff08,
        "Tab" => 0xff09,
        "Escape" => 0xff1b,
        "minus" => 0x002d,
        "backslash" => 0x005c,
        // Simple ascii mapping
        c => match c.chars().next() {
            Some(ch) if c.len() == 1 && ch.is_ascii_graphic() => u32::from(ch),
            _ => 0, // Unknown
        },
    }
}

fn parse_keybind(bind: &str, mod_key_mask: ModMask) -> (u32, u16) {
    let mut mask = 0u16;
    let mut keysym = 0u32;

    for part in bind.split('+') {
        match part {
            "Mod" => mask |= u16::from(mod_key_mask),
            "Shift" => mask |= u16::from(ModMask::SHIFT),
            "Control" => mask |= u16::from(ModMask::CONTROL),
            "Alt" => mask |= u16::from(ModMask::M1),
            key => keysym = keysym_from_name(key),
        }
    }
    (keysym, mask)
}

fn detect_mod_key() -> ModMask {
    if std::env::var("STACKWM_MOD").unwrap_or_default().to_lowercase() == "alt" {
        ModMask::M1
    } else {
        ModMask::M4 // Super
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            LogConfig::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            LevelFilter::Debug,
            LogConfig::default(),
            File::create("/tmp/stackwm.log")?,
        ),
    ])?;

    let config = Config::load();

    let (conn, screen_num) = x11rb::connect(None)?;
    let screen = &conn.setup().roots[screen_num];
    let mod_mask = detect_mod_key();

    log::info!(
        "Connected. Screen: {}x{}",
        screen.width_in_pixels,
        screen.height_in_pixels
    );

    let change = xproto::ChangeWindowAttributesAux::new().event_mask(
        xproto::EventMask::SUBSTRUCTURE_REDIRECT | xproto::EventMask::SUBSTRUCTURE_NOTIFY,
    );
    conn.change_window_attributes(screen.root, &change)?;

    let mut key_actions: HashMap<(u16, u8), Action> = HashMap::new();

    let mut needed_keysyms = Vec::new();
    let mut raw_bindings = Vec::new();

    for (key_str, action_str) in &config.bindings {
        if let Some(action) = parse_action(action_str) {
            let (sym, mask) = parse_keybind(key_str, mod_mask);
            if sym != 0 {
                needed_keysyms.push(sym);
                raw_bindings.push((sym, mask, action));
            }
        }
    }

    let min_keycode = conn.setup().min_keycode;
    let max_keycode = conn.setup().max_keycode;
    let mapping = conn
        .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
        .reply()?;
    let keysyms_per_keycode = mapping.keysyms_per_keycode as usize;

    let mut sym_to_code: HashMap<u32, u8> = HashMap::new();
    for (i, code) in (min_keycode..=max_keycode).enumerate() {
        let start = i * keysyms_per_keycode;
        for &sym in &mapping.keysyms[start..start + keysyms_per_keycode] {
            if needed_keysyms.contains(&sym) && sym != 0 {
                sym_to_code.entry(sym).or_insert(code);
            }
        }
    }

    let ignored_modifiers = [
        0,
        u16::from(ModMask::M2),
        u16::from(ModMask::LOCK),
        u16::from(ModMask::M2 | ModMask::LOCK),
    ];

    for (sym, mask, action) in raw_bindings {
        if let Some(&code) = sym_to_code.get(&sym) {
            key_actions.insert((mask, code), action);

            for ignored in ignored_modifiers {
                conn.grab_key(
                    true,
                    screen.root,
                    ModMask::from(mask | ignored),
                    code,
                    xproto::GrabMode::ASYNC,
                    xproto::GrabMode::ASYNC,
                )
                .ok();
            }
        } else {
            log::warn!("Could not find keycode for keysym: {}", sym);
        }
    }
    conn.flush()?;
    log::info!("STACKWM STARTED with {} keybinds", key_actions.len());

    let mut wm_state = WindowManager::new(screen, &config);

    loop {
        conn.flush()?;
        let event = conn.wait_for_event()?;

        match event {
            Event::KeyPress(evt) => {
                let mask = evt.state;
                // Clean mask of Lock/NumLock for lookup
                let clean_mask =
                    u16::from(mask) & !(u16::from(ModMask::M2) | u16::from(ModMask::LOCK));

                if let Some(action) = key_actions.get(&(clean_mask, evt.detail)) {
                    log::info!("Executing: {:?}", action);
                    match action {
                        Action::Spawn(cmd) => spawn(cmd),
                        Action::KillFocused => wm_state.kill_focused_window(&conn)?,
                        Action::Quit => {
                            wm_state.kill_all_windows(&conn)?;
                            break;
                        }
                        Action::FocusNext => {
                            wm_state.cycle_focus(&conn, state::FocusDirection::Next)?
                        }
                        Action::FocusPrev => {
                            wm_state.cycle_focus(&conn, state::FocusDirection::Prev)?
                        }
                        Action::Info => wm_state.log_info()?,
                        Action::Layout(command) => wm_state.layout_command(&conn, *command)?,
                        Action::Workspace(i) => wm_state.switch_workspace(&conn, i - 1)?, // Config is 1-based, internal is 0-based
                        Action::MoveToWorkspace(i) => {
                            wm_state.move_window_to_workspace(&conn, i - 1)?
                        }
                    }
                }
            }
            Event::MapRequest(evt) => wm_state.handle_map_request(&conn, evt.window)?,
            Event::DestroyNotify(evt) => wm_state.handle_destroy_notify(&conn, evt.window)?,
            Event::EnterNotify(evt) => wm_state.handle_enter_notify(&conn, evt)?,
            _ => {}
        }
    }
    Ok(())
}

fn spawn(command: &str) {
    match Command::new("sh").arg("-c").arg(command).spawn() {
        Ok(_) => log::info!("Spawned {}", command),
        Err(e) => log::error!("Failed to spawn {}: {}", command, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_host_and_layout_actions() {
        assert_eq!(
            parse_action("Spawn xterm -e top"),
            Some(Action::Spawn("xterm -e top".to_string()))
        );
        assert_eq!(parse_action("Workspace 3"), Some(Action::Workspace(3)));
        assert_eq!(parse_action("Workspace 0"), None);
        assert_eq!(parse_action("MoveToWorkspace x"), None);
        assert_eq!(
            parse_action("ClientToPrevious"),
            Some(Action::Layout(LayoutCommand::ClientToPrevious))
        );
        assert_eq!(parse_action("Info"), Some(Action::Info));
        assert_eq!(parse_action("Dance"), None);
        assert_eq!(parse_action("   "), None);
    }

    #[test]
    fn every_default_binding_parses() {
        let config = Config::default();
        for (key, action) in &config.bindings {
            assert!(parse_action(action).is_some(), "{action} bound to {key}");
            let (sym, _) = parse_keybind(key, ModMask::M4);
            assert_ne!(sym, 0, "{key} has no keysym");
        }
    }

    #[test]
    fn keybinds_combine_modifiers() {
        let (sym, mask) = parse_keybind("Mod+Shift+Return", ModMask::M4);
        assert_eq!(sym, 0xff0d);
        assert_eq!(mask, u16::from(ModMask::M4) | u16::from(ModMask::SHIFT));
        assert_eq!(keysym_from_name("l"), u32::from('l'));
        assert_eq!(keysym_from_name("Hyper"), 0);
    }
}
