// tray.rs — System tray menu and global shortcuts.
// Both only emit a `trigger` event; the webview runs the matching command so
// results always land in the same banners and players as a button press.

use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::TrayIconBuilder,
    AppHandle, Emitter, Manager,
};
use tauri_plugin_global_shortcut::{Code, Modifiers, Shortcut, ShortcutState};

use crate::coordinator::Trigger;

/// Event name the webview listens on. Payload is the serialized [`Trigger`].
pub const TRIGGER_EVENT: &str = "trigger";

/// Ctrl+Shift+D / E / S for describe, extract and speak.
pub fn trigger_shortcuts() -> [(Shortcut, Trigger); 3] {
    let mods = Some(Modifiers::CONTROL | Modifiers::SHIFT);
    [
        (Shortcut::new(mods, Code::KeyD), Trigger::Describe),
        (Shortcut::new(mods, Code::KeyE), Trigger::Extract),
        (Shortcut::new(mods, Code::KeyS), Trigger::Speak),
    ]
}

/// Register each shortcut, skipping any another application already holds.
/// Returns how many were registered.
pub fn register_shortcuts<E: std::fmt::Display>(
    shortcuts: impl IntoIterator<Item = (Shortcut, Trigger)>,
    mut register: impl FnMut(Shortcut) -> Result<(), E>,
) -> usize {
    let mut registered = 0;
    for (shortcut, trigger) in shortcuts {
        log::info!("Registering global shortcut {:?} for {}", shortcut, trigger);
        match register(shortcut) {
            Ok(()) => registered += 1,
            // The button and tray entry still work.
            Err(e) => log::warn!("Global shortcut {:?} unavailable for {}: {}", shortcut, trigger, e),
        }
    }
    registered
}

fn emit_trigger(app: &AppHandle, trigger: Trigger, source: &str) {
    log::info!("{}: {} requested", source, trigger);
    if let Err(e) = app.emit(TRIGGER_EVENT, trigger) {
        log::error!("Failed to emit {} event: {}", TRIGGER_EVENT, e);
    }
}

// ─── Tray setup ──────────────────────────────────────────────────────

/// Call this from `App::setup` to create the system-tray icon and menu.
pub fn setup_tray(app: &tauri::App) -> Result<(), Box<dyn std::error::Error>> {
    let handle = app.handle();

    let describe_item = MenuItem::with_id(handle, "describe", "Describe Scene", true, None::<&str>)?;
    let extract_item = MenuItem::with_id(handle, "extract", "Extract Text", true, None::<&str>)?;
    let speak_item = MenuItem::with_id(handle, "speak", "Text-to-Speech", true, None::<&str>)?;
    let separator = PredefinedMenuItem::separator(handle)?;
    let show_item = MenuItem::with_id(handle, "show_window", "Show VisionAssist", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(handle, "quit", "Quit", true, None::<&str>)?;

    let menu = Menu::with_items(
        handle,
        &[&describe_item, &extract_item, &speak_item, &separator, &show_item, &quit_item],
    )?;

    TrayIconBuilder::new()
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_menu_event(|app_handle, event| match event.id().as_ref() {
            "describe" => emit_trigger(app_handle, Trigger::Describe, "Tray"),
            "extract" => emit_trigger(app_handle, Trigger::Extract, "Tray"),
            "speak" => emit_trigger(app_handle, Trigger::Speak, "Tray"),
            "show_window" => {
                if let Some(win) = app_handle.get_webview_window("main") {
                    let _ = win.show();
                    let _ = win.set_focus();
                }
            }
            "quit" => {
                log::info!("Tray: quit requested");
                app_handle.exit(0);
            }
            _ => {}
        })
        .build(app)?;

    log::info!("System tray created");
    Ok(())
}

// ─── Global shortcut handler ─────────────────────────────────────────

/// Called by the global-shortcut plugin when any registered shortcut fires.
pub fn on_shortcut_event(
    app: &AppHandle,
    shortcut: &Shortcut,
    event: tauri_plugin_global_shortcut::ShortcutEvent,
) {
    // key-down only
    if event.state() != ShortcutState::Pressed {
        return;
    }

    if let Some((_, trigger)) = trigger_shortcuts().into_iter().find(|(s, _)| s == shortcut) {
        emit_trigger(app, trigger, "Shortcut");
    }
}
