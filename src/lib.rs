pub mod adapters;
pub mod coordinator;
pub mod extraction;
pub mod session;
pub mod settings;
pub mod upload;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod tray;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;
    use tauri_plugin_global_shortcut::GlobalShortcutExt;

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(tray::on_shortcut_event)
                .build(),
        )
        .invoke_handler(tauri::generate_handler![
            commands::upload_image,
            commands::describe_scene,
            commands::extract_text,
            commands::text_to_speech,
            commands::reset_session,
            commands::load_settings,
            commands::save_settings,
        ])
        .setup(|app| {
            let settings = settings::Settings::load_from_app(app.handle()).unwrap_or_else(|e| {
                log::warn!("Could not load settings, using defaults: {}", e);
                settings::Settings::default().with_env_overrides()
            });
            app.manage(commands::AppState::new(settings));

            tray::setup_tray(app)?;

            let shortcuts = tray::trigger_shortcuts();
            let total = shortcuts.len();
            let registered = tray::register_shortcuts(shortcuts, |shortcut| {
                app.global_shortcut().register(shortcut)
            });
            log::info!("{} of {} global shortcuts registered", registered, total);

            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
