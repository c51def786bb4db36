//! Physically based rendering viewer
//!
//! Usage: `pbr_viewer [config.toml|config.ron]`
//!
//! Drag with the left mouse button to orbit, scroll to zoom, Escape to quit.

use std::process::ExitCode;

use glfw::{Action, Key, MouseButton, WindowEvent};
use pbr_engine::assets::FileSystemAssets;
use pbr_engine::config::{Config, ViewerConfig};
use pbr_engine::foundation::logging;
use pbr_engine::render::opengl::GlWindow;
use pbr_engine::render::Renderer;
use pbr_viewer::{InputEvent, InputResponse, OrbitController, ViewerError};

fn load_config(path: Option<&str>) -> Result<ViewerConfig, ViewerError> {
    match path {
        Some(path) => Ok(ViewerConfig::load_from_file(path)?),
        None => Ok(ViewerConfig::default()),
    }
}

fn translate(event: &WindowEvent) -> Option<InputEvent> {
    match *event {
        WindowEvent::CursorPos(x, y) => Some(InputEvent::CursorMoved { x, y }),
        WindowEvent::MouseButton(MouseButton::Button1, action, _) => {
            Some(InputEvent::LeftButton(action != Action::Release))
        }
        WindowEvent::Scroll(_, offset) => Some(InputEvent::Scrolled(offset)),
        WindowEvent::Key(Key::Escape, _, Action::Press, _) => Some(InputEvent::Escape),
        _ => None,
    }
}

fn run(config: &ViewerConfig) -> Result<(), ViewerError> {
    let mut window = GlWindow::new(&config.window)?;
    let device = window.create_device()?;

    let mut renderer = Renderer::initialize(
        device,
        config.window.width,
        config.window.height,
        config.window.samples,
    )?;

    let assets = FileSystemAssets::new(&config.assets.root);
    renderer.setup(&assets, &config.assets)?;

    let mut orbit = OrbitController::new(&config.view);
    while !window.should_close() {
        window.poll_events();
        let events: Vec<InputEvent> = window
            .flush_events()
            .filter_map(|(_, event)| translate(&event))
            .collect();
        for event in events {
            if orbit.handle(event) == InputResponse::Exit {
                window.set_should_close(true);
            }
        }

        renderer.render(&mut window, &orbit.view_settings());
    }

    // GL objects must go before the context does
    renderer.shutdown();
    drop(renderer);
    Ok(())
}

fn main() -> ExitCode {
    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref());

    let level = config
        .as_ref()
        .map_or("info", |config| config.log_level.as_str());
    logging::init(level);

    let result = config.and_then(|config| {
        log::info!("Starting PBR viewer");
        run(&config)
    });

    match result {
        Ok(()) => {
            log::info!("PBR viewer shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
