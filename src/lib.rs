//! An OpenGL 3D model viewer and rendering sandbox.
//!
//! The crate is split into a thin GPU abstraction layer ([`abs`]), CPU-side
//! model data and OBJ loading ([`model`]), scene state ([`scene`]), an
//! immediate-mode GUI overlay ([`gui`]) and the host frame loop
//! ([`viewer`]).

pub mod abs;
pub mod camera;
pub mod config;
pub mod gui;
pub mod input;
pub mod model;
pub mod scene;
pub mod viewer;

/// Initializes logging to stdout. The level can be overridden with the
/// `MESHVIEW_LOG` environment variable (`error`..`trace`).
pub fn init_logger() -> Result<(), fern::InitError> {
    let level = std::env::var("MESHVIEW_LOG")
        .ok()
        .and_then(|s| s.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
