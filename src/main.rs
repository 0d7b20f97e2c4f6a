mod config;
mod dispatch;
mod engine;
mod graph;
mod mapping;
mod midi;
mod output;
mod pad;
mod pointer;

use clap::Parser;
use macroquad::prelude::*;
use tokio::runtime::Runtime;

use config::{Settings, WINDOW_TITLE};
use dispatch::{InputDispatch, InputEvent};
use engine::SoundEngine;
use midi::spawn_midi_listener;
use output::DeviceContext;
use pad::{BACKGROUND, draw_header, geometry_of, pad_rect};
use pointer::{PointerFrame, PointerTracker};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let settings = Settings::parse();
    let runtime = Runtime::new()?;
    log::info!("starting {WINDOW_TITLE} {}", env!("CARGO_PKG_VERSION"));
    macroquad::Window::from_config(settings.window_conf(), run(settings, runtime));
    Ok(())
}

async fn run(settings: Settings, runtime: Runtime) {
    // Touches are dispatched on their own; no synthetic mouse events.
    simulate_mouse_with_touch(false);

    let engine = SoundEngine::new(Box::new(DeviceContext::open));
    let mut dispatch = InputDispatch::new(engine);
    let midi = if settings.no_midi {
        None
    } else {
        Some(spawn_midi_listener(&runtime, &settings.midi_client))
    };
    let mut pointer = PointerTracker::default();

    loop {
        if quit_requested() {
            break;
        }

        let pad = pad_rect(screen_width(), screen_height());
        let geometry = geometry_of(pad);
        if let Some(link) = &midi {
            if let Some(access) = link.poll_access() {
                dispatch.on_midi_access(access);
            }
            for event in link.poll_events() {
                dispatch.handle(InputEvent::Midi(event), geometry);
            }
        }
        for event in pointer.collect(pad, PointerFrame::poll()) {
            dispatch.handle(event, geometry);
        }

        clear_background(BACKGROUND);
        draw_header(WINDOW_TITLE);
        dispatch.view().draw(pad);

        next_frame().await;
    }

    log::info!("shutting down");
    drop(midi);
    runtime.shutdown_background();
}

fn quit_requested() -> bool {
    let modifier = is_key_down(KeyCode::LeftControl)
        || is_key_down(KeyCode::RightControl)
        || is_key_down(KeyCode::LeftSuper)
        || is_key_down(KeyCode::RightSuper);
    is_key_pressed(KeyCode::Escape) || (modifier && is_key_pressed(KeyCode::Q))
}
