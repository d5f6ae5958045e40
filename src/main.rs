#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = desktop::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod desktop {
    use std::any::Any;
    use std::env;
    use std::fmt;
    use std::io;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use glam::Vec2;
    use log::info;
    use pollster::block_on;
    use winit::dpi::PhysicalSize;
    use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
    use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
    use winit::keyboard::PhysicalKey;
    use winit::platform::run_on_demand::EventLoopExtRunOnDemand;
    use winit::window::{Window, WindowBuilder};

    use bloom_sketch::app::{dump_shaders, run_summary, CommandOutcome, Sketch};
    use bloom_sketch::config::{SketchConfig, USAGE};
    use bloom_sketch::input::{command_for_key, map_winit_button, map_winit_key};
    use bloom_sketch::render::Renderer;
    use bloom_sketch::render_loop::{FrameScheduler, SystemClock};
    use bloom_sketch::scene::SceneState;

    pub fn run() -> Result<()> {
        let config = SketchConfig::from_args(env::args().skip(1))?;
        if config.help {
            println!("{USAGE}");
            return Ok(());
        }

        if config.summary_only {
            return run_headless(&config);
        }
        match run_interactive(&config) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&config)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn run_headless(config: &SketchConfig) -> Result<()> {
        let stdout = io::stdout();
        run_summary(config, &mut stdout.lock())
    }

    fn run_interactive(config: &SketchConfig) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::<()>::new));
        panic::set_hook(default_hook);
        let mut event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("bloom-sketch")
                .with_inner_size(PhysicalSize::new(config.width, config.height))
                .build(&event_loop)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        // The window reports physical pixels, so the viewport uses a ratio of 1.
        let size = window.inner_size();
        let mut scene = SceneState::bootstrap(config, size.width.max(1), size.height.max(1), 1.0)
            .context("failed to bootstrap scene")?;
        let renderer = block_on(Renderer::new(
            Arc::clone(&window),
            size.width.max(1),
            size.height.max(1),
            &mut scene,
        ))?;
        if config.dump_shaders {
            if let Some(shader) = scene.material.shader() {
                dump_shaders(&shader.source, &mut io::stdout().lock())?;
            }
        }

        let mut app = AppState {
            sketch: Sketch::new(scene, renderer, SystemClock::new()),
            scheduler: RedrawScheduler {
                window: Arc::clone(&window),
            },
            window,
            cursor: Vec2::ZERO,
            last_error: None,
        };
        app.sketch.start(&mut app.scheduler)?;
        app.window.set_title(&app.sketch.title());

        event_loop
            .run_on_demand(|event, elwt| {
                elwt.set_control_flow(ControlFlow::Wait);
                if let Err(err) = app.process_event(event, elwt) {
                    app.last_error = Some(err);
                    elwt.exit();
                }
            })
            .context("event loop failed")?;

        println!("Final panel: {}", app.sketch.scene.panel.describe());
        println!("Rendered {} frame(s)", app.sketch.render_loop().frames());
        if let Some(err) = app.last_error {
            return Err(err);
        }
        Ok(())
    }

    struct RedrawScheduler {
        window: Arc<Window>,
    }

    impl FrameScheduler for RedrawScheduler {
        fn request_frame(&mut self) -> Result<()> {
            self.window.request_redraw();
            Ok(())
        }
    }

    struct AppState {
        sketch: Sketch<Renderer, SystemClock>,
        scheduler: RedrawScheduler,
        window: Arc<Window>,
        cursor: Vec2,
        last_error: Option<anyhow::Error>,
    }

    impl AppState {
        fn process_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) -> Result<()> {
            let Event::WindowEvent { event, window_id } = event else {
                return Ok(());
            };
            if window_id != self.window.id() {
                return Ok(());
            }
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(size) => {
                    self.sketch.resize(size.width, size.height);
                }
                WindowEvent::RedrawRequested => {
                    self.sketch.frame(&mut self.scheduler)?;
                }
                WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event, elwt)?,
                WindowEvent::MouseInput { state, button, .. } => match state {
                    ElementState::Pressed => self
                        .sketch
                        .scene
                        .pointer_down(map_winit_button(button), self.cursor),
                    ElementState::Released => self.sketch.scene.pointer_up(),
                },
                WindowEvent::CursorMoved { position, .. } => {
                    self.cursor = Vec2::new(position.x as f32, position.y as f32);
                    self.sketch.scene.pointer_move(self.cursor);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let delta_y = match delta {
                        MouseScrollDelta::LineDelta(_, y) => -y,
                        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                    };
                    self.sketch.scene.wheel(delta_y);
                }
                _ => {}
            }
            Ok(())
        }

        fn handle_keyboard(&mut self, event: &KeyEvent, elwt: &EventLoopWindowTarget<()>) -> Result<()> {
            if event.state != ElementState::Pressed {
                return Ok(());
            }
            let PhysicalKey::Code(code) = event.physical_key else {
                return Ok(());
            };
            let Some(key) = map_winit_key(code) else {
                return Ok(());
            };
            match self
                .sketch
                .handle_command(command_for_key(key), &mut self.scheduler)?
            {
                CommandOutcome::Quit => elwt.exit(),
                CommandOutcome::PanelChanged | CommandOutcome::Continue => {
                    let title = self.sketch.title();
                    info!("{title}");
                    self.window.set_title(&title);
                }
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }
}
