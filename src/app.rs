use std::io::Write;

use anyhow::{Context, Result};
use log::info;

use crate::config::SketchConfig;
use crate::input::Command;
use crate::render_loop::{
    Clock, CountingScheduler, FrameRenderer, FrameScheduler, HeadlessRenderer, ManualClock,
    Playback, RenderLoop, TickOutcome,
};
use crate::resize::{handle_resize, RenderSurface};
use crate::scene::SceneState;
use crate::shader::chunks::{FRAGMENT_INSERTIONS, VERTEX_INSERTIONS};
use crate::shader::{ShaderSource, ShaderStage};

/// Seconds between simulated frames in the summary run.
const SUMMARY_FRAME_STEP: f32 = 1.0 / 60.0;

/// What the host should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    /// Panel values changed; refresh whatever displays them.
    PanelChanged,
    Quit,
}

/// Scene, render loop and the platform collaborators that drive them.
pub struct Sketch<R, C> {
    pub scene: SceneState,
    render_loop: RenderLoop,
    renderer: R,
    clock: C,
}

impl<R, C> Sketch<R, C>
where
    R: FrameRenderer + RenderSurface,
    C: Clock,
{
    pub fn new(scene: SceneState, renderer: R, clock: C) -> Self {
        Self {
            scene,
            render_loop: RenderLoop::new(),
            renderer,
            clock,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn start(&mut self, scheduler: &mut impl FrameScheduler) -> Result<()> {
        self.render_loop.start(scheduler)
    }

    /// Frame callback from the host.
    pub fn frame(&mut self, scheduler: &mut impl FrameScheduler) -> Result<TickOutcome> {
        let elapsed = self.clock.elapsed_secs();
        self.render_loop
            .tick(&mut self.scene, elapsed, &mut self.renderer, scheduler)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        handle_resize(&mut self.scene, &mut self.renderer, width, height)
    }

    pub fn stop(&mut self) {
        self.render_loop.stop();
    }

    pub fn play(&mut self, scheduler: &mut impl FrameScheduler) -> Result<bool> {
        self.render_loop.play(scheduler)
    }

    pub fn handle_command(
        &mut self,
        command: Command,
        scheduler: &mut impl FrameScheduler,
    ) -> Result<CommandOutcome> {
        let outcome = match command {
            Command::TogglePlayback => {
                let state = self.render_loop.toggle(scheduler)?;
                info!("playback {state:?}");
                CommandOutcome::Continue
            }
            Command::SelectNextSlider => {
                self.scene.panel.select_next();
                CommandOutcome::PanelChanged
            }
            Command::Nudge(steps) => {
                self.scene.nudge_selected(steps);
                CommandOutcome::PanelChanged
            }
            Command::Quit => CommandOutcome::Quit,
        };
        Ok(outcome)
    }

    /// Window title: playback state plus the panel line.
    pub fn title(&self) -> String {
        let state = match self.render_loop.state() {
            Playback::Playing => "playing",
            Playback::Stopped => "stopped",
        };
        format!("bloom-sketch [{state}] {}", self.scene.panel.describe())
    }
}

/// One line per stage telling which displacement snippets `source` carries.
pub fn shader_patch_report(source: &ShaderSource) -> Vec<String> {
    let mut lines = Vec::new();
    for (stage, body, insertions) in [
        (ShaderStage::Vertex, &source.vertex_shader, &VERTEX_INSERTIONS[..]),
        (ShaderStage::Fragment, &source.fragment_shader, &FRAGMENT_INSERTIONS[..]),
    ] {
        let unpatched: Vec<&str> = insertions
            .iter()
            .filter(|insertion| !insertion.is_applied(body))
            .map(|insertion| insertion.anchor)
            .collect();
        let patched = insertions.len() - unpatched.len();
        let mut line = format!(
            "Shader patch: {stage} {patched}/{} anchor(s) patched",
            insertions.len()
        );
        if !unpatched.is_empty() {
            line.push_str(&format!(", unpatched {}", unpatched.join(", ")));
        }
        lines.push(line);
    }
    let names: Vec<&str> = source.uniforms.iter().map(|uniform| uniform.name.as_str()).collect();
    lines.push(format!("Shader uniforms: {}", names.join(", ")));
    lines
}

/// Builds the scene without a window, prints its summary and simulates
/// `config.frames` ticks with a headless renderer.
pub fn run_summary(config: &SketchConfig, out: &mut impl Write) -> Result<()> {
    let scene = SceneState::bootstrap(config, config.width, config.height, 1.0)
        .context("failed to bootstrap scene")?;
    let mut sketch = Sketch::new(scene, HeadlessRenderer::new(), ManualClock::new());
    let source = sketch
        .scene
        .material
        .compile()
        .context("failed to compile material")?
        .source
        .clone();

    for line in sketch.scene.summary_lines() {
        writeln!(out, "{line}")?;
    }
    for line in shader_patch_report(&source) {
        writeln!(out, "{line}")?;
    }
    if config.dump_shaders {
        dump_shaders(&source, out)?;
    }

    let mut scheduler = CountingScheduler::default();
    sketch.start(&mut scheduler)?;
    for _ in 0..config.frames {
        sketch.frame(&mut scheduler)?;
        sketch.clock_mut().advance(SUMMARY_FRAME_STEP);
    }
    let times: Vec<String> = sketch
        .renderer()
        .frames
        .iter()
        .map(|time| match time {
            Some(time) => format!("{time:.3}"),
            None => "-".to_string(),
        })
        .collect();
    writeln!(
        out,
        "Rendered {} frame(s); time uniform: [{}]",
        sketch.render_loop().frames(),
        times.join(", ")
    )?;
    Ok(())
}

/// Writes both assembled WGSL modules.
pub fn dump_shaders(source: &ShaderSource, out: &mut impl Write) -> Result<()> {
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        let module = source.module(stage)?;
        writeln!(out, "// ---- {stage} shader ----")?;
        writeln!(out, "{module}")?;
    }
    Ok(())
}
