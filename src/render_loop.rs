//! Frame lifecycle of the sketch.
//!
//! The loop is either playing or stopped. A playing loop keeps exactly one
//! frame request outstanding: each tick clears the pending request, draws,
//! then asks the scheduler for the next frame.

use anyhow::Result;
use log::{debug, trace};

use crate::scene::SceneState;

/// Name of the material uniform that receives the elapsed time.
pub const TIME_UNIFORM: &str = "time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Stopped,
}

/// Monotonic source of elapsed seconds since the sketch started.
pub trait Clock {
    fn elapsed_secs(&self) -> f32;
}

/// Asks the host to call back for one more frame.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> Result<()>;
}

/// Draws one frame of the scene through the post-processing chain.
pub trait FrameRenderer {
    fn render_frame(&mut self, scene: &SceneState) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    Skipped,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: Playback,
    frame_pending: bool,
    frames: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: Playback::Playing,
            frame_pending: false,
            frames: 0,
        }
    }

    pub fn state(&self) -> Playback {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == Playback::Playing
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// First kick after bootstrap.
    pub fn start(&mut self, scheduler: &mut impl FrameScheduler) -> Result<()> {
        if self.is_playing() {
            self.schedule(scheduler)?;
        }
        Ok(())
    }

    /// Stops scheduling. A frame already requested still arrives but is
    /// skipped.
    pub fn stop(&mut self) {
        if self.state == Playback::Playing {
            debug!("render loop stopped after {} frame(s)", self.frames);
        }
        self.state = Playback::Stopped;
    }

    /// Resumes a stopped loop. Returns whether a new frame was requested.
    pub fn play(&mut self, scheduler: &mut impl FrameScheduler) -> Result<bool> {
        if self.state == Playback::Playing {
            return Ok(false);
        }
        self.state = Playback::Playing;
        debug!("render loop resumed");
        self.schedule(scheduler)
    }

    /// Toggles between playing and stopped.
    pub fn toggle(&mut self, scheduler: &mut impl FrameScheduler) -> Result<Playback> {
        match self.state {
            Playback::Playing => self.stop(),
            Playback::Stopped => {
                self.play(scheduler)?;
            }
        }
        Ok(self.state)
    }

    /// Frame callback. Writes `elapsed` into the time uniform, draws, then
    /// requests the next frame. A renderer error stops the loop.
    pub fn tick(
        &mut self,
        scene: &mut SceneState,
        elapsed: f32,
        renderer: &mut impl FrameRenderer,
        scheduler: &mut impl FrameScheduler,
    ) -> Result<TickOutcome> {
        self.frame_pending = false;
        if self.state == Playback::Stopped {
            return Ok(TickOutcome::Skipped);
        }
        match scene.material.shader_mut() {
            Some(shader) => {
                shader.set_uniform(TIME_UNIFORM, elapsed);
            }
            None => trace!("material not compiled yet; time uniform skipped"),
        }
        scene.controls.update(&mut scene.camera);
        if let Err(err) = renderer.render_frame(scene) {
            // Stopped so that `play` can resume after the failure.
            self.state = Playback::Stopped;
            return Err(err.context(format!("failed to render frame {}", self.frames)));
        }
        self.frames += 1;
        self.schedule(scheduler)?;
        Ok(TickOutcome::Rendered)
    }

    fn schedule(&mut self, scheduler: &mut impl FrameScheduler) -> Result<bool> {
        if self.frame_pending {
            return Ok(false);
        }
        scheduler.request_frame()?;
        self.frame_pending = true;
        Ok(true)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use system_clock::SystemClock;

#[cfg(not(target_arch = "wasm32"))]
mod system_clock {
    use std::time::Instant;

    use super::Clock;

    /// Wall clock started when the value is created.
    #[derive(Debug, Clone, Copy)]
    pub struct SystemClock {
        started: Instant,
    }

    impl Default for SystemClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SystemClock {
        pub fn new() -> Self {
            Self {
                started: Instant::now(),
            }
        }
    }

    impl Clock for SystemClock {
        fn elapsed_secs(&self) -> f32 {
            self.started.elapsed().as_secs_f32()
        }
    }
}

/// Clock advanced by hand; used by the headless summary and by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    now: f32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward; negative steps are ignored.
    pub fn advance(&mut self, seconds: f32) {
        self.now += seconds.max(0.0);
    }
}

impl Clock for ManualClock {
    fn elapsed_secs(&self) -> f32 {
        self.now
    }
}

/// Scheduler that only counts requests; the caller drives ticks itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountingScheduler {
    pub requests: u32,
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&mut self) -> Result<()> {
        self.requests += 1;
        Ok(())
    }
}

/// Renderer without a GPU. Records the time uniform seen by every frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeadlessRenderer {
    pub frames: Vec<Option<f32>>,
    pub surface_size: Option<(u32, u32)>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn render_frame(&mut self, scene: &SceneState) -> Result<()> {
        let time = scene
            .material
            .shader()
            .and_then(|shader| shader.uniforms().get(TIME_UNIFORM));
        self.frames.push(time);
        Ok(())
    }
}

impl crate::resize::RenderSurface for HeadlessRenderer {
    fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface_size = Some((width, height));
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::config::SketchConfig;

    fn scene() -> SceneState {
        let config = SketchConfig {
            detail: 0,
            ..SketchConfig::default()
        };
        let mut scene = SceneState::bootstrap(&config, 800, 600, 1.0).unwrap();
        scene.material.compile().unwrap();
        scene
    }

    struct FailingRenderer;

    impl FrameRenderer for FailingRenderer {
        fn render_frame(&mut self, _scene: &SceneState) -> Result<()> {
            Err(anyhow!("device lost"))
        }
    }

    #[test]
    fn tick_writes_time_before_drawing() {
        let mut scene = scene();
        let mut render_loop = RenderLoop::new();
        let mut renderer = HeadlessRenderer::new();
        let mut scheduler = CountingScheduler::default();
        render_loop.start(&mut scheduler).unwrap();
        for elapsed in [0.0, 0.5, 1.25] {
            let outcome = render_loop
                .tick(&mut scene, elapsed, &mut renderer, &mut scheduler)
                .unwrap();
            assert_eq!(outcome, TickOutcome::Rendered);
        }
        assert_eq!(renderer.frames, vec![Some(0.0), Some(0.5), Some(1.25)]);
        assert_eq!(scheduler.requests, 4);
        assert_eq!(render_loop.frames(), 3);
    }

    #[test]
    fn stopped_loop_skips_and_stops_requesting() {
        let mut scene = scene();
        let mut render_loop = RenderLoop::new();
        let mut renderer = HeadlessRenderer::new();
        let mut scheduler = CountingScheduler::default();
        render_loop.start(&mut scheduler).unwrap();
        render_loop.stop();
        let outcome = render_loop
            .tick(&mut scene, 1.0, &mut renderer, &mut scheduler)
            .unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);
        assert!(renderer.frames.is_empty());
        assert_eq!(scheduler.requests, 1);
        assert!(!render_loop.frame_pending());
    }

    #[test]
    fn play_keeps_a_single_pending_frame() {
        let mut render_loop = RenderLoop::new();
        let mut scheduler = CountingScheduler::default();
        render_loop.start(&mut scheduler).unwrap();
        render_loop.stop();
        assert!(!render_loop.play(&mut scheduler).unwrap());
        assert!(!render_loop.play(&mut scheduler).unwrap());
        assert_eq!(scheduler.requests, 1);
        assert!(render_loop.is_playing());
    }

    #[test]
    fn play_after_skipped_tick_requests_again() {
        let mut scene = scene();
        let mut render_loop = RenderLoop::new();
        let mut renderer = HeadlessRenderer::new();
        let mut scheduler = CountingScheduler::default();
        render_loop.start(&mut scheduler).unwrap();
        render_loop.stop();
        render_loop
            .tick(&mut scene, 0.1, &mut renderer, &mut scheduler)
            .unwrap();
        assert!(render_loop.play(&mut scheduler).unwrap());
        assert_eq!(scheduler.requests, 2);
        assert_eq!(render_loop.toggle(&mut scheduler).unwrap(), Playback::Stopped);
    }

    #[test]
    fn missing_shader_record_is_tolerated() {
        let config = SketchConfig {
            detail: 0,
            ..SketchConfig::default()
        };
        let mut scene = SceneState::bootstrap(&config, 320, 240, 1.0).unwrap();
        let mut render_loop = RenderLoop::new();
        let mut renderer = HeadlessRenderer::new();
        let mut scheduler = CountingScheduler::default();
        let outcome = render_loop
            .tick(&mut scene, 2.0, &mut renderer, &mut scheduler)
            .unwrap();
        assert_eq!(outcome, TickOutcome::Rendered);
        assert_eq!(renderer.frames, vec![None]);
    }

    #[test]
    fn renderer_error_stops_until_play() {
        let mut scene = scene();
        let mut render_loop = RenderLoop::new();
        let mut scheduler = CountingScheduler::default();
        let err = render_loop
            .tick(&mut scene, 0.0, &mut FailingRenderer, &mut scheduler)
            .unwrap_err();
        assert!(format!("{err:#}").contains("device lost"));
        assert_eq!(scheduler.requests, 0);
        assert!(!render_loop.frame_pending());
        assert_eq!(render_loop.state(), Playback::Stopped);

        assert!(render_loop.play(&mut scheduler).unwrap());
        assert_eq!(scheduler.requests, 1);
        assert!(render_loop.frame_pending());

        let mut renderer = HeadlessRenderer::new();
        let outcome = render_loop
            .tick(&mut scene, 1.0, &mut renderer, &mut scheduler)
            .unwrap();
        assert_eq!(outcome, TickOutcome::Rendered);
        assert_eq!(scheduler.requests, 2);
    }

    #[test]
    fn manual_clock_is_monotonic() {
        let mut clock = ManualClock::new();
        clock.advance(0.5);
        clock.advance(-3.0);
        assert_eq!(clock.elapsed_secs(), 0.5);
    }
}
