#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use gloo_events::EventListener;
use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, HtmlCanvasElement, HtmlElement, HtmlInputElement};

use crate::app::{CommandOutcome, Sketch};
use crate::config::SketchConfig;
use crate::error::SketchError;
use crate::input::wasm::{InputSink, WasmInputHandler};
use crate::input::{Command, PointerButton};
use crate::render::Renderer;
use crate::render_loop::{Clock, FrameScheduler};
use crate::resize::{physical_size, usable_size};
use crate::scene::SceneState;
use crate::settings::{SettingField, SLIDERS};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Handle returned to JavaScript.
#[wasm_bindgen(js_name = Sketch)]
pub struct WebSketch {
    inner: Rc<RefCell<WebState>>,
}

#[wasm_bindgen(js_class = Sketch)]
impl WebSketch {
    /// Creates the sketch inside the element with id `container_id` and
    /// starts rendering.
    pub async fn create(container_id: String) -> Result<WebSketch, JsValue> {
        build_sketch(&container_id).await.map_err(to_js_error)
    }

    pub fn stop(&self) {
        self.inner.borrow_mut().sketch.stop();
    }

    /// Resumes rendering; returns `false` when it was already playing.
    pub fn play(&self) -> Result<bool, JsValue> {
        let mut state = self.inner.borrow_mut();
        let WebState {
            sketch, scheduler, ..
        } = &mut *state;
        sketch.play(scheduler).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.inner.borrow().sketch.render_loop().is_playing()
    }

    pub fn frames(&self) -> u32 {
        self.inner.borrow().sketch.render_loop().frames() as u32
    }
}

impl Drop for WebSketch {
    fn drop(&mut self) {
        let mut state = self.inner.borrow_mut();
        state.sketch.stop();
        state.scheduler.cancel();
    }
}

async fn build_sketch(container_id: &str) -> Result<WebSketch> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("document not available"))?;
    let container: HtmlElement = document
        .get_element_by_id(container_id)
        .ok_or_else(|| SketchError::MissingContainer(container_id.to_string()))?
        .dyn_into()
        .map_err(|_| anyhow!("`{container_id}` is not an HTML element"))?;

    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| anyhow!("failed to create canvas"))?;
    canvas
        .set_attribute("style", "display:block;width:100%;height:100%")
        .map_err(js_error)?;
    container.append_child(&canvas).map_err(js_error)?;

    // A container without a CSS height measures 0; start at the window size
    // and follow the container once it has an area.
    let measured = container_size(&container);
    let (width, height) = usable_size(measured, window_size(&window));
    if measured != (width, height) {
        warn!("container `{container_id}` measures {measured:?}; using {width}x{height}");
    }
    let pixel_ratio = window.device_pixel_ratio() as f32;
    let (physical_width, physical_height) = physical_size(width, height, pixel_ratio);
    canvas.set_width(physical_width);
    canvas.set_height(physical_height);

    let config = SketchConfig::default();
    let mut scene = SceneState::bootstrap(&config, width, height, pixel_ratio)
        .context("failed to bootstrap scene")?;
    let renderer = Renderer::new(
        wgpu::SurfaceTarget::Canvas(canvas.clone()),
        physical_width,
        physical_height,
        &mut scene,
    )
    .await?;
    let clock = PerformanceClock::new()?;
    let panel = PanelInputs::build(&document, &container)?;

    let frame_slot = Rc::new(RefCell::new(None));
    let inner = Rc::new(RefCell::new(WebState {
        sketch: Sketch::new(scene, renderer, clock),
        scheduler: RafScheduler {
            callback: Rc::clone(&frame_slot),
            pending: Rc::new(Cell::new(None)),
        },
        canvas: canvas.clone(),
        container,
        panel,
        _input: None,
        _listeners: Vec::new(),
    }));

    let weak = Rc::downgrade(&inner);
    *frame_slot.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        state.frame();
    }) as Box<dyn FnMut()>));

    let input = WasmInputHandler::attach(&canvas, Rc::downgrade(&inner))?;
    let listeners = attach_listeners(&window, &inner);
    {
        let mut state = inner.borrow_mut();
        state._input = Some(input);
        state._listeners = listeners;
        state.panel.refresh(&state.sketch.scene);
        let WebState {
            sketch, scheduler, ..
        } = &mut *state;
        sketch.start(scheduler)?;
    }
    info!("sketch started in `{container_id}` at {width}x{height} (ratio {pixel_ratio})");

    Ok(WebSketch { inner })
}

fn attach_listeners(window: &web_sys::Window, inner: &Rc<RefCell<WebState>>) -> Vec<EventListener> {
    let mut listeners = Vec::new();

    {
        let weak = Rc::downgrade(inner);
        listeners.push(EventListener::new(window, "resize", move |_| {
            with_state(&weak, WebState::resize_to_container);
        }));
    }

    let inputs: Vec<(SettingField, HtmlInputElement)> = inner
        .borrow()
        .panel
        .sliders
        .iter()
        .map(|slider| (slider.field, slider.input.clone()))
        .collect();
    for (field, input) in inputs {
        let weak = Rc::downgrade(inner);
        let source = input.clone();
        listeners.push(EventListener::new(&input, "input", move |_| {
            let value = source.value_as_number() as f32;
            with_state(&weak, |state| {
                state.sketch.scene.apply_setting(field, value);
                state.panel.refresh(&state.sketch.scene);
            });
        }));
    }

    listeners
}

fn with_state(weak: &Weak<RefCell<WebState>>, f: impl FnOnce(&mut WebState)) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    if let Ok(mut state) = state.try_borrow_mut() {
        f(&mut state);
    }
}

struct WebState {
    sketch: Sketch<Renderer, PerformanceClock>,
    scheduler: RafScheduler,
    canvas: HtmlCanvasElement,
    container: HtmlElement,
    panel: PanelInputs,
    _input: Option<WasmInputHandler>,
    _listeners: Vec<EventListener>,
}

impl WebState {
    fn frame(&mut self) {
        if let Err(err) = self.sketch.frame(&mut self.scheduler) {
            error!("render failed: {err:#}");
        }
    }

    fn resize_to_container(&mut self) {
        let (width, height) = container_size(&self.container);
        let pixel_ratio = window()
            .map(|window| window.device_pixel_ratio() as f32)
            .unwrap_or(1.0);
        if width == 0 || height == 0 {
            return;
        }
        self.sketch.scene.viewport.pixel_ratio = pixel_ratio;
        let (physical_width, physical_height) = physical_size(width, height, pixel_ratio);
        self.canvas.set_width(physical_width);
        self.canvas.set_height(physical_height);
        self.sketch.resize(width, height);
    }
}

impl InputSink for WebState {
    fn pointer_down(&mut self, button: PointerButton, position: Vec2) {
        self.sketch.scene.pointer_down(button, position);
    }

    fn pointer_move(&mut self, position: Vec2) {
        self.sketch.scene.pointer_move(position);
    }

    fn pointer_up(&mut self) {
        self.sketch.scene.pointer_up();
    }

    fn wheel(&mut self, delta_y: f32) {
        self.sketch.scene.wheel(delta_y);
    }

    fn command(&mut self, command: Command) {
        // A page cannot close itself; escape pauses instead.
        if command == Command::Quit {
            self.sketch.stop();
            return;
        }
        match self.sketch.handle_command(command, &mut self.scheduler) {
            Ok(CommandOutcome::PanelChanged) => self.panel.refresh(&self.sketch.scene),
            Ok(_) => {}
            Err(err) => error!("command {command:?} failed: {err:#}"),
        }
    }
}

/// Requests animation frames with the stored callback.
struct RafScheduler {
    callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
    pending: Rc<Cell<Option<i32>>>,
}

impl RafScheduler {
    fn cancel(&mut self) {
        if let (Some(id), Some(window)) = (self.pending.take(), window()) {
            let _ = window.cancel_animation_frame(id);
        }
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> Result<()> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let callback = self.callback.borrow();
        let callback = callback
            .as_ref()
            .ok_or_else(|| anyhow!("animation callback not installed"))?;
        let id = window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
        self.pending.set(Some(id));
        Ok(())
    }
}

/// Seconds since creation, read from `performance.now()`.
struct PerformanceClock {
    performance: web_sys::Performance,
    origin: f64,
}

impl PerformanceClock {
    fn new() -> Result<Self> {
        let performance = window()
            .and_then(|window| window.performance())
            .ok_or_else(|| anyhow!("performance timer not available"))?;
        let origin = performance.now();
        Ok(Self {
            performance,
            origin,
        })
    }
}

impl Clock for PerformanceClock {
    fn elapsed_secs(&self) -> f32 {
        ((self.performance.now() - self.origin) / 1000.0) as f32
    }
}

struct SliderInput {
    field: SettingField,
    input: HtmlInputElement,
    readout: HtmlElement,
}

/// Range inputs mirroring the parameter panel.
struct PanelInputs {
    sliders: Vec<SliderInput>,
}

impl PanelInputs {
    fn build(document: &Document, container: &HtmlElement) -> Result<Self> {
        let root = create_html(document, "div")?;
        root.set_class_name("sketch-panel");
        root.set_attribute(
            "style",
            "position:absolute;top:8px;right:8px;padding:8px;background:rgba(0,0,0,0.6);\
             color:#fff;font:12px monospace",
        )
        .map_err(js_error)?;

        let mut sliders = Vec::with_capacity(SLIDERS.len());
        for spec in &SLIDERS {
            let row = create_html(document, "label")?;
            row.set_attribute("style", "display:block").map_err(js_error)?;
            let name = create_html(document, "span")?;
            name.set_text_content(Some(spec.label));
            let input: HtmlInputElement = document
                .create_element("input")
                .map_err(js_error)?
                .dyn_into()
                .map_err(|_| anyhow!("failed to create slider input"))?;
            input.set_type("range");
            input.set_min(&spec.min.to_string());
            input.set_max(&spec.max.to_string());
            input.set_step(&spec.step.to_string());
            let readout = create_html(document, "span")?;

            row.append_child(&name).map_err(js_error)?;
            row.append_child(&input).map_err(js_error)?;
            row.append_child(&readout).map_err(js_error)?;
            root.append_child(&row).map_err(js_error)?;
            sliders.push(SliderInput {
                field: spec.field,
                input,
                readout,
            });
        }
        container.append_child(&root).map_err(js_error)?;
        Ok(Self { sliders })
    }

    fn refresh(&self, scene: &SceneState) {
        for slider in &self.sliders {
            let value = scene.panel.value(slider.field);
            let selected = scene.panel.selected() == slider.field;
            slider.input.set_value(&value.to_string());
            slider
                .readout
                .set_text_content(Some(&format!(" {value:.2}{}", if selected { " *" } else { "" })));
        }
    }
}

fn create_html(document: &Document, tag: &str) -> Result<HtmlElement> {
    document
        .create_element(tag)
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| anyhow!("failed to create <{tag}>"))
}

fn container_size(container: &HtmlElement) -> (u32, u32) {
    (
        container.offset_width().max(0) as u32,
        container.offset_height().max(0) as u32,
    )
}

fn window_size(window: &web_sys::Window) -> (u32, u32) {
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|value| value.as_f64())
            .map_or(0, |value| value.max(0.0) as u32)
    };
    (dimension(window.inner_width()), dimension(window.inner_height()))
}

fn js_error(err: JsValue) -> anyhow::Error {
    anyhow!("{err:?}")
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    js_sys::Error::new(&format!("{err:#}")).into()
}
