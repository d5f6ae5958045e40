use std::cell::RefCell;
use std::rc::Weak;

use anyhow::{anyhow, Result};
use glam::Vec2;
use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, KeyboardEvent, PointerEvent, WheelEvent};

use super::{command_for_key, Command, KeyCode, PointerButton};

/// Receiver of the DOM input the sketch reacts to.
pub trait InputSink {
    fn pointer_down(&mut self, button: PointerButton, position: Vec2);
    fn pointer_move(&mut self, position: Vec2);
    fn pointer_up(&mut self);
    fn wheel(&mut self, delta_y: f32);
    fn command(&mut self, command: Command);
}

/// Forwards canvas pointer events and document key presses to an [`InputSink`].
pub struct WasmInputHandler {
    listeners: Vec<EventListener>,
}

impl WasmInputHandler {
    pub fn attach<S: InputSink + 'static>(
        canvas: &HtmlCanvasElement,
        sink: Weak<RefCell<S>>,
    ) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;

        let mut listeners = Vec::new();

        // Keys are read on the document so the canvas does not need focus.
        {
            let sink = sink.clone();
            listeners.push(EventListener::new_with_options(
                &document,
                "keydown",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                        return;
                    };
                    if is_form_control(event) {
                        return;
                    }
                    let Some(key) = KeyCode::from_name(&event.key()) else {
                        return;
                    };
                    event.prevent_default();
                    with_sink(&sink, |sink| sink.command(command_for_key(key)));
                },
            ));
        }

        {
            let sink = sink.clone();
            listeners.push(EventListener::new(canvas, "pointerdown", move |event| {
                let Some(event) = event.dyn_ref::<PointerEvent>() else {
                    return;
                };
                let button = PointerButton::from_index(event.button().max(0) as u16);
                let position = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                with_sink(&sink, |sink| sink.pointer_down(button, position));
            }));
        }

        {
            let sink = sink.clone();
            listeners.push(EventListener::new(canvas, "pointermove", move |event| {
                let Some(event) = event.dyn_ref::<PointerEvent>() else {
                    return;
                };
                let position = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                with_sink(&sink, |sink| sink.pointer_move(position));
            }));
        }

        // Released outside the canvas still ends the drag.
        {
            let sink = sink.clone();
            listeners.push(EventListener::new(&window, "pointerup", move |_| {
                with_sink(&sink, |sink| sink.pointer_up());
            }));
        }

        {
            let sink = sink.clone();
            listeners.push(EventListener::new_with_options(
                canvas,
                "wheel",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    let Some(event) = event.dyn_ref::<WheelEvent>() else {
                        return;
                    };
                    event.prevent_default();
                    let delta_y = event.delta_y() as f32;
                    with_sink(&sink, |sink| sink.wheel(delta_y));
                },
            ));
        }

        // The context menu would swallow right-button drags.
        listeners.push(EventListener::new_with_options(
            canvas,
            "contextmenu",
            EventListenerOptions::enable_prevent_default(),
            |event| event.prevent_default(),
        ));

        Ok(Self { listeners })
    }
}

impl Drop for WasmInputHandler {
    fn drop(&mut self) {
        self.listeners.clear();
    }
}

fn with_sink<S: InputSink>(sink: &Weak<RefCell<S>>, f: impl FnOnce(&mut S)) {
    let Some(sink) = sink.upgrade() else {
        return;
    };
    // Busy while a frame is rendering; the event is dropped.
    if let Ok(mut sink) = sink.try_borrow_mut() {
        f(&mut sink);
    }
}

/// Arrow keys on a focused slider belong to the slider.
fn is_form_control(event: &KeyboardEvent) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
        .is_some()
}
