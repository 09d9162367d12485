//! Tagalong Web - keeps an HTML label glued to a three.js node.
//!
//! The page owns the WebGL renderer and the scene graph. This crate owns the
//! camera, the orbit controls and the frame loop: every animation frame it
//! moves the node, projects it, positions the label element and then hands
//! the camera pose to the page's draw function.
use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Promise, Reflect};
use nalgebra::Point3;
use tagalong_core::{
    AssetSlot, Error, FrameLoop, FrameView, OverlaySink, Scene, SceneConfig, ScreenAnchor, ScreenSpaceTracker,
    Scheduler, Stage, ViewportMetrics, WorldTransform,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, EventTarget, HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent, Window};

pub mod input;
pub mod status;

use input::{css_position, transform_from_elements, wheel_steps, DragMode, PointerDrag};
use status::SharedStatus;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
        .unwrap_or_else(|| format!("{value:?}"))
}

fn render_error(context: &str, value: JsValue) -> Error {
    Error::Render(format!("{context}: {}", describe(&value)))
}

fn call_method(target: &JsValue, name: &str, args: &Array) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    method.apply(target, args)
}

fn point_array(p: &Point3<f32>) -> Array {
    Array::of3(&JsValue::from(p.x), &JsValue::from(p.y), &JsValue::from(p.z))
}

/// The canvas the page renders into, plus the page's draw callback.
struct CanvasStage {
    window: Window,
    canvas: HtmlCanvasElement,
    draw: Option<Function>,
    /// Write the core's motion into `node.position`. Off when the page animates the node itself.
    drives_position: bool,
}

impl Stage for CanvasStage {
    type Prop = JsValue;

    fn viewport(&self) -> ViewportMetrics {
        let rect = self.canvas.get_bounding_client_rect();
        let scroll_x = self.window.scroll_x().unwrap_or(0.0);
        let scroll_y = self.window.scroll_y().unwrap_or(0.0);
        ViewportMetrics::new(rect.width() as f32, rect.height() as f32)
            .with_offset((rect.left() + scroll_x) as f32, (rect.top() + scroll_y) as f32)
    }

    fn update_transforms(&mut self, node: &mut JsValue, transform: &mut WorldTransform) -> tagalong_core::Result<()> {
        if self.drives_position {
            let position = Reflect::get(node, &"position".into()).map_err(|e| render_error("node.position", e))?;
            call_method(&position, "set", &point_array(&transform.position))
                .map_err(|e| render_error("node.position.set", e))?;
        }
        call_method(node, "updateMatrixWorld", &Array::of1(&JsValue::TRUE))
            .map_err(|e| render_error("node.updateMatrixWorld", e))?;

        let elements = Reflect::get(node, &"matrixWorld".into())
            .and_then(|matrix| Reflect::get(&matrix, &"elements".into()))
            .map_err(|e| render_error("node.matrixWorld", e))?;
        let elements: Vec<f64> = Array::from(&elements).iter().filter_map(|v| v.as_f64()).collect();
        *transform = transform_from_elements(&elements)
            .ok_or_else(|| Error::Render("node.matrixWorld.elements is not a 4x4 matrix".into()))?;
        Ok(())
    }

    fn draw(&mut self, frame: &FrameView<'_, JsValue>) -> tagalong_core::Result<()> {
        let Some(draw) = &self.draw else {
            return Ok(());
        };
        let info = Object::new();
        let fields = [
            ("dt", JsValue::from(frame.dt)),
            ("eye", point_array(&frame.camera.position).into()),
            ("target", point_array(&frame.camera.target).into()),
            ("labelVisible", JsValue::from(frame.tracking.anchor().is_some())),
        ];
        for (key, value) in fields {
            Reflect::set(&info, &key.into(), &value).map_err(|e| render_error("frame info", e))?;
        }
        draw.call1(&JsValue::NULL, &info)
            .map_err(|e| render_error("draw callback", e))?;
        Ok(())
    }
}

/// The label element, positioned absolutely in page pixels.
struct HtmlLabel {
    element: HtmlElement,
}

impl OverlaySink for HtmlLabel {
    fn place(&mut self, anchor: ScreenAnchor) {
        let (left, top) = css_position(anchor);
        let style = self.element.style();
        if let Err(err) = style
            .set_property("left", &left)
            .and_then(|_| style.set_property("top", &top))
        {
            tracing::warn!(error = %describe(&err), "failed to position label");
        }
    }
}

/// Schedules frames with `requestAnimationFrame`.
struct RafScheduler {
    window: Window,
    callback: FrameCallback,
    status: Rc<SharedStatus>,
    /// Request id of the frame not yet delivered.
    pending: Option<i32>,
}

impl RafScheduler {
    fn cancel(&mut self) {
        if let Some(id) = self.pending.take() {
            if let Err(err) = self.window.cancel_animation_frame(id) {
                tracing::debug!(error = %describe(&err), "cancelAnimationFrame failed");
            }
        }
    }
}

impl Scheduler for RafScheduler {
    fn schedule_next(&mut self) -> tagalong_core::Result<()> {
        if self.status.is_stopped() {
            return Ok(());
        }
        let callback = self.callback.borrow();
        let Some(callback) = callback.as_ref() else {
            return Err(Error::Schedule("frame callback not installed".into()));
        };
        let id = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|e| Error::Schedule(describe(&e)))?;
        self.pending = Some(id);
        Ok(())
    }
}

struct Runtime {
    scene: Scene<JsValue>,
    stage: CanvasStage,
    label: HtmlLabel,
    frames: FrameLoop,
    scheduler: RafScheduler,
    drag: PointerDrag,
    status: Rc<SharedStatus>,
}

impl Runtime {
    fn tick(&mut self, now_ms: f64) {
        self.scheduler.pending = None;
        if self.status.take_host_motion() {
            tracing::info!("node motion handed to the page");
            self.scene.motion = None;
            self.stage.drives_position = false;
        }

        let result = self.frames.tick(
            &mut self.scene,
            &mut self.stage,
            &mut self.label,
            &mut self.scheduler,
            now_ms,
        );
        self.status.record_frames(self.frames.frames());
        if let Err(err) = result {
            tracing::error!(%err, frame = self.frames.frames(), "frame loop stopped");
        }
    }

    fn pointer_moved(&mut self, x: f32, y: f32) {
        let Some((mode, dx, dy)) = self.drag.moved(x, y) else {
            return;
        };
        let height = self.stage.viewport().height;
        match mode {
            DragMode::Orbit => self.scene.controls.rotate_by_pixels(dx, dy, height),
            DragMode::Pan => self.scene.controls.pan_by_pixels(dx, dy, &self.scene.camera, height),
        }
    }
}

/// A tracked node, its label, and the loop that keeps them together.
#[wasm_bindgen]
pub struct WebScene {
    runtime: Rc<RefCell<Runtime>>,
    callback: FrameCallback,
    status: Rc<SharedStatus>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl WebScene {
    /// `target` resolves to the three.js `Object3D` to follow. `config` is optional TOML.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, label_id: &str, target: Promise, config: Option<String>) -> Result<WebScene, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("canvas #{canvas_id} not found")))?
            .dyn_into()?;
        let label: HtmlElement = document
            .get_element_by_id(label_id)
            .ok_or_else(|| JsValue::from_str(&format!("label #{label_id} not found")))?
            .dyn_into()?;

        let config = match config {
            Some(text) => SceneConfig::from_toml_str(&text).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => SceneConfig::default(),
        };

        let (prop, resolver) = AssetSlot::pending();
        wasm_bindgen_futures::spawn_local(async move {
            let result = JsFuture::from(target)
                .await
                .map_err(|e| Error::Asset(describe(&e)));
            if let Err(err) = &result {
                tracing::warn!(%err, "tracked node failed to load");
            }
            resolver.complete(result);
        });

        let stage = CanvasStage {
            window: window.clone(),
            canvas: canvas.clone(),
            draw: None,
            drives_position: true,
        };
        let viewport = stage.viewport();
        let camera = config.camera(viewport.width.max(1.0) as u32, viewport.height.max(1.0) as u32);
        let scene = Scene::new(camera, config.controls(), prop)
            .with_motion(config.motion())
            .with_tracker(ScreenSpaceTracker::new(config.label_offset()));

        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let status = Rc::new(SharedStatus::default());
        let runtime = Rc::new(RefCell::new(Runtime {
            scene,
            stage,
            label: HtmlLabel { element: label },
            frames: FrameLoop::new(),
            scheduler: RafScheduler {
                window: window.clone(),
                callback: Rc::clone(&callback),
                status: Rc::clone(&status),
                pending: None,
            },
            drag: PointerDrag::default(),
            status: Rc::clone(&status),
        }));

        let listeners = install_listeners(&window, &canvas, &runtime)?;
        tracing::info!(canvas_id, label_id, "web scene created");

        Ok(WebScene {
            runtime,
            callback,
            status,
            listeners,
        })
    }

    /// Hand node movement to the page: from the next frame the core stops writing `node.position`.
    #[wasm_bindgen(js_name = hostDrivesMotion)]
    pub fn host_drives_motion(&self) {
        self.status.request_host_motion();
    }

    /// Start the frame loop. `draw` is called every frame with `{ dt, eye, target, labelVisible }`.
    pub fn start(&self, draw: Function) -> Result<(), JsValue> {
        self.runtime
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("start() called from inside a frame"))?
            .stage
            .draw = Some(draw);
        if self.callback.borrow().is_some() {
            return Ok(());
        }

        let runtime = Rc::clone(&self.runtime);
        *self.callback.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
            runtime.borrow_mut().tick(now_ms);
        }) as Box<dyn FnMut(f64)>));

        self.runtime
            .borrow_mut()
            .scheduler
            .schedule_next()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> f64 {
        self.status.frames() as f64
    }
}

impl Drop for WebScene {
    fn drop(&mut self) {
        self.status.stop();
        self.listeners.clear();
        // Dropped from inside the page's draw callback the frame is still running;
        // the stop flag keeps it from scheduling another.
        let Ok(mut runtime) = self.runtime.try_borrow_mut() else {
            return;
        };
        runtime.scheduler.cancel();
        drop(runtime);
        let callback = self.callback.borrow_mut().take();
        drop(callback);
        tracing::debug!("web scene dropped");
    }
}

/// A registered DOM listener, removed again when dropped.
struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref())
        {
            tracing::debug!(event = self.event, error = %describe(&err), "removeEventListener failed");
        }
    }
}

fn listen(
    target: &EventTarget,
    event: &'static str,
    handler: impl FnMut(Event) + 'static,
) -> Result<Listener, JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    Ok(Listener {
        target: target.clone(),
        event,
        closure,
    })
}

fn install_listeners(
    window: &Window,
    canvas: &HtmlCanvasElement,
    runtime: &Rc<RefCell<Runtime>>,
) -> Result<Vec<Listener>, JsValue> {
    let mut listeners = Vec::new();

    let rt = Rc::clone(runtime);
    listeners.push(listen(canvas, "mousedown", move |event| {
        let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        if rt
            .borrow_mut()
            .drag
            .press(mouse.button(), mouse.client_x() as f32, mouse.client_y() as f32)
        {
            event.prevent_default();
        }
    })?);

    let rt = Rc::clone(runtime);
    listeners.push(listen(window, "mousemove", move |event| {
        if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
            rt.borrow_mut()
                .pointer_moved(mouse.client_x() as f32, mouse.client_y() as f32);
        }
    })?);

    let rt = Rc::clone(runtime);
    listeners.push(listen(window, "mouseup", move |_| rt.borrow_mut().drag.release())?);

    let rt = Rc::clone(runtime);
    listeners.push(listen(canvas, "wheel", move |event| {
        if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
            event.prevent_default();
            rt.borrow_mut().scene.controls.zoom(wheel_steps(wheel.delta_y()));
        }
    })?);

    // Right-drag pans; keep the context menu out of the way
    listeners.push(listen(canvas, "contextmenu", |event| event.prevent_default())?);

    let rt = Rc::clone(runtime);
    listeners.push(listen(window, "resize", move |_| {
        let mut runtime = rt.borrow_mut();
        let viewport = runtime.stage.viewport();
        tracing::debug!(width = viewport.width, height = viewport.height, "canvas resized");
        runtime.scene.resize(&viewport);
    })?);

    Ok(listeners)
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    // A second init (hot reload) keeps the first logger
    let _ = console_log::init_with_level(log::Level::Info);
}
