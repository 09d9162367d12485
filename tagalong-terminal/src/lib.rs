//! Terminal front end: an ASCII scene with a text label that follows the prop.
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use nalgebra::Matrix4;
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tagalong_core::{
    AssetSlot, FrameLoop, FrameReport, FrameView, Mesh, OrbitControls, Scene, SceneConfig, ScreenSpaceTracker,
    Scheduler, Stage, Tracking, ViewportMetrics,
};

pub mod renderer;

pub use renderer::{AsciiRenderer, Layer, TerminalLabel, CELL_ASPECT};

/// Radians per rotate key press
const ROTATE_STEP: f32 = 0.1;
/// Cells per pan key press
const PAN_STEP: f32 = 2.0;
/// Segments around the stock cylinder prop
const PROP_SEGMENTS: usize = 16;
/// Ground plane side and subdivision, as in the stock scene
const GROUND_SIZE: f32 = 500.0;
const GROUND_SEGMENTS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Scene(#[from] tagalong_core::Error),
}

/// Paces the loop to a target frame rate. Each frame asks for exactly one successor.
#[derive(Debug)]
pub struct FramePacer {
    frame_time: Duration,
    next_at: Option<Instant>,
}

impl FramePacer {
    /// The first frame is due immediately.
    pub fn new(fps: u32) -> Self {
        Self {
            frame_time: Duration::from_secs(1) / fps.max(1),
            next_at: Some(Instant::now()),
        }
    }

    /// Sleep until the scheduled frame is due. `false` when nothing was scheduled.
    pub fn wait_next(&mut self) -> bool {
        let Some(at) = self.next_at.take() else {
            return false;
        };
        let now = Instant::now();
        if at > now {
            std::thread::sleep(at - now);
        }
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_at.is_some()
    }
}

impl Scheduler for FramePacer {
    fn schedule_next(&mut self) -> tagalong_core::Result<()> {
        if self.next_at.is_some() {
            return Err(tagalong_core::Error::Schedule("a frame is already pending".into()));
        }
        self.next_at = Some(Instant::now() + self.frame_time);
        Ok(())
    }
}

/// The terminal's rendering engine: ground plane plus whichever prop mesh loaded.
pub struct TerminalStage {
    renderer: AsciiRenderer,
    ground: Mesh,
}

impl TerminalStage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            renderer: AsciiRenderer::new(width, height),
            ground: Mesh::plane(GROUND_SIZE, GROUND_SEGMENTS),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.renderer.resize(width, height);
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }
}

impl Stage for TerminalStage {
    type Prop = Mesh;

    fn viewport(&self) -> ViewportMetrics {
        self.renderer.viewport()
    }

    fn draw(&mut self, frame: &FrameView<'_, Mesh>) -> tagalong_core::Result<()> {
        self.renderer.clear();
        self.renderer
            .render_mesh(&self.ground, &Matrix4::identity(), frame.camera, Layer::Ground);
        if let Some(prop) = frame.prop {
            self.renderer
                .render_mesh(prop, &frame.prop_transform.matrix(), frame.camera, Layer::Prop);
        }
        Ok(())
    }
}

/// Where the prop comes from.
#[derive(Debug, Clone)]
pub enum PropSource {
    /// The stock cylinder, available from the first frame.
    Cylinder { radius: f32, height: f32 },
    /// An STL file, read on a background thread and scaled to `height`.
    Stl { path: PathBuf, height: f32 },
}

impl PropSource {
    pub fn from_config(config: &SceneConfig, model: Option<PathBuf>) -> Self {
        match model {
            Some(path) => PropSource::Stl {
                path,
                height: config.prop.height,
            },
            None => PropSource::Cylinder {
                radius: config.prop.radius,
                height: config.prop.height,
            },
        }
    }

    /// Start loading. The slot stays pending until a file-backed prop arrives.
    pub fn load(self) -> AssetSlot<Mesh> {
        match self {
            PropSource::Cylinder { radius, height } => AssetSlot::ready(Mesh::cylinder(radius, height, PROP_SEGMENTS)),
            PropSource::Stl { path, height } => {
                let (slot, resolver) = AssetSlot::pending();
                std::thread::spawn(move || {
                    tracing::info!(path = %path.display(), "loading prop model");
                    resolver.complete(load_stl(&path, height));
                });
                slot
            }
        }
    }
}

fn load_stl(path: &std::path::Path, height: f32) -> tagalong_core::Result<Mesh> {
    let data = std::fs::read(path)
        .map_err(|e| tagalong_core::Error::Asset(format!("{}: {e}", path.display())))?;
    let mesh = tagalong_core::stl::parse_stl(&data)?;
    tracing::info!(triangles = mesh.triangles.len(), "prop model parsed");
    Ok(mesh.grounded().fit_height(height))
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    scene: Scene<Mesh>,
    stage: TerminalStage,
    label: TerminalLabel,
    frames: FrameLoop,
    pacer: FramePacer,
    started: Instant,
    running: bool,
    fps: FpsCounter,
    last_report: Option<FrameReport>,
}

impl TerminalApp {
    pub fn new(config: &SceneConfig, prop: PropSource, label: impl Into<String>) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let stage = TerminalStage::new(width as usize, height as usize);

        let viewport = stage.viewport();
        let camera = config.camera(viewport.width as u32, viewport.height as u32);
        let scene = Scene::new(camera, config.controls(), prop.load())
            .with_motion(config.motion())
            .with_tracker(ScreenSpaceTracker::new(config.label_offset()));

        Ok(Self {
            scene,
            stage,
            label: TerminalLabel::new(label),
            frames: FrameLoop::new(),
            pacer: FramePacer::new(config.target_fps),
            started: Instant::now(),
            running: true,
            fps: FpsCounter::default(),
            last_report: None,
        })
    }

    pub fn run(&mut self) -> Result<(), TerminalError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<(), TerminalError> {
        tracing::info!("starting terminal frame loop");
        while self.running && self.pacer.wait_next() {
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }
            if !self.running {
                break;
            }

            let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
            let report = self.frames.tick(
                &mut self.scene,
                &mut self.stage,
                &mut self.label,
                &mut self.pacer,
                now_ms,
            )?;
            self.fps.record(now_ms);
            self.last_report = Some(report);

            self.present()?;
        }
        tracing::info!(frames = self.frames.frames(), "terminal frame loop stopped");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => self.handle_key(code),
            Event::Resize(width, height) => {
                tracing::debug!(width, height, "terminal resized");
                self.stage.resize(width as usize, height as usize);
                self.scene.resize(&self.stage.viewport());
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        let surface_height = self.stage.viewport().height;
        let controls: &mut OrbitControls = &mut self.scene.controls;
        let camera = &self.scene.camera;
        let pan_pixels = PAN_STEP;
        let pan_y = pan_pixels * CELL_ASPECT;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('w') | KeyCode::Up => controls.rotate_up(ROTATE_STEP),
            KeyCode::Char('s') | KeyCode::Down => controls.rotate_up(-ROTATE_STEP),
            KeyCode::Char('a') | KeyCode::Left => controls.rotate_left(ROTATE_STEP),
            KeyCode::Char('d') | KeyCode::Right => controls.rotate_left(-ROTATE_STEP),
            KeyCode::Char('i') => controls.pan_by_pixels(0.0, pan_y, camera, surface_height),
            KeyCode::Char('k') => controls.pan_by_pixels(0.0, -pan_y, camera, surface_height),
            KeyCode::Char('j') => controls.pan_by_pixels(pan_pixels, 0.0, camera, surface_height),
            KeyCode::Char('l') => controls.pan_by_pixels(-pan_pixels, 0.0, camera, surface_height),
            KeyCode::Char('+') | KeyCode::Char('=') => controls.zoom(-1.0),
            KeyCode::Char('-') => controls.zoom(1.0),
            _ => {}
        }
    }

    fn present(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        let (width, height) = self.stage.renderer().size();

        self.stage.renderer().draw(&mut stdout)?;
        self.label.draw(&mut stdout, width as u16, height as u16)?;

        // Status line
        let status = self
            .last_report
            .as_ref()
            .map(|report| tracking_status(&report.tracking, &self.label))
            .unwrap_or_default();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Tagalong | FPS: {:.1} | {} | Arrows/WASD=Orbit IJKL=Pan +/-=Zoom Q=Quit",
                self.fps.fps(),
                status
            )),
            ResetColor
        )?;

        stdout.flush()
    }
}

/// Status line text for the label. A skipped frame leaves the label at its last cell.
fn tracking_status(tracking: &Tracking, label: &TerminalLabel) -> String {
    match (tracking, label.cell()) {
        (Tracking::Placed(anchor), _) => format!("label @ {:.0},{:.0}", anchor.x, anchor.y / CELL_ASPECT),
        (Tracking::Skipped(reason), Some(_)) => format!("label held ({reason:?})"),
        (Tracking::Skipped(reason), None) => format!("label hidden ({reason:?})"),
    }
}

/// Frames per second over a rolling one-second window.
#[derive(Debug, Default)]
struct FpsCounter {
    window_start_ms: Option<f64>,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn record(&mut self, now_ms: f64) {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.frames += 1;
        let elapsed = now_ms - start;
        if elapsed >= 1000.0 {
            self.fps = (f64::from(self.frames) * 1000.0 / elapsed) as f32;
            self.frames = 0;
            self.window_start_ms = Some(now_ms);
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
