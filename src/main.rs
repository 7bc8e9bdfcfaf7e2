//! Stack Tower entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

    use stack_tower::audio::{AudioManager, SoundEffect};
    use stack_tower::renderer::RenderState;
    use stack_tower::sim::{GameEvent, GamePhase, GameSession, TickInput, tick};
    use stack_tower::{HighScores, Settings};

    /// Presentation adapter around the simulation session
    struct Game {
        session: GameSession,
        render_state: Option<RenderState>,
        input: TickInput,
        audio: AudioManager,
        high_scores: HighScores,
        canvas: HtmlCanvasElement,
    }

    impl Game {
        fn new(settings: Settings, seed: u64, canvas: HtmlCanvasElement) -> Self {
            let audio = AudioManager::new(
                settings.master_volume,
                settings.sfx_volume,
                settings.music_volume,
            );
            Self {
                session: GameSession::new(settings, seed),
                render_state: None,
                input: TickInput::default(),
                audio,
                high_scores: HighScores::load(),
                canvas,
            }
        }

        fn frame(&mut self, time: f64) {
            let input = std::mem::take(&mut self.input);
            tick(&mut self.session, &input, time);
            self.handle_events();
            self.render();
        }

        fn handle_events(&mut self) {
            for event in self.session.drain_events() {
                match event {
                    GameEvent::Started => {
                        if self.session.settings.background_music {
                            self.audio.start_music();
                        }
                        self.audio.on_start();
                        set_score(0);
                        show(&["score"], &["instructions", "results"]);
                    }
                    GameEvent::Reset => {
                        self.audio.on_start();
                        set_score(0);
                        show(&["score"], &["results"]);
                    }
                    GameEvent::Placed { score } => {
                        set_score(score);
                        self.audio.play(SoundEffect::Place { score });
                    }
                    GameEvent::Missed { score } => self.finish_run(score),
                }
            }
        }

        fn finish_run(&mut self, score: u32) {
            self.audio.on_miss();
            self.audio.play(SoundEffect::Miss);

            let autopilot = self.session.autopilot.enabled;
            if let Some(rank) = self.high_scores.record(score, autopilot, js_sys::Date::now()) {
                log::info!("Score {} ranked #{}", score, rank);
                self.high_scores.save();
                if rank == 1 {
                    self.audio.play(SoundEffect::NewBest);
                }
            }

            if let Some(doc) = document() {
                if let Some(el) = doc.get_element_by_id("final-score") {
                    el.set_text_content(Some(&score.to_string()));
                }
                if let Some(el) = doc.get_element_by_id("best-score") {
                    let best = self.high_scores.best().unwrap_or(0);
                    el.set_text_content(Some(&best.to_string()));
                }
            }
            show(&["results"], &[]);
        }

        fn render(&mut self) {
            let Some(render_state) = self.render_state.as_mut() else {
                return;
            };
            let session = &self.session;
            match render_state.render(
                &session.stage.scene,
                &session.camera,
                &session.fog,
                &session.settings,
            ) {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost) => render_state.reconfigure(),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }
        }

        fn resize(&mut self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let dpr = window.device_pixel_ratio();
            let width = (self.canvas.client_width() as f64 * dpr) as u32;
            let height = (self.canvas.client_height() as f64 * dpr) as u32;
            if width == 0 || height == 0 {
                return;
            }
            self.canvas.set_width(width);
            self.canvas.set_height(height);
            self.session.resize(width, height);
            if let Some(render_state) = self.render_state.as_mut() {
                render_state.resize(width, height);
            }
        }
    }

    fn document() -> Option<Document> {
        web_sys::window().and_then(|w| w.document())
    }

    fn set_score(score: u32) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id("score")) {
            el.set_text_content(Some(&score.to_string()));
        }
    }

    /// Toggle the `hidden` class on overlay elements
    fn show(visible: &[&str], hidden: &[&str]) {
        let Some(doc) = document() else { return };
        for (ids, hide) in [(visible, false), (hidden, true)] {
            for id in ids {
                if let Some(el) = doc.get_element_by_id(id) {
                    let _ = el.class_list().toggle_with_force("hidden", hide);
                }
            }
        }
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger init failed: {e}").into());
        }

        log::info!("Stack Tower starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.class_list().add_1("hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let settings = Settings::load();
        log::info!("Settings: {:?}", settings);

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(settings, seed, canvas.clone())));
        game.borrow_mut().resize();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to get adapter: {e}")))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let (width, height) = (canvas.width(), canvas.height());
        let render_state = RenderState::new(surface, &adapter, width, height)
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to create device: {e}")))?;
        game.borrow_mut().render_state = Some(render_state);

        setup_input_handlers(&window, &document, game.clone())?;

        // Autopilot runs start on their own
        if game.borrow().session.autopilot.enabled {
            game.borrow_mut().input.primary = true;
        }

        request_animation_frame(game);

        log::info!("Stack Tower running!");
        Ok(())
    }

    fn setup_input_handlers(
        window: &web_sys::Window,
        document: &Document,
        game: Rc<RefCell<Game>>,
    ) -> Result<(), JsValue> {
        // Click / tap anywhere
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().input.primary = true;
            });
            window.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                // Suppresses the emulated mouse events, so the overlays are handled here too
                event.prevent_default();
                let on_results = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                    .and_then(|el| el.closest("#results").ok().flatten())
                    .is_some();
                let mut g = game.borrow_mut();
                let tap = TickInput::tap(g.session.phase, on_results);
                g.input.merge(&tap);
            });
            window.add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    " " => {
                        event.prevent_default();
                        g.input.primary = true;
                    }
                    "r" | "R" => g.input.reset = true,
                    _ => {}
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Results overlay restarts, start button starts
        if let Some(results) = document.get_element_by_id("results") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                event.stop_propagation();
                game.borrow_mut().input.reset = true;
            });
            results.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        if let Some(start) = document.get_element_by_id("start") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                event.stop_propagation();
                let mut g = game.borrow_mut();
                if g.session.phase == GamePhase::NotStarted {
                    g.input.primary = true;
                }
            });
            start.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Resize
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::UiEvent| {
                game.borrow_mut().resize();
            });
            window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run().await
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use stack_tower::Settings;
    use stack_tower::sim::{GameEvent, GameSession, TickInput, tick};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Stack Tower (native) starting...");
    log::info!("Native mode runs a headless autopilot demo - run with `trunk serve` for the game");

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_FRAMES: usize = 60 * 120;

    let mut settings = Settings::default();
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = settings.apply_query(&args.join("&")) {
        log::error!("{e}");
        std::process::exit(2);
    }
    settings.autopilot = true;

    let mut session = GameSession::new(settings, 0x5eed);
    let start = TickInput {
        primary: true,
        ..Default::default()
    };
    tick(&mut session, &start, 0.0);

    let mut time = 0.0;
    for _ in 0..MAX_FRAMES {
        time += FRAME_MS;
        tick(&mut session, &TickInput::default(), time);
        for event in session.drain_events() {
            match event {
                GameEvent::Placed { score } => {
                    let top = session.tower.top().map(|l| (l.width, l.depth));
                    log::info!("Placed layer {} (footprint {:?})", score, top);
                }
                GameEvent::Missed { score } => log::info!("Missed, final score {}", score),
                _ => {}
            }
        }
    }

    println!(
        "Autopilot finished: {} layers in {:.1}s ({:?})",
        session.score(),
        time / 1000.0,
        session.phase
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
