use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::{egui, App, Frame, NativeOptions};
use egui::{Align, Align2, Color32, FontId, Layout, RichText};
use runpad_core::{
    EditorAdapter, LanguageCatalog, LanguageId, Session, SwitchOutcome, TerminalView, TextBuffer,
    Workbench, UNSAVED_CHANGES_PROMPT,
};
use runpad_runexec::{ExecutionClient, HttpExecutionClient};
use runpad_settings::ServiceConfig;
use tokio::runtime::Runtime;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const APP_TITLE: &str = "RunPad";
const NARROW_WIDTH: f32 = 768.0;
const PENDING_REPAINT: Duration = Duration::from_millis(100);
const TERMINAL_BACKGROUND: Color32 = Color32::from_rgb(12, 12, 16);
const TERMINAL_FOREGROUND: Color32 = Color32::from_rgb(120, 220, 140);

fn language_icon(id: &LanguageId) -> &'static str {
    match id.as_str() {
        "Python" => "🐍",
        "JS" => "📜",
        _ => "▣",
    }
}

struct RunPadApp {
    bench: Workbench<TextBuffer>,
    terminal: TerminalView,
    pending_switch: Option<LanguageId>,
    notice: Option<String>,
    // Kept alive for the spawned run requests.
    _runtime: Runtime,
}

impl RunPadApp {
    fn new(config: &ServiceConfig) -> Result<Self> {
        let client = HttpExecutionClient::new(&config.base_url)
            .context("failed to create HTTP client")?;
        let runtime = Runtime::new().context("failed to start async runtime")?;
        Ok(Self::with_client(Arc::new(client), runtime))
    }

    fn with_client(client: Arc<dyn ExecutionClient>, runtime: Runtime) -> Self {
        let bench = Workbench::new(
            Session::new(LanguageCatalog::builtin()),
            TextBuffer::default(),
            client,
            runtime.handle().clone(),
        );
        Self {
            bench,
            terminal: TerminalView::default(),
            pending_switch: None,
            notice: None,
            _runtime: runtime,
        }
    }

    /// Language icon clicked: switch directly or park the request behind the dialog.
    fn request_language(&mut self, id: LanguageId) {
        match self.bench.needs_confirmation(id.as_str()) {
            Ok(true) => self.pending_switch = Some(id),
            Ok(false) => self.switch_language(id.as_str(), true),
            Err(err) => {
                error!(error = %err, "language icon refers to an unknown language");
                self.notice = Some(err.to_string());
            }
        }
    }

    fn resolve_pending_switch(&mut self, accept: bool) {
        if let Some(id) = self.pending_switch.take() {
            self.switch_language(id.as_str(), accept);
        }
    }

    fn switch_language(&mut self, id: &str, accept: bool) {
        match self.bench.select_language(id, accept) {
            Ok(SwitchOutcome::Declined) | Ok(SwitchOutcome::Unchanged) => {}
            Ok(SwitchOutcome::Switched) => self.notice = None,
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    fn trigger_run(&mut self) {
        if !self.bench.run() {
            warn!("run requested while a previous run is pending");
        }
    }

    /// Applies finished runs; called once per frame.
    fn tick(&mut self) {
        self.bench.poll();
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("navbar")
            .resizable(false)
            .exact_height(40.0)
            .show(ctx, |ui| {
                let profile = self.bench.session().active_language();
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    ui.label(RichText::new("R").strong().size(20.0));
                    ui.heading(profile.compiler_title());
                });
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.label(format!("● Active Session: {}", profile.runtime_session_label()));
                });
            });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    ui.spacing_mut().item_spacing.x = 10.0;
                    ui.label("UTF-8");
                    ui.separator();
                    ui.label(self.bench.session().active_language().engine_label());
                    if let Some(notice) = &self.notice {
                        ui.separator();
                        ui.colored_label(Color32::LIGHT_RED, notice);
                    }
                });
            });
    }

    fn show_activity_bar(&mut self, ctx: &egui::Context) {
        let ids: Vec<(LanguageId, String)> = self
            .bench
            .session()
            .catalog()
            .profiles()
            .iter()
            .map(|profile| (profile.id.clone(), profile.display_label.clone()))
            .collect();
        egui::SidePanel::left("activity_bar")
            .resizable(false)
            .exact_width(48.0)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    for (id, label) in ids {
                        let active = self.bench.session().active_language().id == id;
                        let icon = RichText::new(language_icon(&id)).size(22.0);
                        if ui.selectable_label(active, icon).on_hover_text(label).clicked() {
                            self.request_language(id);
                        }
                    }
                });
            });
    }

    fn show_terminal(&mut self, ctx: &egui::Context, font: FontId) {
        egui::TopBottomPanel::bottom("terminal")
            .resizable(true)
            .default_height(200.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Terminal Output").strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Clear").clicked() {
                            self.bench.clear_output();
                        }
                    });
                });
                ui.separator();

                let rows = (ui.available_height() / font.size.max(1.0)).floor() as usize;
                if rows != self.terminal.viewport_rows() {
                    self.terminal.resize(rows, self.bench.session());
                }
                let scrolled = self.terminal.sync(self.bench.session());
                let text = self.terminal.render(self.bench.session()).to_string();
                egui::Frame::none()
                    .fill(TERMINAL_BACKGROUND)
                    .inner_margin(6.0)
                    .show(ui, |ui| {
                        egui::ScrollArea::vertical()
                            .auto_shrink([false, false])
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                ui.label(RichText::new(text).font(font).color(TERMINAL_FOREGROUND));
                                if scrolled {
                                    ui.scroll_to_cursor(Some(Align::BOTTOM));
                                }
                            });
                    });
            });
    }

    fn show_editor(&mut self, ctx: &egui::Context, font: FontId) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let pending = self.bench.session().is_pending();
            let file_name = self.bench.session().active_language().file_name();
            ui.horizontal(|ui| {
                ui.label(RichText::new(file_name).strong());
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    let label = if pending { "..." } else { "▶ RUN" };
                    if ui.add_enabled(!pending, egui::Button::new(label)).clicked() {
                        self.trigger_run();
                    }
                });
            });
            ui.separator();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let mut buffer = self.bench.editor().value().to_string();
                    let text_edit = egui::TextEdit::multiline(&mut buffer)
                        .font(font)
                        .code_editor()
                        .desired_rows(24)
                        .desired_width(f32::INFINITY);
                    if ui.add(text_edit).changed() {
                        self.bench.editor_mut().edit(buffer);
                    }
                });
        });
    }

    fn show_switch_dialog(&mut self, ctx: &egui::Context) {
        if self.pending_switch.is_none() {
            return;
        }
        let mut decision = None;
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(UNSAVED_CHANGES_PROMPT);
                ui.horizontal(|ui| {
                    if ui.button("Continue").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });
        if let Some(accept) = decision {
            self.resolve_pending_switch(accept);
        }
    }
}

impl App for RunPadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.tick();

        let font_size = if ctx.screen_rect().width() < NARROW_WIDTH {
            12.0
        } else {
            14.0
        };
        let font = FontId::monospace(font_size);

        self.show_header(ctx);
        self.show_status_bar(ctx);
        self.show_activity_bar(ctx);
        self.show_terminal(ctx, font.clone());
        self.show_editor(ctx, font);
        self.show_switch_dialog(ctx);

        if self.bench.session().is_pending() {
            ctx.request_repaint_after(PENDING_REPAINT);
        }
    }
}

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::from_env().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring invalid service URL; using default");
        ServiceConfig::default()
    });
    let app = match RunPadApp::new(&config) {
        Ok(app) => app,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to start RunPad");
            std::process::exit(1);
        }
    };

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_title(APP_TITLE),
        ..Default::default()
    };
    eframe::run_native(APP_TITLE, options, Box::new(|_cc| Box::new(app)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use runpad_core::RunStatus;
    use runpad_runexec::{ScriptedClient, ScriptedReply};

    fn app_with(client: ScriptedClient) -> (RunPadApp, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let app = RunPadApp::with_client(Arc::clone(&client) as Arc<dyn ExecutionClient>, runtime);
        (app, client)
    }

    fn tick_until_idle(app: &mut RunPadApp) {
        for _ in 0..500 {
            app.tick();
            if !app.bench.session().is_pending() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("run did not finish");
    }

    #[test]
    fn edited_buffer_parks_switch_until_confirmed() {
        let (mut app, _client) = app_with(ScriptedClient::new());
        app.bench.editor_mut().edit("print('mine')");

        app.request_language(LanguageId::from("JS"));
        assert_eq!(app.pending_switch, Some(LanguageId::from("JS")));
        assert_eq!(app.bench.session().active_language().id, "Python");

        app.resolve_pending_switch(false);
        assert!(app.pending_switch.is_none());
        assert_eq!(app.bench.session().source(), "print('mine')");

        app.request_language(LanguageId::from("JS"));
        app.resolve_pending_switch(true);
        assert_eq!(app.bench.session().active_language().id, "JS");
        assert_eq!(
            app.bench.editor().value(),
            app.bench.session().active_language().default_source
        );
    }

    #[test]
    fn clean_buffer_switches_immediately() {
        let (mut app, _client) = app_with(ScriptedClient::new());
        app.request_language(LanguageId::from("JS"));
        assert!(app.pending_switch.is_none());
        assert_eq!(app.bench.session().active_language().id, "JS");
    }

    #[test]
    fn run_button_result_reaches_terminal() {
        let (mut app, client) = app_with(ScriptedClient::with_replies([ScriptedReply::output(
            "Hello World\n",
        )]));
        app.trigger_run();
        app.trigger_run();
        tick_until_idle(&mut app);

        assert_eq!(client.submission_count(), 1);
        assert_eq!(
            app.bench.session().status(),
            &RunStatus::Succeeded("Hello World\n".into())
        );
        assert_eq!(app.terminal.render(app.bench.session()), "Hello World\n");
    }

    #[test]
    fn icons_cover_builtin_languages() {
        for id in LanguageCatalog::builtin().ids() {
            assert_ne!(language_icon(id), "▣");
        }
    }
}
