// src/gui.rs
use eframe::egui;
use egui::{Color32, RichText, Rounding, Stroke, Vec2};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};
use crate::config::AppConfig;
use crate::drivers::{BreathPipeline, DriverError, FakeBreathSource};
use crate::pages::{self, CalibrationPage, ACCENT, CARD_FILL, TEXT_DIM, TEXT_MUTED};
use crate::types::*;

const APP_BG: Color32 = Color32::from_rgb(0x0f, 0x11, 0x15);
const FADE_SECONDS: f64 = 0.22;
const MAX_LOG_LINES: usize = 8;

// 启动画面 -> 主界面 的淡入淡出
#[derive(Clone, Copy, Debug, PartialEq)]
enum Shell {
    Splash,
    FadingOut { since: f64 },
    FadingIn { since: f64 },
    App,
}

pub struct AtemgurtApp {
    // 核心
    pipeline: BreathPipeline<FakeBreathSource>,
    rx: Receiver<BeltMessage>,
    started: Instant,
    tick: Duration,

    // 界面状态
    shell: Shell,
    page: Page,
    status: StatusText,
    calibration_page: CalibrationPage,
    log_messages: Vec<String>,
}

impl AtemgurtApp {
    pub fn new(config: &AppConfig) -> Result<Self, DriverError> {
        let (tx, rx) = channel();
        let source = FakeBreathSource::new(config.sim_phase_step, config.sim_noise);
        let pipeline = BreathPipeline::new(source, config, tx)?;
        let status = pipeline.status_text();
        Ok(Self {
            pipeline,
            rx,
            started: Instant::now(),
            tick: Duration::from_millis(config.tick_interval_ms),
            shell: Shell::Splash,
            page: Page::Live,
            status,
            calibration_page: CalibrationPage::new(config.sampling_duration_ms),
            log_messages: vec!["Atemgurt bereit.".to_owned()],
        })
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > MAX_LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                BeltMessage::Log(s) => self.log(&s),
                BeltMessage::Status(s) => self.status = s,
                BeltMessage::Calibration(ev) => self.calibration_page.on_event(&ev),
            }
        }
    }

    fn set_page(&mut self, page: Page) {
        if self.page != page {
            log::debug!("page -> {}", page.title());
        }
        self.page = page;
    }

    fn show_splash(&mut self, ctx: &egui::Context) {
        let time = ctx.input(|i| i.time);
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::WHITE))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space((ui.available_height() * 0.25).max(20.0));

                    // 呼吸动画 (代替原来的 GIF)
                    let (rect, _) = ui.allocate_exact_size(Vec2::splat(140.0), egui::Sense::hover());
                    let breath = ((time * 1.2).sin() * 0.5 + 0.5) as f32;
                    let painter = ui.painter();
                    painter.circle_filled(rect.center(), 38.0 + breath * 24.0, ACCENT.gamma_multiply(0.25));
                    painter.circle_filled(rect.center(), 30.0 + breath * 12.0, ACCENT);

                    ui.add_space(10.0);
                    ui.label(RichText::new("Atemgurt").size(34.0).strong().color(Color32::from_rgb(0x11, 0x11, 0x11)));
                    ui.label(RichText::new("Live Atemanalyse").size(14.0).color(Color32::from_rgb(0x55, 0x55, 0x55)));
                    ui.add_space(18.0);

                    let start = egui::Button::new(RichText::new("Start").size(14.0).strong().color(Color32::WHITE))
                        .fill(ACCENT)
                        .rounding(Rounding::same(12.0));
                    let clickable = self.shell == Shell::Splash;
                    if ui.add_enabled(clickable, start.min_size(Vec2::new(240.0, 46.0))).clicked() {
                        self.shell = Shell::FadingOut { since: time };
                    }
                });
            });
        ctx.request_repaint();
    }

    fn show_topbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("topbar")
            .exact_height(54.0)
            .frame(
                egui::Frame::none()
                    .fill(CARD_FILL)
                    .rounding(Rounding::same(18.0))
                    .inner_margin(egui::Margin::symmetric(14.0, 10.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(RichText::new("Atemgurt").size(14.0).strong());
                    ui.add_space(10.0);
                    ui.label(RichText::new(self.page.title()).size(13.0).color(TEXT_DIM));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(RichText::new(self.status.label()).size(12.0).color(Color32::from_rgb(0xbd, 0xbd, 0xbd)));
                        let dot = if self.pipeline.is_connected() {
                            Color32::from_rgb(0x4c, 0xd9, 0x64)
                        } else {
                            Color32::from_rgb(0xff, 0x4d, 0x4d)
                        };
                        ui.label(RichText::new("●").size(14.0).color(dot));
                    });
                });
            });
    }

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sidebar")
            .exact_width(220.0)
            .resizable(false)
            .frame(
                egui::Frame::none()
                    .fill(CARD_FILL)
                    .rounding(Rounding::same(18.0))
                    .inner_margin(egui::Margin::same(14.0)),
            )
            .show(ctx, |ui| {
                ui.label(RichText::new("Atemgurt").size(18.0).strong());
                ui.label(RichText::new("Programmierübung 3").size(11.0).color(TEXT_MUTED));
                ui.separator();

                for page in Page::ALL {
                    let text = RichText::new(format!("{}   {}", page.icon(), page.title())).size(13.0);
                    let nav = egui::SelectableLabel::new(self.page == page, text);
                    if ui.add_sized([ui.available_width(), 42.0], nav).clicked() {
                        self.set_page(page);
                    }
                }

                ui.add_space(20.0);
                ui.separator();
                egui::ScrollArea::vertical().max_height(120.0).show(ui, |ui| {
                    for m in &self.log_messages {
                        ui.label(RichText::new(m).monospace().size(11.0).color(TEXT_MUTED));
                    }
                });
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        let mut command = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(APP_BG).inner_margin(egui::Margin::same(16.0)))
            .show(ctx, |ui| match self.page {
                Page::Live => pages::live_page(ui, self.pipeline.buffer()),
                Page::Calibration => {
                    command = self.calibration_page.show(
                        ui,
                        self.pipeline.calibration_status(),
                        self.pipeline.readout(),
                    );
                }
                Page::Settings => pages::settings_page(ui),
            });
        if let Some(cmd) = command {
            log::info!("gui command {:?}", cmd);
            self.pipeline.apply(cmd);
            self.drain_messages();
        }
    }

    fn paint_fade(&self, ctx: &egui::Context, alpha: f64) {
        let a = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
        if a == 0 {
            return;
        }
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("fade_overlay"),
        ));
        painter.rect_filled(
            ctx.screen_rect(),
            0.0,
            Color32::from_rgba_unmultiplied(APP_BG.r(), APP_BG.g(), APP_BG.b(), a),
        );
    }
}

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = APP_BG;
    visuals.window_fill = CARD_FILL;
    visuals.widgets.noninteractive.bg_fill = CARD_FILL;
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, Color32::from_rgb(0xea, 0xea, 0xea));
    visuals.selection.bg_fill = ACCENT.gamma_multiply(0.35);
    ctx.set_visuals(visuals);
}

impl eframe::App for AtemgurtApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 推进核心时钟，处理所有到期的定时器
        let now_ms = self.started.elapsed().as_millis() as u64;
        self.pipeline.advance_to(now_ms);

        // 2. 消息处理
        self.drain_messages();

        // 3. 界面
        let time = ctx.input(|i| i.time);
        match self.shell {
            Shell::Splash => self.show_splash(ctx),
            Shell::FadingOut { since } => {
                self.show_splash(ctx);
                let t = (time - since) / FADE_SECONDS;
                self.paint_fade(ctx, t);
                if t >= 1.0 {
                    self.shell = Shell::FadingIn { since: time };
                }
            }
            Shell::FadingIn { since } => {
                self.show_topbar(ctx);
                self.show_sidebar(ctx);
                self.show_content(ctx);
                let t = (time - since) / FADE_SECONDS;
                self.paint_fade(ctx, 1.0 - t);
                if t >= 1.0 {
                    self.shell = Shell::App;
                }
                ctx.request_repaint();
            }
            Shell::App => {
                self.show_topbar(ctx);
                self.show_sidebar(ctx);
                self.show_content(ctx);
            }
        }

        // 定时器按 tick 节奏推进
        ctx.request_repaint_after(self.tick);
    }
}
