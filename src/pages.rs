// src/pages.rs
use eframe::egui;
use egui::{Color32, RichText, Rounding, Stroke};
use egui_plot::{HLine, Line, Plot, PlotBounds, PlotPoints, Points};
use crate::drivers::{
    padded_range, CalibrationEvent, CalibrationStatus, DisplayBuffer, Readout,
};
use crate::types::GuiCommand;

pub const CARD_FILL: Color32 = Color32::from_rgb(0x14, 0x18, 0x21);
pub const ACCENT: Color32 = Color32::from_rgb(0x2F, 0x80, 0xED);
pub const TEXT_DIM: Color32 = Color32::from_rgb(0xcf, 0xcf, 0xcf);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(0x9b, 0x9b, 0x9b);

// "现在"点的大小范围 (符号直径)
const NOW_SIZE_MIN: f64 = 6.0;
const NOW_SIZE_MAX: f64 = 16.0;

/// Radius of the pulsing "now" marker: bigger swing, bigger dot.
pub fn pulse_radius(value: f64) -> f32 {
    let size = (8.0 + value.abs() * 8.0).clamp(NOW_SIZE_MIN, NOW_SIZE_MAX);
    (size / 2.0) as f32
}

// 卡片容器
pub fn card<R>(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui) -> R) -> R {
    egui::Frame::none()
        .fill(CARD_FILL)
        .rounding(Rounding::same(18.0))
        .stroke(Stroke::new(1.0, Color32::from_white_alpha(15)))
        .inner_margin(egui::Margin::same(14.0))
        .show(ui, add_contents)
        .inner
}

fn header(ui: &mut egui::Ui, text: &str) {
    ui.label(RichText::new(text).size(22.0).strong());
    ui.add_space(6.0);
}

// ============================================================
// Live
// ============================================================
pub fn live_page(ui: &mut egui::Ui, buffer: &DisplayBuffer) {
    header(ui, "Live");
    card(ui, |ui| {
        let (t_min, t_max) = buffer.visible_range();
        let t_max = t_max.max(t_min + buffer.tick_ms() as f64 / 1000.0);
        // 样本不足时按现有数据估一个范围
        let (y_min, y_max) = buffer
            .visible_y_range()
            .or_else(|| padded_range(buffer.samples().map(|p| p.value)))
            .unwrap_or((-1.0, 1.0));
        let points = buffer.plot_points();
        let start_y = buffer.first_point().map(|p| p.value).unwrap_or(0.0);
        let now = buffer.now_point();

        // 用户不能缩放或拖动，坐标轴完全由程序控制
        Plot::new("live_plot")
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .allow_double_click_reset(false)
            .x_axis_label("Zeit (s)")
            .y_axis_label("Dehnung")
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([t_min, y_min], [t_max, y_max]));
                plot_ui.hline(HLine::new(0.0).color(Color32::from_white_alpha(60)));
                plot_ui.line(
                    Line::new(PlotPoints::new(points))
                        .color(ACCENT)
                        .width(2.0)
                        .name("Atmung"),
                );
                plot_ui.points(
                    Points::new(vec![[0.0, start_y]])
                        .radius(5.0)
                        .color(Color32::WHITE)
                        .name("Start"),
                );
                if let Some(now) = now {
                    plot_ui.points(
                        Points::new(vec![[now.time, now.value]])
                            .radius(pulse_radius(now.value))
                            .color(ACCENT)
                            .name("Jetzt"),
                    );
                }
            });
    });
}

// ============================================================
// Kalibrierung
// ============================================================
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoTopic {
    Placement,
    Exhale,
    Curve,
}

impl InfoTopic {
    pub fn title(self) -> &'static str {
        match self {
            InfoTopic::Placement => "Warum auf Bauchhöhe?",
            InfoTopic::Exhale => "Warum beim Ausatmen?",
            InfoTopic::Curve => "Was zeigt die Kurve?",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            InfoTopic::Placement => {
                "Auf Bauchhöhe ist die Umfangsänderung beim Atmen meist am größten.\n\n\
                 Das liefert stabilere Messwerte und minimiert Störungen durch Schulter- oder Brustbewegungen."
            }
            InfoTopic::Exhale => {
                "Beim vollständigen Ausatmen ist der Bauchumfang am kleinsten.\n\n\
                 Das ist ein stabiler Referenzpunkt, damit die Atemkurve später sauber um die Null-Linie liegt."
            }
            InfoTopic::Curve => {
                "Die Kurve zeigt die relative Dehnung des Gurts.\n\n\
                 Sie misst keine Liter Luft, sondern das Atemmuster (Rhythmus und Tiefe der Atmung)."
            }
        }
    }
}

pub struct CalibrationPage {
    status_line: String,
    show_progress: bool,
    progress: u8,
    sampling_seconds: f64,
    info: Option<InfoTopic>,
}

impl CalibrationPage {
    pub fn new(sampling_duration_ms: u64) -> Self {
        Self {
            status_line: "Status: bereit".to_owned(),
            show_progress: false,
            progress: 0,
            sampling_seconds: sampling_duration_ms as f64 / 1000.0,
            info: None,
        }
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    pub fn on_event(&mut self, event: &CalibrationEvent) {
        match event {
            CalibrationEvent::CountdownStarted(n) | CalibrationEvent::CountdownTick(n) => {
                self.status_line = format!("Status: bereitmachen… ({n})");
                self.show_progress = false;
            }
            CalibrationEvent::SamplingStarted => {
                self.status_line = format!("Status: messe {} Sekunden…", self.sampling_seconds);
                self.show_progress = true;
                self.progress = 0;
            }
            CalibrationEvent::Progress(pct) => self.progress = *pct,
            CalibrationEvent::Completed { .. } => {
                self.status_line = "Status: Nullpunkt gesetzt ✔".to_owned();
                self.progress = 100;
            }
            CalibrationEvent::Reset => {
                self.status_line = "Status: Offset zurückgesetzt".to_owned();
                self.show_progress = false;
            }
        }
    }

    /// Draws the page; returns the command the user issued, if any.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        status: CalibrationStatus,
        readout: Readout,
    ) -> Option<GuiCommand> {
        let mut command = None;
        header(ui, "Kalibrierung");
        egui::ScrollArea::vertical().show(ui, |ui| {
            card(ui, |ui| {
                self.step_placement(ui);
                ui.separator();
                command = self.step_zero_point(ui, status, readout);
                ui.separator();
                self.step_live(ui);
            });
        });

        if let Some(topic) = self.info {
            let mut open = true;
            egui::Window::new(topic.title())
                .open(&mut open)
                .collapsible(false)
                .resizable(false)
                .show(ui.ctx(), |ui| {
                    ui.label(topic.text());
                });
            if !open {
                self.info = None;
            }
        }
        command
    }

    fn info_button(&mut self, ui: &mut egui::Ui, topic: InfoTopic) {
        if ui
            .add(egui::Button::new(RichText::new(" i ").strong()).rounding(Rounding::same(16.0)))
            .on_hover_text(topic.title())
            .clicked()
        {
            self.info = Some(topic);
        }
    }

    fn step(&mut self, ui: &mut egui::Ui, title: &str, body: &str, topic: InfoTopic) {
        ui.label(RichText::new(title).size(16.0).strong());
        ui.horizontal_top(|ui| {
            ui.add(egui::Label::new(RichText::new(body).color(TEXT_DIM)).wrap(true));
            self.info_button(ui, topic);
        });
    }

    fn step_placement(&mut self, ui: &mut egui::Ui) {
        self.step(
            ui,
            "1) Gurt anlegen",
            "• Direkt auf der Haut tragen (nicht über Kleidung).\n\
             • Position: Bauchhöhe, unterhalb der Brust.\n\
             • Eng anliegend, aber nicht einschnürend\n  (1–2 Finger sollten noch darunter passen).",
            InfoTopic::Placement,
        );
    }

    fn step_zero_point(
        &mut self,
        ui: &mut egui::Ui,
        status: CalibrationStatus,
        readout: Readout,
    ) -> Option<GuiCommand> {
        let body = format!(
            "• Setz dich ruhig hin oder steh entspannt.\n\
             • Atme vollständig aus.\n\
             • Halte kurz still.\n\
             • Drücke dann „Nullpunkt setzen“.\n\n\
             Die App misst {} Sekunden und speichert den Mittelwert als Nullpunkt.",
            self.sampling_seconds
        );
        self.step(ui, "2) Nullpunkt setzen", &body, InfoTopic::Exhale);

        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Rohwert: {:.3}", readout.raw)).size(12.0).color(TEXT_DIM));
            ui.add_space(18.0);
            ui.label(RichText::new(format!("Offset: {:.3}", readout.offset)).size(12.0).color(TEXT_DIM));
        });
        ui.label(RichText::new(&self.status_line).size(12.0).color(TEXT_MUTED));

        if self.show_progress {
            ui.add(egui::ProgressBar::new(self.progress as f32 / 100.0).fill(ACCENT));
        }

        let mut command = None;
        let idle = !status.is_busy();
        ui.horizontal(|ui| {
            let zero_label = format!("Nullpunkt setzen ({}s Mittelwert)", self.sampling_seconds);
            if ui.add_enabled(idle, egui::Button::new(zero_label)).clicked() {
                command = Some(GuiCommand::StartCalibration);
            }
            if ui.add_enabled(idle, egui::Button::new("Offset zurücksetzen")).clicked() {
                command = Some(GuiCommand::ResetOffset);
            }
        });
        command
    }

    fn step_live(&mut self, ui: &mut egui::Ui) {
        self.step(
            ui,
            "3) Live messen",
            "• Atme danach normal weiter.\n\
             • Die Kurve steigt typischerweise beim Einatmen und fällt beim Ausatmen.\n\
             • Wichtig sind Rhythmus und Ausschlagshöhe.\n\n\
             Wenn sich der Gurt verschiebt oder die Kurve driftet:\n\
             → Kalibrierung erneut durchführen.",
            InfoTopic::Curve,
        );
    }
}

// ============================================================
// Einstellungen (Platzhalter)
// ============================================================
pub fn settings_page(ui: &mut egui::Ui) {
    header(ui, "Einstellungen");
    ui.label(RichText::new("Hier kommt später BLE / Sampling / Export / Theme.").color(TEXT_MUTED));
}
