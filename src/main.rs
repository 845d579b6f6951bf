// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod gui;
mod pages;
mod types;
use anyhow::{anyhow, Context};
use config::AppConfig;
use eframe::egui;
use log::warn;
// 配置加载失败时退回缺省值，只记录警告
fn load_config() -> AppConfig {
    match AppConfig::load().context("loading configuration") {
        Ok(config) => config,
        Err(e) => {
            warn!("{e:#}; falling back to defaults");
            AppConfig::default()
        }
    }
}
// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = load_config();
    let app = gui::AtemgurtApp::new(&config).context("building breathing pipeline")?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1100.0, 650.0])
        .with_min_inner_size([900.0, 560.0])
        .with_title("Atemgurt");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Atemgurt",
        options,
        Box::new(move |cc| {
            gui::apply_theme(&cc.egui_ctx);
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow!("window closed with error: {e}"))
}
