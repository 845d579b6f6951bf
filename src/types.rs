// src/types.rs
use crate::drivers::CalibrationEvent;

// 页面
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Page {
    Live,
    Calibration,
    Settings,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Live, Page::Calibration, Page::Settings];

    pub fn title(self) -> &'static str {
        match self {
            Page::Live => "Live",
            Page::Calibration => "Kalibrierung",
            Page::Settings => "Einstellungen",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Page::Live => "📈",
            Page::Calibration => "🎯",
            Page::Settings => "⚙",
        }
    }
}

// GUI 发给核心的命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuiCommand {
    StartCalibration,
    ResetOffset,
}

// 顶栏状态文字
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusText {
    Offline,
    Connected,
    Calibrating,
    Calibrated,
    OffsetReset,
}

impl StatusText {
    pub fn label(self) -> &'static str {
        match self {
            StatusText::Offline => "Offline",
            StatusText::Connected => "Verbunden",
            StatusText::Calibrating => "Kalibrieren…",
            StatusText::Calibrated => "Kalibriert",
            StatusText::OffsetReset => "Offset reset",
        }
    }
}

// 核心发给 GUI 的消息
#[derive(Clone, Debug, PartialEq)]
pub enum BeltMessage {
    Log(String),
    Status(StatusText),
    Calibration(CalibrationEvent),
}
