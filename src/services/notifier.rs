//! 用户通知服务 - 业务能力层
//!
//! 只负责"把一条消息告诉用户"，不关心是哪个流程产生的

use tracing::{info, warn};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// 一条面向用户的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 通知能力
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// 终端通知：直接打印到标准输出
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => {
                info!("通知: {}", notice.message);
                println!("ℹ️  {}", notice.message);
            }
            NoticeLevel::Error => {
                warn!("提醒用户: {}", notice.message);
                println!("⚠️  {}", notice.message);
            }
        }
    }
}

// ========== 通知文案 ==========

pub const EXTRACTION_FAILED_KEY: &str = "An error occurred during answer key extraction.";
pub const EXTRACTION_FAILED_STUDENT: &str = "An error occurred during student paper extraction.";
pub const EXTRACT_BOTH_FIRST: &str = "Please extract answers from both files first.";
pub const EVALUATION_IN_PROGRESS: &str = "Marks are already being calculated, please wait.";
pub const EVALUATION_FAILED: &str = "An error occurred while evaluating the answers.";
pub const NOTHING_TO_DOWNLOAD: &str = "No extracted data available to download.";
