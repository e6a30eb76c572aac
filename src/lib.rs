//! # Grading Session
//!
//! 答卷评分会话客户端：上传答案和学生试卷，远程提取答案，再远程评分
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 评分服务的 HTTP 封装
//! - `GradingApi` - 提取 / 评分两个接口的抽象，测试中可替换
//!
//! ### ② 会话层（Session）
//! - `session/` - 会话上下文、代数与票据、状态迁移
//! - `SessionState` - 唯一的可变状态
//! - `SessionSnapshot` - 用于展示的只读快照
//!
//! ### ③ 业务能力层（Services）
//! - `Exporter` - 导出提取结果
//! - `Notifier` - 向用户发出通知
//!
//! ### ④ 流程层（Workflow）
//! - `extraction_flow` - 一份文档的提取
//! - `evaluation_flow` - 一次评分
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/grading_session` - 会话控制器
//! - `orchestrator/app` - 终端应用
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GradingApi, GradingClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{EvaluationRequest, EvaluationResult, ExtractionResult, Role, UploadFile};
pub use orchestrator::{App, GradingSession};
pub use services::{ConsoleNotifier, Exporter, Notice, NoticeLevel, Notifier};
pub use session::{SessionSnapshot, SessionState};
