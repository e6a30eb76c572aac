//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责命令调度和会话状态的所有权，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `grading_session` - 评分会话控制器
//! - 持有唯一的 `SessionState`（`Arc<Mutex<_>>`）
//! - 签发票据，调用 workflow，应用返回的 `Transition`
//! - 维护"处理中"标记（作用域守卫）
//! - 失败时通知用户，过期结果静默丢弃
//!
//! ### `command` - 终端命令解析
//! - 一行输入 → 一个 `Command`
//!
//! ### `app` - 终端应用
//! - 管理应用生命周期（初始化、运行）
//! - 交互模式 / 一次性模式
//!
//! ## 层次关系
//!
//! ```text
//! app (处理终端输入)
//!     ↓
//! grading_session (持有会话上下文)
//!     ↓
//! workflow::extraction_flow / evaluation_flow (单次请求)
//!     ↓
//! clients::GradingApi (HTTP)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一所有者**：只有 grading_session 修改会话状态
//! 2. **向下依赖**：编排层 → workflow → clients
//! 3. **锁不跨 await**：workflow 运行期间不持有会话锁

pub mod app;
pub mod command;
pub mod grading_session;

// 重新导出主要类型
pub use app::App;
pub use command::{Command, CommandError};
pub use grading_session::GradingSession;
