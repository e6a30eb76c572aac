//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use crate::config::Config;
use crate::session::SessionSnapshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // 测试中可能被多次调用
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 答卷评分会话");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 评分服务: {}", config.api_base_url);
    info!("📁 下载目录: {}", config.download_dir);
    info!("{}", "=".repeat(60));
}

/// 记录会话重置
pub fn log_session_reset(generation: u64) {
    info!("\n{}", "─".repeat(60));
    info!("🆕 新会话 #{}", generation);
    info!("{}", "─".repeat(60));
}

/// 打印会话统计信息
pub fn print_session_summary(snapshot: &SessionSnapshot) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话 #{} 结束", snapshot.generation.value());
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for view in [&snapshot.key, &snapshot.student] {
        let count = view.extraction.as_ref().map(|r| r.answers().map_or(0, <[String]>::len));
        info!(
            "{}: {}",
            view.file_name.as_deref().unwrap_or("未上传"),
            count.map_or_else(|| "未提取".to_string(), |n| format!("{} 条答案", n))
        );
    }
    info!(
        "评分结果: {}",
        if snapshot.evaluation.is_present() {
            "已生成"
        } else {
            "无"
        }
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
