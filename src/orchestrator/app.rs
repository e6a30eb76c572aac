//! 终端应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，把终端输入翻译成会话命令。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、创建评分客户端和会话
//! 2. **交互模式**：逐行读取标准输入，每个命令 `tokio::spawn` 出去，不阻塞输入；
//!    退出前等待仍在进行的请求
//! 3. **一次性模式**：两个文件都已配置时，并发提取、评分、导出后退出
//!
//! ## 设计特点
//!
//! - **顶层编排**：不直接修改会话状态
//! - **资源所有者**：唯一持有 `GradingSession` 的模块
//! - **向下委托**：文件读取交给 models，状态迁移交给 session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clients::GradingClient;
use crate::config::Config;
use crate::models::{Role, UploadFile};
use crate::orchestrator::command::{Command, USAGE};
use crate::orchestrator::GradingSession;
use crate::services::{ConsoleNotifier, Exporter, Notice, Notifier};
use crate::utils::logging;

type ConsoleSession = GradingSession<GradingClient, ConsoleNotifier>;

/// 应用主结构
pub struct App {
    config: Config,
    notifier: Arc<ConsoleNotifier>,
    session: ConsoleSession,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let notifier = Arc::new(ConsoleNotifier);
        let session = GradingSession::new(
            Arc::new(GradingClient::new(&config)),
            Arc::clone(&notifier),
            Exporter::new(&config),
        );

        Ok(Self {
            config,
            notifier,
            session,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        match self.config.one_shot_files() {
            Some((key, student)) => self.run_one_shot(Path::new(key), Path::new(student)).await,
            None => self.run_interactive().await,
        }
    }

    /// 一次性模式：提取两份文档 → 计算分数 → （可选）导出
    async fn run_one_shot(&self, key_path: &Path, student_path: &Path) -> Result<()> {
        info!("📋 一次性模式");

        let key = UploadFile::load(key_path)
            .await
            .with_context(|| format!("无法读取答案文件: {}", key_path.display()))?;
        let student = UploadFile::load(student_path)
            .await
            .with_context(|| format!("无法读取学生试卷: {}", student_path.display()))?;

        // 两份提取互不依赖，并发进行
        let (key_result, student_result) = tokio::join!(
            self.session.select_file(Role::Key, Some(key)),
            self.session.select_file(Role::Student, Some(student)),
        );
        for (role, result) in [(Role::Key, key_result), (Role::Student, student_result)] {
            if let Err(e) = result {
                error!("[{}] ❌ 提取失败: {}", role, e);
            }
        }

        if self.session.can_calculate_marks() {
            if let Err(e) = self.session.calculate_marks().await {
                error!("❌ 计算分数失败: {}", e);
            }
        } else {
            warn!("⚠️ 缺少提取结果，跳过评分");
        }

        let snapshot = self.session.snapshot();
        println!("{}", snapshot.render());

        if self.config.auto_download {
            for role in Role::ALL {
                if snapshot.role(role).extraction.is_present() {
                    // 失败已通知用户
                    let _ = self.session.download(role);
                }
            }
        }

        logging::print_session_summary(&snapshot);
        Ok(())
    }

    /// 交互模式：逐行读取命令直到 quit 或输入结束
    async fn run_interactive(&self) -> Result<()> {
        println!("{}", USAGE);
        println!();
        println!("{}", self.session.snapshot().render());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending = PendingTasks::default();

        while let Some(line) = lines.next_line().await.context("读取标准输入失败")? {
            debug!("收到输入: {}", logging::truncate_text(&line, 80));
            pending.prune();

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    self.notifier.notify(Notice::error(e.to_string()));
                    println!("{}", USAGE);
                    continue;
                }
            };

            if command == Command::Quit {
                break;
            }
            self.dispatch(command, &mut pending).await;
        }

        // 退出前等待进行中的请求，避免结果丢失
        pending.wait_all().await;

        logging::print_session_summary(&self.session.snapshot());
        Ok(())
    }

    async fn dispatch(&self, command: Command, pending: &mut PendingTasks) {
        match command {
            Command::SelectFile { role, path } => self.select_file(role, path, pending).await,
            Command::Download(role) => {
                // 失败已通知用户
                let _ = self.session.download(role);
            }
            Command::CalculateMarks => {
                let session = self.session.clone();
                let handle = tokio::spawn(async move {
                    if session.calculate_marks().await.is_ok() {
                        if let Some(rendered) = session.snapshot().render_evaluation() {
                            println!("{}", rendered);
                        }
                    }
                });
                pending.push("计算分数".to_string(), handle);
            }
            Command::NewSession => {
                self.session.reset();
                println!("{}", self.session.snapshot().render());
            }
            Command::Show => println!("{}", self.session.snapshot().render()),
            Command::Help => println!("{}", USAGE),
            Command::Quit => {}
        }
    }

    /// 读取文件后在后台提取；读不到文件等同于取消选择
    async fn select_file(&self, role: Role, path: PathBuf, pending: &mut PendingTasks) {
        let file = match UploadFile::load(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("[{}] ⚠️ 文件读取失败: {}", role, e);
                self.notifier.notify(Notice::error(e.to_string()));
                return;
            }
        };

        println!("✓ {} uploaded successfully: {}", role.panel_title(), file.file_name);

        let label = format!("{}提取: {}", role, file.file_name);
        let session = self.session.clone();
        let handle = tokio::spawn(async move {
            match session.select_file(role, Some(file)).await {
                Ok(_) => println!("{}", session.snapshot().render_panel(role)),
                Err(e) if e.is_superseded() => debug!("[{}] 结果已过期: {}", role, e),
                Err(e) => debug!("[{}] 提取未完成: {}", role, e),
            }
        });
        pending.push(label, handle);
    }
}

/// 后台任务句柄
#[derive(Default)]
struct PendingTasks {
    handles: Vec<(String, JoinHandle<()>)>,
}

impl PendingTasks {
    fn push(&mut self, label: String, handle: JoinHandle<()>) {
        self.handles.push((label, handle));
    }

    /// 丢掉已经结束的任务
    fn prune(&mut self) {
        self.handles.retain(|(_, handle)| !handle.is_finished());
    }

    fn len(&self) -> usize {
        self.handles.len()
    }

    /// 等待全部任务结束
    async fn wait_all(&mut self) {
        let running = self
            .handles
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .count();
        if running > 0 {
            info!("⏳ 等待 {} 个进行中的请求完成...", running);
        }

        for (label, handle) in self.handles.drain(..) {
            match handle.await {
                Ok(()) => debug!("✓ {} 已结束", label),
                Err(e) => error!("[{}] 任务执行失败: {}", label, e),
            }
        }
    }
}
