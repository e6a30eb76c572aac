//! 评分会话控制器 - 编排层
//!
//! ## 职责
//!
//! 持有唯一的会话上下文，对外提供六个用户命令：
//! 选择答案文件、选择学生试卷、下载两份提取结果、计算分数、新会话。
//!
//! ## 设计特点
//!
//! - **状态只在这里修改**：workflow 返回 `Transition`，由本模块加锁应用
//! - **锁不跨 await**：每次只在同步代码块里短暂持有
//! - **可克隆**：内部全是 `Arc`，终端应用可以把每个命令 `tokio::spawn` 出去
//! - **票据防串**：重置后才到达的响应、以及基于旧提取结果的评分响应，凭票据识别并丢弃

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::clients::GradingApi;
use crate::error::{DownloadError, EvaluationError, ExtractionError};
use crate::models::{EvaluationResult, ExtractionResult, Role, UploadFile};
use crate::services::notifier::{
    EVALUATION_FAILED, EVALUATION_IN_PROGRESS, EXTRACTION_FAILED_KEY, EXTRACTION_FAILED_STUDENT,
    EXTRACT_BOTH_FIRST, NOTHING_TO_DOWNLOAD,
};
use crate::services::{Exporter, Notice, Notifier};
use crate::session::{
    Applied, EvaluationTicket, ExtractionTicket, SessionSnapshot, SessionState, Transition,
};
use crate::utils::logging;
use crate::workflow::{evaluation_flow, extraction_flow};

/// 评分会话控制器
pub struct GradingSession<A: ?Sized, N: ?Sized> {
    api: Arc<A>,
    notifier: Arc<N>,
    exporter: Exporter,
    state: Arc<Mutex<SessionState>>,
}

impl<A: ?Sized, N: ?Sized> Clone for GradingSession<A, N> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            notifier: Arc::clone(&self.notifier),
            exporter: self.exporter.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// 评分处理中标记的作用域守卫
///
/// 无论评分成功、失败、panic 还是 future 被丢弃，离开作用域时都会清除标记。
struct ProcessingGuard {
    state: Arc<Mutex<SessionState>>,
    ticket: EvaluationTicket,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let cleared = lock(&self.state).finish_evaluation(self.ticket);
        debug!("评分结束，处理中标记已清除: {}", cleared);
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A, N> GradingSession<A, N>
where
    A: GradingApi + ?Sized,
    N: Notifier + ?Sized,
{
    /// 创建新的会话
    pub fn new(api: Arc<A>, notifier: Arc<N>, exporter: Exporter) -> Self {
        Self {
            api,
            notifier,
            exporter,
            state: Arc::new(Mutex::new(SessionState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    /// 当前会话的快照
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().snapshot()
    }

    /// “计算分数”是否可用
    pub fn can_calculate_marks(&self) -> bool {
        self.state().can_calculate_marks()
    }

    /// 选择文件并立即提取
    ///
    /// `None` 表示用户取消了选择，不做任何修改，返回 `Ok(None)`。
    pub async fn select_file(
        &self,
        role: Role,
        file: Option<UploadFile>,
    ) -> Result<Option<ExtractionResult>, ExtractionError> {
        let Some(file) = file else {
            debug!("[{}] 未选择文件，忽略", role);
            return Ok(None);
        };

        let file = Arc::new(file);
        let ticket = self.state().select_file(role, Arc::clone(&file));
        info!("[{}] ✓ 已选择文件: {}", role, file.file_name);

        self.extract(ticket, &file).await.map(Some)
    }

    /// 选择答案文件
    pub async fn select_key_file(
        &self,
        file: Option<UploadFile>,
    ) -> Result<Option<ExtractionResult>, ExtractionError> {
        self.select_file(Role::Key, file).await
    }

    /// 选择学生试卷
    pub async fn select_student_file(
        &self,
        file: Option<UploadFile>,
    ) -> Result<Option<ExtractionResult>, ExtractionError> {
        self.select_file(Role::Student, file).await
    }

    async fn extract(
        &self,
        ticket: ExtractionTicket,
        file: &UploadFile,
    ) -> Result<ExtractionResult, ExtractionError> {
        let role = ticket.role;
        let transition = extraction_flow::run(&*self.api, ticket, file).await;
        let applied = self.state().apply(&transition);

        match (applied, transition) {
            (Applied::Stale, _) => {
                warn!("[{}] 提取响应已过期（会话已重置或有更新的请求），已丢弃", role);
                Err(ExtractionError::Superseded { role })
            }
            (_, Transition::Extracted { result, .. }) => Ok(result),
            (_, Transition::ExtractionFailed { error, .. }) => {
                self.notifier.notify(Notice::error(match role {
                    Role::Key => EXTRACTION_FAILED_KEY,
                    Role::Student => EXTRACTION_FAILED_STUDENT,
                }));
                Err(error)
            }
            (_, other) => {
                // extraction_flow 只会返回提取相关的迁移
                warn!("[{}] 意外的迁移: {:?}", role, other);
                Err(ExtractionError::Superseded { role })
            }
        }
    }

    /// 计算分数
    ///
    /// 两份提取结果都存在时才会发出请求；处理中标记由守卫保证清除。
    pub async fn calculate_marks(&self) -> Result<EvaluationResult, EvaluationError> {
        let begun = self.state().begin_evaluation();
        let (ticket, request) = match begun {
            Ok(begun) => begun,
            Err(e) => {
                warn!("⚠️ 无法计算分数: {}", e);
                let message = match e {
                    EvaluationError::InProgress => EVALUATION_IN_PROGRESS,
                    _ => EXTRACT_BOTH_FIRST,
                };
                self.notifier.notify(Notice::error(message));
                return Err(e);
            }
        };

        let _guard = ProcessingGuard {
            state: Arc::clone(&self.state),
            ticket,
        };

        let transition = evaluation_flow::run(&*self.api, ticket, &request).await;
        let applied = self.state().apply(&transition);

        match (applied, transition) {
            (Applied::Stale, _) => {
                warn!("评分响应到达时会话已重置或提取结果已更新，已丢弃");
                Err(EvaluationError::Superseded)
            }
            (_, Transition::Evaluated { result, .. }) => Ok(result),
            (_, Transition::EvaluationFailed { error, .. }) => {
                self.notifier.notify(Notice::error(EVALUATION_FAILED));
                Err(EvaluationError::Api(error))
            }
            (_, other) => {
                warn!("意外的迁移: {:?}", other);
                Err(EvaluationError::Superseded)
            }
        }
    }

    /// 导出某一角色的提取结果
    pub fn download(&self, role: Role) -> Result<PathBuf, DownloadError> {
        let result = self.state().extraction(role).cloned();
        let Some(result) = result else {
            warn!("[{}] 没有可下载的提取结果", role);
            self.notifier.notify(Notice::error(NOTHING_TO_DOWNLOAD));
            return Err(DownloadError::NothingToDownload { role });
        };

        match self.exporter.export(role, &result) {
            Ok(path) => {
                info!("[{}] ✓ 已导出: {}", role, path.display());
                self.notifier
                    .notify(Notice::info(format!("已保存 {}", path.display())));
                Ok(path)
            }
            Err(e) => {
                self.notifier.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// 导出答案的提取结果
    pub fn download_extracted_key(&self) -> Result<PathBuf, DownloadError> {
        self.download(Role::Key)
    }

    /// 导出学生试卷的提取结果
    pub fn download_extracted_student(&self) -> Result<PathBuf, DownloadError> {
        self.download(Role::Student)
    }

    /// 新会话：一次性清空全部状态
    ///
    /// 不取消进行中的请求，它们的响应到达后会被丢弃。
    pub fn reset(&self) {
        let generation = {
            let mut state = self.state();
            state.reset();
            state.generation()
        };
        logging::log_session_reset(generation.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::EvaluationRequest;
    use crate::services::NoticeLevel;
    use crate::session::{SessionPhase, NO_EXTRACTION_YET};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// 记录所有通知
    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<Notice>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.message.clone())
                .collect()
        }
    }

    /// 按文件名返回预设结果的假接口
    ///
    /// - 文件名以 `fail` 开头时返回网络错误
    /// - 文件名以 `raw` 开头时返回没有 answers 字段的响应
    /// - `gate` 存在时，评分请求会等到放行才返回
    #[derive(Default)]
    struct FakeApi {
        extract_calls: AtomicUsize,
        evaluate_calls: AtomicUsize,
        last_request: Mutex<Option<EvaluationRequest>>,
        evaluation_response: Option<Value>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl GradingApi for FakeApi {
        async fn extract(&self, file: &UploadFile) -> Result<Value, ApiError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            if file.file_name.starts_with("fail") {
                return Err(ApiError::request_failed(
                    "/extract/",
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                ));
            }
            if file.file_name.starts_with("raw") {
                return Ok(json!({
                    "text": String::from_utf8_lossy(&file.bytes),
                    "pages": 2
                }));
            }
            let answers: Vec<String> = String::from_utf8_lossy(&file.bytes)
                .split(',')
                .map(str::to_string)
                .collect();
            Ok(json!({ "answers": answers }))
        }

        async fn evaluate(&self, request: &EvaluationRequest) -> Result<Value, ApiError> {
            self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.evaluation_response {
                Some(body) => Ok(body.clone()),
                None => Err(ApiError::BadStatus {
                    endpoint: "/evaluate/".into(),
                    status: 503,
                    body: "unavailable".into(),
                }),
            }
        }
    }

    fn upload(name: &str, answers: &str) -> Option<UploadFile> {
        Some(UploadFile::new(name, answers.as_bytes().to_vec()))
    }

    fn session_with(
        api: FakeApi,
    ) -> (
        GradingSession<FakeApi, RecordingNotifier>,
        Arc<FakeApi>,
        Arc<RecordingNotifier>,
        tempfile::TempDir,
    ) {
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::default());
        let dir = tempfile::tempdir().unwrap();
        let session = GradingSession::new(
            Arc::clone(&api),
            Arc::clone(&notifier),
            Exporter::with_dir(dir.path()),
        );
        (session, api, notifier, dir)
    }

    fn scored_api() -> FakeApi {
        FakeApi {
            evaluation_response: Some(json!({"answers": ["Q1 correct", "Q2 wrong"]})),
            ..FakeApi::default()
        }
    }

    #[tokio::test]
    async fn test_cancelled_selection_changes_nothing() {
        let (session, api, notifier, _dir) = session_with(FakeApi::default());

        let result = session.select_file(Role::Key, None).await.unwrap();

        assert!(result.is_none());
        assert_eq!(api.extract_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.snapshot().phase, SessionPhase::Empty);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_full_scenario_builds_wrapped_request() {
        let (session, api, _notifier, _dir) = session_with(scored_api());

        session.select_file(Role::Key, upload("key.pdf", "A,B")).await.unwrap();
        assert!(!session.can_calculate_marks());
        session
            .select_file(Role::Student, upload("student.pdf", "A,C"))
            .await
            .unwrap();
        assert!(session.can_calculate_marks());

        let result = session.calculate_marks().await.unwrap();

        let request = api.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"answer_key": {"answers": ["A", "B"]}, "student": {"answers": ["A", "C"]}})
        );
        assert_eq!(result.body(), &json!({"answers": ["Q1 correct", "Q2 wrong"]}));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Evaluated);
        assert!(!snapshot.processing);
        assert!(snapshot.render().contains("1. Q1 correct"));
    }

    #[tokio::test]
    async fn test_extractions_run_concurrently() {
        let (session, _api, _notifier, _dir) = session_with(scored_api());

        let (key, student) = tokio::join!(
            session.select_key_file(upload("key.pdf", "A")),
            session.select_student_file(upload("student.pdf", "B")),
        );

        assert_eq!(key.unwrap().unwrap().answers().unwrap(), ["A"]);
        assert_eq!(student.unwrap().unwrap().answers().unwrap(), ["B"]);
        assert_eq!(session.snapshot().phase, SessionPhase::ReadyToEvaluate);
    }

    #[tokio::test]
    async fn test_student_extraction_failure_keeps_key_and_blocks_marks() {
        let (session, api, notifier, _dir) = session_with(scored_api());

        session.select_file(Role::Key, upload("key.pdf", "A,B")).await.unwrap();
        let err = session
            .select_file(Role::Student, upload("fail.pdf", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Api { role: Role::Student, .. }));
        let snapshot = session.snapshot();
        assert_eq!(
            snapshot.key.extraction.as_ref().unwrap().answers().unwrap(),
            ["A", "B"]
        );
        assert!(snapshot.student.extraction.as_ref().is_none());
        assert_eq!(snapshot.student.file_name.as_deref(), Some("fail.pdf"));
        assert!(!snapshot.can_calculate_marks);
        assert_eq!(notifier.messages(), vec![EXTRACTION_FAILED_STUDENT]);

        // 前置条件不满足：不发请求
        let err = session.calculate_marks().await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::MissingExtractions { ref missing } if missing == &vec![Role::Student]
        ));
        assert_eq!(api.evaluate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.messages().last().unwrap(), EXTRACT_BOTH_FIRST);
    }

    #[tokio::test]
    async fn test_failed_reextraction_keeps_prior_success() {
        let (session, _api, _notifier, _dir) = session_with(scored_api());

        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        let _ = session.select_file(Role::Key, upload("fail-2.pdf", "")).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.key.extraction.as_ref().unwrap().answers().unwrap(), ["A"]);
        assert_eq!(snapshot.key.file_name.as_deref(), Some("fail-2.pdf"));
    }

    #[tokio::test]
    async fn test_evaluation_failure_keeps_state_and_clears_flag() {
        let (session, _api, notifier, _dir) = session_with(FakeApi::default());

        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        session.select_file(Role::Student, upload("s.pdf", "A")).await.unwrap();

        let err = session.calculate_marks().await.unwrap_err();

        assert!(matches!(err, EvaluationError::Api(ApiError::BadStatus { status: 503, .. })));
        let snapshot = session.snapshot();
        assert!(!snapshot.processing);
        assert!(snapshot.evaluation.as_ref().is_none());
        assert_eq!(snapshot.phase, SessionPhase::ReadyToEvaluate);
        assert!(snapshot.can_calculate_marks);
        assert_eq!(notifier.messages(), vec![EVALUATION_FAILED]);
    }

    #[tokio::test]
    async fn test_processing_flag_visible_only_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let (session, _api, notifier, _dir) = session_with(FakeApi {
            gate: Some(Arc::clone(&gate)),
            ..scored_api()
        });
        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        session.select_file(Role::Student, upload("s.pdf", "A")).await.unwrap();
        assert!(!session.snapshot().processing);

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.calculate_marks().await }
        });
        while !session.snapshot().processing {
            tokio::task::yield_now().await;
        }

        assert!(!session.can_calculate_marks());
        let err = session.calculate_marks().await.unwrap_err();
        assert!(matches!(err, EvaluationError::InProgress));
        assert_eq!(notifier.messages(), vec![EVALUATION_IN_PROGRESS]);

        gate.notify_one();
        running.await.unwrap().unwrap();
        assert!(!session.snapshot().processing);
    }

    #[tokio::test]
    async fn test_reset_mid_flight_discards_late_evaluation() {
        let gate = Arc::new(Notify::new());
        let (session, _api, notifier, _dir) = session_with(FakeApi {
            gate: Some(Arc::clone(&gate)),
            ..scored_api()
        });
        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        session.select_file(Role::Student, upload("s.pdf", "B")).await.unwrap();

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.calculate_marks().await }
        });
        while !session.snapshot().processing {
            tokio::task::yield_now().await;
        }

        session.reset();
        gate.notify_one();

        let err = running.await.unwrap().unwrap_err();
        assert!(matches!(err, EvaluationError::Superseded));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Empty);
        assert!(snapshot.evaluation.as_ref().is_none());
        assert!(!snapshot.processing);
        assert!(!snapshot.can_calculate_marks);
        assert!(snapshot.render_panel(Role::Key).contains(NO_EXTRACTION_YET));
        assert!(snapshot.render_panel(Role::Student).contains(NO_EXTRACTION_YET));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_reextraction_mid_flight_discards_late_evaluation() {
        let gate = Arc::new(Notify::new());
        let (session, _api, notifier, _dir) = session_with(FakeApi {
            gate: Some(Arc::clone(&gate)),
            ..scored_api()
        });
        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        session.select_file(Role::Student, upload("s.pdf", "B")).await.unwrap();

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.calculate_marks().await }
        });
        while !session.snapshot().processing {
            tokio::task::yield_now().await;
        }

        // 评分进行中重新提取学生试卷
        session
            .select_student_file(upload("s-v2.pdf", "Z"))
            .await
            .unwrap();
        gate.notify_one();

        let err = running.await.unwrap().unwrap_err();
        assert!(matches!(err, EvaluationError::Superseded));

        let snapshot = session.snapshot();
        assert_eq!(
            snapshot.student.extraction.as_ref().unwrap().answers().unwrap(),
            ["Z"]
        );
        assert!(snapshot.evaluation.as_ref().is_none());
        assert!(!snapshot.processing);
        assert_eq!(snapshot.phase, SessionPhase::ReadyToEvaluate);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_result_without_answers_downloads_but_blocks_marks() {
        let (session, api, notifier, dir) = session_with(scored_api());
        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();

        let stored = session
            .select_file(Role::Student, upload("raw.pdf", "no answers"))
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.has_answers());

        let path = session.download_extracted_student().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n  \"text\": \"no answers\",\n  \"pages\": 2\n}"
        );

        assert!(!session.can_calculate_marks());
        let err = session.calculate_marks().await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::MissingExtractions { ref missing } if missing == &vec![Role::Student]
        ));
        assert_eq!(api.evaluate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.messages().last().unwrap(), EXTRACT_BOTH_FIRST);
        assert!(path.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_cancelled_evaluation_future_clears_flag() {
        let gate = Arc::new(Notify::new());
        let (session, _api, _notifier, _dir) = session_with(FakeApi {
            gate: Some(gate),
            ..scored_api()
        });
        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        session.select_file(Role::Student, upload("s.pdf", "B")).await.unwrap();

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.calculate_marks().await }
        });
        while !session.snapshot().processing {
            tokio::task::yield_now().await;
        }

        running.abort();
        let _ = running.await;

        assert!(!session.snapshot().processing);
        assert!(session.can_calculate_marks());
    }

    #[tokio::test]
    async fn test_download_without_extraction_notifies() {
        let (session, _api, notifier, dir) = session_with(FakeApi::default());

        let err = session.download_extracted_key().unwrap_err();

        assert!(matches!(err, DownloadError::NothingToDownload { role: Role::Key }));
        assert_eq!(notifier.messages(), vec![NOTHING_TO_DOWNLOAD]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(session.snapshot().phase, SessionPhase::Empty);
    }

    #[tokio::test]
    async fn test_download_writes_named_file() {
        let (session, _api, notifier, dir) = session_with(FakeApi::default());
        session
            .select_file(Role::Student, upload("s.pdf", "A,C"))
            .await
            .unwrap();

        let path = session.download_extracted_student().unwrap();

        assert_eq!(path, dir.path().join("extracted-student-paper.json"));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"answers": ["A", "C"]}));
        assert_eq!(notifier.notices.lock().unwrap()[0].level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn test_reset_clears_all_categories() {
        let (session, _api, _notifier, _dir) = session_with(scored_api());
        session.select_file(Role::Key, upload("key.pdf", "A")).await.unwrap();
        session.select_file(Role::Student, upload("s.pdf", "A")).await.unwrap();
        session.calculate_marks().await.unwrap();

        session.reset();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Empty);
        assert!(snapshot.key.file_name.is_none());
        assert!(snapshot.student.file_name.is_none());
        assert!(snapshot.evaluation.as_ref().is_none());
        assert_eq!(snapshot.generation.value(), 1);
    }
}
