//! 会话快照与文本渲染

use crate::models::{EvaluationResult, ExtractionResult, Role};
use crate::session::state::{Generation, RolePhase, RoleState, SessionPhase, Slot};
use crate::utils::logging::truncate_text;

/// 提取面板的占位文字
pub const NO_EXTRACTION_YET: &str = "暂无提取结果 (No extraction yet.)";

/// 响应没有 answers 字段时的提示
pub const NO_ANSWERS_FIELD: &str = "响应中没有 answers 字段，只能下载，不能评分";

/// 单个角色的展示数据
#[derive(Debug, Clone, PartialEq)]
pub struct RoleView {
    pub file_name: Option<String>,
    pub extraction: Slot<ExtractionResult>,
    pub in_flight: bool,
    pub phase: RolePhase,
}

impl From<RoleState> for RoleView {
    fn from(state: RoleState) -> Self {
        Self {
            file_name: state.upload.as_ref().map(|f| f.file_name.clone()),
            in_flight: state.is_in_flight(),
            phase: state.phase(),
            extraction: state.extraction,
        }
    }
}

/// 会话快照
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub generation: Generation,
    pub phase: SessionPhase,
    pub key: RoleView,
    pub student: RoleView,
    pub evaluation: Slot<EvaluationResult>,
    pub processing: bool,
    pub can_calculate_marks: bool,
}

impl SessionSnapshot {
    pub fn role(&self, role: Role) -> &RoleView {
        match role {
            Role::Key => &self.key,
            Role::Student => &self.student,
        }
    }

    /// 渲染提取面板
    pub fn render_panel(&self, role: Role) -> String {
        let view = self.role(role);
        let mut lines = vec![format!("==== {} ====", role.panel_title())];

        if let Some(name) = &view.file_name {
            lines.push(format!("✓ {} 已上传: {}", role.name(), name));
        }
        if view.in_flight {
            lines.push("⏳ 正在提取...".to_string());
        }

        match view.extraction.as_ref() {
            Some(result) => match result.answers() {
                Some(answers) => lines.extend(
                    answers
                        .iter()
                        .enumerate()
                        .map(|(i, answer)| format!("{}. {}", i + 1, answer)),
                ),
                None => {
                    lines.push(NO_ANSWERS_FIELD.to_string());
                    lines.push(truncate_text(&result.to_value().to_string(), 200));
                }
            },
            None => lines.push(NO_EXTRACTION_YET.to_string()),
        }

        lines.join("\n")
    }

    /// 渲染评分结果，没有结果时返回 None
    pub fn render_evaluation(&self) -> Option<String> {
        self.evaluation
            .as_ref()
            .map(|result| format!("==== 评分结果 ====\n{}", result.view().render()))
    }

    /// 状态行
    pub fn render_status(&self) -> String {
        let marks = if self.processing {
            "Processing"
        } else if self.can_calculate_marks {
            "可用"
        } else {
            "不可用（需要两份提取结果）"
        };
        format!("[会话 #{}] 计算分数: {}", self.generation.value(), marks)
    }

    /// 完整渲染：学生面板在左、答案面板在右的顺序，然后是评分结果
    pub fn render(&self) -> String {
        let mut sections = vec![
            self.render_panel(Role::Student),
            self.render_panel(Role::Key),
        ];
        if let Some(evaluation) = self.render_evaluation() {
            sections.push(evaluation);
        }
        sections.push(self.render_status());
        sections.join("\n\n")
    }
}
