//! 会话上下文
//!
//! 一个会话内的全部状态：两个上传槽、两个提取结果、评分结果、处理中标记。
//! 工作流只返回 [`Transition`]，由 [`SessionState::apply`] 统一应用。
//! 每个请求发出时都会拿到一张票据，会话重置后到达的旧响应凭票据识别并丢弃。

use std::sync::Arc;

use crate::error::{ApiError, EvaluationError, ExtractionError};
use crate::models::{EvaluationRequest, EvaluationResult, ExtractionResult, Role, UploadFile};
use crate::session::view::SessionSnapshot;

/// 显式的有/无两态
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Absent,
    Present(T),
}

impl<T> Slot<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Slot::Present(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Slot::Present(value) => Some(value),
            Slot::Absent => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Slot::Absent;
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Absent
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Slot::Present(v),
            None => Slot::Absent,
        }
    }
}

/// 会话代数，每次重置加一
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// 提取请求票据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionTicket {
    pub generation: Generation,
    pub role: Role,
    /// 同一角色内递增的请求序号
    pub seq: u64,
}

/// 评分请求票据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationTicket {
    pub generation: Generation,
    /// 发出请求时的提取纪元；之后任何一侧写入新的提取结果都会使其过期
    pub epoch: u64,
}

/// 工作流返回的状态迁移
#[derive(Debug)]
pub enum Transition {
    Extracted {
        ticket: ExtractionTicket,
        result: ExtractionResult,
    },
    ExtractionFailed {
        ticket: ExtractionTicket,
        error: ExtractionError,
    },
    Evaluated {
        ticket: EvaluationTicket,
        result: EvaluationResult,
    },
    EvaluationFailed {
        ticket: EvaluationTicket,
        error: ApiError,
    },
}

/// 迁移应用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// 结果已写入会话
    Stored,
    /// 失败，会话保持原状
    Unchanged,
    /// 票据已过期，响应被丢弃
    Stale,
}

/// 单个角色的状态
#[derive(Debug, Clone, Default)]
pub struct RoleState {
    pub upload: Slot<Arc<UploadFile>>,
    pub extraction: Slot<ExtractionResult>,
    issued: u64,
    settled: u64,
}

impl RoleState {
    /// 最新一次提取请求是否还没有返回
    pub fn is_in_flight(&self) -> bool {
        self.issued > self.settled
    }

    pub fn phase(&self) -> RolePhase {
        if self.extraction.is_present() {
            RolePhase::Extracted
        } else if self.upload.is_present() {
            RolePhase::Pending
        } else {
            RolePhase::Empty
        }
    }
}

/// 单个角色所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePhase {
    Empty,
    Pending,
    Extracted,
}

/// 整个会话所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Intake { key: RolePhase, student: RolePhase },
    ReadyToEvaluate,
    Evaluating,
    Evaluated,
}

/// 会话上下文
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    generation: Generation,
    key: RoleState,
    student: RoleState,
    evaluation: Slot<EvaluationResult>,
    processing: bool,
    /// 每写入一次提取结果加一
    epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn role(&self, role: Role) -> &RoleState {
        match role {
            Role::Key => &self.key,
            Role::Student => &self.student,
        }
    }

    fn role_mut(&mut self, role: Role) -> &mut RoleState {
        match role {
            Role::Key => &mut self.key,
            Role::Student => &mut self.student,
        }
    }

    pub fn extraction(&self, role: Role) -> Option<&ExtractionResult> {
        self.role(role).extraction.as_ref()
    }

    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        self.evaluation.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// 还没有可评分答案的角色（未提取，或响应缺少 answers）
    pub fn missing_extractions(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| {
                !self
                    .extraction(*role)
                    .is_some_and(ExtractionResult::has_answers)
            })
            .collect()
    }

    /// “计算分数”是否可用
    pub fn can_calculate_marks(&self) -> bool {
        self.missing_extractions().is_empty() && !self.processing
    }

    /// 记录选中的文件并签发提取票据
    ///
    /// 旧的提取结果保留，直到新的响应到达。
    pub fn select_file(&mut self, role: Role, file: Arc<UploadFile>) -> ExtractionTicket {
        let generation = self.generation;
        let slot = self.role_mut(role);
        slot.upload = Slot::Present(file);
        slot.issued += 1;
        ExtractionTicket {
            generation,
            role,
            seq: slot.issued,
        }
    }

    /// 检查前置条件，置处理中标记，构建请求体
    pub fn begin_evaluation(
        &mut self,
    ) -> Result<(EvaluationTicket, EvaluationRequest), EvaluationError> {
        if self.processing {
            return Err(EvaluationError::InProgress);
        }

        let key = self.extraction(Role::Key).and_then(ExtractionResult::answers);
        let student = self.extraction(Role::Student).and_then(ExtractionResult::answers);
        let (key, student) = match (key, student) {
            (Some(key), Some(student)) => (key, student),
            _ => {
                return Err(EvaluationError::MissingExtractions {
                    missing: self.missing_extractions(),
                })
            }
        };

        let request = EvaluationRequest::new(key, student);
        self.processing = true;

        Ok((
            EvaluationTicket {
                generation: self.generation,
                epoch: self.epoch,
            },
            request,
        ))
    }

    /// 清除处理中标记（只对本代会话的票据生效）
    pub fn finish_evaluation(&mut self, ticket: EvaluationTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.processing = false;
        true
    }

    fn is_current_evaluation(&self, ticket: &EvaluationTicket) -> bool {
        ticket.generation == self.generation && ticket.epoch == self.epoch
    }

    fn is_current_extraction(&self, ticket: &ExtractionTicket) -> bool {
        ticket.generation == self.generation && ticket.seq >= self.role(ticket.role).issued
    }

    /// 应用工作流返回的迁移
    pub fn apply(&mut self, transition: &Transition) -> Applied {
        match transition {
            Transition::Extracted { ticket, result } => {
                if !self.is_current_extraction(ticket) {
                    return Applied::Stale;
                }
                let slot = self.role_mut(ticket.role);
                slot.extraction = Slot::Present(result.clone());
                slot.settled = ticket.seq;
                // 评分结果与旧的提取结果对应，已失效；进行中的评分也随之过期
                self.evaluation.clear();
                self.epoch += 1;
                Applied::Stored
            }
            Transition::ExtractionFailed { ticket, .. } => {
                if !self.is_current_extraction(ticket) {
                    return Applied::Stale;
                }
                self.role_mut(ticket.role).settled = ticket.seq;
                Applied::Unchanged
            }
            Transition::Evaluated { ticket, result } => {
                if !self.is_current_evaluation(ticket) {
                    return Applied::Stale;
                }
                self.evaluation = Slot::Present(result.clone());
                Applied::Stored
            }
            Transition::EvaluationFailed { ticket, .. } => {
                if !self.is_current_evaluation(ticket) {
                    return Applied::Stale;
                }
                Applied::Unchanged
            }
        }
    }

    /// 重置为空会话，代数加一
    pub fn reset(&mut self) {
        *self = SessionState {
            generation: self.generation.next(),
            ..SessionState::default()
        };
    }

    pub fn phase(&self) -> SessionPhase {
        if self.processing {
            return SessionPhase::Evaluating;
        }
        if self.evaluation.is_present() {
            return SessionPhase::Evaluated;
        }
        if self.missing_extractions().is_empty() {
            return SessionPhase::ReadyToEvaluate;
        }
        match (self.key.phase(), self.student.phase()) {
            (RolePhase::Empty, RolePhase::Empty) => SessionPhase::Empty,
            (key, student) => SessionPhase::Intake { key, student },
        }
    }

    /// 拷贝一份用于展示的快照
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            phase: self.phase(),
            key: self.key.clone().into(),
            student: self.student.clone().into(),
            evaluation: self.evaluation.clone(),
            processing: self.processing,
            can_calculate_marks: self.can_calculate_marks(),
        }
    }
}
