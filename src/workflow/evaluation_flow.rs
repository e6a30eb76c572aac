//! 评分流程 - 流程层
//!
//! 前置条件检查与处理中标记由会话负责，这里只做一次评分接口往返

use tracing::{error, info};

use crate::clients::GradingApi;
use crate::models::{EvaluationRequest, EvaluationResult};
use crate::session::{EvaluationTicket, Transition};

pub async fn run<A: GradingApi + ?Sized>(
    api: &A,
    ticket: EvaluationTicket,
    request: &EvaluationRequest,
) -> Transition {
    info!(
        "📤 正在计算分数 (答案 {} 条 / 学生 {} 条)...",
        request.answer_key.answers.len(),
        request.student.answers.len()
    );

    match api.evaluate(request).await {
        Ok(body) => {
            info!("✓ 评分完成");
            Transition::Evaluated {
                ticket,
                result: EvaluationResult::new(body),
            }
        }
        Err(e) => {
            error!("❌ 评分请求失败: {}", e);
            Transition::EvaluationFailed { ticket, error: e }
        }
    }
}
