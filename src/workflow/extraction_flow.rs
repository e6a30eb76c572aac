//! 提取流程 - 流程层
//!
//! 核心职责：定义"一份文档"的提取流程
//!
//! 流程顺序：
//! 1. 上传文件到提取接口
//! 2. 校验 answers 结构
//! 3. 返回 `Transition`，不直接修改会话

use tracing::{info, warn};

use crate::clients::GradingApi;
use crate::error::ExtractionError;
use crate::models::{ExtractionResult, UploadFile};
use crate::session::{ExtractionTicket, Transition};

pub async fn run<A: GradingApi + ?Sized>(
    api: &A,
    ticket: ExtractionTicket,
    file: &UploadFile,
) -> Transition {
    let role = ticket.role;
    info!("[{}] 🔍 正在提取: {}", role, file.file_name);

    let body = match api.extract(file).await {
        Ok(body) => body,
        Err(source) => {
            warn!("[{}] ⚠️ 提取请求失败: {}", role, source);
            return Transition::ExtractionFailed {
                ticket,
                error: ExtractionError::Api { role, source },
            };
        }
    };

    match ExtractionResult::from_response(body) {
        Ok(result) => {
            match result.answers() {
                Some(answers) => info!("[{}] ✓ 提取完成，共 {} 条答案", role, answers.len()),
                None => warn!("[{}] ⚠️ 响应中没有 answers 字段，结果只能下载", role),
            }
            Transition::Extracted { ticket, result }
        }
        Err(source) => {
            warn!("[{}] ⚠️ 提取结果格式错误: {}", role, source);
            Transition::ExtractionFailed {
                ticket,
                error: ExtractionError::Payload { role, source },
            }
        }
    }
}
