//! 评分服务 API 客户端
//!
//! 封装提取接口（`POST /extract/`）与评分接口（`POST /evaluate/`）的调用逻辑
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{EvaluationRequest, UploadFile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

/// 远程接口能力
///
/// 只返回原始 JSON，结构校验交给调用方。
#[async_trait]
pub trait GradingApi: Send + Sync {
    /// 上传单个文件并返回提取结果
    async fn extract(&self, file: &UploadFile) -> Result<Value, ApiError>;

    /// 提交两侧答案并返回评分结果
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Value, ApiError>;
}

/// 基于 reqwest 的评分服务客户端
#[derive(Debug, Clone)]
pub struct GradingClient {
    http: Client,
    base_url: String,
}

impl GradingClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.api_base_url)
    }

    /// 使用指定的接口地址创建
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path)
    }

    /// 检查状态码并解析 JSON 响应
    async fn read_json(endpoint: &str, response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::request_failed(endpoint, e))?;

        if !status.is_success() {
            warn!("接口返回错误状态 {}: {}", status, endpoint);
            return Err(ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::InvalidJson {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl GradingApi for GradingClient {
    async fn extract(&self, file: &UploadFile) -> Result<Value, ApiError> {
        let endpoint = self.endpoint("extract");
        debug!(
            "上传文件到提取接口: {} ({} 字节)",
            file.file_name,
            file.len()
        );

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::InvalidUpload {
                file_name: file.file_name.clone(),
                source: Box::new(e),
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;

        Self::read_json(&endpoint, response).await
    }

    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Value, ApiError> {
        let endpoint = self.endpoint("evaluate");
        debug!(
            "提交评分请求: 答案 {} 条, 学生 {} 条",
            request.answer_key.answers.len(),
            request.student.answers.len()
        );

        let response = self
            .http
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;

        Self::read_json(&endpoint, response).await
    }
}
