use thiserror::Error;

use crate::models::Role;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 提取相关错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 评分相关错误
    #[error("评分错误: {0}")]
    Evaluation(#[from] EvaluationError),
    /// 下载相关错误
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 远程接口调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 接口返回非成功状态码
    #[error("API返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 响应体不是合法 JSON
    #[error("JSON解析失败 ({endpoint}): {source}")]
    InvalidJson {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    /// 无法构建上传表单
    #[error("无法构建上传请求 ({file_name}): {source}")]
    InvalidUpload {
        file_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }
}

/// 提取接口返回内容的结构错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("响应不是 JSON 对象")]
    NotAnObject,
    #[error("answers 字段不是数组")]
    AnswersNotAList,
    #[error("answers[{index}] 不是字符串")]
    NonStringAnswer { index: usize },
}

/// 提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 调用提取接口失败
    #[error("{role}提取请求失败: {source}")]
    Api {
        role: Role,
        #[source]
        source: ApiError,
    },
    /// 提取结果格式不符合约定
    #[error("{role}提取结果格式错误: {source}")]
    Payload {
        role: Role,
        #[source]
        source: PayloadError,
    },
    /// 会话已重置或同一角色有更新的请求，结果被丢弃
    #[error("{role}的提取结果已过期，已丢弃")]
    Superseded { role: Role },
}

impl ExtractionError {
    pub fn role(&self) -> Role {
        match self {
            ExtractionError::Api { role, .. }
            | ExtractionError::Payload { role, .. }
            | ExtractionError::Superseded { role } => *role,
        }
    }

    /// 是否是因过期被丢弃（不需要提示用户）
    pub fn is_superseded(&self) -> bool {
        matches!(self, ExtractionError::Superseded { .. })
    }
}

/// 评分错误
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// 本地前置条件不满足：缺少提取结果
    #[error("缺少提取结果: {}", format_roles(.missing))]
    MissingExtractions { missing: Vec<Role> },
    /// 已有评分请求在进行中
    #[error("评分正在进行中")]
    InProgress,
    /// 调用评分接口失败
    #[error("评分请求失败: {0}")]
    Api(#[from] ApiError),
    /// 会话已重置或提取结果已更新，结果被丢弃
    #[error("会话已重置或提取结果已更新，评分结果已丢弃")]
    Superseded,
}

impl EvaluationError {
    /// 是否是本地拒绝（没有发出网络请求）
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            EvaluationError::MissingExtractions { .. } | EvaluationError::InProgress
        )
    }
}

/// 下载错误
#[derive(Debug, Error)]
pub enum DownloadError {
    /// 没有可下载的提取结果
    #[error("{role}暂无可下载的提取结果")]
    NothingToDownload { role: Role },
    /// 序列化失败
    #[error("{role}提取结果序列化失败: {source}")]
    Serialize {
        role: Role,
        #[source]
        source: serde_json::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 接口地址不合法
    #[error("接口地址不合法: '{url}'")]
    InvalidBaseUrl { url: String },
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.name())
        .collect::<Vec<_>>()
        .join("、")
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_extractions_message_lists_roles() {
        let err = EvaluationError::MissingExtractions {
            missing: vec![Role::Key, Role::Student],
        };
        assert_eq!(err.to_string(), "缺少提取结果: 答案、学生试卷");
        assert!(err.is_local());
    }

    #[test]
    fn test_extraction_error_role() {
        let err = ExtractionError::Payload {
            role: Role::Student,
            source: PayloadError::AnswersNotAList,
        };
        assert_eq!(err.role(), Role::Student);
        assert!(!err.is_superseded());
        assert!(ExtractionError::Superseded { role: Role::Key }.is_superseded());
    }

    #[test]
    fn test_app_error_wraps_download_error() {
        let err: AppError = DownloadError::NothingToDownload { role: Role::Key }.into();
        assert!(matches!(err, AppError::Download(_)));
        assert!(err.to_string().contains("暂无可下载"));
    }
}
