//! 提取结果导出服务 - 业务能力层
//!
//! 只负责"把提取结果写成 JSON 文件"能力，不关心流程

use crate::config::Config;
use crate::error::DownloadError;
use crate::models::{ExtractionResult, Role};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 提取结果导出服务
///
/// 职责：
/// - 将单个角色的提取结果格式化为 JSON
/// - 写入下载目录，文件名由角色决定
/// - 不读取会话状态
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    /// 使用配置中的下载目录创建
    pub fn new(config: &Config) -> Self {
        Self::with_dir(&config.download_dir)
    }

    /// 使用自定义目录创建
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 生成文件名与文件内容
    pub fn render(role: Role, result: &ExtractionResult) -> Result<(String, String), DownloadError> {
        let contents = result
            .to_pretty_json()
            .map_err(|source| DownloadError::Serialize { role, source })?;
        Ok((role.download_file_name().to_string(), contents))
    }

    /// 写出文件
    ///
    /// # 返回
    /// 返回写入的文件路径
    pub fn export(&self, role: Role, result: &ExtractionResult) -> Result<PathBuf, DownloadError> {
        let (file_name, contents) = Self::render(role, result)?;
        let path = self.output_dir.join(file_name);

        debug!("写出{}提取结果: {}", role, path.display());

        fs::create_dir_all(&self.output_dir).map_err(|source| DownloadError::WriteFailed {
            path: self.output_dir.display().to_string(),
            source,
        })?;
        fs::write(&path, contents).map_err(|source| DownloadError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;

        Ok(path)
    }
}
