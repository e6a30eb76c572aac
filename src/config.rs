use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::Path;

/// 程序配置
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 评分服务地址
    pub api_base_url: String,
    /// 下载文件存放目录
    pub download_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 一次性模式 ---
    /// 答案文件路径
    pub answer_key_file: Option<String>,
    /// 学生试卷文件路径
    pub student_paper_file: Option<String>,
    /// 评分后自动导出两份提取结果
    pub auto_download: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://hammad712-grading.hf.space".to_string(),
            download_dir: ".".to_string(),
            verbose_logging: false,
            answer_key_file: None,
            student_paper_file: None,
            auto_download: false,
        }
    }
}

impl Config {
    /// 读取配置：`GRADING_CONFIG` 指向的 TOML 文件（可选），再叠加环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("GRADING_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str::<Self>(&content)
            .map(Self::normalized)
            .map_err(|source| {
                AppError::File(FileError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            })
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        let config = Self {
            api_base_url: std::env::var("GRADING_API_BASE_URL").unwrap_or(self.api_base_url),
            download_dir: std::env::var("DOWNLOAD_DIR").unwrap_or(self.download_dir),
            verbose_logging: env_bool("VERBOSE_LOGGING")?.unwrap_or(self.verbose_logging),
            answer_key_file: std::env::var("ANSWER_KEY_FILE").ok().or(self.answer_key_file),
            student_paper_file: std::env::var("STUDENT_PAPER_FILE")
                .ok()
                .or(self.student_paper_file),
            auto_download: env_bool("AUTO_DOWNLOAD")?.unwrap_or(self.auto_download),
        };
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        self
    }

    fn validate(&self) -> AppResult<()> {
        let url = &self.api_base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl { url: url.clone() }.into());
        }
        Ok(())
    }

    /// 两个文件都已配置时进入一次性模式
    pub fn one_shot_files(&self) -> Option<(&str, &str)> {
        match (&self.answer_key_file, &self.student_paper_file) {
            (Some(key), Some(student)) => Some((key.as_str(), student.as_str())),
            _ => None,
        }
    }
}

fn env_bool(var_name: &str) -> AppResult<Option<bool>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<bool>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: "bool".to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
