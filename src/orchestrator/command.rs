//! 终端命令解析
//!
//! 每行输入对应一个用户命令，支持英文简写和中文别名

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Role;

/// 用法说明
pub const USAGE: &str = "\
可用命令:
  key <文件路径>          选择答案文件并提取      (别名: k, 答案)
  student <文件路径>      选择学生试卷并提取      (别名: s, paper, 学生)
  download key|student    导出提取结果            (别名: dl, 下载)
  marks                   计算分数                (别名: m, calc, 评分)
  new                     新会话                  (别名: reset, 新建)
  show                    显示当前面板            (别名: ls, 查看)
  help                    显示本说明              (别名: h, ?, 帮助)
  quit                    退出                    (别名: q, exit, 退出)";

/// 用户命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectFile { role: Role, path: PathBuf },
    Download(Role),
    CalculateMarks,
    NewSession,
    Show,
    Help,
    Quit,
}

/// 命令解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("未知命令: {input}")]
    Unknown { input: String },

    #[error("命令 {command} 缺少参数，用法: {usage}")]
    MissingArgument {
        command: &'static str,
        usage: &'static str,
    },

    #[error("无法识别的角色: {input}（应为 key 或 student）")]
    UnknownRole { input: String },
}

impl Command {
    /// 解析一行输入；空行返回 `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "marks" | "m" | "calc" | "calculate" | "评分" | "计算分数" => Command::CalculateMarks,
            "new" | "reset" | "新建" | "新会话" => Command::NewSession,
            "show" | "ls" | "查看" => Command::Show,
            "help" | "h" | "?" | "帮助" => Command::Help,
            "quit" | "q" | "exit" | "退出" => Command::Quit,
            "download" | "dl" | "下载" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "download",
                        usage: "download key|student",
                    });
                }
                let role = Role::from_str(rest).ok_or_else(|| CommandError::UnknownRole {
                    input: rest.to_string(),
                })?;
                Command::Download(role)
            }
            other => match Role::from_str(other) {
                Some(role) => {
                    if rest.is_empty() {
                        return Err(CommandError::MissingArgument {
                            command: match role {
                                Role::Key => "key",
                                Role::Student => "student",
                            },
                            usage: "key|student <文件路径>",
                        });
                    }
                    Command::SelectFile {
                        role,
                        path: PathBuf::from(unquote(rest)),
                    }
                }
                None => {
                    return Err(CommandError::Unknown {
                        input: line.to_string(),
                    })
                }
            },
        };

        Ok(Some(command))
    }
}

// 去掉拖放路径常带的一对引号
fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
