/// 文档角色：比较的哪一方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 标准答案
    Key,
    /// 学生试卷
    Student,
}

impl Role {
    /// 全部角色（固定顺序：答案在前）
    pub const ALL: [Role; 2] = [Role::Key, Role::Student];

    /// 获取显示名称
    pub fn name(self) -> &'static str {
        match self {
            Role::Key => "答案",
            Role::Student => "学生试卷",
        }
    }

    /// 面板标题
    pub fn panel_title(self) -> &'static str {
        match self {
            Role::Key => "Answer Key",
            Role::Student => "Student Answers",
        }
    }

    /// 下载时使用的文件名
    pub fn download_file_name(self) -> &'static str {
        match self {
            Role::Key => "extracted-answer-key.json",
            Role::Student => "extracted-student-paper.json",
        }
    }

    /// 尝试从命令参数解析角色
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "key" | "answer-key" | "answer_key" | "answerkey" | "k" | "答案" => Some(Role::Key),
            "student" | "student-paper" | "student_paper" | "paper" | "s" | "学生" | "学生试卷" => {
                Some(Role::Student)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
