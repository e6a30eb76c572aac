use crate::error::PayloadError;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// 从一份文档中提取出的结果
///
/// 整个响应对象按服务端的字段顺序原样保存，下载时逐字段写出。
/// `answers` 存在时已校验为字符串数组；缺少该字段的响应仍然保存，
/// 可以下载，但不能用于评分。
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    answers: Option<Vec<String>>,
    body: Map<String, Value>,
}

impl ExtractionResult {
    /// 只含 `answers` 的结果
    pub fn new(answers: Vec<String>) -> Self {
        let mut body = Map::new();
        body.insert(
            "answers".to_string(),
            Value::Array(answers.iter().cloned().map(Value::String).collect()),
        );
        Self {
            answers: Some(answers),
            body,
        }
    }

    /// 校验提取接口的响应体并转换
    pub fn from_response(body: Value) -> Result<Self, PayloadError> {
        let Value::Object(body) = body else {
            return Err(PayloadError::NotAnObject);
        };

        let answers = match body.get("answers") {
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| match item {
                        Value::String(s) => Ok(s.clone()),
                        _ => Err(PayloadError::NonStringAnswer { index }),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => return Err(PayloadError::AnswersNotAList),
            None => None,
        };

        Ok(Self { answers, body })
    }

    /// 提取出的答案；响应缺少 `answers` 时为 `None`
    pub fn answers(&self) -> Option<&[String]> {
        self.answers.as_deref()
    }

    /// 是否可以参与评分
    pub fn has_answers(&self) -> bool {
        self.answers.is_some()
    }

    /// 除 `answers` 以外的字段
    pub fn extra(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.body.iter().filter(|(key, _)| key.as_str() != "answers")
    }

    /// 还原为完整的 JSON 对象
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// 两个空格缩进的 JSON 文本
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.body)
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}
