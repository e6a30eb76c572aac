use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单侧答案容器：`{ "answers": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub answers: Vec<String>,
}

/// 评分请求体
///
/// 两侧答案必须分别包在各自的容器里，而不是直接发送数组。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub answer_key: AnswerSet,
    pub student: AnswerSet,
}

impl EvaluationRequest {
    pub fn new(key: &[String], student: &[String]) -> Self {
        Self {
            answer_key: AnswerSet {
                answers: key.to_vec(),
            },
            student: AnswerSet {
                answers: student.to_vec(),
            },
        }
    }
}

/// 评分接口返回的结果，原样保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationResult(Value);

impl EvaluationResult {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    pub fn body(&self) -> &Value {
        &self.0
    }

    /// 根据响应形状决定展示方式
    pub fn view(&self) -> EvaluationView {
        match &self.0 {
            Value::Object(fields) => match fields.get("answers") {
                Some(Value::Array(items)) => {
                    EvaluationView::Answers(items.iter().map(display_value).collect())
                }
                _ => EvaluationView::Fields(
                    fields
                        .iter()
                        .map(|(label, value)| (label.clone(), display_value(value)))
                        .collect(),
                ),
            },
            other => EvaluationView::Raw(other.to_string()),
        }
    }
}

/// 评分结果的两种（加上兜底共三种）展示形状
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationView {
    /// `{ "answers": [...] }`：有序列表
    Answers(Vec<String>),
    /// 任意映射：字段名/值对
    Fields(Vec<(String, String)>),
    /// 非对象响应
    Raw(String),
}

impl EvaluationView {
    pub fn render(&self) -> String {
        match self {
            EvaluationView::Answers(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}", i + 1, item))
                .collect::<Vec<_>>()
                .join("\n"),
            EvaluationView::Fields(fields) => fields
                .iter()
                .map(|(label, value)| format!("{}: {}", label, value))
                .collect::<Vec<_>>()
                .join("\n"),
            EvaluationView::Raw(text) => text.clone(),
        }
    }
}

// 字符串原样显示，其余（包括嵌套对象）序列化为紧凑 JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let key = vec!["A".to_string(), "B".to_string()];
        let student = vec!["A".to_string(), "C".to_string()];
        let body = serde_json::to_value(EvaluationRequest::new(&key, &student)).unwrap();
        assert_eq!(
            body,
            json!({"answer_key": {"answers": ["A", "B"]}, "student": {"answers": ["A", "C"]}})
        );
    }

    #[test]
    fn test_request_body_keeps_containers_for_empty_lists() {
        let empty: Vec<String> = vec![];
        let body = serde_json::to_value(EvaluationRequest::new(&empty, &empty)).unwrap();
        assert_eq!(
            body,
            json!({"answer_key": {"answers": []}, "student": {"answers": []}})
        );
    }

    #[test]
    fn test_view_answers_list() {
        let result = EvaluationResult::new(json!({"answers": ["Q1: correct", "Q2: wrong"]}));
        let view = result.view();
        assert_eq!(
            view,
            EvaluationView::Answers(vec!["Q1: correct".into(), "Q2: wrong".into()])
        );
        assert_eq!(view.render(), "1. Q1: correct\n2. Q2: wrong");
    }

    #[test]
    fn test_view_field_mapping_serializes_nested_objects() {
        let result = EvaluationResult::new(json!({
            "score": 7,
            "grade": "B",
            "details": {"q1": true},
            "missing": null
        }));
        let EvaluationView::Fields(fields) = result.view() else {
            panic!("应为字段映射");
        };
        assert!(fields.contains(&("score".to_string(), "7".to_string())));
        assert!(fields.contains(&("grade".to_string(), "B".to_string())));
        assert!(fields.contains(&("details".to_string(), r#"{"q1":true}"#.to_string())));
        assert!(fields.contains(&("missing".to_string(), "null".to_string())));
    }

    #[test]
    fn test_view_non_array_answers_falls_back_to_fields() {
        let result = EvaluationResult::new(json!({"answers": "none"}));
        assert_eq!(
            result.view(),
            EvaluationView::Fields(vec![("answers".into(), "none".into())])
        );
    }

    #[test]
    fn test_view_non_object_body() {
        let result = EvaluationResult::new(json!([1, 2]));
        assert_eq!(result.view(), EvaluationView::Raw("[1,2]".into()));
    }
}
