//! 教学大纲目录（科目 → 知识点 → 描述）
//!
//! 外部静态数据，仅用于录入时校验科目/知识点组合和填充下拉选项，不落库。
//! 文件格式：
//! ```json
//! { "Physics": { "Kinematics": { "description": "..." } } }
//! ```
//! 科目与知识点保持文件中的书写顺序。

use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use crate::error::{McqError, McqResult};

/// 内置大纲
const BUILTIN_SYLLABUS: &str = include_str!("../data/syllabus.json");

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub name: String,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Syllabus {
    subjects: Vec<Subject>,
}

impl Syllabus {
    /// 随 crate 发布的默认大纲
    pub fn builtin() -> McqResult<Self> {
        Self::from_json_str(BUILTIN_SYLLABUS)
    }

    pub fn from_path(path: &Path) -> McqResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            McqError::Config(format!("Failed to read syllabus {}: {}", path.display(), e))
        })?;
        let syllabus = Self::from_json_str(&raw)?;
        info!(
            "[Syllabus] Loaded {} subjects from {}",
            syllabus.subjects.len(),
            path.display()
        );
        Ok(syllabus)
    }

    pub fn from_json_str(raw: &str) -> McqResult<Self> {
        let root: Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| McqError::Config(format!("Invalid syllabus JSON: {}", e)))?;

        let mut subjects = Vec::with_capacity(root.len());
        for (subject_name, topics_value) in root {
            let topics_map = topics_value.as_object().ok_or_else(|| {
                McqError::Config(format!("Subject '{}' must map to an object", subject_name))
            })?;

            let mut topics = Vec::with_capacity(topics_map.len());
            for (topic_name, topic_value) in topics_map {
                // 兼容 {"topic": "描述"} 的简写
                let description = match topic_value {
                    Value::String(s) => s.clone(),
                    Value::Object(obj) => obj
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    _ => {
                        return Err(McqError::Config(format!(
                            "Topic '{}' under '{}' has an unsupported shape",
                            topic_name, subject_name
                        )))
                    }
                };
                topics.push(Topic {
                    name: topic_name.clone(),
                    description,
                });
            }

            subjects.push(Subject {
                name: subject_name,
                topics,
            });
        }

        Ok(Self { subjects })
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|s| s.name.as_str())
    }

    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// 某科目下的知识点；科目不存在时返回 None
    pub fn topics(&self, subject: &str) -> Option<Vec<&str>> {
        self.subject(subject)
            .map(|s| s.topics.iter().map(|t| t.name.as_str()).collect())
    }

    pub fn description(&self, subject: &str, topic: &str) -> Option<&str> {
        self.subject(subject)?
            .topics
            .iter()
            .find(|t| t.name == topic)
            .map(|t| t.description.as_str())
    }

    pub fn contains(&self, subject: &str, topic: &str) -> bool {
        self.description(subject, topic).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Physics": {
            "Optics": {"description": "Light"},
            "Kinematics": {"description": "Motion"}
        },
        "Mathematics": {"Algebra": "Equations"}
    }"#;

    #[test]
    fn test_preserves_authored_order() {
        let s = Syllabus::from_json_str(SAMPLE).unwrap();
        assert_eq!(s.subjects().collect::<Vec<_>>(), vec!["Physics", "Mathematics"]);
        assert_eq!(s.topics("Physics").unwrap(), vec!["Optics", "Kinematics"]);
        assert!(s.topics("Biology").is_none());
    }

    #[test]
    fn test_description_and_membership() {
        let s = Syllabus::from_json_str(SAMPLE).unwrap();
        assert_eq!(s.description("Physics", "Kinematics"), Some("Motion"));
        assert_eq!(s.description("Mathematics", "Algebra"), Some("Equations"));
        assert!(s.contains("Physics", "Optics"));
        // 知识点必须属于所选科目
        assert!(!s.contains("Mathematics", "Optics"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(Syllabus::from_json_str(r#"{"Physics": 3}"#).is_err());
        assert!(Syllabus::from_json_str("[]").is_err());
    }

    #[test]
    fn test_builtin_loads() {
        let s = Syllabus::builtin().unwrap();
        assert!(!s.is_empty());
        assert!(s.contains("Physics", "Kinematics"));
    }
}
