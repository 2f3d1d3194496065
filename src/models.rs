//! 题目数据模型
//!
//! - `QuestionDraft`: 录入表单原始输入
//! - `QuestionContent`: 校验后的题目内容（不含 ID 与时间戳）
//! - `Question`: 存储中的题目记录（只读，创建后不再修改）
//!
//! 不变量：选项恰为 A/B/C/D 四项；正确答案必为其中之一；
//! 当且仅当题型为真题（PYQ）时带年份。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::config::AuthoringConfig;
use crate::error::{McqError, McqResult};
use crate::store::{Document, StoredDocument};
use crate::syllabus::Syllabus;

// ============================================================================
// 枚举
// ============================================================================

/// 选项标签
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum OptionLabel {
    #[default]
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(OptionLabel::A),
            "B" | "b" => Some(OptionLabel::B),
            "C" | "c" => Some(OptionLabel::C),
            "D" | "d" => Some(OptionLabel::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 题型；存储值沿用早期记录的写法（"Question Bank" / "PYQ"）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QuestionType {
    #[default]
    #[serde(rename = "Question Bank")]
    QuestionBank,
    #[serde(rename = "PYQ")]
    PastYearQuestion,
    /// 仅用于测试数据
    Dummy,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::QuestionBank => "Question Bank",
            QuestionType::PastYearQuestion => "PYQ",
            QuestionType::Dummy => "Dummy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Question Bank" => Some(QuestionType::QuestionBank),
            "PYQ" => Some(QuestionType::PastYearQuestion),
            "Dummy" => Some(QuestionType::Dummy),
            _ => None,
        }
    }

    pub fn requires_year(&self) -> bool {
        matches!(self, QuestionType::PastYearQuestion)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// 题目内容
// ============================================================================

/// 四个选项，序列化为 {"A": .., "B": .., "C": .., "D": ..}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

impl McqOptions {
    pub fn get(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.a,
            OptionLabel::B => &self.b,
            OptionLabel::C => &self.c,
            OptionLabel::D => &self.d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        OptionLabel::ALL.into_iter().map(move |l| (l, self.get(l)))
    }
}

/// 题目附图（base64 编码）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionImage {
    /// MIME 类型
    pub mime: String,
    /// base64 内容
    pub data: String,
}

impl QuestionImage {
    pub fn from_bytes(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn decode(&self) -> McqResult<Vec<u8>> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| McqError::Serialization(format!("Invalid image data: {}", e)))
    }
}

/// 校验后的题目内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionContent {
    pub question: String,
    pub options: McqOptions,
    pub correct_answer: OptionLabel,
    pub difficulty: Difficulty,
    pub solution: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub year: Option<i32>,
    /// 兼容字段："{subject_name} - {topic_name}"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<QuestionImage>,
}

impl QuestionContent {
    /// 转为存储文档并写入时间戳
    pub fn to_document(&self, created_at: &str, updated_at: &str) -> McqResult<Document> {
        let value = serde_json::to_value(self)?;
        let serde_json::Value::Object(mut fields) = value else {
            return Err(McqError::Serialization(
                "Question content did not serialize to an object".to_string(),
            ));
        };
        fields.insert("created_at".into(), created_at.into());
        fields.insert("updated_at".into(), updated_at.into());
        Ok(fields)
    }

    /// 大小写不敏感的标签匹配；`tag_lower` 须已转小写
    pub fn has_tag_lowercase(&self, tag_lower: &str) -> bool {
        self.tags.iter().any(|t| t.to_lowercase() == tag_lower)
    }
}

/// 题目记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 存储分配的文档 ID
    #[serde(rename = "doc_id")]
    pub id: String,
    #[serde(flatten)]
    pub content: QuestionContent,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Question {
    pub fn from_stored(doc: StoredDocument) -> McqResult<Self> {
        let mut fields = doc.fields;
        fields.insert("doc_id".into(), doc.id.into());
        Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
    }

    /// 展示用科目：优先 "科目 / 知识点"，旧记录回退到 subject
    pub fn subject_label(&self) -> Option<String> {
        match (&self.content.subject_name, &self.content.topic_name) {
            (Some(s), Some(t)) => Some(format!("{} / {}", s, t)),
            _ => self.content.subject.clone(),
        }
    }
}

// ============================================================================
// 录入表单
// ============================================================================

/// 上传的附图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// 录入表单原始输入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionDraft {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: OptionLabel,
    pub difficulty: Difficulty,
    pub solution: String,
    pub question_type: QuestionType,
    pub year: Option<i32>,
    pub subject_name: String,
    pub topic_name: String,
    /// 逗号分隔
    pub tags: String,
    pub image: Option<ImageUpload>,
}

impl QuestionDraft {
    /// 校验并生成题目内容；失败时不产生任何副作用
    pub fn validate(
        &self,
        syllabus: &Syllabus,
        authoring: &AuthoringConfig,
    ) -> McqResult<QuestionContent> {
        let question = required("question", &self.question)?;
        let options = McqOptions {
            a: required("option_a", &self.option_a)?,
            b: required("option_b", &self.option_b)?,
            c: required("option_c", &self.option_c)?,
            d: required("option_d", &self.option_d)?,
        };
        let solution = required("solution", &self.solution)?;

        let year = if self.question_type.requires_year() {
            let year = self
                .year
                .ok_or_else(|| McqError::validation("year", "required for PYQ questions"))?;
            if !authoring.year_range().contains(&year) {
                return Err(McqError::validation(
                    "year",
                    format!(
                        "{} is outside {}..={}",
                        year, authoring.min_year, authoring.max_year
                    ),
                ));
            }
            Some(year)
        } else {
            None
        };

        let subject_name = required("subject_name", &self.subject_name)?;
        let topic_name = required("topic_name", &self.topic_name)?;
        if syllabus.subject(&subject_name).is_none() {
            return Err(McqError::validation(
                "subject_name",
                format!("'{}' is not in the syllabus", subject_name),
            ));
        }
        if !syllabus.contains(&subject_name, &topic_name) {
            return Err(McqError::validation(
                "topic_name",
                format!("'{}' is not a topic of '{}'", topic_name, subject_name),
            ));
        }

        let image = match &self.image {
            Some(upload) if upload.bytes.is_empty() => {
                return Err(McqError::validation("image", "uploaded image is empty"))
            }
            Some(upload) if upload.mime.trim().is_empty() => {
                return Err(McqError::validation("image", "missing MIME type"))
            }
            Some(upload) => Some(QuestionImage::from_bytes(upload.mime.trim(), &upload.bytes)),
            None => None,
        };

        Ok(QuestionContent {
            question,
            options,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty,
            solution,
            question_type: self.question_type,
            year,
            subject: Some(format!("{} - {}", subject_name, topic_name)),
            subject_name: Some(subject_name),
            topic_name: Some(topic_name),
            tags: parse_tags(&self.tags),
            image,
        })
    }
}

fn required(field: &str, value: &str) -> McqResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(McqError::validation(field, "is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// 逗号分隔的标签：去空白、去空项、大小写不敏感去重（保留首次写法）
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}
