//! 抽题结果导出
//!
//! 生成可离线使用的 JSON 文件：
//! ```json
//! {
//!   "selection_info": {
//!     "total_questions": 5,
//!     "filters_applied": {"difficulty": "Hard", "subject": "All", ...},
//!     "generated_at": "2024-05-01T08:30:00.000000Z",
//!     "source": "sqlite"
//!   },
//!   "questions": [ ... ]
//! }
//! ```
//! 文件名 `random_mcqs_YYYYMMDD_HHMMSS.json`，同秒重复导出追加序号。

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::error::{McqError, McqResult};
use crate::models::Question;
use crate::repos::{format_timestamp, QuestionFilters, ALL_CHOICE};

/// 导出文件名前缀
pub const EXPORT_FILE_PREFIX: &str = "random_mcqs";

/// 导出时记录的筛选条件；未设置的字段写 "All"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilters {
    pub difficulty: String,
    pub subject: String,
    pub topic: String,
    pub question_type: String,
    pub year: Value,
    pub tag: String,
}

impl From<&QuestionFilters> for AppliedFilters {
    fn from(f: &QuestionFilters) -> Self {
        let or_all = |v: Option<&str>| v.unwrap_or(ALL_CHOICE).to_string();
        Self {
            difficulty: or_all(f.difficulty.map(|d| d.as_str())),
            subject: or_all(f.subject_name.as_deref().or(f.subject.as_deref())),
            topic: or_all(f.topic_name.as_deref()),
            question_type: or_all(f.question_type.map(|t| t.as_str())),
            year: f.year.map(Value::from).unwrap_or_else(|| Value::from(ALL_CHOICE)),
            tag: or_all(f.tag.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionInfo {
    pub total_questions: usize,
    pub filters_applied: AppliedFilters,
    pub generated_at: String,
    pub source: String,
}

/// 下载文件内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionExport {
    pub selection_info: SelectionInfo,
    pub questions: Vec<Question>,
}

impl SelectionExport {
    pub fn new(
        questions: Vec<Question>,
        filters: &QuestionFilters,
        source: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            selection_info: SelectionInfo {
                total_questions: questions.len(),
                filters_applied: AppliedFilters::from(filters),
                generated_at: format_timestamp(generated_at),
                source: source.into(),
            },
            questions,
        }
    }

    pub fn to_json_pretty(&self) -> McqResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 导出结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    /// 导出题目数
    pub exported_count: usize,
    /// 文件路径
    pub file_path: PathBuf,
    /// 文件大小（字节）
    pub file_size: u64,
}

/// 基于时间戳的导出文件名；按传入时间所在时区格式化
pub fn export_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{}_{}.json", EXPORT_FILE_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// 抽题导出服务
pub struct QuestionExportService;

impl QuestionExportService {
    /// 校验导出目录，防止目录遍历
    fn validate_directory(dir: &Path) -> McqResult<()> {
        if dir.components().any(|c| c == Component::ParentDir) {
            return Err(McqError::Export(format!(
                "Export directory must not contain '..': {}",
                dir.display()
            )));
        }
        Ok(())
    }

    /// 写入导出目录，返回文件路径与大小
    pub fn write_to_dir(dir: &Path, export: &SelectionExport) -> McqResult<ExportResult> {
        Self::validate_directory(dir)?;
        fs::create_dir_all(dir)?;

        let body = export.to_json_pretty()?;
        // 文件名使用本地时间，selection_info 中保留 UTC
        let generated_at = DateTime::parse_from_rfc3339(&export.selection_info.generated_at)
            .map(|t| t.with_timezone(&Local))
            .unwrap_or_else(|_| Local::now());
        let (file_path, file) = Self::create_unique(dir, &export_file_name(&generated_at))?;

        let mut writer = BufWriter::new(file);
        writer.write_all(body.as_bytes())?;
        writer.flush()?;

        let file_size = fs::metadata(&file_path).map(|m| m.len()).unwrap_or(0);
        info!(
            "[QuestionExport] Exported {} questions to {} ({} bytes)",
            export.questions.len(),
            file_path.display(),
            file_size
        );

        Ok(ExportResult {
            exported_count: export.questions.len(),
            file_path,
            file_size,
        })
    }

    /// 以 create_new 打开文件；同名已存在时追加 `_1`、`_2` ...
    fn create_unique(dir: &Path, file_name: &str) -> McqResult<(PathBuf, fs::File)> {
        let stem = file_name.trim_end_matches(".json");
        for attempt in 0..100u32 {
            let candidate = if attempt == 0 {
                dir.join(file_name)
            } else {
                dir.join(format!("{}_{}.json", stem, attempt))
            };
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(McqError::Export(format!(
            "Too many exports named {} in {}",
            file_name,
            dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuestionType};
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 15).unwrap()
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(export_file_name(&at()), "random_mcqs_20240501_083015.json");
    }

    #[test]
    fn test_file_name_follows_time_zone() {
        let east8 = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(
            export_file_name(&at().with_timezone(&east8)),
            "random_mcqs_20240501_163015.json"
        );
    }

    #[test]
    fn test_applied_filters_fill_all() {
        let filters = QuestionFilters {
            difficulty: Some(Difficulty::Hard),
            question_type: Some(QuestionType::PastYearQuestion),
            year: Some(2020),
            ..Default::default()
        };
        let applied = AppliedFilters::from(&filters);
        assert_eq!(applied.difficulty, "Hard");
        assert_eq!(applied.subject, "All");
        assert_eq!(applied.question_type, "PYQ");
        assert_eq!(applied.year, json!(2020));
        assert_eq!(AppliedFilters::from(&QuestionFilters::default()).year, json!("All"));
    }

    #[test]
    fn test_export_json_shape() {
        let export = SelectionExport::new(Vec::new(), &QuestionFilters::default(), "memory", at());
        let v: Value = serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();
        assert_eq!(v["selection_info"]["total_questions"], json!(0));
        assert_eq!(v["selection_info"]["source"], json!("memory"));
        assert_eq!(v["selection_info"]["generated_at"], json!("2024-05-01T08:30:15.000000Z"));
        assert_eq!(v["questions"], json!([]));
    }

    #[test]
    fn test_write_to_dir_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let export = SelectionExport::new(Vec::new(), &QuestionFilters::default(), "memory", at());

        let first = QuestionExportService::write_to_dir(dir.path(), &export).unwrap();
        let second = QuestionExportService::write_to_dir(dir.path(), &export).unwrap();
        let expected = export_file_name(&at().with_timezone(&Local));
        let stem = expected.trim_end_matches(".json");
        assert_eq!(first.file_path.file_name().unwrap(), expected.as_str());
        assert_eq!(
            second.file_path.file_name().unwrap(),
            format!("{}_1.json", stem).as_str()
        );
        assert!(first.file_size > 0);

        let raw = std::fs::read_to_string(&first.file_path).unwrap();
        let back: SelectionExport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, export);
    }

    #[test]
    fn test_rejects_parent_dir() {
        let err = QuestionExportService::write_to_dir(Path::new("../escape"), &SelectionExport::new(
            Vec::new(),
            &QuestionFilters::default(),
            "memory",
            at(),
        ))
        .unwrap_err();
        assert!(matches!(err, McqError::Export(_)));
    }
}
