use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{AnalyticsError, Result};
use crate::models::QuestionResult;

/// Per-question results read once from a CSV source and shared read-only.
///
/// The first `load` reads and parses the file under a lock; afterwards the
/// cached rows are handed out without locking. A failed read is not cached.
#[derive(Debug)]
pub struct StudentDataset {
    path: Option<PathBuf>,
    rows: OnceLock<Vec<QuestionResult>>,
    load_lock: Mutex<()>,
}

impl StudentDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            rows: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// A dataset that is already loaded with `records`.
    pub fn from_records(records: Vec<QuestionResult>) -> Self {
        Self {
            path: None,
            rows: OnceLock::from(records),
            load_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.rows.get().is_some()
    }

    pub fn load(&self) -> Result<&[QuestionResult]> {
        if let Some(rows) = self.rows.get() {
            return Ok(rows.as_slice());
        }

        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have finished loading while we waited.
        if let Some(rows) = self.rows.get() {
            return Ok(rows.as_slice());
        }

        let path = self.path.as_deref().ok_or_else(|| AnalyticsError::DataUnavailable {
            path: "<memory>".to_string(),
            reason: "dataset has no source path".to_string(),
        })?;

        let records = read_csv(path)?;
        info!(
            rows = records.len(),
            path = %path.display(),
            "loaded student results"
        );
        Ok(self.rows.get_or_init(|| records).as_slice())
    }
}

pub fn read_csv(path: &Path) -> Result<Vec<QuestionResult>> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|err| AnalyticsError::DataUnavailable {
        path: label.clone(),
        reason: err.to_string(),
    })?;
    load_from_reader(file, &label)
}

/// Parses CSV rows from any reader. `source` only labels errors.
pub fn load_from_reader<R: Read>(reader: R, source: &str) -> Result<Vec<QuestionResult>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        #[serde(default)]
        result_id: Option<String>,
        student_id: String,
        #[serde(default)]
        student_class: Option<String>,
        subject: String,
        test_date: String,
        #[serde(default)]
        test_number: Option<String>,
        #[serde(default)]
        question_number: Option<String>,
        topic: String,
        level: String,
        #[serde(default)]
        is_correct: Option<String>,
        #[serde(default)]
        time_taken_seconds: Option<String>,
        #[serde(default)]
        student_ability: Option<String>,
    }

    let unavailable = |line: usize, reason: String| AnalyticsError::DataUnavailable {
        path: source.to_string(),
        reason: format!("row {line}: {reason}"),
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = result.map_err(|err| unavailable(line, err.to_string()))?;

        let test_date = parse_date(&row.test_date)
            .ok_or_else(|| unavailable(line, format!("invalid test_date {:?}", row.test_date)))?;
        let result_id = match non_empty(row.result_id) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|err| unavailable(line, format!("invalid result_id {raw:?}: {err}")))?,
            None => (index + 1) as u64,
        };
        let is_correct = match non_empty(row.is_correct) {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| unavailable(line, format!("invalid is_correct {raw:?}")))?,
            None => false,
        };

        records.push(QuestionResult {
            result_id,
            student_id: row.student_id,
            student_class: non_empty(row.student_class),
            subject: row.subject,
            test_date,
            test_number: parse_optional_u32(row.test_number, "test_number")
                .map_err(|reason| unavailable(line, reason))?,
            question_number: parse_optional_u32(row.question_number, "question_number")
                .map_err(|reason| unavailable(line, reason))?,
            topic: row.topic,
            level: row.level,
            is_correct,
            time_taken_seconds: parse_optional_u32(row.time_taken_seconds, "time_taken_seconds")
                .map_err(|reason| unavailable(line, reason))?,
            student_ability: non_empty(row.student_ability),
        });
    }

    debug!(rows = records.len(), source, "parsed student results");
    Ok(records)
}

/// Accepts `YYYY-MM-DD`, or a timestamp whose first ten characters are one.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let (day, rest) = (raw.get(..10)?, raw.get(10..)?);
    if rest.starts_with(' ') || rest.starts_with('T') {
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    } else {
        None
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Some(true),
        "0" | "0.0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_optional_u32(raw: Option<String>, column: &str) -> std::result::Result<Option<u32>, String> {
    non_empty(raw)
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|err| format!("invalid {column} {value:?}: {err}"))
        })
        .transpose()
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_CSV: &str = "\
result_id,student_id,student_class,subject,test_date,test_number,question_number,topic,level,is_correct,time_taken_seconds,student_ability
1,20250001,12A1,Toán,2025-07-01,1,1,Hàm số,Nhận biết,0,120,khá
2,20250001,12A1,Toán,2025-07-01,1,2,Logarit,Thông hiểu,1,95,khá
3,00420001,12B2,Lý,2025-07-08 00:00:00,2,5,Quang học,Vận dụng cao,False,,yếu
";

    const REDUCED_CSV: &str = "\
student_id,subject,test_date,topic,level
20250001,Toán,2025-07-01,Hàm số,Nhận biết
20250001,Toán,2025-07-08,Logarit,Vận dụng cao
";

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn parses_full_schema() {
        let rows = load_from_reader(FULL_CSV.as_bytes(), "inline").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].student_class.as_deref(), Some("12A1"));
        assert!(!rows[0].is_correct);
        assert!(rows[1].is_correct);
        assert_eq!(rows[1].time_taken_seconds, Some(95));
        assert_eq!(rows[2].student_id, "00420001");
        assert_eq!(rows[2].test_date, NaiveDate::from_ymd_opt(2025, 7, 8).unwrap());
        assert_eq!(rows[2].time_taken_seconds, None);
        assert_eq!(rows[2].student_ability.as_deref(), Some("yếu"));
    }

    #[test]
    fn reduced_schema_defaults_to_wrong_answers_with_assigned_ids() {
        let rows = load_from_reader(REDUCED_CSV.as_bytes(), "inline").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(QuestionResult::is_wrong));
        assert_eq!(rows[0].result_id, 1);
        assert_eq!(rows[1].result_id, 2);
        assert_eq!(rows[0].student_class, None);
        assert_eq!(rows[0].test_number, None);
    }

    #[test]
    fn malformed_date_is_data_unavailable() {
        let csv = "student_id,subject,test_date,topic,level\n1,Toán,07/01/2025,Hàm số,Nhận biết\n";
        let err = load_from_reader(csv.as_bytes(), "inline").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let dataset = StudentDataset::new("/definitely/not/here.csv");
        let err = dataset.load().unwrap_err();
        assert!(matches!(err, AnalyticsError::DataUnavailable { .. }));
        assert!(!dataset.is_loaded());
    }

    #[test]
    fn load_is_cached_after_first_read() {
        let file = write_temp(FULL_CSV);
        let dataset = StudentDataset::new(file.path());

        let first = dataset.load().unwrap();
        let first_ptr = first.as_ptr();
        assert_eq!(first.len(), 3);

        // Removing the source proves the second call never touches it.
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        let second = dataset.load().unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second.as_ptr(), first_ptr);
    }

    #[test]
    fn concurrent_first_loads_share_one_table() {
        let file = write_temp(FULL_CSV);
        let dataset = StudentDataset::new(file.path());

        let pointers: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| dataset.load().unwrap().as_ptr() as usize))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert!(pointers.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn in_memory_dataset_is_loaded_without_a_path() {
        let rows = load_from_reader(REDUCED_CSV.as_bytes(), "inline").unwrap();
        let dataset = StudentDataset::from_records(rows.clone());
        assert!(dataset.is_loaded());
        assert_eq!(dataset.path(), None);
        assert_eq!(dataset.load().unwrap(), rows.as_slice());
    }

    #[test]
    fn parse_date_accepts_timestamps_only_with_separator() {
        assert!(parse_date("2025-07-01").is_some());
        assert!(parse_date("2025-07-01T08:30:00").is_some());
        assert!(parse_date("2025-07-01 08:30:00").is_some());
        assert!(parse_date("2025-07-01xx").is_none());
        assert!(parse_date("").is_none());
    }
}
