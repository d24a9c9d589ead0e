use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

pub const SUBJECTS: [&str; 9] = [
    "Toán", "Lý", "Hóa", "Sinh", "Sử", "Địa", "GDCD", "Văn", "Anh",
];

/// Cognitive levels, easiest first.
pub const LEVELS: [&str; 4] = ["Nhận biết", "Thông hiểu", "Vận dụng thấp", "Vận dụng cao"];

/// Topics of a subject in prerequisite order. Empty for unknown subjects.
pub fn topics_for(subject: &str) -> &'static [&'static str] {
    match subject {
        "Toán" => &[
            "Tích phân", "Nguyên hàm", "Hàm số", "Logarit", "Lượng giác", "Hình học",
            "Thống kê", "Xác suất", "Dãy số", "Giới hạn",
        ],
        "Lý" => &[
            "Dao động cơ học", "Sóng cơ học", "Điện xoay chiều", "Hạt nhân", "Điện từ",
            "Quang học", "Nhiệt học", "Cơ học", "Điện học", "Vật lý hiện đại",
        ],
        "Hóa" => &[
            "Điện li", "Hydrocarbon", "Polymer", "Kim loại", "Phi kim", "Hóa hữu cơ",
            "Hóa vô cơ", "Phản ứng", "Cân bằng", "Nhiệt hóa học",
        ],
        "Sinh" => &[
            "Di truyền", "Tiến hóa", "Sinh thái", "Hệ sinh thái", "Tế bào", "Sinh lý",
            "Thực vật", "Động vật", "Vi sinh", "Sinh học phân tử",
        ],
        "Sử" => &[
            "Kháng chiến", "Cách mạng", "Thời kỳ phong kiến", "Hiện đại", "Thế giới cận đại",
            "Việt Nam cận đại", "Chiến tranh lạnh", "Toàn cầu hóa", "Dân chủ",
            "Xã hội chủ nghĩa",
        ],
        "Địa" => &[
            "Địa hình", "Khí hậu", "Dân số", "Tài nguyên", "Kinh tế", "Môi trường",
            "Đô thị hóa", "Nông nghiệp", "Công nghiệp", "Thủy văn",
        ],
        "GDCD" => &[
            "Pháp luật", "Đạo đức", "Quyền công dân", "Kỹ năng sống", "Hiến pháp", "Nhà nước",
            "Xã hội", "Gia đình", "Trường học", "Cộng đồng",
        ],
        "Văn" => &[
            "Đọc hiểu", "Nghị luận XH", "Nghị luận VH", "Tiếng Việt", "Thơ", "Truyện", "Kịch",
            "Phong cách", "Tu từ", "Ngữ pháp",
        ],
        "Anh" => &[
            "Ngữ pháp", "Giao tiếp", "Đọc hiểu", "Viết", "Nghe", "Từ vựng", "Phát âm",
            "Văn hóa", "Dịch thuật", "Văn học",
        ],
        _ => &[],
    }
}

/// Index in a reference list; unknown entries sort last.
pub fn position(order: &[&str], name: &str) -> usize {
    order
        .iter()
        .position(|candidate| *candidate == name)
        .unwrap_or(usize::MAX)
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub result_id: u64,
    pub student_id: String,
    pub student_class: Option<String>,
    pub subject: String,
    pub test_date: NaiveDate,
    pub test_number: Option<u32>,
    pub question_number: Option<u32>,
    pub topic: String,
    pub level: String,
    pub is_correct: bool,
    pub time_taken_seconds: Option<u32>,
    pub student_ability: Option<String>,
}

impl QuestionResult {
    pub fn is_wrong(&self) -> bool {
        !self.is_correct
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchSummary {
    pub total_results: usize,
    pub unique_students: usize,
    pub date_range: DateRange,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutput {
    pub success: bool,
    pub summary: SearchSummary,
    pub results: Vec<QuestionResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverallStats {
    pub total_questions: usize,
    pub correct_answers: usize,
    pub total_wrong_questions: usize,
    pub accuracy_percentage: f64,
    pub avg_time_seconds: Option<f64>,
    pub subjects_with_errors: Vec<String>,
    pub levels_with_errors: Vec<String>,
}

/// Per-subject or per-level slice of a student's results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Performance {
    pub total_questions: usize,
    pub total_wrong_questions: usize,
    pub accuracy: f64,
    pub avg_time_seconds: Option<f64>,
    pub wrong_topics: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentStats {
    pub success: bool,
    pub student_id: String,
    pub student_class: String,
    pub student_ability: String,
    pub overall: OverallStats,
    pub subject_performance: BTreeMap<String, Performance>,
    pub level_performance: BTreeMap<String, Performance>,
    pub test_dates: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelBreakdown {
    pub total_wrong_questions: usize,
    pub wrong_topics: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub latest_test_date: String,
    pub level_breakdown: BTreeMap<String, LevelBreakdown>,
}

impl SubjectSummary {
    pub fn total_wrong_questions(&self) -> usize {
        self.level_breakdown
            .values()
            .map(|level| level.total_wrong_questions)
            .sum()
    }
}

/// Result of the latest and second-latest sitting lookups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    pub success: bool,
    pub student_id: String,
    pub unique_students: usize,
    pub subjects: BTreeMap<String, SubjectSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSubjectDetail {
    pub latest_test_date: String,
    pub total_wrong_questions: usize,
    pub wrong_topics: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelReport {
    pub success: bool,
    pub student_id: String,
    pub level: String,
    pub subjects: BTreeMap<String, LevelSubjectDetail>,
    pub total_wrong_questions_in_level: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakSubject {
    pub subject: String,
    pub test_date: String,
    pub total_wrong_questions: usize,
    pub weakest_topic: Option<(String, usize)>,
    pub weakest_level: Option<(String, usize)>,
}

/// Formats a date the way every payload carries it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subject_has_a_syllabus() {
        for subject in SUBJECTS {
            assert_eq!(topics_for(subject).len(), 10, "{subject}");
        }
        assert!(topics_for("Tin học").is_empty());
    }
}
