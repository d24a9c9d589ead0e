//! Callable tools for the agent orchestration layer. Each tool takes a JSON
//! object of primitive arguments and answers with a JSON object.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::dataset::StudentDataset;
use crate::error::{AnalyticsError, Result};
use crate::latest::{latest_summary, level_analysis, second_latest_summary};
use crate::search::{parse_date_arg, search, SearchCriteria};
use crate::stats::student_stats;

/// Results returned by `search_student` when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

pub trait Tool: Send + Sync {
    /// The unique name of this tool (used in function calling).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> Value;

    fn execute(&self, dataset: &StudentDataset, args: Value) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registry with every analytics tool.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchStudentTool));
        registry.register(Arc::new(StudentStatsTool));
        registry.register(Arc::new(LatestTestTool));
        registry.register(Arc::new(SecondLatestTestTool));
        registry.register(Arc::new(LevelAnalysisTool));
        registry
    }

    /// Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!("Registered tool: {}", name);
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.tools.keys().map(|name| name.as_str()).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    pub fn call(&self, dataset: &StudentDataset, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| AnalyticsError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "executing tool");
        tool.execute(dataset, args)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    // Agents sometimes send `null` for "no arguments".
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|err| AnalyticsError::InvalidArguments(err.to_string()))
}

pub struct SearchStudentTool;

#[derive(Deserialize)]
struct SearchArgs {
    student_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    subject: Option<String>,
    student_class: Option<String>,
    limit: Option<usize>,
}

impl Tool for SearchStudentTool {
    fn name(&self) -> &str {
        "search_student"
    }

    fn description(&self) -> &str {
        "Search per-question test results by partial student id, date range, subject or class"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "student_id": { "type": "string", "description": "Full or partial student id" },
                "from_date": { "type": "string", "description": "Inclusive start date, YYYY-MM-DD" },
                "to_date": { "type": "string", "description": "Inclusive end date, YYYY-MM-DD" },
                "subject": { "type": "string" },
                "student_class": { "type": "string" },
                "limit": { "type": "integer", "minimum": 0, "default": DEFAULT_SEARCH_LIMIT }
            }
        })
    }

    fn execute(&self, dataset: &StudentDataset, args: Value) -> Result<Value> {
        let args: SearchArgs = parse_args(args)?;
        let criteria = SearchCriteria {
            student_id: args.student_id,
            from_date: args.from_date.as_deref().map(parse_date_arg).transpose()?,
            to_date: args.to_date.as_deref().map(parse_date_arg).transpose()?,
            subject: args.subject,
            student_class: args.student_class,
            limit: Some(args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
        };

        Ok(serde_json::to_value(search(dataset, &criteria)?)?)
    }
}

pub struct StudentStatsTool;

#[derive(Deserialize)]
struct StudentArgs {
    student_id: String,
}

impl Tool for StudentStatsTool {
    fn name(&self) -> &str {
        "get_student_stats"
    }

    fn description(&self) -> &str {
        "Wrong-answer statistics for one student by subject, cognitive level and topic"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "student_id": { "type": "string", "description": "Exact student id" }
            },
            "required": ["student_id"]
        })
    }

    fn execute(&self, dataset: &StudentDataset, args: Value) -> Result<Value> {
        let args: StudentArgs = parse_args(args)?;
        Ok(serde_json::to_value(student_stats(dataset, &args.student_id)?)?)
    }
}

#[derive(Deserialize)]
struct OptionalStudentArgs {
    student_id: Option<String>,
}

fn optional_student_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "student_id": {
                "type": "string",
                "description": "Exact student id; omit to summarize every student"
            }
        }
    })
}

pub struct LatestTestTool;

impl Tool for LatestTestTool {
    fn name(&self) -> &str {
        "get_latest_test"
    }

    fn description(&self) -> &str {
        "Latest test of every subject with wrong answers by cognitive level and topic"
    }

    fn parameters_schema(&self) -> Value {
        optional_student_schema()
    }

    fn execute(&self, dataset: &StudentDataset, args: Value) -> Result<Value> {
        let args: OptionalStudentArgs = parse_args(args)?;
        Ok(serde_json::to_value(latest_summary(
            dataset,
            args.student_id.as_deref(),
        )?)?)
    }
}

pub struct SecondLatestTestTool;

impl Tool for SecondLatestTestTool {
    fn name(&self) -> &str {
        "get_second_latest_test"
    }

    fn description(&self) -> &str {
        "Second most recent test of every subject that has at least two tests"
    }

    fn parameters_schema(&self) -> Value {
        optional_student_schema()
    }

    fn execute(&self, dataset: &StudentDataset, args: Value) -> Result<Value> {
        let args: OptionalStudentArgs = parse_args(args)?;
        Ok(serde_json::to_value(second_latest_summary(
            dataset,
            args.student_id.as_deref(),
        )?)?)
    }
}

pub struct LevelAnalysisTool;

#[derive(Deserialize)]
struct LevelArgs {
    student_id: String,
    level: String,
}

impl Tool for LevelAnalysisTool {
    fn name(&self) -> &str {
        "analyze_level"
    }

    fn description(&self) -> &str {
        "Wrong answers at one cognitive level across the student's latest tests"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "student_id": { "type": "string" },
                "level": { "type": "string", "enum": crate::models::LEVELS }
            },
            "required": ["student_id", "level"]
        })
    }

    fn execute(&self, dataset: &StudentDataset, args: Value) -> Result<Value> {
        let args: LevelArgs = parse_args(args)?;
        Ok(serde_json::to_value(level_analysis(
            dataset,
            &args.student_id,
            &args.level,
        )?)?)
    }
}
