use chrono::{Datelike, NaiveDate, NaiveTime};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Soft per-segment limit; exceeding it is flagged, never rejected.
pub const THREAD_CHAR_LIMIT: usize = 500;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub type PostId = String;
pub type SegmentId = String;
pub type WeekNumber = u32;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ThreadSegment {
    pub id: SegmentId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Scheduled,
    Published,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ThreadPost {
    pub id: PostId,
    pub title: String,
    pub status: PostStatus,
    pub time: String,
    pub segments: Vec<ThreadSegment>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: String,
    #[serde(default)]
    pub daily_theme: String,
    #[serde(default)]
    pub posts: Vec<ThreadPost>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthPlan {
    pub month_key: String,
    #[serde(default)]
    pub monthly_theme: String,
    #[serde(default)]
    pub weekly_themes: BTreeMap<WeekNumber, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub plans: BTreeMap<String, DayPlan>,
    #[serde(default)]
    pub month_plans: BTreeMap<String, MonthPlan>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("invalid month (use YYYY-MM): {0}")]
    InvalidMonth(String),
    #[error("invalid time (use HH:MM): {0}")]
    InvalidTime(String),
    #[error("unknown status {0:?} (expected draft, scheduled or published)")]
    UnknownStatus(String),
}

impl PostStatus {
    pub const ALL: [PostStatus; 3] = [
        PostStatus::Draft,
        PostStatus::Scheduled,
        PostStatus::Published,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
        }
    }

    pub fn next(self) -> Self {
        match self {
            PostStatus::Draft => PostStatus::Scheduled,
            PostStatus::Scheduled => PostStatus::Published,
            PostStatus::Published => PostStatus::Draft,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PostStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| PlanError::UnknownStatus(s.to_string()))
    }
}

impl ThreadSegment {
    pub fn new(content: impl Into<String>) -> Self {
        ThreadSegment {
            id: generate_id(),
            content: content.into(),
            image: None,
        }
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn over_limit(&self) -> bool {
        self.char_count() > THREAD_CHAR_LIMIT
    }
}

impl ThreadPost {
    /// Blank draft with a single empty segment.
    pub fn draft(time: impl Into<String>) -> Self {
        ThreadPost {
            id: generate_id(),
            title: String::new(),
            status: PostStatus::Draft,
            time: time.into(),
            segments: vec![ThreadSegment::new("")],
        }
    }

    /// Draft seeded from a generated idea: the idea becomes the first
    /// segment and its first 30 characters the title.
    pub fn from_idea(idea: &str, time: impl Into<String>) -> Self {
        let head: String = idea.chars().take(30).collect();
        ThreadPost {
            id: generate_id(),
            title: format!("{}...", head),
            status: PostStatus::Draft,
            time: time.into(),
            segments: vec![ThreadSegment::new(idea)],
        }
    }

    pub fn is_chain(&self) -> bool {
        self.segments.len() > 1
    }

    /// Label used wherever a post is listed: title, then first segment.
    pub fn display_title(&self, placeholder: &str) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        match self.segments.first() {
            Some(seg) if !seg.content.is_empty() => seg.content.clone(),
            _ => placeholder.to_string(),
        }
    }
}

impl DayPlan {
    pub fn empty(date: NaiveDate) -> Self {
        DayPlan {
            date: day_key(date),
            daily_theme: String::new(),
            posts: Vec::new(),
        }
    }

    pub fn find_post(&self, post_id: &str) -> Option<&ThreadPost> {
        self.posts.iter().find(|p| p.id == post_id)
    }
}

impl MonthPlan {
    pub fn empty(date: NaiveDate) -> Self {
        MonthPlan {
            month_key: month_key(date),
            monthly_theme: String::new(),
            weekly_themes: BTreeMap::new(),
        }
    }

    pub fn weekly_theme(&self, week: WeekNumber) -> &str {
        self.weekly_themes
            .get(&week)
            .map(String::as_str)
            .unwrap_or("")
    }
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn parse_date(input: &str) -> Result<NaiveDate, PlanError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| PlanError::InvalidDate(input.to_string()))
}

/// Parses `YYYY-MM` into the first day of that month. Months whose
/// six-week grid would run past the last representable date are rejected.
pub fn parse_month(input: &str) -> Result<NaiveDate, PlanError> {
    let raw = input.trim();
    let (year, month) = raw
        .split_once('-')
        .ok_or_else(|| PlanError::InvalidMonth(input.to_string()))?;
    let year: i32 = year
        .parse()
        .map_err(|_| PlanError::InvalidMonth(input.to_string()))?;
    let month: u32 = month
        .parse()
        .map_err(|_| PlanError::InvalidMonth(input.to_string()))?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .filter(|first| first.checked_add_signed(chrono::Duration::days(41)).is_some())
        .ok_or_else(|| PlanError::InvalidMonth(input.to_string()))
}

/// Normalizes a post time to zero-padded `HH:MM`.
pub fn parse_time(input: &str) -> Result<String, PlanError> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map(|t| t.format(TIME_FORMAT).to_string())
        .map_err(|_| PlanError::InvalidTime(input.to_string()))
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_parses_known_values_and_rejects_others() {
        assert_eq!("draft".parse::<PostStatus>(), Ok(PostStatus::Draft));
        assert_eq!(" Scheduled ".parse::<PostStatus>(), Ok(PostStatus::Scheduled));
        assert_eq!("published".parse::<PostStatus>(), Ok(PostStatus::Published));
        assert_eq!(
            "archived".parse::<PostStatus>(),
            Err(PlanError::UnknownStatus("archived".into()))
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&PostStatus::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
        assert!(serde_json::from_str::<PostStatus>("\"pending\"").is_err());
    }

    #[test]
    fn draft_has_one_empty_segment() {
        let post = ThreadPost::draft("09:00");
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.time, "09:00");
        assert_eq!(post.title, "");
        assert_eq!(post.segments.len(), 1);
        assert_eq!(post.segments[0].content, "");
    }

    #[test]
    fn idea_post_truncates_title() {
        let idea = "Ten lessons from shipping a side project in a weekend";
        let post = ThreadPost::from_idea(idea, "12:00");
        assert_eq!(post.title, "Ten lessons from shipping a si...");
        assert_eq!(post.segments[0].content, idea);
        assert_eq!(post.time, "12:00");
    }

    #[test]
    fn display_title_falls_back_to_first_segment() {
        let mut post = ThreadPost::draft("09:00");
        assert_eq!(post.display_title("Untitled"), "Untitled");
        post.segments[0].content = "hello".into();
        assert_eq!(post.display_title("Untitled"), "hello");
        post.title = "Launch".into();
        assert_eq!(post.display_title("Untitled"), "Launch");
    }

    #[test]
    fn keys_and_parsers() {
        assert_eq!(day_key(date(2024, 3, 10)), "2024-03-10");
        assert_eq!(month_key(date(2024, 3, 10)), "2024-03");
        assert_eq!(parse_date("2024-03-10"), Ok(date(2024, 3, 10)));
        assert!(parse_date("2024-13-01").is_err());
        assert_eq!(parse_month("2024-03"), Ok(date(2024, 3, 1)));
        assert!(parse_month("March").is_err());
        let last_year = NaiveDate::MAX.year();
        assert!(parse_month(&format!("{}-12", last_year)).is_err());
        assert_eq!(
            parse_month(&format!("{}-01", last_year)),
            Ok(date(last_year, 1, 1))
        );
        assert_eq!(parse_time("9:05"), Ok("09:05".to_string()));
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn char_count_uses_scalar_values() {
        let mut seg = ThreadSegment::new("héllo");
        assert_eq!(seg.char_count(), 5);
        assert!(!seg.over_limit());
        seg.content = "x".repeat(THREAD_CHAR_LIMIT + 1);
        assert!(seg.over_limit());
    }

    #[test]
    fn app_state_uses_camel_case_and_string_week_keys() {
        let mut state = AppState::default();
        let mut month = MonthPlan::empty(date(2024, 3, 1));
        month.weekly_themes.insert(11, "Launch Week".into());
        state.month_plans.insert(month.month_key.clone(), month);
        state
            .plans
            .insert("2024-03-10".into(), DayPlan::empty(date(2024, 3, 10)));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json["monthPlans"]["2024-03"]["weeklyThemes"]["11"],
            "Launch Week"
        );
        assert_eq!(json["plans"]["2024-03-10"]["dailyTheme"], "");
    }
}
