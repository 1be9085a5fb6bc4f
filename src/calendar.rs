use crate::model::{AppState, PostStatus, WeekNumber};
use crate::planner::{day_plan, month_plan};
use chrono::{Datelike, Duration, NaiveDate};

pub const GRID_CELLS: usize = 42;
pub const MAX_PREVIEWS: usize = 3;
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Sunday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date.checked_sub_signed(Duration::days(date.weekday().num_days_from_sunday() as i64))
        .unwrap_or(NaiveDate::MIN)
}

/// Sunday-start week of the year; week 1 is the week holding January 1st,
/// so the last days of December can belong to week 1 of the next year.
pub fn week_number(date: NaiveDate) -> WeekNumber {
    let week_start = start_of_week(date);
    if let Some(next_jan1) = NaiveDate::from_ymd_opt(date.year() + 1, 1, 1) {
        if start_of_week(next_jan1) <= date {
            return 1;
        }
    }
    let first_week = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(start_of_week)
        .unwrap_or(week_start);
    ((week_start - first_week).num_days() / 7 + 1) as WeekNumber
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn shift_month(date: NaiveDate, delta: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + delta;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(date)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    shift_month(first, 1)
        .pred_opt()
        .map(|d| d.day())
        .unwrap_or(28)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_week_start: bool,
}

/// Six Sunday-to-Saturday rows covering one month.
#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub month: NaiveDate,
    pub cells: Vec<GridCell>,
}

impl MonthGrid {
    /// Cells past the last representable date repeat `NaiveDate::MAX`.
    pub fn new(any_day: NaiveDate) -> Self {
        let month = first_of_month(any_day);
        let start = start_of_week(month);
        let cells = (0..GRID_CELLS as i64)
            .map(|offset| {
                let date = start
                    .checked_add_signed(Duration::days(offset))
                    .unwrap_or(NaiveDate::MAX);
                GridCell {
                    date,
                    in_month: date.year() == month.year() && date.month() == month.month(),
                    is_week_start: offset % 7 == 0,
                }
            })
            .collect();
        MonthGrid { month, cells }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[GridCell]> {
        self.cells.chunks(7)
    }

    pub fn month_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.cells.iter().filter(|c| c.in_month).map(|c| c.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPreview {
    pub label: String,
    pub chain: bool,
    pub status: PostStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub theme: String,
    pub post_count: usize,
    pub previews: Vec<PostPreview>,
    pub more: usize,
}

pub fn day_summary(state: &AppState, date: NaiveDate) -> DaySummary {
    let plan = day_plan(state, date);
    let previews = plan
        .posts
        .iter()
        .take(MAX_PREVIEWS)
        .map(|post| PostPreview {
            label: post.display_title("Untitled Draft"),
            chain: post.is_chain(),
            status: post.status,
        })
        .collect();
    DaySummary {
        date,
        theme: plan.daily_theme.clone(),
        post_count: plan.posts.len(),
        previews,
        more: plan.posts.len().saturating_sub(MAX_PREVIEWS),
    }
}

/// Theme editor anchor shown on a Sunday cell of the displayed month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekAnchor {
    pub date: NaiveDate,
    pub week: WeekNumber,
    pub theme: String,
}

pub fn week_anchors(state: &AppState, grid: &MonthGrid) -> Vec<WeekAnchor> {
    grid.cells
        .iter()
        .filter(|c| c.is_week_start && c.in_month)
        .map(|c| {
            let week = week_number(c.date);
            WeekAnchor {
                date: c.date,
                week,
                theme: month_plan(state, c.date).weekly_theme(week).to_string(),
            }
        })
        .collect()
}

/// Weekly theme that applies to `date`, read from `date`'s own month.
pub fn weekly_theme_for(state: &AppState, date: NaiveDate) -> String {
    month_plan(state, date)
        .weekly_theme(week_number(date))
        .to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthStats {
    pub total: usize,
    pub drafts: usize,
    pub scheduled: usize,
    pub published: usize,
}

pub fn month_stats(state: &AppState, any_day: NaiveDate) -> MonthStats {
    let grid = MonthGrid::new(any_day);
    let mut stats = MonthStats::default();
    for date in grid.month_days() {
        for post in day_plan(state, date).posts {
            stats.total += 1;
            match post.status {
                PostStatus::Draft => stats.drafts += 1,
                PostStatus::Scheduled => stats.scheduled += 1,
                PostStatus::Published => stats.published += 1,
            }
        }
    }
    stats
}
