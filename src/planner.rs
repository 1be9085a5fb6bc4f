use crate::calendar::week_number;
use crate::model::{day_key, month_key, AppState, DayPlan, MonthPlan, PostId, ThreadPost};
use crate::storage::StateStore;
use anyhow::Result;
use chrono::NaiveDate;

/// Stored day record, or an empty one. Never mutates `state`.
pub fn day_plan(state: &AppState, date: NaiveDate) -> DayPlan {
    state
        .plans
        .get(&day_key(date))
        .cloned()
        .unwrap_or_else(|| DayPlan::empty(date))
}

/// Stored month record for `date`'s month, or an empty one.
pub fn month_plan(state: &AppState, date: NaiveDate) -> MonthPlan {
    state
        .month_plans
        .get(&month_key(date))
        .cloned()
        .unwrap_or_else(|| MonthPlan::empty(date))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetMonthTheme { month: NaiveDate, theme: String },
    SetWeeklyTheme { date: NaiveDate, theme: String },
    SetDailyTheme { date: NaiveDate, theme: String },
    CreatePost { date: NaiveDate, post: ThreadPost },
    SavePost { date: NaiveDate, post: ThreadPost },
    DeletePost { date: NaiveDate, post_id: PostId },
}

impl Action {
    pub fn describe(&self) -> String {
        match self {
            Action::SetMonthTheme { month, .. } => {
                format!("Month theme set for {}", month_key(*month))
            }
            Action::SetWeeklyTheme { date, .. } => {
                format!("Week {} theme set", week_number(*date))
            }
            Action::SetDailyTheme { date, .. } => format!("Theme set for {}", day_key(*date)),
            Action::CreatePost { date, post } => {
                format!("Created post {} on {}", post.id, day_key(*date))
            }
            Action::SavePost { post, .. } => format!("Saved post {}", post.id),
            Action::DeletePost { post_id, .. } => format!("Deleted post {}", post_id),
        }
    }
}

/// Next state from the current one. Only the day or month entry named by
/// the action is replaced; every other entry is carried over as is.
pub fn apply(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::SetMonthTheme { month, theme } => {
            let mut plan = month_plan(&state, month);
            plan.monthly_theme = theme;
            state.month_plans.insert(plan.month_key.clone(), plan);
        }
        Action::SetWeeklyTheme { date, theme } => {
            let mut plan = month_plan(&state, date);
            plan.weekly_themes.insert(week_number(date), theme);
            state.month_plans.insert(plan.month_key.clone(), plan);
        }
        Action::SetDailyTheme { date, theme } => {
            let mut plan = day_plan(&state, date);
            plan.daily_theme = theme;
            state.plans.insert(plan.date.clone(), plan);
        }
        Action::CreatePost { date, post } => {
            let mut plan = day_plan(&state, date);
            plan.posts.push(post);
            state.plans.insert(plan.date.clone(), plan);
        }
        Action::SavePost { date, post } => {
            let mut plan = day_plan(&state, date);
            if let Some(slot) = plan.posts.iter_mut().find(|p| p.id == post.id) {
                *slot = post;
            } else {
                tracing::debug!(post = %post.id, "save skipped, post no longer exists");
            }
            state.plans.insert(plan.date.clone(), plan);
        }
        Action::DeletePost { date, post_id } => {
            let mut plan = day_plan(&state, date);
            plan.posts.retain(|p| p.id != post_id);
            state.plans.insert(plan.date.clone(), plan);
        }
    }
    state
}

/// Owns the application state and writes it out after every change.
pub struct Planner {
    state: AppState,
    store: Box<dyn StateStore>,
}

impl Planner {
    pub fn open(store: Box<dyn StateStore>) -> Self {
        let state = store.load();
        Planner { state, store }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn location(&self) -> String {
        self.store.describe()
    }

    pub fn day(&self, date: NaiveDate) -> DayPlan {
        day_plan(&self.state, date)
    }

    pub fn month(&self, date: NaiveDate) -> MonthPlan {
        month_plan(&self.state, date)
    }

    pub fn find_post(&self, date: NaiveDate, post_id: &str) -> Option<ThreadPost> {
        self.state
            .plans
            .get(&day_key(date))
            .and_then(|plan| plan.find_post(post_id))
            .cloned()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        tracing::debug!(?action, "dispatch");
        let current = std::mem::take(&mut self.state);
        self.state = apply(current, action);
        self.store.save(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PostStatus, ThreadSegment};
    use crate::storage::{FileStore, MemoryStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accessors_default_without_writing() {
        let state = AppState::default();
        let day = day_plan(&state, date(2024, 3, 10));
        assert_eq!(day.date, "2024-03-10");
        assert_eq!(day.daily_theme, "");
        assert!(day.posts.is_empty());
        let month = month_plan(&state, date(2024, 3, 10));
        assert_eq!(month.month_key, "2024-03");
        assert_eq!(month.monthly_theme, "");
        assert!(month.weekly_themes.is_empty());
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn create_default_post() {
        let day = date(2024, 3, 10);
        let state = apply(
            AppState::default(),
            Action::CreatePost {
                date: day,
                post: ThreadPost::draft("09:00"),
            },
        );
        let plan = day_plan(&state, day);
        assert_eq!(plan.posts.len(), 1);
        let post = &plan.posts[0];
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.time, "09:00");
        assert_eq!(post.segments.len(), 1);
        assert_eq!(post.segments[0].content, "");
    }

    #[test]
    fn weekly_theme_lands_on_the_right_week() {
        let mut state = apply(
            AppState::default(),
            Action::SetWeeklyTheme {
                date: date(2024, 3, 3),
                theme: "Warmup".into(),
            },
        );
        state = apply(
            state,
            Action::SetWeeklyTheme {
                date: date(2024, 3, 10),
                theme: "Launch Week".into(),
            },
        );
        let month = month_plan(&state, date(2024, 3, 1));
        assert_eq!(month.weekly_theme(11), "Launch Week");
        assert_eq!(month.weekly_theme(10), "Warmup");
        assert_eq!(month.weekly_themes.len(), 2);
    }

    #[test]
    fn month_and_day_themes_leave_other_entries_alone() {
        let mut state = apply(
            AppState::default(),
            Action::SetDailyTheme {
                date: date(2024, 3, 9),
                theme: "Q&A".into(),
            },
        );
        let before = state.plans.clone();
        state = apply(
            state,
            Action::SetMonthTheme {
                month: date(2024, 3, 1),
                theme: "Spring".into(),
            },
        );
        state = apply(
            state,
            Action::SetDailyTheme {
                date: date(2024, 3, 10),
                theme: "Launch".into(),
            },
        );
        assert_eq!(state.plans["2024-03-09"], before["2024-03-09"]);
        assert_eq!(month_plan(&state, date(2024, 3, 20)).monthly_theme, "Spring");
        assert_eq!(day_plan(&state, date(2024, 3, 10)).daily_theme, "Launch");
    }

    #[test]
    fn save_replaces_by_id_and_is_idempotent() {
        let day = date(2024, 3, 10);
        let mut post = ThreadPost::draft("09:00");
        let mut state = apply(
            AppState::default(),
            Action::CreatePost {
                date: day,
                post: post.clone(),
            },
        );
        post.title = "Launch".into();
        post.segments.push(ThreadSegment::new("part two"));
        state = apply(state, Action::SavePost { date: day, post: post.clone() });
        let once = state.clone();
        state = apply(state, Action::SavePost { date: day, post: post.clone() });
        assert_eq!(state, once);
        assert_eq!(day_plan(&state, day).posts, vec![post]);
    }

    #[test]
    fn save_and_delete_of_missing_post_are_noops() {
        let day = date(2024, 3, 10);
        let kept = ThreadPost::draft("09:00");
        let state = apply(
            AppState::default(),
            Action::CreatePost {
                date: day,
                post: kept.clone(),
            },
        );
        let saved = apply(
            state.clone(),
            Action::SavePost {
                date: day,
                post: ThreadPost::draft("10:00"),
            },
        );
        assert_eq!(saved, state);
        let deleted = apply(
            state.clone(),
            Action::DeletePost {
                date: day,
                post_id: "missing".into(),
            },
        );
        assert_eq!(deleted, state);
    }

    #[test]
    fn delete_removes_only_the_target() {
        let day = date(2024, 3, 10);
        let a = ThreadPost::draft("09:00");
        let b = ThreadPost::draft("10:00");
        let mut state = AppState::default();
        for post in [a.clone(), b.clone()] {
            state = apply(state, Action::CreatePost { date: day, post });
        }
        state = apply(
            state,
            Action::DeletePost {
                date: day,
                post_id: a.id.clone(),
            },
        );
        assert_eq!(day_plan(&state, day).posts, vec![b]);
    }

    #[test]
    fn dispatch_persists_every_change() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        let mut planner = Planner::open(Box::new(FileStore::new(&path)));
        planner
            .dispatch(Action::SetDailyTheme {
                date: date(2024, 3, 10),
                theme: "Launch".into(),
            })
            .unwrap();
        assert_eq!(planner.day(date(2024, 3, 10)).daily_theme, "Launch");

        let reopened = Planner::open(Box::new(FileStore::new(&path)));
        assert_eq!(reopened.state(), planner.state());
    }

    #[test]
    fn find_post_does_not_create_days() {
        let planner = Planner::open(Box::new(MemoryStore::default()));
        assert!(planner.find_post(date(2024, 3, 10), "x").is_none());
        assert!(planner.state().plans.is_empty());
    }
}
