use crate::model::{parse_time, PlanError, PostStatus, ThreadPost, ThreadSegment};
use crate::planner::Action;
use chrono::NaiveDate;

/// Detached working copy of one post. Nothing reaches the planner until
/// [`ThreadEditor::save`] or [`ThreadEditor::delete`] hands back an action.
#[derive(Debug, Clone)]
pub struct ThreadEditor {
    date: NaiveDate,
    post: ThreadPost,
}

impl ThreadEditor {
    pub fn new(date: NaiveDate, mut post: ThreadPost) -> Self {
        if post.segments.is_empty() {
            post.segments.push(ThreadSegment::new(""));
        }
        ThreadEditor { date, post }
    }

    pub fn post(&self) -> &ThreadPost {
        &self.post
    }

    pub fn segments(&self) -> &[ThreadSegment] {
        &self.post.segments
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.post.title = title.into();
    }

    /// Leaves the current time in place when `input` does not parse.
    pub fn set_time(&mut self, input: &str) -> Result<(), PlanError> {
        self.post.time = parse_time(input)?;
        Ok(())
    }

    pub fn set_status(&mut self, status: PostStatus) {
        self.post.status = status;
    }

    pub fn cycle_status(&mut self) {
        self.post.status = self.post.status.next();
    }

    pub fn add_segment(&mut self) -> &ThreadSegment {
        self.post.segments.push(ThreadSegment::new(""));
        &self.post.segments[self.post.segments.len() - 1]
    }

    /// Removes a segment unless it is the last one left.
    pub fn remove_segment(&mut self, segment_id: &str) -> bool {
        if self.post.segments.len() <= 1 {
            return false;
        }
        let before = self.post.segments.len();
        self.post.segments.retain(|s| s.id != segment_id);
        self.post.segments.len() != before
    }

    pub fn update_segment(&mut self, segment_id: &str, content: impl Into<String>) -> bool {
        match self.post.segments.iter_mut().find(|s| s.id == segment_id) {
            Some(segment) => {
                segment.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Replaces the whole chain with freshly created segments.
    pub fn apply_split(&mut self, parts: Vec<String>) {
        let mut segments: Vec<ThreadSegment> = parts.into_iter().map(ThreadSegment::new).collect();
        if segments.is_empty() {
            segments.push(ThreadSegment::new(""));
        }
        self.post.segments = segments;
    }

    pub fn apply_polish(&mut self, segment_id: &str, polished: String) -> bool {
        self.update_segment(segment_id, polished)
    }

    pub fn over_limit_count(&self) -> usize {
        self.post.segments.iter().filter(|s| s.over_limit()).count()
    }

    pub fn into_post(self) -> ThreadPost {
        self.post
    }

    pub fn save(self) -> Action {
        Action::SavePost {
            date: self.date,
            post: self.post,
        }
    }

    pub fn delete(self) -> Action {
        Action::DeletePost {
            date: self.date,
            post_id: self.post.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppState, THREAD_CHAR_LIMIT};
    use crate::planner::{apply, day_plan, Planner};
    use crate::storage::MemoryStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn cannot_remove_the_last_segment() {
        let mut post = ThreadPost::draft("09:00");
        post.segments[0].content = "Hi".into();
        let only = post.segments[0].id.clone();
        let mut editor = ThreadEditor::new(day(), post);
        assert!(!editor.remove_segment(&only));
        let contents: Vec<_> = editor.segments().iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, ["Hi"]);
    }

    #[test]
    fn add_then_remove_segments() {
        let mut editor = ThreadEditor::new(day(), ThreadPost::draft("09:00"));
        let second = editor.add_segment().id.clone();
        editor.add_segment();
        assert_eq!(editor.segments().len(), 3);
        assert!(editor.remove_segment(&second));
        assert_eq!(editor.segments().len(), 2);
        assert!(!editor.remove_segment("unknown"));
        assert_eq!(editor.segments().len(), 2);
    }

    #[test]
    fn time_is_validated_and_normalized() {
        let mut editor = ThreadEditor::new(day(), ThreadPost::draft("09:00"));
        assert!(editor.set_time("7:30").is_ok());
        assert_eq!(editor.post().time, "07:30");
        assert!(editor.set_time("7pm").is_err());
        assert_eq!(editor.post().time, "07:30");
    }

    #[test]
    fn status_cycles_through_all_values() {
        let mut editor = ThreadEditor::new(day(), ThreadPost::draft("09:00"));
        editor.cycle_status();
        assert_eq!(editor.post().status, PostStatus::Scheduled);
        editor.cycle_status();
        assert_eq!(editor.post().status, PostStatus::Published);
        editor.cycle_status();
        assert_eq!(editor.post().status, PostStatus::Draft);
    }

    #[test]
    fn long_segments_are_flagged_not_blocked() {
        let day = day();
        let post = ThreadPost::draft("09:00");
        let state = apply(
            AppState::default(),
            Action::CreatePost {
                date: day,
                post: post.clone(),
            },
        );
        let mut editor = ThreadEditor::new(day, post);
        let id = editor.segments()[0].id.clone();
        editor.update_segment(&id, "y".repeat(THREAD_CHAR_LIMIT + 20));
        assert_eq!(editor.over_limit_count(), 1);
        let state = apply(state, editor.save());
        assert_eq!(
            day_plan(&state, day).posts[0].segments[0].char_count(),
            THREAD_CHAR_LIMIT + 20
        );
    }

    #[test]
    fn split_replaces_the_chain() {
        let mut editor = ThreadEditor::new(day(), ThreadPost::draft("09:00"));
        editor.apply_split(vec!["one".into(), "two".into(), "three".into()]);
        let contents: Vec<_> = editor.segments().iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
        editor.apply_split(Vec::new());
        assert_eq!(editor.segments().len(), 1);
    }

    #[test]
    fn dropped_editor_changes_nothing() {
        let day = day();
        let mut planner = Planner::open(Box::new(MemoryStore::default()));
        let post = ThreadPost::draft("09:00");
        planner
            .dispatch(Action::CreatePost {
                date: day,
                post: post.clone(),
            })
            .unwrap();
        let before = planner.state().clone();

        let mut editor = ThreadEditor::new(day, planner.find_post(day, &post.id).unwrap());
        editor.set_title("changed");
        editor.add_segment();
        drop(editor);

        assert_eq!(planner.state(), &before);
        assert_eq!(planner.find_post(day, &post.id), Some(post));
    }

    #[test]
    fn delete_produces_delete_action() {
        let post = ThreadPost::draft("09:00");
        let id = post.id.clone();
        let editor = ThreadEditor::new(day(), post);
        assert_eq!(
            editor.delete(),
            Action::DeletePost {
                date: day(),
                post_id: id
            }
        );
    }
}
