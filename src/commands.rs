use crate::ai::{idea_context, is_fallback, Assistant};
use crate::calendar::{self, MonthGrid, WEEKDAY_LABELS};
use crate::cli::{PostTarget, ThemeCommand};
use crate::config::Config;
use crate::editor::ThreadEditor;
use crate::model::{
    day_key, parse_date, parse_month, PostStatus, ThreadPost, THREAD_CHAR_LIMIT,
};
use crate::planner::{Action, Planner};
use crate::storage::FileStore;
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Everything a command needs: resolved config, loaded state, AI client.
pub struct Session {
    pub config: Config,
    pub planner: Planner,
    pub assistant: Assistant,
}

impl Session {
    pub fn open(config: Config) -> Result<Session> {
        let path = config.data_file()?;
        let planner = Planner::open(Box::new(FileStore::new(path)));
        let assistant = Assistant::from_config(&config);
        Ok(Session {
            config,
            planner,
            assistant,
        })
    }
}

pub fn load_config(config_path: Option<PathBuf>, data_file: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(config_path.as_deref())?;
    if data_file.is_some() {
        config.data_file = data_file;
    }
    Ok(config)
}

pub fn month(session: &Session, month: Option<String>) -> Result<()> {
    let anchor = match month {
        Some(raw) => parse_month(&raw)?,
        None => today(),
    };
    let state = session.planner.state();
    let grid = MonthGrid::new(anchor);
    let plan = session.planner.month(anchor);
    let stats = calendar::month_stats(state, anchor);

    println!("{}", grid.month.format("%B %Y"));
    println!(
        "  theme: {}",
        if plan.monthly_theme.is_empty() {
            "(none)"
        } else {
            plan.monthly_theme.as_str()
        }
    );
    println!(
        "  posts: {} total, {} draft, {} scheduled, {} published",
        stats.total, stats.drafts, stats.scheduled, stats.published
    );
    println!();

    let anchors = calendar::week_anchors(state, &grid);
    for row in grid.rows() {
        if !row.iter().any(|c| c.in_month) {
            continue;
        }
        match anchors.iter().find(|a| a.date == row[0].date) {
            Some(anchor) if !anchor.theme.is_empty() => {
                println!("Week {}: {}", anchor.week, anchor.theme)
            }
            _ => println!("Week {}", calendar::week_number(row[0].date)),
        }
        for cell in row.iter().filter(|c| c.in_month) {
            let summary = calendar::day_summary(state, cell.date);
            let weekday = WEEKDAY_LABELS[cell.date.weekday().num_days_from_sunday() as usize];
            if summary.post_count == 0 && summary.theme.is_empty() {
                continue;
            }
            print!("  {} {}", weekday, day_key(cell.date));
            if !summary.theme.is_empty() {
                print!("  [{}]", summary.theme);
            }
            println!("  ({} post{})", summary.post_count, plural(summary.post_count));
            for preview in &summary.previews {
                let chain = if preview.chain { " (chain)" } else { "" };
                println!("    - {}{}  {}", preview.label, chain, preview.status);
            }
            if summary.more > 0 {
                println!("    + {} more", summary.more);
            }
        }
    }
    Ok(())
}

pub fn day(session: &Session, date: String) -> Result<()> {
    let date = parse_date(&date)?;
    let plan = session.planner.day(date);
    let week = calendar::week_number(date);
    println!("{} (week {})", day_key(date), week);
    let month_theme = session.planner.month(date).monthly_theme;
    if !month_theme.is_empty() {
        println!("  month theme: {}", month_theme);
    }
    let week_theme = calendar::weekly_theme_for(session.planner.state(), date);
    if !week_theme.is_empty() {
        println!("  week theme: {}", week_theme);
    }
    if !plan.daily_theme.is_empty() {
        println!("  day theme: {}", plan.daily_theme);
    }
    if plan.posts.is_empty() {
        println!("  (no posts)");
    }
    for post in &plan.posts {
        print_post(post);
    }
    Ok(())
}

pub fn theme(session: &mut Session, command: ThemeCommand) -> Result<()> {
    let action = match command {
        ThemeCommand::Month { month, theme } => Action::SetMonthTheme {
            month: parse_month(&month)?,
            theme,
        },
        ThemeCommand::Week { date, theme } => Action::SetWeeklyTheme {
            date: parse_date(&date)?,
            theme,
        },
        ThemeCommand::Day { date, theme } => Action::SetDailyTheme {
            date: parse_date(&date)?,
            theme,
        },
    };
    let message = action.describe();
    session.planner.dispatch(action)?;
    println!("{}", message);
    Ok(())
}

pub fn add_post(
    session: &mut Session,
    date: String,
    title: Option<String>,
    time: Option<String>,
    status: Option<PostStatus>,
    segments: Vec<String>,
) -> Result<()> {
    let date = parse_date(&date)?;
    let draft = ThreadPost::draft(&session.config.default_post_time);
    let mut editor = ThreadEditor::new(date, draft);
    if let Some(t) = title {
        editor.set_title(t);
    }
    if let Some(t) = time {
        editor.set_time(&t)?;
    }
    if let Some(s) = status {
        editor.set_status(s);
    }
    if !segments.is_empty() {
        editor.apply_split(segments);
    }
    warn_over_limit(&editor);
    let post = editor.into_post();
    let id = post.id.clone();
    session
        .planner
        .dispatch(Action::CreatePost { date, post })
        .with_context(|| format!("adding post on {}", day_key(date)))?;
    println!("Added post {} on {}", id, day_key(date));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit_post(
    session: &mut Session,
    date: String,
    post_id: String,
    title: Option<String>,
    time: Option<String>,
    status: Option<PostStatus>,
    segments: Vec<String>,
    add_segment: bool,
    remove_segment: Option<usize>,
) -> Result<()> {
    let date = parse_date(&date)?;
    let Some(post) = session.planner.find_post(date, &post_id) else {
        println!("No post {} on {}; nothing changed", post_id, day_key(date));
        return Ok(());
    };
    let mut editor = ThreadEditor::new(date, post);
    if let Some(t) = title {
        editor.set_title(t);
    }
    if let Some(t) = time {
        editor.set_time(&t)?;
    }
    if let Some(s) = status {
        editor.set_status(s);
    }
    if !segments.is_empty() {
        editor.apply_split(segments);
    }
    if let Some(number) = remove_segment {
        let target = number
            .checked_sub(1)
            .and_then(|idx| editor.segments().get(idx))
            .map(|s| s.id.clone())
            .ok_or_else(|| anyhow!("post has no segment {}", number))?;
        if !editor.remove_segment(&target) {
            println!("Kept segment {}: a post needs at least one segment", number);
        }
    }
    if add_segment {
        editor.add_segment();
    }
    warn_over_limit(&editor);
    session.planner.dispatch(editor.save())?;
    println!("Updated post {}", post_id);
    Ok(())
}

pub fn delete_post(session: &mut Session, date: String, post_id: String, yes: bool) -> Result<()> {
    let date = parse_date(&date)?;
    let Some(post) = session.planner.find_post(date, &post_id) else {
        println!("No post {} on {}; nothing changed", post_id, day_key(date));
        return Ok(());
    };
    let label = post.display_title("Untitled Post");
    if !yes && !confirm(&format!("Delete \"{}\"?", label))? {
        println!("Delete canceled");
        return Ok(());
    }
    session.planner.dispatch(Action::DeletePost {
        date,
        post_id: post_id.clone(),
    })?;
    println!("Deleted post {}", post_id);
    Ok(())
}

pub fn ideas(
    session: &mut Session,
    topic: String,
    date: Option<String>,
    pick: Option<usize>,
) -> Result<()> {
    let date = match date {
        Some(raw) => parse_date(&raw)?,
        None => today(),
    };
    let context = idea_context(
        &session.planner.month(date).monthly_theme,
        &session.planner.day(date).daily_theme,
    );
    let ideas = session.assistant.generate_ideas(&topic, &context);
    if ideas.is_empty() {
        println!("No ideas returned");
        return Ok(());
    }
    for (idx, idea) in ideas.iter().enumerate() {
        println!("{}. {}", idx + 1, idea);
    }
    if let Some(number) = pick {
        if is_fallback(&ideas) {
            println!("No ideas to pick; nothing added");
            return Ok(());
        }
        let idea = number
            .checked_sub(1)
            .and_then(|idx| ideas.get(idx))
            .ok_or_else(|| anyhow!("no idea number {}", number))?;
        let post = ThreadPost::from_idea(idea, &session.config.idea_post_time);
        let id = post.id.clone();
        session.planner.dispatch(Action::CreatePost { date, post })?;
        println!("Added post {} on {}", id, day_key(date));
    }
    Ok(())
}

pub fn split(session: &mut Session, text: String, target: PostTarget) -> Result<()> {
    let parts = session.assistant.split_into_chain(&text);
    for (idx, part) in parts.iter().enumerate() {
        println!("{}/{} ({} chars)", idx + 1, parts.len(), part.chars().count());
        println!("{}", part);
        println!();
    }
    if let Some(mut editor) = target_editor(session, &target)? {
        editor.apply_split(parts);
        session.planner.dispatch(editor.save())?;
        println!("Replaced chain of post {}", target.post.unwrap_or_default());
    }
    Ok(())
}

pub fn polish(
    session: &mut Session,
    text: String,
    target: PostTarget,
    segment: usize,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let polished = session.assistant.polish(&text);
    println!("{}", polished);
    if let Some(mut editor) = target_editor(session, &target)? {
        let segment_id = segment
            .checked_sub(1)
            .and_then(|idx| editor.segments().get(idx))
            .map(|s| s.id.clone())
            .ok_or_else(|| anyhow!("post has no segment {}", segment))?;
        editor.apply_polish(&segment_id, polished);
        session.planner.dispatch(editor.save())?;
        println!("Updated segment {}", segment);
    }
    Ok(())
}

pub fn tui(session: Session) -> Result<()> {
    ui::run(session)
}

fn target_editor(session: &Session, target: &PostTarget) -> Result<Option<ThreadEditor>> {
    let (Some(date), Some(post_id)) = (&target.date, &target.post) else {
        return Ok(None);
    };
    let date = parse_date(date)?;
    match session.planner.find_post(date, post_id) {
        Some(post) => Ok(Some(ThreadEditor::new(date, post))),
        None => {
            println!("No post {} on {}; nothing changed", post_id, day_key(date));
            Ok(None)
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn warn_over_limit(editor: &ThreadEditor) {
    for (idx, seg) in editor.segments().iter().enumerate() {
        if seg.over_limit() {
            println!(
                "note: segment {} is {} chars (limit {})",
                idx + 1,
                seg.char_count(),
                THREAD_CHAR_LIMIT
            );
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn print_post(post: &ThreadPost) {
    println!(
        "  - {}: {}  {} {}",
        post.id,
        post.display_title("Untitled Post"),
        post.time,
        post.status
    );
    for (idx, seg) in post.segments.iter().enumerate() {
        let flag = if seg.over_limit() { " !" } else { "" };
        println!(
            "    {}/{} [{}/{}{}] {}",
            idx + 1,
            post.segments.len(),
            seg.char_count(),
            THREAD_CHAR_LIMIT,
            flag,
            seg.content
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, CompletionBackend};
    use tempfile::TempDir;

    struct Fixed(&'static str);

    impl CompletionBackend for Fixed {
        fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }
    }

    const DAY: &str = "2024-03-10";

    fn session(dir: &TempDir, assistant: Assistant) -> Session {
        let config = Config {
            data_file: Some(dir.path().join("plan.json")),
            ..Config::default()
        };
        let path = config.data_file().unwrap();
        Session {
            config,
            planner: Planner::open(Box::new(FileStore::new(path))),
            assistant,
        }
    }

    fn day() -> NaiveDate {
        parse_date(DAY).unwrap()
    }

    fn add(session: &mut Session, segments: &[&str]) -> String {
        let segments = segments.iter().map(|s| s.to_string()).collect();
        add_post(session, DAY.into(), None, None, None, segments).unwrap();
        session.planner.day(day()).posts.last().unwrap().id.clone()
    }

    fn contents(session: &Session, id: &str) -> Vec<String> {
        session
            .planner
            .find_post(day(), id)
            .unwrap()
            .segments
            .into_iter()
            .map(|s| s.content)
            .collect()
    }

    fn target(id: &str) -> PostTarget {
        PostTarget {
            date: Some(DAY.into()),
            post: Some(id.into()),
        }
    }

    #[test]
    fn edit_replaces_chain_before_removing() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, Assistant::disabled());
        let id = add(&mut session, &["a", "b"]);
        let replacement = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        edit_post(
            &mut session,
            DAY.into(),
            id.clone(),
            None,
            None,
            None,
            replacement,
            false,
            Some(1),
        )
        .unwrap();
        assert_eq!(contents(&session, &id), ["y", "z"]);
    }

    #[test]
    fn edit_keeps_the_only_segment() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, Assistant::disabled());
        let id = add(&mut session, &["Hi"]);
        let remove = |session: &mut Session, number| {
            edit_post(
                session,
                DAY.into(),
                id.clone(),
                None,
                None,
                None,
                vec![],
                false,
                Some(number),
            )
        };
        remove(&mut session, 1).unwrap();
        assert_eq!(contents(&session, &id), ["Hi"]);
        assert!(remove(&mut session, 4).is_err());
    }

    #[test]
    fn edit_and_delete_of_unknown_id_change_nothing() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, Assistant::disabled());
        add(&mut session, &["keep"]);
        let before = session.planner.state().clone();
        edit_post(
            &mut session,
            DAY.into(),
            "missing".into(),
            Some("new".into()),
            None,
            None,
            vec![],
            true,
            None,
        )
        .unwrap();
        delete_post(&mut session, "2024-03-11".into(), "missing".into(), true).unwrap();
        assert_eq!(session.planner.state(), &before);
    }

    #[test]
    fn delete_removes_the_post_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, Assistant::disabled());
        let id = add(&mut session, &["bye"]);
        delete_post(&mut session, DAY.into(), id, true).unwrap();
        let reopened = Planner::open(Box::new(FileStore::new(dir.path().join("plan.json"))));
        assert!(reopened.day(day()).posts.is_empty());
    }

    #[test]
    fn split_writes_chain_into_target_post() {
        let dir = TempDir::new().unwrap();
        let backend = Fixed("```json\n[\"Hook\", \"Body\", \"Call to action\"]\n```");
        let mut session = session(&dir, Assistant::with_backend(Box::new(backend)));
        let id = add(&mut session, &["draft"]);
        split(&mut session, "a long essay".into(), target(&id)).unwrap();
        assert_eq!(contents(&session, &id), ["Hook", "Body", "Call to action"]);
    }

    #[test]
    fn polish_overwrites_the_chosen_segment() {
        let dir = TempDir::new().unwrap();
        let backend = Fixed("  Punchier.  ");
        let mut session = session(&dir, Assistant::with_backend(Box::new(backend)));
        let id = add(&mut session, &["one", "two"]);
        polish(&mut session, "two".into(), target(&id), 2).unwrap();
        assert_eq!(contents(&session, &id), ["one", "Punchier."]);

        assert!(polish(&mut session, "two".into(), target(&id), 3).is_err());
        assert!(polish(&mut session, "two".into(), target(&id), 0).is_err());
        assert_eq!(contents(&session, &id), ["one", "Punchier."]);
    }

    #[test]
    fn picking_from_placeholder_ideas_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, Assistant::disabled());
        ideas(&mut session, "rust".into(), Some(DAY.into()), Some(1)).unwrap();
        assert!(session.planner.day(day()).posts.is_empty());

        let failing = Assistant::with_backend(Box::new(Fixed("not json")));
        let mut session = self::session(&dir, failing);
        ideas(&mut session, "rust".into(), Some(DAY.into()), Some(1)).unwrap();
        assert!(session.planner.day(day()).posts.is_empty());
    }

    #[test]
    fn picking_an_idea_adds_a_noon_draft() {
        let dir = TempDir::new().unwrap();
        let backend = Fixed("[\"First idea\", \"Second idea\"]");
        let mut session = session(&dir, Assistant::with_backend(Box::new(backend)));
        ideas(&mut session, "rust".into(), Some(DAY.into()), Some(2)).unwrap();
        let posts = session.planner.day(day()).posts;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Second idea...");
        assert_eq!(posts[0].time, "12:00");
        assert_eq!(posts[0].status, PostStatus::Draft);
        assert!(ideas(&mut session, "rust".into(), Some(DAY.into()), Some(5)).is_err());
    }
}
