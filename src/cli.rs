use crate::model::PostStatus;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "threadplan",
    version,
    about = "Terminal content calendar for thread chains"
)]
pub struct Cli {
    /// State file to use instead of the default data directory
    #[arg(long, global = true, env = "THREADPLAN_DATA_FILE")]
    pub data_file: Option<PathBuf>,
    /// Config file (YAML)
    #[arg(long, global = true, env = "THREADPLAN_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the calendar for a month
    Month {
        /// Month in YYYY-MM format (defaults to the current month)
        month: Option<String>,
    },
    /// Show the theme and posts planned for a day
    Day {
        /// Date in YYYY-MM-DD format
        date: String,
    },
    /// Set monthly, weekly or daily themes
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },
    /// Create, edit or delete posts
    Post {
        #[command(subcommand)]
        command: PostCommand,
    },
    /// Generate post ideas for a topic
    Ideas {
        /// Topic to brainstorm around
        topic: String,
        /// Day whose themes are passed as context (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Add the idea with this number (1-based) as a new post on --date
        #[arg(long)]
        pick: Option<usize>,
    },
    /// Split long text into a thread chain
    Split {
        /// Text to split
        text: String,
        #[command(flatten)]
        target: PostTarget,
    },
    /// Rewrite text to be punchier
    Polish {
        /// Text to polish
        text: String,
        #[command(flatten)]
        target: PostTarget,
        /// Segment number (1-based) to overwrite when --date/--post are given
        #[arg(long, default_value_t = 1)]
        segment: usize,
    },
    /// Launch the interactive TUI
    Tui,
}

/// Optional post to write an AI result back into.
#[derive(Args, Debug, Default)]
pub struct PostTarget {
    /// Date of the post to update
    #[arg(long, requires = "post")]
    pub date: Option<String>,
    /// Id of the post to update
    #[arg(long, requires = "date")]
    pub post: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ThemeCommand {
    /// Set the theme for a month
    Month {
        /// Month in YYYY-MM format
        month: String,
        theme: String,
    },
    /// Set the theme for the week containing a date
    Week {
        /// Any date in the week (YYYY-MM-DD)
        date: String,
        theme: String,
    },
    /// Set the theme for a single day
    Day {
        /// Date in YYYY-MM-DD format
        date: String,
        theme: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    /// Add a new post to a day
    Add {
        /// Date in YYYY-MM-DD format
        date: String,
        /// Planner title
        #[arg(long)]
        title: Option<String>,
        /// Scheduled time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// draft, scheduled or published
        #[arg(long)]
        status: Option<PostStatus>,
        /// Chain segment content (repeatable, in order)
        #[arg(long = "segment", short = 's')]
        segments: Vec<String>,
    },
    /// Edit an existing post
    Edit {
        /// Date in YYYY-MM-DD format
        date: String,
        /// Post id
        post_id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// New status
        #[arg(long)]
        status: Option<PostStatus>,
        /// Replace the chain with these segments (repeatable)
        #[arg(long = "segment", short = 's')]
        segments: Vec<String>,
        /// Append one empty segment
        #[arg(long)]
        add_segment: bool,
        /// Remove the segment with this number (1-based); the last one stays
        #[arg(long)]
        remove_segment: Option<usize>,
    },
    /// Delete a post
    Delete {
        /// Date in YYYY-MM-DD format
        date: String,
        /// Post id
        post_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
