mod ai;
mod calendar;
mod cli;
mod commands;
mod config;
mod editor;
mod logging;
mod model;
mod planner;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    let config = commands::load_config(args.config, args.data_file)?;

    if matches!(command, cli::Command::Tui) {
        logging::init_file(&config.log_file()?, tracing::Level::INFO)?;
    } else {
        logging::init_stderr(tracing::Level::WARN);
    }

    let mut session = commands::Session::open(config)?;
    match command {
        cli::Command::Month { month } => commands::month(&session, month),
        cli::Command::Day { date } => commands::day(&session, date),
        cli::Command::Theme { command } => commands::theme(&mut session, command),
        cli::Command::Post { command } => match command {
            cli::PostCommand::Add {
                date,
                title,
                time,
                status,
                segments,
            } => commands::add_post(&mut session, date, title, time, status, segments),
            cli::PostCommand::Edit {
                date,
                post_id,
                title,
                time,
                status,
                segments,
                add_segment,
                remove_segment,
            } => commands::edit_post(
                &mut session,
                date,
                post_id,
                title,
                time,
                status,
                segments,
                add_segment,
                remove_segment,
            ),
            cli::PostCommand::Delete { date, post_id, yes } => {
                commands::delete_post(&mut session, date, post_id, yes)
            }
        },
        cli::Command::Ideas { topic, date, pick } => {
            commands::ideas(&mut session, topic, date, pick)
        }
        cli::Command::Split { text, target } => commands::split(&mut session, text, target),
        cli::Command::Polish {
            text,
            target,
            segment,
        } => commands::polish(&mut session, text, target, segment),
        cli::Command::Tui => commands::tui(session),
    }
}
