//! Command handlers for the interactive prompt.

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use sous_core::TimerRecord;
use sous_types::formatting::{format_countdown, format_duration};

use crate::CliContext;

fn fmt_local_time(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M:%S").to_string()
}

pub fn add(ctx: &CliContext, id: &str, name: &str, secs: i64) {
    let record = TimerRecord::new(id, ctx.session_id.clone(), name, secs, Utc::now());
    ctx.engine.store().set(record);
    println!("added {} ({})", id, format_duration(secs));
}

pub fn start(ctx: &CliContext, id: &str) {
    match ctx.engine.start(id, &ctx.user) {
        Ok(record) => {
            let done_at = record.end_at.map(fmt_local_time).unwrap_or_default();
            println!("{} running, done at {}", record.name, done_at);
        }
        Err(err) => println!("error: {err}"),
    }
}

pub fn pause(ctx: &CliContext, id: &str) {
    match ctx.engine.pause(id) {
        Ok(record) => println!(
            "{} paused with {} left",
            record.name,
            format_duration(record.remaining_seconds)
        ),
        Err(err) => println!("error: {err}"),
    }
}

pub fn resume(ctx: &CliContext, id: &str) {
    match ctx.engine.resume(id) {
        Ok(record) => {
            let done_at = record.end_at.map(fmt_local_time).unwrap_or_default();
            println!("{} running again, done at {}", record.name, done_at);
        }
        Err(err) => println!("error: {err}"),
    }
}

pub fn reset(ctx: &CliContext, id: &str) {
    match ctx.engine.reset(id) {
        Ok(record) => println!("{} reset to {}", record.name, format_duration(record.default_seconds)),
        Err(err) => println!("error: {err}"),
    }
}

pub fn remove(ctx: &CliContext, id: &str) {
    match ctx.engine.store().remove(id) {
        Some(record) => println!("removed {}", record.name),
        None => println!("no timer {id}"),
    }
}

pub fn list(ctx: &CliContext) {
    let timers = ctx
        .engine
        .store()
        .sorted_by(|a, b| a.created_at.cmp(&b.created_at));

    if timers.is_empty() {
        println!("no timers");
        return;
    }

    println!("{:<12} {:<24} {:<10} {:>8}  Started by", "Id", "Name", "Status", "Left");
    println!("{}", "-".repeat(64));

    for timer in &timers {
        println!(
            "{:<12} {:<24} {:<10} {:>8}  {}",
            timer.id,
            timer.name,
            timer.status.to_string(),
            format_countdown(timer.remaining_seconds, "done"),
            timer.started_by.as_deref().unwrap_or("-")
        );
    }

    println!("\nTotal: {} timers", timers.len());
}

/// Ring the terminal bell when a timer finishes, unless its chime is off.
pub fn install_chime(ctx: &CliContext) {
    let prefs = Arc::clone(&ctx.preferences);
    ctx.engine.on_complete(move |record| {
        if prefs.lock().unwrap().chime_enabled(&record.id) {
            print!("\x07");
        }
        println!("*** {} finished ***", record.name);
        let _ = std::io::stdout().flush();
    });
}

pub fn chime(ctx: &CliContext, id: &str, off: bool) {
    ctx.preferences
        .lock()
        .unwrap()
        .update_chime_enabled(id, !off);
    ctx.save_preferences();
    println!("chime {} for {}", if off { "off" } else { "on" }, id);
}

pub fn clear_session(ctx: &CliContext) {
    let removed = ctx.engine.remove_session(&ctx.session_id);
    println!("removed {removed} timers");
}

pub fn exit(ctx: &CliContext) {
    ctx.engine.destroy();
    write!(std::io::stdout(), "quitting...").expect("error exiting");
    std::io::stdout().flush().expect("error flushing stdout");
}
