//! User-facing console lines.
//! Tagged messages go to stdout (info/ok) or stderr (warn/error); colour is
//! used only when the stream is a TTY. The run summary table is plain text so
//! it can be scripted against.

use owo_colors::OwoColorize;

use crate::engine::{PairOutcome, RunSummary, Tally};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Ok,
    Warn,
    Error,
}

impl Tone {
    fn tag(self) -> &'static str {
        match self {
            Tone::Info => "info:",
            Tone::Ok => "ok:",
            Tone::Warn => "warn:",
            Tone::Error => "error:",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Tone::Warn | Tone::Error)
    }
}

fn colored(tone: Tone, tty: bool) -> String {
    let tag = tone.tag();
    if !tty {
        return tag.to_string();
    }
    match tone {
        Tone::Info => tag.cyan().bold().to_string(),
        Tone::Ok => tag.green().bold().to_string(),
        Tone::Warn => tag.yellow().bold().to_string(),
        Tone::Error => tag.red().bold().to_string(),
    }
}

pub fn say(tone: Tone, msg: &str) {
    if tone.to_stderr() {
        eprintln!("{} {msg}", colored(tone, atty::is(atty::Stream::Stderr)));
    } else {
        println!("{} {msg}", colored(tone, atty::is(atty::Stream::Stdout)));
    }
}

pub fn info(msg: &str) {
    say(Tone::Info, msg);
}

pub fn warn(msg: &str) {
    say(Tone::Warn, msg);
}

pub fn error(msg: &str) {
    say(Tone::Error, msg);
}

pub fn success(msg: &str) {
    say(Tone::Ok, msg);
}

/// One line per pair, then the totals.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::with_capacity(summary.pairs.len() + summary.issues.len() + 1);
    for p in &summary.pairs {
        let mark = match p.outcome.tally() {
            Tally::Succeeded if matches!(p.outcome, PairOutcome::Planned { .. }) => "plan",
            Tally::Succeeded => "done",
            Tally::Skipped => "skip",
            Tally::Failed => "FAIL",
        };
        lines.push(format!(
            "{mark}  {}/{}  {}",
            p.library.display(),
            p.category,
            p.outcome
        ));
    }
    for issue in &summary.issues {
        lines.push(format!("FAIL  {issue}"));
    }
    lines.push(format!(
        "{}{}: {} succeeded, {} skipped, {} failed",
        if summary.dry_run { "dry-run " } else { "" },
        summary.kind,
        summary.succeeded(),
        summary.skipped(),
        summary.failed()
    ));
    lines
}

pub fn print_summary(summary: &RunSummary) {
    for line in summary_lines(summary) {
        println!("{line}");
    }
}
