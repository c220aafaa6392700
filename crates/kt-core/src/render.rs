//! Markdown reports for days, months and years.
//!
//! Rendering only formats values computed elsewhere; the structured
//! [`Aggregate`] is the source of truth.

use std::fmt::Write;

use crate::aggregate::{Aggregate, DayRow, Scope, Tally, per_minute};
use crate::record::DayRecord;

// ========== Day Report ==========

/// Renders the short report for a single day.
pub fn render_day(record: &DayRecord) -> String {
    let mut out = String::new();
    let month = Scope::month_of(record.date);
    let minutes = record.active_minutes;

    writeln!(out, "---").unwrap();
    writeln!(out, "type: keytally-daily").unwrap();
    writeln!(out, "date: {}", record.date).unwrap();
    writeln!(out, "monthRef: \"[[{}]]\"", month.stem()).unwrap();
    writeln!(out, "---").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "# Typing statistics {}", record.date).unwrap();
    writeln!(out).unwrap();
    writeln!(out, "- Characters: {}", record.totals.chars_typed).unwrap();
    writeln!(out, "- Words: {}", record.totals.words_typed).unwrap();
    writeln!(out, "- Accuracy: {}", percent(record.accuracy)).unwrap();
    writeln!(
        out,
        "- Characters per minute: {}",
        per_minute(record.totals.chars_typed, minutes)
    )
    .unwrap();
    writeln!(
        out,
        "- Words per minute: {}",
        per_minute(record.totals.words_typed, minutes)
    )
    .unwrap();
    out
}

// ========== Month / Year Report ==========

/// Renders a month or year aggregate.
pub fn render_aggregate(aggregate: &Aggregate) -> String {
    let mut out = String::new();
    let scope = aggregate.scope;

    writeln!(out, "---").unwrap();
    match scope {
        Scope::Month { year, .. } => {
            writeln!(out, "type: keytally-monthly").unwrap();
            writeln!(out, "yearRef: \"[[{}]]\"", Scope::Year { year }.stem()).unwrap();
        }
        Scope::Year { .. } => writeln!(out, "type: keytally-yearly").unwrap(),
    }
    writeln!(out, "---").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "# Typing statistics {}", title(scope)).unwrap();
    writeln!(out).unwrap();

    let summary = match scope {
        Scope::Month { .. } => "Month totals",
        Scope::Year { .. } => "Year totals",
    };
    writeln!(out, "## {summary}").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "- Characters: {}", aggregate.total_chars_typed).unwrap();
    writeln!(out, "- Words: {}", aggregate.total_words_typed).unwrap();
    writeln!(out, "- Active days: {}", aggregate.active_day_count).unwrap();
    writeln!(out, "- Average accuracy: {}", percent(aggregate.average_accuracy)).unwrap();
    writeln!(out).unwrap();

    writeln!(out, "## Characters").unwrap();
    writeln!(out, "### Alphabet").unwrap();
    write_table(&mut out, "Character", &aggregate.alphabet);
    writeln!(out).unwrap();
    writeln!(out, "### Symbols").unwrap();
    write_table(&mut out, "Character", &aggregate.symbols);
    writeln!(out).unwrap();

    writeln!(out, "## Shortcuts").unwrap();
    writeln!(out, "### System").unwrap();
    write_table(&mut out, "Shortcut", &aggregate.system_ranking);
    writeln!(out).unwrap();
    writeln!(out, "### Vim").unwrap();
    write_table(&mut out, "Shortcut", &aggregate.vim_ranking);
    writeln!(out).unwrap();

    write_deletions(&mut out, aggregate);
    writeln!(out).unwrap();

    writeln!(out, "## Days").unwrap();
    writeln!(
        out,
        "| Weekday | Date | Characters | Words | Chars/min | Words/min |"
    )
    .unwrap();
    writeln!(out, "|---|---|---|---|---|---|").unwrap();
    let link_days = matches!(scope, Scope::Month { .. });
    for row in &aggregate.days {
        write_day_row(&mut out, row, link_days);
    }
    out
}

fn title(scope: Scope) -> String {
    match scope {
        Scope::Month { .. } => scope
            .first_day()
            .map_or_else(|| scope.to_string(), |d| d.format("%B %Y").to_string()),
        Scope::Year { year } => format!("{year}"),
    }
}

fn write_table(out: &mut String, heading: &str, tallies: &[Tally]) {
    writeln!(out, "| Position | {heading} | Count |").unwrap();
    writeln!(out, "|---|---|---|").unwrap();
    for (i, tally) in tallies.iter().enumerate() {
        writeln!(out, "| {}. | `{}` | {} |", i + 1, tally.label, tally.count).unwrap();
    }
}

fn write_deletions(out: &mut String, aggregate: &Aggregate) {
    let deletions = &aggregate.deletions;
    writeln!(out, "## Deletions").unwrap();
    writeln!(out).unwrap();
    if deletions.boundary_most_deleted() {
        writeln!(out, "> The most deleted character was a space.").unwrap();
    } else {
        writeln!(out, "**Most deleted character:**").unwrap();
        writeln!(out).unwrap();
        match &deletions.most_deleted {
            Some(most) => {
                writeln!(out, "- Character: `{}`", most.label).unwrap();
                writeln!(out, "- Count: {}", most.count).unwrap();
            }
            None => writeln!(out, "- Character: none").unwrap(),
        }
    }
    writeln!(out).unwrap();
    writeln!(out, "### Top 20 deleted characters (without space)").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "| Character | Count |").unwrap();
    writeln!(out, "|---|---|").unwrap();
    for tally in &deletions.top {
        writeln!(out, "| `{}` | {} |", tally.label, tally.count).unwrap();
    }
}

fn write_day_row(out: &mut String, row: &DayRow, link_days: bool) {
    let weekday = row.date.format("%A").to_string();
    let date = if link_days && row.recorded {
        format!("[[{}]]", row.date)
    } else {
        row.date.to_string()
    };
    let cells = [
        weekday,
        date,
        row.chars_typed.to_string(),
        row.words_typed.to_string(),
        row.chars_per_minute.to_string(),
        row.words_per_minute.to_string(),
    ];

    out.push('|');
    for cell in cells {
        if row.rest_day {
            write!(out, " =={cell}== |").unwrap();
        } else {
            write!(out, " {cell} |").unwrap();
        }
    }
    out.push('\n');
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
