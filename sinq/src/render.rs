//! Text rendering for questions, distributions and responses.

use std::io::{self, Write};

use colored::Colorize;
use survey::{DisplayConfig, Distribution, Response, ResponseValue, Schema, SchemaEntry, SurveyData};

/// Key that selects every question in a response dump.
pub const ALL_KEYS: &str = "*";

/// Print numbered questions under a heading.
pub fn questions(out: &mut dyn Write, heading: &str, entries: &[&SchemaEntry]) -> io::Result<()> {
    writeln!(out, "{}", heading.bold())?;
    let width = entries.len().to_string().len();
    for (i, entry) in entries.iter().enumerate() {
        question(out, entry, i + 1, width)?;
    }
    Ok(())
}

fn question(out: &mut dyn Write, entry: &SchemaEntry, number: usize, width: usize) -> io::Result<()> {
    writeln!(
        out,
        "{:0width$}. [{}] ({})",
        number,
        entry.key.cyan(),
        entry.qtype,
        width = width
    )?;
    writeln!(out, "    {}", entry.text)?;
    if entry.qtype.is_choice() && !entry.options.is_empty() {
        writeln!(out, "    Used options:")?;
        for option in &entry.options {
            writeln!(out, "        - {}", option)?;
        }
    }
    Ok(())
}

/// Print a distribution table with a share column and a bar per option.
pub fn distribution(out: &mut dyn Write, dist: &Distribution, display: &DisplayConfig) -> io::Result<()> {
    writeln!(out, "{} {}: {}", "Distribution for".bold(), dist.key, dist.text)?;

    let width = dist
        .rows
        .iter()
        .map(|row| row.option.chars().count())
        .max()
        .unwrap_or(0)
        .min(display.option_width);

    for row in &dist.rows {
        let bar = bar(row.count, dist.total, display.bar_width);
        distribution_line(out, &truncate(&row.option, width), row.count, dist.share(row.count), &bar, width)?;
    }
    distribution_line(out, "(missing)", dist.missing, dist.share(dist.missing), "", width)?;
    let total_share = if dist.total == 0 { 0.0 } else { 100.0 };
    distribution_line(out, "(total)", dist.total, total_share, "", width)
}

fn distribution_line(
    out: &mut dyn Write,
    label: &str,
    count: usize,
    share: f64,
    bar: &str,
    width: usize,
) -> io::Result<()> {
    let line = format!(
        "  {:<width$} : {:>7}  ({:>6.2}%) {}",
        label,
        count,
        share,
        bar,
        width = width
    );
    writeln!(out, "{}", line.trim_end())
}

/// Cut `s` to `width` characters, ending in an ellipsis when shortened.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width <= 1 {
        return s.chars().take(width).collect();
    }
    let mut cut: String = s.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

/// Bar of `width` cells, filled in proportion to `count / total` (rounded).
fn bar(count: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((count as f64 * width as f64 / total as f64) + 0.5) as usize
    }
    .min(width);
    format!("{}{}", "█".repeat(filled), " ".repeat(width - filled))
}

/// Print responses as `Response N:` blocks, numbered within `responses`.
///
/// `keys` picks and orders the fields shown; empty or containing
/// [`ALL_KEYS`] shows every question in schema order.
pub fn responses(
    out: &mut dyn Write,
    schema: &Schema,
    responses: &[&Response],
    keys: &[String],
    display: &DisplayConfig,
) -> io::Result<()> {
    let keys = shown_keys(schema, keys);
    for (i, response) in responses.iter().enumerate() {
        writeln!(out, "{}", format!("Response {}:", i + 1).bold())?;
        for key in &keys {
            let value = SurveyData::value(response, key);
            writeln!(out, "    {}: {}", key, value_text(value, display.max_choices))?;
        }
    }
    Ok(())
}

/// Keys to display, without duplicates, in request order.
fn shown_keys<'a>(schema: &'a Schema, keys: &'a [String]) -> Vec<&'a str> {
    if keys.is_empty() || keys.iter().any(|k| k == ALL_KEYS) {
        return schema.iter().map(|e| e.key.as_str()).collect();
    }
    let mut shown: Vec<&str> = Vec::with_capacity(keys.len());
    for key in keys {
        if !shown.contains(&key.as_str()) {
            shown.push(key);
        }
    }
    shown
}

/// One response value as display text.
///
/// Absent values print `n/a`. Choice lists longer than `max_choices` are cut
/// with a `... (N more)` marker.
pub fn value_text(value: &ResponseValue, max_choices: usize) -> String {
    match value {
        ResponseValue::Absent => "n/a".to_string(),
        ResponseValue::Text(text) => text.clone(),
        ResponseValue::Choices(choices) if choices.len() > max_choices => {
            let shown = choices[..max_choices].join(", ");
            let more = format!("... ({} more)", choices.len() - max_choices);
            if shown.is_empty() {
                more
            } else {
                format!("{}, {}", shown, more)
            }
        }
        ResponseValue::Choices(choices) => choices.join(", "),
    }
}
