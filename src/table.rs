//! Plain-text and Markdown rendering of small result tables.

use std::borrow::Cow;
use std::fmt::Write as _;

/// Renders an aligned text table; numeric cells are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows);
    let numeric = numeric_columns(headers.len(), rows);

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &[]));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &[]));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

/// Renders at most `limit` rows followed by an elision note.
pub fn render_preview(headers: &[String], rows: &[Vec<String>], limit: usize) -> String {
    let shown = rows.len().min(limit);
    let mut output = render_table(headers, &rows[..shown]);
    if rows.len() > shown {
        let _ = writeln!(output, "... {} more row(s)", rows.len() - shown);
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Renders a GitHub-flavoured Markdown table.
pub fn render_markdown_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let numeric = numeric_columns(headers.len(), rows);
    let escape = |value: &str| sanitize_cell(value).replace('|', "\\|");

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| escape(h)).collect();
    let _ = writeln!(output, "| {} |", header_cells.join(" | "));
    let align: Vec<&str> = (0..headers.len())
        .map(|idx| if numeric.contains(&idx) { "---:" } else { "---" })
        .collect();
    let _ = writeln!(output, "| {} |", align.join(" | "));
    for row in rows {
        let cells: Vec<String> = (0..headers.len())
            .map(|idx| row.get(idx).map(|cell| escape(cell)).unwrap_or_default())
            .collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
    output
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(headers.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    widths.iter().map(|w| (*w).max(3)).collect()
}

fn numeric_columns(column_count: usize, rows: &[Vec<String>]) -> Vec<usize> {
    (0..column_count)
        .filter(|&idx| {
            let mut cells = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|cell| !cell.is_empty())
                .peekable();
            cells.peek().is_some() && cells.all(|cell| cell.parse::<f64>().is_ok())
        })
        .collect()
}

fn format_row(values: &[String], widths: &[usize], right_aligned: &[usize]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (value, width))| {
            let sanitized = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
            if right_aligned.contains(&idx) {
                format!("{padding}{sanitized}")
            } else {
                format!("{sanitized}{padding}")
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
