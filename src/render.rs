//! Plain terminal rendering of the runs list and the run detail.
//!
//! Everything writes to an `io::Write`; styling is emitted through crossterm
//! only when a color depth is given, so the same code prints to pipes.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor};
use unicode_width::UnicodeWidthStr;

use crate::ansi::StyledLine;
use crate::color::{Color, ColorDepth};
use crate::types::{ChangeAction, ChangeBadge, FilterKey, Pagination, RunRecord, RunStatus};
use crate::util;
use crate::views::detail::{DetailMode, DetailTab, RunDetailViewer};
use crate::views::runs::{Notification, NotificationLevel};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// `None` disables styling.
    pub depth: Option<ColorDepth>,
    pub date_format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            depth: None,
            date_format: "relative".to_owned(),
        }
    }
}

/// Status color: green when succeeded, red when failed, yellow otherwise.
pub fn status_color(status: Option<RunStatus>) -> Color {
    match status {
        Some(RunStatus::Succeeded) => Color::GREEN,
        Some(RunStatus::Failed) => Color::RED,
        Some(RunStatus::Pending | RunStatus::Running) | None => Color::YELLOW,
    }
}

pub fn badge_color(badge: ChangeBadge) -> Color {
    match badge {
        ChangeBadge::Error => Color::RED,
        ChangeBadge::Warning => Color::YELLOW,
        ChangeBadge::Neutral => Color::GREY,
    }
}

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

fn styled(
    out: &mut impl Write,
    text: &str,
    color: Option<Color>,
    bold: bool,
    opts: &RenderOptions,
) -> io::Result<()> {
    let Some(depth) = opts.depth else {
        return queue!(out, Print(text));
    };
    if bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if let Some(color) = color {
        queue!(out, SetForegroundColor(color.to_crossterm_color(depth)))?;
    }
    queue!(out, Print(text))?;
    if bold || color.is_some() {
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    }
    Ok(())
}

/// Pad `text` with spaces to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(text);
    format!("{text}{:fill$}", "", fill = width.saturating_sub(w))
}

// ---------------------------------------------------------------------------
// Runs list
// ---------------------------------------------------------------------------

const HEADERS: [&str; 4] = ["ID", "TYPE", "STATUS", "CREATED"];

/// Print the filter chips, the runs table and a pagination footer.
pub fn write_runs(
    out: &mut impl Write,
    runs: &[RunRecord],
    pagination: &Pagination,
    filters: &[(FilterKey, String)],
    opts: &RenderOptions,
) -> io::Result<()> {
    if !filters.is_empty() {
        let chips: Vec<String> = filters
            .iter()
            .map(|(key, value)| format!("{}: {value}", key.label()))
            .collect();
        styled(out, &format!("filters  {}", chips.join("  |  ")), Some(Color::GREY), false, opts)?;
        queue!(out, Print("\n"))?;
    }

    let rows: Vec<[String; 4]> = runs
        .iter()
        .map(|run| {
            [
                run.id.to_string(),
                run.kind.map_or("-", |k| k.as_str()).to_owned(),
                run.status.map_or("-", |s| s.as_str()).to_owned(),
                util::format_timestamp(run.creation_timestamp.as_ref(), &opts.date_format),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| UnicodeWidthStr::width(h));
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| pad(h, w))
        .collect();
    styled(out, header.join("  ").trim_end(), None, true, opts)?;
    queue!(out, Print("\n"))?;

    if rows.is_empty() {
        styled(out, "No runs", Some(Color::GREY), false, opts)?;
        queue!(out, Print("\n"))?;
    }
    for (run, row) in runs.iter().zip(&rows) {
        for (i, (cell, w)) in row.iter().zip(widths).enumerate() {
            if i > 0 {
                queue!(out, Print("  "))?;
            }
            let text = if i + 1 == row.len() { cell.clone() } else { pad(cell, w) };
            let color = (i == 2).then(|| status_color(run.status));
            styled(out, &text, color, false, opts)?;
        }
        queue!(out, Print("\n"))?;
    }

    let footer = format!(
        "page {}/{}  ({} runs, {} per page)",
        pagination.page,
        pagination.page_count(),
        pagination.total,
        pagination.page_size
    );
    styled(out, &footer, Some(Color::GREY), false, opts)?;
    queue!(out, Print("\n"))?;
    out.flush()
}

pub fn write_notification(
    out: &mut impl Write,
    notification: &Notification,
    opts: &RenderOptions,
) -> io::Result<()> {
    let color = match notification.level {
        NotificationLevel::Success => Color::GREEN,
        NotificationLevel::Error => Color::RED,
    };
    styled(out, &notification.message, Some(color), true, opts)?;
    queue!(out, Print("\n"))?;
    out.flush()
}

// ---------------------------------------------------------------------------
// Run detail
// ---------------------------------------------------------------------------

pub fn write_styled_lines(
    out: &mut impl Write,
    lines: &[StyledLine],
    opts: &RenderOptions,
) -> io::Result<()> {
    for line in lines {
        for span in &line.spans {
            styled(out, &span.text, span.style.fg, span.style.bold, opts)?;
        }
        queue!(out, Print("\n"))?;
    }
    Ok(())
}

fn write_badge(out: &mut impl Write, action: Option<ChangeAction>, opts: &RenderOptions) -> io::Result<()> {
    let action = action.unwrap_or(ChangeAction::Undefined);
    let label = format!("[{}]", action.as_str());
    styled(out, &pad(&label, 12), Some(badge_color(action.badge())), false, opts)
}

/// Print the open run: a header, then the current tab.
///
/// Change-mode runs list their resources with badges and the selected
/// resource's before/after documents on the result tab.
pub fn write_detail(
    out: &mut impl Write,
    viewer: &RunDetailViewer,
    opts: &RenderOptions,
) -> io::Result<()> {
    let (Some(record), Some(mode)) = (viewer.record(), viewer.mode()) else {
        return Ok(());
    };

    styled(out, &format!("Run #{}", record.id), None, true, opts)?;
    queue!(out, Print("  "), Print(record.kind.map_or("-", |k| k.as_str())), Print("  "))?;
    styled(
        out,
        record.status.map_or("-", |s| s.as_str()),
        Some(status_color(record.status)),
        false,
        opts,
    )?;
    queue!(out, Print("\n\n"))?;

    match (viewer.tab(), mode) {
        (DetailTab::ExecLogs, _) => write_styled_lines(out, viewer.log_lines(), opts)?,
        (DetailTab::ExecResult, DetailMode::Summary) => {
            queue!(out, Print(viewer.result_text()), Print("\n"))?;
        }
        (DetailTab::ExecResult, DetailMode::Changes) => {
            let resources = viewer.resources();
            if resources.is_empty() {
                styled(out, "No changes", Some(Color::GREY), false, opts)?;
                queue!(out, Print("\n"))?;
            }
            for (key, action) in resources {
                let marker = if viewer.selected_resource() == Some(key) { "> " } else { "  " };
                queue!(out, Print(marker))?;
                write_badge(out, action, opts)?;
                queue!(out, Print(key), Print("\n"))?;
            }
            if viewer.selected_step().is_some() {
                let (from, to) = viewer.diff_sides();
                queue!(out, Print("\n"))?;
                styled(out, "--- before", Some(Color::RED), false, opts)?;
                queue!(out, Print("\n"), Print(from), Print("\n"))?;
                styled(out, "+++ after", Some(Color::GREEN), false, opts)?;
                queue!(out, Print("\n"), Print(to), Print("\n"))?;
            }
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunKind;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn run(id: u64, status: Option<RunStatus>) -> RunRecord {
        RunRecord {
            id,
            kind: Some(RunKind::Apply),
            status,
            creation_timestamp: None,
            result: None,
            logs: None,
        }
    }

    #[test]
    fn status_colors() {
        assert_eq!(status_color(Some(RunStatus::Succeeded)), Color::GREEN);
        assert_eq!(status_color(Some(RunStatus::Failed)), Color::RED);
        assert_eq!(status_color(Some(RunStatus::Running)), Color::YELLOW);
        assert_eq!(status_color(None), Color::YELLOW);
    }

    #[test]
    fn table_is_aligned_and_has_footer() {
        let pagination = Pagination {
            page: 1,
            page_size: 10,
            total: 2,
        };
        let text = render(|out| {
            write_runs(
                out,
                &[run(7, Some(RunStatus::Succeeded)), run(1234, None)],
                &pagination,
                &[],
                &RenderOptions::default(),
            )
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID    TYPE   STATUS     CREATED");
        assert_eq!(lines[1], "7     Apply  Succeeded  -");
        assert_eq!(lines[2], "1234  Apply  -          -");
        assert_eq!(lines[3], "page 1/1  (2 runs, 10 per page)");
    }

    #[test]
    fn empty_page_and_filter_chips() {
        let text = render(|out| {
            write_runs(
                out,
                &[],
                &Pagination::default(),
                &[(FilterKey::Status, "Failed".to_owned())],
                &RenderOptions::default(),
            )
        });
        assert!(text.starts_with("filters  status: Failed\n"), "{text}");
        assert!(text.contains("No runs\n"));
    }

    #[test]
    fn colored_output_uses_escape_sequences() {
        let opts = RenderOptions {
            depth: Some(ColorDepth::Color16),
            ..RenderOptions::default()
        };
        let text = render(|out| {
            write_notification(
                out,
                &Notification {
                    level: NotificationLevel::Error,
                    message: "boom".to_owned(),
                },
                &opts,
            )
        });
        assert!(text.contains('\u{1b}'));
        assert!(text.contains("boom"));
    }

    #[test]
    fn change_mode_lists_resources_and_diff() {
        let mut record = run(9, Some(RunStatus::Succeeded));
        record.kind = Some(RunKind::Preview);
        record.result = Some(
            r#"{"stepKeys":["a"],"changeSteps":{"a":{"action":"Create","from":null,"to":{"x":1}}}}"#
                .to_owned(),
        );
        let mut viewer = RunDetailViewer::default();
        viewer.open(record);

        let text = render(|out| write_detail(out, &viewer, &RenderOptions::default()));
        assert!(text.starts_with("Run #9  Preview  Succeeded\n"), "{text}");
        assert!(text.contains("> [Create]    a\n"), "{text}");
        assert!(text.contains("+++ after\n{\n  \"x\": 1\n}\n"), "{text}");
    }
}
