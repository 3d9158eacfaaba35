//! Conversion of raw run logs (with ANSI SGR escapes) into styled lines.

use crate::color::Color;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub fg: Option<Color>,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    /// The line's text with all styling dropped.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn push(&mut self, text: &mut String, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(StyledSpan {
                text: text.clone(),
                style,
            }),
        }
        text.clear();
    }
}

/// Split `raw` into lines of styled spans.
///
/// SGR color and bold attributes are honoured and carry over line breaks;
/// every other escape sequence is dropped.
pub fn to_styled_lines(raw: &str) -> Vec<StyledLine> {
    let mut lines = Vec::new();
    let mut line = StyledLine::default();
    let mut text = String::new();
    let mut style = SpanStyle::default();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                line.push(&mut text, style);
                lines.push(std::mem::take(&mut line));
            }
            '\r' => {}
            '\u{1b}' => {
                if chars.peek() != Some(&'[') {
                    // Lone ESC or a non-CSI sequence: skip the next char.
                    chars.next();
                    continue;
                }
                chars.next();
                let mut params = String::new();
                let mut terminator = None;
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        terminator = Some(c);
                        break;
                    }
                    params.push(c);
                }
                if terminator == Some('m') {
                    let next = apply_sgr(style, &params);
                    if next != style {
                        line.push(&mut text, style);
                        style = next;
                    }
                }
            }
            c => text.push(c),
        }
    }

    line.push(&mut text, style);
    if !line.spans.is_empty() {
        lines.push(line);
    }
    lines
}

fn apply_sgr(mut style: SpanStyle, params: &str) -> SpanStyle {
    let codes: Vec<u16> = params
        .split(';')
        .map(|p| p.parse().unwrap_or(0))
        .collect();
    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            0 => style = SpanStyle::default(),
            1 => style.bold = true,
            22 => style.bold = false,
            n @ 30..=37 => style.fg = Some(Color::Ansi256((n - 30) as u8)),
            n @ 90..=97 => style.fg = Some(Color::Ansi256((n - 90 + 8) as u8)),
            39 => style.fg = None,
            38 => match codes.get(i + 1) {
                Some(5) => {
                    if let Some(&n) = codes.get(i + 2) {
                        style.fg = u8::try_from(n).ok().map(Color::Ansi256);
                    }
                    i += 2;
                }
                Some(2) => {
                    if let (Some(&r), Some(&g), Some(&b)) =
                        (codes.get(i + 2), codes.get(i + 3), codes.get(i + 4))
                    {
                        style.fg = Some(Color::Hex {
                            r: r.min(255) as u8,
                            g: g.min(255) as u8,
                            b: b.min(255) as u8,
                        });
                    }
                    i += 4;
                }
                _ => {}
            },
            _ => {}
        }
        i += 1;
    }
    style
}
