//! Minimal inline markup for assistant replies.
//!
//! Only three things are recognised: `**strong**`, `*emphasis*` and newlines.
//! Strong spans are resolved before emphasis so `**x**` is never read as two
//! nested emphasis spans. Neither pattern crosses a line break.

use regex::Regex;
use std::sync::OnceLock;

fn strong_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("strong pattern is valid"))
}

fn emphasis_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*(.*?)\*").expect("emphasis pattern is valid"))
}

/// A stretch of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub strong: bool,
    pub emphasis: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            strong: false,
            emphasis: false,
        }
    }
}

/// Message text broken into lines of styled runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Markup {
    lines: Vec<Vec<Run>>,
}

impl Markup {
    /// Apply the strong/emphasis/line-break transform.
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(parse_line).collect(),
        }
    }

    /// Keep the text as-is, only splitting on newlines.
    pub fn plain(text: &str) -> Self {
        Self {
            lines: text
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        Vec::new()
                    } else {
                        vec![Run::plain(line)]
                    }
                })
                .collect(),
        }
    }

    pub fn lines(&self) -> &[Vec<Run>] {
        &self.lines
    }

    /// Render as an HTML fragment. All text is escaped; only the tags this
    /// module produces (`strong`, `em`, `br`) appear unescaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push_str("<br>");
            }
            for run in line {
                if run.strong {
                    out.push_str("<strong>");
                }
                if run.emphasis {
                    out.push_str("<em>");
                }
                out.push_str(&escape_html(&run.text));
                if run.emphasis {
                    out.push_str("</em>");
                }
                if run.strong {
                    out.push_str("</strong>");
                }
            }
        }
        out
    }

    /// The visible text with markers removed.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|run| run.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_line(line: &str) -> Vec<Run> {
    // Pass 1: strip `**` delimiters, remembering which bytes were inside.
    let mut text = String::with_capacity(line.len());
    let mut strong = Vec::with_capacity(line.len());
    let mut push = |segment: &str, is_strong: bool, text: &mut String| {
        text.push_str(segment);
        strong.extend(std::iter::repeat(is_strong).take(segment.len()));
    };

    let mut last = 0;
    for caps in strong_pattern().captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push(&line[last..whole.start()], false, &mut text);
        push(inner.as_str(), true, &mut text);
        last = whole.end();
    }
    push(&line[last..], false, &mut text);

    // Pass 2: emphasis over what is left, which may straddle a strong run.
    let mut emphasis = vec![false; text.len()];
    let mut hidden = vec![false; text.len()];
    for caps in emphasis_pattern().captures_iter(&text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        hidden[whole.start()] = true;
        hidden[whole.end() - 1] = true;
        for flag in &mut emphasis[inner.range()] {
            *flag = true;
        }
    }

    let mut runs: Vec<Run> = Vec::new();
    for (i, c) in text.char_indices() {
        if hidden[i] {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.strong == strong[i] && run.emphasis == emphasis[i] => run.text.push(c),
            _ => runs.push(Run {
                text: c.to_string(),
                strong: strong[i],
                emphasis: emphasis[i],
            }),
        }
    }
    runs
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
