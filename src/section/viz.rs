//! Rendering of segmentation results
//!
//! Two renderers: a plain-text outline for terminals and an HTML view that
//! highlights section headers and entities inline, in the style of NER
//! visualizers. Entity labels get a stable color from a fixed cycle; section
//! headers are always drawn in light gray so they read as structure rather
//! than content.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::section::attributes::Entity;
use crate::section::partition::Segmentation;
use crate::section::token::Document;

const LABEL_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const SECTION_COLOR: &str = "#dee0e3";

/// Plain-text outline of a segmentation
pub fn render_text(doc: &Document, segmentation: &Segmentation) -> String {
    let mut out = String::new();
    for (i, section) in segmentation.sections().iter().enumerate() {
        let title = section.title.as_deref().unwrap_or("(untitled)");
        let _ = writeln!(out, "[{}] {}", i, title);
        if let Some(parent) = &section.parent_title {
            let _ = writeln!(out, "    parent: {}", parent);
        }
        if let Some(header) = &section.header {
            let _ = writeln!(out, "    header: {}", doc.slice(header));
        }
        let _ = writeln!(out, "    body: {}", doc.slice(&section.body));
    }
    out
}

struct Mark {
    start: usize,
    end: usize,
    label: String,
    color: String,
}

/// HTML view with highlighted section headers and entities.
///
/// Marks that overlap an earlier mark are dropped rather than nested.
pub fn render_html(doc: &Document, segmentation: &Segmentation, entities: &[Entity]) -> String {
    let mut colors: HashMap<&str, &str> = HashMap::new();
    let mut next_color = 0usize;
    let mut marks = Vec::new();

    for entity in entities {
        let color = *colors.entry(entity.label.as_str()).or_insert_with(|| {
            let color = LABEL_COLORS[next_color % LABEL_COLORS.len()];
            next_color += 1;
            color
        });
        let span = doc.byte_span(&entity.span);
        marks.push(Mark {
            start: span.start,
            end: span.end,
            label: entity.label.to_uppercase(),
            color: color.to_string(),
        });
    }

    for section in segmentation.sections() {
        let (title, header) = match (&section.title, &section.header) {
            (Some(title), Some(header)) => (title, header),
            _ => continue,
        };
        let span = doc.byte_span(header);
        marks.push(Mark {
            start: span.start,
            end: span.end,
            label: format!("<< {} >>", title.to_uppercase()),
            color: SECTION_COLOR.to_string(),
        });
    }

    marks.sort_by_key(|m| (m.start, m.end));

    let text = doc.text();
    let mut out = String::from("<div class=\"sections\">");
    let mut cursor = 0;
    for mark in marks {
        if mark.start < cursor {
            continue;
        }
        out.push_str(&escape(&text[cursor..mark.start]));
        let _ = write!(
            out,
            "<mark style=\"background: {}\">{}<span class=\"label\">{}</span></mark>",
            mark.color,
            escape(&text[mark.start..mark.end]),
            escape(&mark.label)
        );
        cursor = mark.end;
    }
    out.push_str(&escape(&text[cursor..]));
    out.push_str("</div>");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
