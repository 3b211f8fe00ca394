use lazy_static::lazy_static;
use regex::Regex;

use super::scanner::{Tag, TagScanner};

/// Container wrapped around each page of editable content.
pub const PAGE_OPEN: &str = r#"<div class="page">"#;
const PAGE_BREAK_MARKUP: &str = r#"</div><div class="page">"#;

/// Print styles for documents sent back to the converter.
pub const EXPORT_STYLES: &str = concat!(
    "<style>",
    "body{font-family:Arial, sans-serif; color:#212529; margin:0; padding:0;}",
    ".page{width:794px; min-height:1123px; margin:0 auto; padding:48px 56px; box-sizing:border-box; page-break-after:always;}",
    "p{margin:0 0 12px 0; white-space:pre-wrap; word-break:break-word; overflow-wrap:anywhere;}",
    "*{word-break:break-word; overflow-wrap:anywhere;}",
    "</style>",
);

lazy_static! {
    static ref PAGE_BREAK: Regex = Regex::new(r"(?i)page-break-before\s*:\s*always").unwrap();
}

fn find_start<'a>(tags: &mut TagScanner<'a>, name: &str) -> Option<Tag<'a>> {
    tags.find(|t| !t.closing && t.name == name)
}

fn find_end<'a>(tags: &mut TagScanner<'a>, name: &str) -> Option<Tag<'a>> {
    tags.find(|t| t.closing && t.name == name)
}

/// Markup between `<body ...>` and `</body>`.
///
/// Without a body tag the input is returned unchanged; without an end tag
/// everything after the start tag is returned.
pub fn extract_body(html: &str) -> String {
    let mut tags = TagScanner::new(html);
    let Some(open) = find_start(&mut tags, "body") else {
        return html.to_string();
    };
    match find_end(&mut tags, "body") {
        Some(close) => html[open.end..close.start].to_string(),
        None => html[open.end..].to_string(),
    }
}

/// Every `<style>` block inside `<head>`, concatenated in document order.
pub fn extract_head_styles(html: &str) -> String {
    let mut tags = TagScanner::new(html);
    if find_start(&mut tags, "head").is_none() {
        return String::new();
    }

    let mut styles = String::new();
    while let Some(tag) = tags.next() {
        if tag.name == "head" && tag.closing {
            return styles;
        }
        if tag.name == "style" && !tag.closing {
            match find_end(&mut tags, "style") {
                Some(close) => styles.push_str(&html[tag.start..close.end]),
                None => break,
            }
        }
    }

    // No </head>: nothing is trusted.
    String::new()
}

/// Split body markup into `<div class="page">` containers at every
/// `div`/`p` carrying an inline `page-break-before: always`.
pub fn repaginate(body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(body.len() + PAGE_OPEN.len() + 6);
    let mut last = 0;
    for tag in TagScanner::new(body) {
        if tag.closing || !matches!(tag.name.as_str(), "div" | "p") {
            continue;
        }
        if !PAGE_BREAK.is_match(tag.attributes()) {
            continue;
        }

        out.push_str(&body[last..tag.start]);
        // A break before any content would only open an empty page.
        if !out.trim().is_empty() {
            out.push_str(PAGE_BREAK_MARKUP);
        }
        out.push_str(&PAGE_BREAK.replace(&body[tag.start..tag.end], "page-break-before:always"));
        last = tag.end;
    }
    out.push_str(&body[last..]);

    if out.trim_start().starts_with(PAGE_OPEN) {
        out
    } else {
        format!("{}{}</div>", PAGE_OPEN, out)
    }
}

/// Converter HTML turned into the markup handed to the browser editor.
pub fn wrap_for_editing(html: &str) -> String {
    let mut editable = extract_head_styles(html);
    editable.push_str(&repaginate(&extract_body(html)));
    editable
}

/// Edited markup turned into a standalone document for the converter.
///
/// Full documents keep their own styles when they have any; otherwise the
/// export styles are placed at the start of `<head>`. Fragments are wrapped
/// in a minimal UTF-8 document.
pub fn wrap_for_conversion(edited: &str) -> String {
    let lower = edited.to_ascii_lowercase();
    if !lower.contains("<html") {
        return format!(
            r#"<!DOCTYPE html><html><head><meta charset="utf-8">{}</head><body>{}</body></html>"#,
            EXPORT_STYLES, edited
        );
    }
    if lower.contains("<style") {
        return edited.to_string();
    }

    let mut tags = TagScanner::new(edited);
    let (at, insert) = match find_start(&mut tags, "head") {
        Some(head) => (head.end, EXPORT_STYLES.to_string()),
        None => match find_start(&mut TagScanner::new(edited), "html") {
            Some(html) => (html.end, format!("<head>{}</head>", EXPORT_STYLES)),
            None => return edited.to_string(),
        },
    };

    let mut out = String::with_capacity(edited.len() + insert.len());
    out.push_str(&edited[..at]);
    out.push_str(&insert);
    out.push_str(&edited[at..]);
    out
}
