//! Tag scanner for converter-produced HTML
//!
//! Not a parser: it only finds tags and their byte spans. Quoted attribute
//! values may contain `>`, comments and declarations are skipped, and the
//! contents of `<style>`/`<script>` are treated as raw text.

/// One start or end tag found in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Byte offset of the `<`.
    pub start: usize,
    /// Byte offset just past the `>`.
    pub end: usize,
    /// Lowercased tag name.
    pub name: String,
    pub closing: bool,
    pub self_closing: bool,
    attributes: &'a str,
}

impl<'a> Tag<'a> {
    /// Raw text between the tag name and the closing `>`.
    pub fn attributes(&self) -> &'a str {
        self.attributes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagOpen,
    TagName,
    Attributes,
    Quoted(u8),
    Declaration,
}

const RAW_TEXT_ELEMENTS: [&str; 2] = ["style", "script"];

pub struct TagScanner<'a> {
    src: &'a str,
    pos: usize,
    raw_text: Option<String>,
}

impl<'a> TagScanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_text: None,
        }
    }

    /// Jump to the end tag of a raw-text element, or to the end of input.
    fn skip_raw_text(&mut self, name: &str) {
        let needle = format!("</{}", name);
        self.pos = find_ignore_case(&self.src[self.pos..], &needle)
            .map_or(self.src.len(), |offset| self.pos + offset);
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        if let Some(name) = self.raw_text.take() {
            self.skip_raw_text(&name);
        }

        let bytes = self.src.as_bytes();
        let mut state = State::Text;
        let mut start = 0;
        let mut name_start = 0;
        let mut name_end = 0;
        let mut closing = false;
        let mut value_start = false;

        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            match state {
                State::Text => {
                    if b == b'<' {
                        start = self.pos;
                        closing = false;
                        state = State::TagOpen;
                    }
                }
                State::TagOpen => {
                    if b == b'/' && !closing {
                        closing = true;
                    } else if b.is_ascii_alphabetic() {
                        name_start = self.pos;
                        state = State::TagName;
                    } else if !closing && self.src[self.pos..].starts_with("!--") {
                        let body = self.pos + 3;
                        self.pos = self.src[body..]
                            .find("-->")
                            .map_or(bytes.len(), |offset| body + offset + 3);
                        state = State::Text;
                        continue;
                    } else if !closing && (b == b'!' || b == b'?') {
                        state = State::Declaration;
                    } else {
                        // A stray '<' in text.
                        state = State::Text;
                        continue;
                    }
                }
                State::TagName => {
                    if !(b.is_ascii_alphanumeric() || b == b'-' || b == b':') {
                        name_end = self.pos;
                        value_start = false;
                        state = State::Attributes;
                        continue;
                    }
                }
                State::Attributes => match b {
                    // Quotes only open a value right after `=`; elsewhere
                    // they are part of an unquoted value.
                    b'"' | b'\'' if value_start => {
                        value_start = false;
                        state = State::Quoted(b);
                    }
                    b'=' => value_start = true,
                    b if b.is_ascii_whitespace() => {}
                    b'>' => {
                        let attributes = &self.src[name_end..self.pos];
                        let name = self.src[name_start..name_end].to_ascii_lowercase();
                        self.pos += 1;

                        if !closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                            self.raw_text = Some(name.clone());
                        }
                        return Some(Tag {
                            start,
                            end: self.pos,
                            self_closing: attributes.trim_end().ends_with('/'),
                            name,
                            closing,
                            attributes,
                        });
                    }
                    _ => value_start = false,
                },
                State::Quoted(quote) => {
                    if b == quote {
                        state = State::Attributes;
                    }
                }
                State::Declaration => {
                    if b == b'>' {
                        state = State::Text;
                    }
                }
            }
            self.pos += 1;
        }

        None
    }
}

/// Byte offset of the first ASCII case-insensitive match of `needle`.
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}
