//! Built-in base font metrics
//!
//! Overlay text is drawn with Helvetica, one of the PDF standard 14 fonts, so
//! nothing is embedded: the page only references the font by name with
//! `WinAnsiEncoding`. Line layout still needs glyph advances, which come from
//! the Adobe Helvetica AFM widths below (units of 1/1000 em).

/// Advance widths for WinAnsi codes 32..=126.
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Advance widths for WinAnsi codes 160..=255 (Latin-1 supplement).
const LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Typographic punctuation that rich-text editors emit, mapped into the
/// WinAnsi 0x80..0x9F block.
const WIN_ANSI_EXTRAS: [(char, u8, u16); 11] = [
    ('\u{20AC}', 0x80, 556),  // euro
    ('\u{2026}', 0x85, 1000), // ellipsis
    ('\u{2018}', 0x91, 222),  // quoteleft
    ('\u{2019}', 0x92, 222),  // quoteright
    ('\u{201C}', 0x93, 333),  // quotedblleft
    ('\u{201D}', 0x94, 333),  // quotedblright
    ('\u{2022}', 0x95, 350),  // bullet
    ('\u{2013}', 0x96, 556),  // endash
    ('\u{2014}', 0x97, 1000), // emdash
    ('\u{2122}', 0x99, 1000), // trademark
    ('\u{0153}', 0x9C, 944),  // oe
];

const REPLACEMENT: u8 = b'?';

/// Read-only metrics for a non-embedded base font.
#[derive(Debug)]
pub struct BaseFont {
    /// PostScript name written as `/BaseFont`.
    pub name: &'static str,
    ascii: &'static [u16; 95],
    latin1: &'static [u16; 96],
    extras: &'static [(char, u8, u16)],
}

/// The process-wide Helvetica metrics.
pub static HELVETICA: BaseFont = BaseFont {
    name: "Helvetica",
    ascii: &ASCII_WIDTHS,
    latin1: &LATIN1_WIDTHS,
    extras: &WIN_ANSI_EXTRAS,
};

impl BaseFont {
    /// Map a character to its WinAnsi code. Characters the encoding cannot
    /// represent become `?`.
    pub fn encode_char(&self, c: char) -> u8 {
        match c as u32 {
            32..=126 | 160..=255 => c as u8,
            _ => self
                .extras
                .iter()
                .find(|(ch, _, _)| *ch == c)
                .map(|(_, code, _)| *code)
                .unwrap_or(REPLACEMENT),
        }
    }

    /// Encode a string into WinAnsi bytes for a `Tj` operand.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        text.chars().map(|c| self.encode_char(c)).collect()
    }

    /// Advance width of a single WinAnsi code in 1/1000 em.
    pub fn code_width(&self, code: u8) -> u16 {
        match code {
            32..=126 => self.ascii[(code - 32) as usize],
            160..=255 => self.latin1[(code - 160) as usize],
            _ => self
                .extras
                .iter()
                .find(|(_, c, _)| *c == code)
                .map(|(_, _, w)| *w)
                .unwrap_or(self.ascii[(REPLACEMENT - 32) as usize]),
        }
    }

    /// Unscaled width of `text` in 1/1000 em.
    pub fn units_width(&self, text: &str) -> u32 {
        text.chars()
            .map(|c| self.code_width(self.encode_char(c)) as u32)
            .sum()
    }

    /// Width of `text` in points at `font_size`.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        self.units_width(text) as f32 / 1000.0 * font_size
    }
}
