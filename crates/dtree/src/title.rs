/// Structured rich text attached to a tree node.
///
/// The decoder never produces markup; it records which pieces of text
/// carry which tone and lets the presentation layer pick the colors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    pub lines: Vec<Vec<Span>>,
}

impl Title {
    pub fn push_line(&mut self, line: Vec<Span>) {
        self.lines.push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One run of text with a uniform tone. Spans on a line are rendered
/// back to back, so separators are explicit plain spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub tone: Tone,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Plain,
        }
    }

    pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// `Active` marks a variable fixed to 1, `Inactive` a variable fixed
/// to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Active,
    Inactive,
}

impl Tone {
    pub fn from_bit(bit: bool) -> Self {
        if bit { Tone::Active } else { Tone::Inactive }
    }
}
