//! Patchnote rendering.
//!
//! Pure string formatting of a [`ContentDifference`]; no I/O.

use dreams_types::ChangeKind;

use crate::difference::ContentDifference;

const TITLE_RULE_LEN: usize = 20;
const RULE: char = '-';

/// Layout of a rendered patchnote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatchnoteStyle {
    /// Banner with version labels, sections split by rule lines.
    #[default]
    Fancy,
    /// `Added:` / `Removed:` / `Modified:` headers.
    Plain,
}

/// Render `diff` as a patchnote, every line indented by `indent` spaces.
///
/// Categories without entries are left out entirely.
pub fn format_patchnote(diff: &ContentDifference, style: PatchnoteStyle, indent: usize) -> String {
    let mut out = Note::new(indent);

    let title = format!(
        "{rule} [PATCHNOTE {} -> {}] {rule}",
        diff.old_version(),
        diff.new_version(),
        rule = RULE.to_string().repeat(TITLE_RULE_LEN),
    );
    let rule = RULE.to_string().repeat(title.chars().count());

    if style == PatchnoteStyle::Fancy {
        out.line(&rule);
        out.line(&title);
        out.line(&rule);
        out.blank();
    }

    let sections = ChangeKind::ALL
        .into_iter()
        .filter(|kind| !diff.paths(*kind).is_empty());

    for (i, kind) in sections.enumerate() {
        match style {
            PatchnoteStyle::Fancy => {
                if i > 0 {
                    out.line(&rule);
                    out.blank();
                }
            }
            PatchnoteStyle::Plain => {
                if i > 0 {
                    out.blank();
                }
                out.line(header(kind));
            }
        }
        for path in diff.paths(kind) {
            out.line(&format!("[{}] {}", kind.symbol(), path));
        }
        if style == PatchnoteStyle::Fancy {
            out.blank();
        }
    }

    if style == PatchnoteStyle::Fancy {
        out.line(&rule);
    }
    out.finish()
}

fn header(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "Added:",
        ChangeKind::Removed => "Removed:",
        ChangeKind::Modified => "Modified:",
    }
}

struct Note {
    indent: String,
    text: String,
}

impl Note {
    fn new(indent: usize) -> Self {
        Self {
            indent: " ".repeat(indent),
            text: String::new(),
        }
    }

    fn line(&mut self, line: &str) {
        self.text.push_str(&self.indent);
        self.text.push_str(&line.replace('\n', ""));
        self.text.push('\n');
    }

    fn blank(&mut self) {
        self.text.push_str(&self.indent);
        self.text.push('\n');
    }

    fn finish(self) -> String {
        self.text
    }
}
