use crate::assets::extract::ScriptSource;

/// One parsed animation program: an ordered, immutable list of text lines.
///
/// Lines are classified lazily, one at a time, as the dispatcher reaches
/// them. There is no pre-pass: a label is unknown until its declaration
/// line has physically executed.
#[derive(Clone, Debug)]
pub struct Script {
    name: String,
    lines: Vec<String>,
}

/// Lazy classification of a single script line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty line or `;` comment.
    Blank,
    /// `name:` declaration at line start.
    Label(&'a str),
    /// Command token plus raw argument text.
    Instr {
        /// The command token as written (case preserved).
        command: &'a str,
        /// Everything after the command token, trimmed.
        args: &'a str,
    },
}

impl Script {
    /// Script from a name and raw lines.
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    /// Script name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// `true` when the script has no lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Classify line `index`, or `None` past the end of the script.
    pub fn classify(&self, index: usize) -> Option<Line<'_>> {
        let line = self.lines.get(index)?.trim();
        if line.is_empty() || line.starts_with(';') {
            return Some(Line::Blank);
        }
        if let Some(name) = label_name(line) {
            return Some(Line::Label(name));
        }
        Some(match line.split_once(char::is_whitespace) {
            Some((command, args)) => Line::Instr {
                command,
                args: args.trim(),
            },
            None => Line::Instr {
                command: line,
                args: "",
            },
        })
    }
}

impl From<ScriptSource> for Script {
    fn from(src: ScriptSource) -> Self {
        Self::new(src.name, src.lines)
    }
}

/// A label declaration is a colon-terminated first token: `name:`.
fn label_name(line: &str) -> Option<&str> {
    let colon = line.find(':')?;
    let name = &line[..colon];
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name)
}
