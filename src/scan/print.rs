use std::borrow::Cow;
use std::io::Write;

use crate::Result;


/// The format of the symbolized transcript.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Format {
    /// Plain text, as the input.
    #[default]
    Text,
    /// An HTML document, with the transcript in a `<pre>` block.
    Html,
}

impl Format {
    /// Write the document prologue, if any.
    pub(crate) fn prologue(&self, out: &mut dyn Write) -> Result<()> {
        if let Self::Html = self {
            let () = writeln!(out, "<html><body><pre>")?;
        }
        Ok(())
    }

    /// Write the document epilogue, if any.
    pub(crate) fn epilogue(&self, out: &mut dyn Write) -> Result<()> {
        if let Self::Html = self {
            let () = writeln!(out, "</pre></body></html>")?;
        }
        Ok(())
    }

    /// Write a single line of the transcript.
    pub(crate) fn line(&self, out: &mut dyn Write, text: &str) -> Result<()> {
        let text = match self {
            Self::Text => Cow::Borrowed(text),
            Self::Html => escape(text),
        };
        let () = writeln!(out, "{text}")?;
        Ok(())
    }
}


/// Escape characters with special meaning in HTML.
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text)
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
