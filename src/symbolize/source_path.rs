use regex::Regex;


/// Rewriting of the `file:line` locations reported by the symbolizer.
///
/// Build host specific prefixes are stripped, and locations inside the
/// sanitizer runtimes themselves are collapsed into fixed labels.
#[derive(Debug)]
pub(crate) struct SourcePaths {
    /// Prefixes to strip, applied in order.
    prefixes: Vec<String>,
    /// Patterns to replace, applied in order after prefix stripping.
    collapse: Vec<(Regex, &'static str)>,
}

impl SourcePaths {
    pub fn new(prefixes: Vec<String>) -> Self {
        let collapse = [
            (r".*hwasan_[a-z_]*\.(?:cc|cpp|h):[0-9]*", "[hwasan_rtl]"),
            (r".*asan_[a-z_]*\.(?:cc|cpp|h):[0-9]*", "[asan_rtl]"),
            (r".*crtstuff\.c:0", "???:0"),
        ]
        .into_iter()
        // SANITY: All patterns are known to be valid.
        .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
        .collect();

        Self { prefixes, collapse }
    }

    /// Rewrite a single `file:line` location.
    pub fn rewrite(&self, file_line: &str) -> String {
        let mut file_line = file_line.to_string();
        for prefix in self.prefixes.iter().filter(|prefix| !prefix.is_empty()) {
            if let Some(idx) = file_line.rfind(prefix.as_str()) {
                file_line = file_line.split_off(idx + prefix.len());
            }
        }

        for (regex, label) in &self.collapse {
            file_line = regex.replace(&file_line, *label).into_owned();
        }
        file_line
    }
}
