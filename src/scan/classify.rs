use regex::Captures;
use regex::Regex;

use crate::elf::BuildId;
use crate::util::parse_hex_addr;
use crate::Addr;

use super::scanner::ScanState;
use super::stack::FrameRecord;


/// The header introducing the list of a thread's recent stack frames.
const HISTORY_HEADER: &str = "Previously allocated frames:";


/// A backtrace frame line, e.g.
/// `#0 0x7f6e35cf2e45  (/blah/foo.so+0x11fe45) (BuildId: 4abce4cd)`.
#[derive(Debug, PartialEq)]
pub(crate) struct Frame<'line> {
    /// Everything preceding the `#`.
    pub prefix: &'line str,
    /// The frame number.
    pub number: &'line str,
    /// The spacing between frame number and address.
    pub spacing: &'line str,
    /// The binary as recorded.
    pub binary: &'line str,
    /// The offset inside of `binary`.
    pub offset: Addr,
    pub build_id: Option<BuildId>,
}

/// A stack history record line, e.g.
/// `record_addr:0x1234 record:0x5678 (/blah/foo.so+0x1234) (BuildId: 4abce4cd)`.
#[derive(Debug, PartialEq)]
pub(crate) struct HistoryRecord<'line> {
    pub record: FrameRecord,
    /// The binary as recorded.
    pub binary: &'line str,
    /// The offset of the frame's code inside of `binary`.
    pub offset: Addr,
    pub build_id: Option<BuildId>,
}

/// The outcome of classifying a single line.
#[derive(Debug, PartialEq)]
pub(crate) enum Line<'line> {
    /// The stack history header.
    HistoryHeader,
    /// A stack history record.
    HistoryRecord(HistoryRecord<'line>),
    /// A backtrace frame.
    Frame(Frame<'line>),
    /// Anything else, to be passed through.
    Other,
}


fn parse_build_id(captures: &Captures<'_>, idx: usize) -> Option<BuildId> {
    captures
        .get(idx)
        .and_then(|m| m.as_str().parse::<BuildId>().ok())
}


/// A classifier of crash report lines.
#[derive(Debug)]
pub(crate) struct LineClassifier {
    tag_mismatch: Regex,
    access_tags: Regex,
    record: Regex,
    frame: Regex,
}

impl LineClassifier {
    pub fn new() -> Self {
        // SANITY: All patterns are known to be valid.
        let regex = |pattern: &str| Regex::new(pattern).unwrap();

        Self {
            tag_mismatch: regex(r"HWAddressSanitizer: tag-mismatch on address (0x[0-9a-f]+)\b"),
            access_tags: regex(
                r"(?:^|\s)of size [0-9]+ at 0x[0-9a-f]* tags: ([0-9a-f]+)/[0-9a-f]+(?:\([0-9a-f]+\))? \(ptr/mem\)",
            ),
            record: regex(
                r"^.*?record_addr:(0x[0-9a-f]+) +record:(0x[0-9a-f]+) +\((.*)\+(0x[0-9a-f]+)\)(?:\s*\(BuildId: ([0-9a-f]+)\))?",
            ),
            frame: regex(
                r"^(.*?)#([0-9]+)( *)(?:0x[0-9a-f]*) *\((.*)\+(0x[0-9a-f]+)\)(?:\s*\(BuildId: ([0-9a-f]+)\))?",
            ),
        }
    }

    /// Extract the faulting address from a tag mismatch line.
    pub fn access_address(&self, line: &str) -> Option<Addr> {
        let captures = self.tag_mismatch.captures(line)?;
        parse_hex_addr(captures.get(1)?.as_str())
    }

    /// Extract the pointer tag from an access description line (`READ
    /// of size 8 at 0x... tags: 3e/3f (ptr/mem)`).
    pub fn access_tag(&self, line: &str) -> Option<u8> {
        let captures = self.access_tags.captures(line)?;
        u8::from_str_radix(captures.get(1)?.as_str(), 16).ok()
    }

    pub fn history_header(&self, line: &str) -> bool {
        line.starts_with(HISTORY_HEADER)
    }

    pub fn history_record<'line>(&self, line: &'line str) -> Option<HistoryRecord<'line>> {
        let captures = self.record.captures(line)?;
        let record = FrameRecord {
            record_addr: parse_hex_addr(captures.get(1)?.as_str())?,
            record: parse_hex_addr(captures.get(2)?.as_str())?,
        };

        Some(HistoryRecord {
            record,
            binary: captures.get(3)?.as_str(),
            offset: parse_hex_addr(captures.get(4)?.as_str())?,
            build_id: parse_build_id(&captures, 5),
        })
    }

    pub fn frame<'line>(&self, line: &'line str) -> Option<Frame<'line>> {
        let captures = self.frame.captures(line)?;
        Some(Frame {
            prefix: captures.get(1)?.as_str(),
            number: captures.get(2)?.as_str(),
            spacing: captures.get(3)?.as_str(),
            binary: captures.get(4)?.as_str(),
            offset: parse_hex_addr(captures.get(5)?.as_str())?,
            build_id: parse_build_id(&captures, 6),
        })
    }

    /// Classify `line`, taking into account what the scan has seen so
    /// far.
    ///
    /// The history header is only recognized once a faulting access is
    /// known, and history records only after the header.
    pub fn classify<'line>(&self, line: &'line str, state: &ScanState) -> Line<'line> {
        if state.access().is_some() && self.history_header(line) {
            return Line::HistoryHeader
        }

        if state.history_armed() {
            if let Some(record) = self.history_record(line) {
                return Line::HistoryRecord(record)
            }
        }

        if let Some(frame) = self.frame(line) {
            return Line::Frame(frame)
        }
        Line::Other
    }
}
