use std::cell::RefCell;
use std::fs::write;
use std::io;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;

use hwasym::scan::Format;
use hwasym::scan::Scanner;
use hwasym::symbolize::Process;
use hwasym::symbolize::Session;
use hwasym::ErrorKind;

use tempfile::tempdir;

use test_log::test;

use crate::suite::common::write_script;


/// A fake `llvm-symbolizer`, knowing about one code address and one
/// stack frame.
const FAKE_SYMBOLIZER: &str = r#"#!/bin/sh
while read -r kind path addr; do
  case "$kind $addr" in
    "CODE 0xa1") printf 'inlined\n/build/src/foo.h:3:7\nfoo\n/build/src/foo.c:10\n\n' ;;
    "CODE 0xb2") printf '__hwasan_check\n/build/compiler-rt/lib/hwasan/hwasan_checks.h:33\n\n' ;;
    "FRAME 0x40") printf 'main\nbuf\n/build/src/main.c:5\n-393216 16 187\nmain\nlen\n/build/src/main.c:6\n?? 8 ??\n\n' ;;
    *) printf '\n' ;;
  esac
done
"#;

const REPORT: &str = "\
==4321==ERROR: HWAddressSanitizer: tag-mismatch on address 0x600000000000 at pc 0x7f00000000a1
READ of size 8 at 0x600000000000 tags: 3e/3f (ptr/mem) in thread T0
    #0 0x7f00000000a1  (/system/lib64/libfoo.so+0xa1) (BuildId: 0123abcd)
    #1 0x7f00000000b2  (/system/lib64/libfoo.so+0xb2)
    #2 0x7f00000000c3  (/system/lib64/libbar.so+0xc3)

Previously allocated frames:
  record_addr:0x7b2c0f9428 record:0x6000000000000040  (/system/lib64/libfoo.so+0x40)
  record_addr:0x7b2c0f9430 record:0x6000000000000050  (/system/lib64/libfoo.so+0x50)
SUMMARY: HWAddressSanitizer: tag-mismatch
";


/// A writer whose contents can be inspected after the fact.
#[derive(Clone, Debug, Default)]
struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}


fn session(symbolizer: &Path, symbols: &Path, diagnostics: &Capture) -> Session<Process> {
    Session::builder()
        .set_binary_prefixes(vec![symbols.to_path_buf()])
        .set_source_prefixes(vec!["/build/".to_string()])
        .set_diagnostics(diagnostics.clone())
        .build(symbolizer)
}


/// Symbolize a complete report using an external symbolizer process.
#[test]
fn symbolize_report() -> Result<()> {
    let dir = tempdir()?;
    let symbolizer = write_script(dir.path(), "llvm-symbolizer", FAKE_SYMBOLIZER);
    let symbols = dir.path().join("symbols");
    let () = std::fs::create_dir_all(symbols.join("system/lib64"))?;
    let () = write(symbols.join("system/lib64/libfoo.so"), b"")?;

    let diagnostics = Capture::default();
    let session = session(&symbolizer, &symbols, &diagnostics);
    let mut scanner = Scanner::builder().build(session);
    let mut out = Vec::new();
    let () = scanner.run(REPORT.as_bytes(), &mut out)?;
    assert!(scanner.session().backend().is_running());
    let () = scanner.into_session().close()?;

    let expected = "\
==4321==ERROR: HWAddressSanitizer: tag-mismatch on address 0x600000000000 at pc 0x7f00000000a1
READ of size 8 at 0x600000000000 tags: 3e/3f (ptr/mem) in thread T0
    #0 inlined in src/foo.h:3:7
    -> foo in src/foo.c:10
    #1 __hwasan_check in [hwasan_rtl]
    #2 0x7f00000000c3  (/system/lib64/libbar.so+0xc3)


Potentially referenced stack object:
  0 bytes inside a variable \"buf\" in stack frame of function \"main\"
  at src/main.c:5
SUMMARY: HWAddressSanitizer: tag-mismatch
";
    assert_eq!(String::from_utf8(out)?, expected);
    assert_eq!(
        diagnostics.contents(),
        "Could not find symbols for system/lib64/libbar.so\n"
    );
    Ok(())
}

/// Check that HTML output of an unsymbolizable report is escaped.
#[test]
fn html_report() -> Result<()> {
    let dir = tempdir()?;
    let symbolizer = write_script(dir.path(), "llvm-symbolizer", FAKE_SYMBOLIZER);

    let session = session(&symbolizer, dir.path(), &Capture::default());
    let mut scanner = Scanner::builder().set_format(Format::Html).build(session);
    let mut out = Vec::new();
    let () = scanner.run("<frames> & 'more'\n".as_bytes(), &mut out)?;
    // No request was made, so the symbolizer never got started.
    assert!(!scanner.session().backend().is_running());

    assert_eq!(
        String::from_utf8(out)?,
        "<html><body><pre>\n&lt;frames&gt; &amp; &#x27;more&#x27;\n</pre></body></html>\n"
    );
    Ok(())
}

/// Check that a symbolizer that cannot be started leaves the report
/// unsymbolized.
#[test]
fn missing_symbolizer() -> Result<()> {
    let dir = tempdir()?;
    let () = write(dir.path().join("libfoo.so"), b"")?;
    let symbolizer = dir.path().join("does-not-exist");

    let session = session(&symbolizer, dir.path(), &Capture::default());
    let mut scanner = Scanner::builder().build(session);
    let input = "#0 0xa1 (/libfoo.so+0xa1)\n";
    let mut out = Vec::new();
    let () = scanner.run(input.as_bytes(), &mut out)?;
    assert_eq!(String::from_utf8(out)?, input);
    Ok(())
}

/// Check that a symbolizer exiting with an error is reported on close.
#[test]
fn failing_symbolizer() -> Result<()> {
    let dir = tempdir()?;
    let () = write(dir.path().join("libfoo.so"), b"")?;
    let symbolizer = write_script(dir.path(), "broken", "#!/bin/sh\nread -r line\nexit 3\n");

    let session = session(&symbolizer, dir.path(), &Capture::default());
    let mut scanner = Scanner::builder().build(session);
    let input = "#0 0xa1 (/libfoo.so+0xa1)\n";
    let mut out = Vec::new();
    let () = scanner.run(input.as_bytes(), &mut out)?;
    assert_eq!(String::from_utf8(out)?, input);

    let err = scanner.into_session().close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    Ok(())
}

/// Check that a reply containing invalid UTF-8 does not get mixed up
/// with the reply to the next request.
#[test]
fn invalid_utf8_reply() -> Result<()> {
    let dir = tempdir()?;
    let () = write(dir.path().join("libfoo.so"), b"")?;
    let symbolizer = write_script(
        dir.path(),
        "llvm-symbolizer",
        r#"#!/bin/sh
while read -r kind path addr; do
  case "$addr" in
    0x1) printf 'bad\377name\nfoo.c:1\nsecond\nsecond.c:2\n\n' ;;
    0x2) printf 'expected\nexpected.c:3\n\n' ;;
    *) printf '\n' ;;
  esac
done
"#,
    );

    let mut session = session(&symbolizer, dir.path(), &Capture::default());
    // Only look at the first frame, leaving the rest of the reply to be
    // drained.
    let first = session
        .call_stack("/libfoo.so", None, 0x1)
        .next()
        .transpose()?
        .map(|frame| frame.function);
    assert_eq!(first.as_deref(), Some("bad\u{fffd}name"));

    let functions = session
        .call_stack("/libfoo.so", None, 0x2)
        .map(|frame| frame.map(|frame| frame.function))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(functions, vec!["expected"]);
    Ok(())
}

/// Check that dropping a session closes the symbolizer's input and
/// waits for it to exit.
#[test]
fn session_drop_shutdown() -> Result<()> {
    let dir = tempdir()?;
    let () = write(dir.path().join("libfoo.so"), b"")?;
    let marker = dir.path().join("exited");
    let symbolizer = write_script(
        dir.path(),
        "llvm-symbolizer",
        &format!(
            "#!/bin/sh\nwhile read -r line; do echo; done\ntouch '{}'\n",
            marker.display()
        ),
    );

    let mut session = session(&symbolizer, dir.path(), &Capture::default());
    assert_eq!(session.call_stack("/libfoo.so", None, 0xa1).count(), 0);
    assert!(session.backend().is_running());
    assert!(!marker.exists());

    let () = drop(session);
    assert!(marker.exists());
    Ok(())
}
