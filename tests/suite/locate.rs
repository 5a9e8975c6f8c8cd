use std::fs::create_dir_all;
use std::fs::write;

use hwasym::elf::read_elf_build_id;
use hwasym::elf::BuildId;
use hwasym::locate::Locator;

use tempfile::tempdir;

use test_log::test;

use crate::suite::common::elf_with_build_id;


/// Check that we can read the build ID of an ELF file on disk and that
/// other files are reported as not having one.
#[test]
fn elf_build_id() {
    let dir = tempdir().unwrap();
    let elf = dir.path().join("libfoo.so");
    let () = write(&elf, elf_with_build_id(&[0xde, 0xad, 0xbe, 0xef])).unwrap();
    let build_id = read_elf_build_id(&elf).unwrap().unwrap();
    assert_eq!(build_id.to_string(), "deadbeef");

    let text = dir.path().join("README");
    let () = write(&text, b"not an ELF file").unwrap();
    assert_eq!(read_elf_build_id(&text).unwrap(), None);

    let empty = dir.path().join("empty");
    let () = write(&empty, b"").unwrap();
    assert_eq!(read_elf_build_id(&empty).unwrap(), None);
}

/// Check that a build ID index hit takes precedence over path based
/// lookup.
#[test]
fn build_id_precedence() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let id = "0123abcd".parse::<BuildId>().unwrap();
    let () = write(a.path().join("renamed.so"), elf_with_build_id(id.as_bytes())).unwrap();
    let () = create_dir_all(b.path().join("system/lib64")).unwrap();
    let () = write(b.path().join("system/lib64/libx.so"), b"").unwrap();

    let mut locator = Locator::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
    let count = locator.build_index(|path, err| panic!("{}: {err}", path.display()));
    assert_eq!(count, 1);

    let path = locator.locate("/system/lib64/libx.so", Some(&id));
    assert_eq!(path, Some(a.path().join("renamed.so")));

    let path = locator.locate("/system/lib64/libx.so", None);
    assert_eq!(path, Some(b.path().join("system/lib64/libx.so")));

    // Resolution is stable.
    let path = locator.locate("/system/lib64/libx.so", None);
    assert_eq!(path, Some(b.path().join("system/lib64/libx.so")));
}
