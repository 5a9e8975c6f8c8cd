use std::fs::set_permissions;
use std::fs::write;
use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;
use std::path::PathBuf;


/// Write an executable shell script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let () = write(&path, contents).unwrap();
    let () = set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
    path
}

/// Assemble a minimal ELF64 little-endian image with a single note
/// section carrying a GNU build ID.
pub fn elf_with_build_id(build_id: &[u8]) -> Vec<u8> {
    let mut note = Vec::new();
    let () = note.extend_from_slice(&4u32.to_le_bytes());
    let () = note.extend_from_slice(&(build_id.len() as u32).to_le_bytes());
    let () = note.extend_from_slice(&3u32.to_le_bytes());
    let () = note.extend_from_slice(b"GNU\0");
    let () = note.extend_from_slice(build_id);
    let () = note.resize(note.len().next_multiple_of(4), 0);

    let note_offset = 64u64;
    let shoff = note_offset + note.len() as u64;

    let mut elf = vec![0; 64];
    let () = elf[0..6].copy_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1]);
    let () = elf[40..48].copy_from_slice(&shoff.to_le_bytes());
    let () = elf[58..60].copy_from_slice(&64u16.to_le_bytes());
    let () = elf[60..62].copy_from_slice(&2u16.to_le_bytes());
    let () = elf.extend_from_slice(&note);

    // The null section.
    let () = elf.extend_from_slice(&[0; 64]);

    let mut shdr = [0; 64];
    let () = shdr[4..8].copy_from_slice(&7u32.to_le_bytes());
    let () = shdr[24..32].copy_from_slice(&note_offset.to_le_bytes());
    let () = shdr[32..40].copy_from_slice(&(note.len() as u64).to_le_bytes());
    let () = elf.extend_from_slice(&shdr);
    elf
}
