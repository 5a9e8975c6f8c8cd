use crate::util::ReadRaw as _;

type Elf64_Addr = u64;
type Elf64_Half = u16;
type Elf64_Off = u64;
type Elf64_Word = u32;
type Elf64_Xword = u64;

const EI_NIDENT: usize = 16;

/// The identification bytes we support: `\x7fELF`, `ELFCLASS64` and
/// `ELFDATA2LSB`.
pub(crate) const ELF64_LE_MAGIC: [u8; 6] = [0x7f, b'E', b'L', b'F', 2, 1];

/// The size of the ELF64 file header.
pub(crate) const EHDR_SIZE: usize = 64;
/// The size of a single ELF64 section header table entry.
pub(crate) const SHDR_SIZE: usize = 64;
/// The size of an ELF note header.
pub(crate) const NHDR_SIZE: usize = 12;

pub(crate) const SHT_NOTE: Elf64_Word = 7;

pub(crate) const NT_GNU_BUILD_ID: Elf64_Word = 3;


#[derive(Debug)]
pub(crate) struct Elf64_Ehdr {
    pub e_ident: [u8; EI_NIDENT], /* ELF "magic number" */
    pub e_type: Elf64_Half,
    pub e_machine: Elf64_Half,
    pub e_version: Elf64_Word,
    pub e_entry: Elf64_Addr, /* Entry point virtual address */
    pub e_phoff: Elf64_Off,  /* Program header table file offset */
    pub e_shoff: Elf64_Off,  /* Section header table file offset */
    pub e_flags: Elf64_Word,
    pub e_ehsize: Elf64_Half,
    pub e_phentsize: Elf64_Half,
    pub e_phnum: Elf64_Half,
    pub e_shentsize: Elf64_Half,
    pub e_shnum: Elf64_Half,
    pub e_shstrndx: Elf64_Half,
}

impl Elf64_Ehdr {
    /// Parse a little endian ELF64 file header from the start of `data`.
    pub fn parse(mut data: &[u8]) -> Option<Self> {
        let e_ident = data.read_slice(EI_NIDENT)?.try_into().ok()?;
        Some(Self {
            e_ident,
            e_type: data.read_u16()?,
            e_machine: data.read_u16()?,
            e_version: data.read_u32()?,
            e_entry: data.read_u64()?,
            e_phoff: data.read_u64()?,
            e_shoff: data.read_u64()?,
            e_flags: data.read_u32()?,
            e_ehsize: data.read_u16()?,
            e_phentsize: data.read_u16()?,
            e_phnum: data.read_u16()?,
            e_shentsize: data.read_u16()?,
            e_shnum: data.read_u16()?,
            e_shstrndx: data.read_u16()?,
        })
    }
}


#[derive(Debug)]
pub(crate) struct Elf64_Shdr {
    pub sh_name: Elf64_Word,       /* Section name, index in string tbl */
    pub sh_type: Elf64_Word,       /* Type of section */
    pub sh_flags: Elf64_Xword,     /* Miscellaneous section attributes */
    pub sh_addr: Elf64_Addr,       /* Section virtual addr at execution */
    pub sh_offset: Elf64_Off,      /* Section file offset */
    pub sh_size: Elf64_Xword,      /* Size of section in bytes */
    pub sh_link: Elf64_Word,       /* Index of another section */
    pub sh_info: Elf64_Word,       /* Additional section information */
    pub sh_addralign: Elf64_Xword, /* Section alignment */
    pub sh_entsize: Elf64_Xword,   /* Entry size if section holds table */
}

impl Elf64_Shdr {
    /// Parse a little endian ELF64 section header from the start of
    /// `data`.
    pub fn parse(mut data: &[u8]) -> Option<Self> {
        Some(Self {
            sh_name: data.read_u32()?,
            sh_type: data.read_u32()?,
            sh_flags: data.read_u64()?,
            sh_addr: data.read_u64()?,
            sh_offset: data.read_u64()?,
            sh_size: data.read_u64()?,
            sh_link: data.read_u32()?,
            sh_info: data.read_u32()?,
            sh_addralign: data.read_u64()?,
            sh_entsize: data.read_u64()?,
        })
    }
}


#[derive(Debug)]
pub(crate) struct Elf64_Nhdr {
    pub n_namesz: Elf64_Word,
    pub n_descsz: Elf64_Word,
    pub n_type: Elf64_Word,
}

impl Elf64_Nhdr {
    /// Read a little endian note header, advancing `data` past it.
    pub fn read(data: &mut &[u8]) -> Option<Self> {
        Some(Self {
            n_namesz: data.read_u32()?,
            n_descsz: data.read_u32()?,
            n_type: data.read_u32()?,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;


    /// Check that header parsing picks fields from the offsets mandated
    /// by the ELF64 layout.
    #[test]
    fn header_field_offsets() {
        let mut ehdr = [0u8; EHDR_SIZE];
        ehdr[..6].copy_from_slice(&ELF64_LE_MAGIC);
        ehdr[40..48].copy_from_slice(&0x1122334455667788u64.to_le_bytes());
        ehdr[58..60].copy_from_slice(&(SHDR_SIZE as u16).to_le_bytes());
        ehdr[60..62].copy_from_slice(&0x1234u16.to_le_bytes());

        let parsed = Elf64_Ehdr::parse(&ehdr).unwrap();
        assert_eq!(parsed.e_ident[..6], ELF64_LE_MAGIC);
        assert_eq!(parsed.e_shoff, 0x1122334455667788);
        assert_eq!(parsed.e_shentsize, SHDR_SIZE as u16);
        assert_eq!(parsed.e_shnum, 0x1234);
        assert_ne!(format!("{parsed:?}"), "");

        assert!(Elf64_Ehdr::parse(&ehdr[..EHDR_SIZE - 1]).is_none());

        let mut shdr = [0u8; SHDR_SIZE];
        shdr[4..8].copy_from_slice(&SHT_NOTE.to_le_bytes());
        shdr[24..32].copy_from_slice(&0x200u64.to_le_bytes());
        shdr[32..40].copy_from_slice(&0x24u64.to_le_bytes());

        let parsed = Elf64_Shdr::parse(&shdr).unwrap();
        assert_eq!(parsed.sh_type, SHT_NOTE);
        assert_eq!(parsed.sh_offset, 0x200);
        assert_eq!(parsed.sh_size, 0x24);
    }
}
