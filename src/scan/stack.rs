use crate::symbolize::LocalVariable;
use crate::Addr;


/// Mask of the program counter bits in a frame record.
const PC_MASK: u64 = (1 << 48) - 1;
/// Mask applied to offsets relative to the frame pointer. Frame pointer
/// arithmetic may wrap within one megabyte.
const FP_OFFSET_MASK: u64 = (1 << 20) - 1;


/// The faulting memory access a report is about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Access {
    /// The address accessed.
    pub addr: Addr,
    /// The tag of the pointer used for the access.
    pub tag: u8,
}


/// A stack frame record, as listed under "Previously allocated frames".
///
/// The runtime records `record_addr`, the (tagged) location of the
/// record in the thread's ring buffer, and `record`, packing the frame
/// pointer and program counter of a function invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRecord {
    /// The address the record was stored at.
    pub record_addr: u64,
    /// The record itself.
    pub record: u64,
}

impl FrameRecord {
    /// The frame's base tag, derived from the record's address.
    #[inline]
    pub fn base_tag(&self) -> u8 {
        ((self.record_addr >> 3) & 0xff) as u8
    }

    /// The frame pointer, stored shifted in the upper 16 bits.
    #[inline]
    pub fn frame_pointer(&self) -> u64 {
        (self.record >> 48) << 4
    }

    /// The program counter, stored in the lower 48 bits.
    #[inline]
    pub fn pc(&self) -> Addr {
        self.record & PC_MASK
    }

    /// Check whether `access` falls inside of `local` within the frame
    /// described by this record.
    ///
    /// Returns the offset of the access inside the variable. Variables
    /// of unknown offset or size never match. Unless `ignore_tags` is
    /// set, the variable's tag also has to match the access' tag.
    pub fn object_offset(
        &self,
        access: &Access,
        local: &LocalVariable,
        ignore_tags: bool,
    ) -> Option<u64> {
        let (Some(frame_offset), Some(size)) = (local.frame_offset, local.size) else {
            return None
        };

        let offset = access
            .addr
            .wrapping_sub(self.frame_pointer())
            .wrapping_sub(frame_offset as u64)
            & FP_OFFSET_MASK;
        if offset >= size {
            return None
        }

        if !ignore_tags {
            let tag_offset = local.tag_offset?;
            if u64::from(self.base_tag()) ^ tag_offset != u64::from(access.tag) {
                return None
            }
        }
        Some(offset)
    }
}


/// A local variable an access potentially referenced.
#[derive(Clone, Debug, PartialEq)]
pub struct StackObject {
    /// The offset of the access inside the variable.
    pub offset: u64,
    /// The variable in question.
    pub local: LocalVariable,
}


/// Find all local variables in the frame described by `record` that
/// `access` may have referenced.
pub fn find_stack_objects<I>(
    record: &FrameRecord,
    access: &Access,
    locals: I,
    ignore_tags: bool,
) -> Vec<StackObject>
where
    I: IntoIterator<Item = LocalVariable>,
{
    locals
        .into_iter()
        .filter_map(|local| {
            let offset = record.object_offset(access, &local, ignore_tags)?;
            Some(StackObject { offset, local })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;


    fn local(
        name: &str,
        frame_offset: Option<i64>,
        size: Option<u64>,
        tag_offset: Option<u64>,
    ) -> LocalVariable {
        LocalVariable {
            function: "main".to_string(),
            file_line: "main.c:3".to_string(),
            name: name.to_string(),
            frame_offset,
            size,
            tag_offset,
        }
    }


    /// Check that record fields are decoded as expected.
    #[test]
    fn record_decoding() {
        let record = FrameRecord {
            record_addr: 0x7fff_0000_1238,
            record: 0xabcd_0000_5555_1234,
        };
        assert_eq!(record.base_tag(), 0x47);
        assert_eq!(record.frame_pointer(), 0xabcd0);
        assert_eq!(record.pc(), 0x0000_5555_1234);
    }

    /// Check that an access inside a variable with matching tag is
    /// attributed to it.
    #[test]
    fn matching_object() {
        let record = FrameRecord {
            record_addr: 0x10 << 3,
            record: 0x1000 << 48,
        };
        let fp = record.frame_pointer();
        let access = Access {
            addr: fp + 0x20 + 4,
            tag: 0x3e,
        };
        let tag_offset = u64::from(0x3e ^ record.base_tag());

        let locals = vec![
            local("before", Some(0x10), Some(0x10), Some(tag_offset)),
            local("buf", Some(0x20), Some(16), Some(tag_offset)),
            local("unknown", None, Some(16), Some(tag_offset)),
            local("wrong_tag", Some(0x20), Some(16), Some(tag_offset + 1)),
        ];
        let objects = find_stack_objects(&record, &access, locals.clone(), false);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].offset, 4);
        assert_eq!(objects[0].local.name, "buf");

        // Ignoring tags only ever adds matches.
        let relaxed = find_stack_objects(&record, &access, locals, true);
        let names = relaxed.iter().map(|o| o.local.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["buf", "wrong_tag"]);
    }

    /// Check that the object offset wraps within the masked range, for
    /// example for negative frame offsets.
    #[test]
    fn wrapping_offset() {
        let record = FrameRecord {
            record_addr: 0,
            record: 0x1000 << 48,
        };
        let access = Access {
            addr: record.frame_pointer() - 0x30 + 8,
            tag: 7,
        };
        let var = local("neg", Some(-0x30), Some(16), Some(7));
        assert_eq!(record.object_offset(&access, &var, false), Some(8));

        // Out of bounds by one.
        let var = local("neg", Some(-0x30), Some(8), Some(7));
        assert_eq!(record.object_offset(&access, &var, false), None);
    }

    /// Check that an unknown tag offset never matches unless tags are
    /// ignored.
    #[test]
    fn unknown_tag_offset() {
        let record = FrameRecord {
            record_addr: 0,
            record: 0,
        };
        let access = Access { addr: 0, tag: 0 };
        let var = local("x", Some(0), Some(1), None);
        assert_eq!(record.object_offset(&access, &var, false), None);
        assert_eq!(record.object_offset(&access, &var, true), Some(0));
    }
}
