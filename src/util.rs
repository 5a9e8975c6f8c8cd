use std::mem::size_of;


/// A marker trait for "plain old data" data types.
///
/// # Safety
/// Only safe to implement for types that are valid for any bit pattern.
pub(crate) unsafe trait Pod {}

unsafe impl Pod for u8 {}
unsafe impl Pod for u16 {}
unsafe impl Pod for u32 {}
unsafe impl Pod for u64 {}


/// An trait providing utility functions for reading data from a byte buffer.
pub(crate) trait ReadRaw<'data> {
    /// Ensure that `len` bytes are available for consumption.
    fn ensure(&self, len: usize) -> Option<()>;

    /// Consume and return `len` bytes.
    fn read_slice(&mut self, len: usize) -> Option<&'data [u8]>;

    /// Consume `len` bytes, rounded up to the next multiple of
    /// `align_to`, returning only the first `len` of them.
    ///
    /// # Panics
    /// This method may panic if `align_to` is not a power of two.
    fn read_padded_slice(&mut self, len: usize, align_to: usize) -> Option<&'data [u8]>;

    /// Read anything implementing `Pod`.
    #[inline]
    fn read_pod<T>(&mut self) -> Option<T>
    where
        T: Pod,
    {
        let data = self.read_slice(size_of::<T>())?;
        // SAFETY: `T` is `Pod` and hence valid for any bit pattern. The pointer
        //         is guaranteed to be valid and to point to memory of at least
        //         `sizeof(T)` bytes.
        let value = unsafe { data.as_ptr().cast::<T>().read_unaligned() };
        Some(value)
    }

    /// Read a `u16` value.
    #[inline]
    fn read_u16(&mut self) -> Option<u16> {
        self.read_pod::<u16>().map(u16::from_le)
    }

    /// Read a `u32` value.
    #[inline]
    fn read_u32(&mut self) -> Option<u32> {
        self.read_pod::<u32>().map(u32::from_le)
    }

    /// Read a `u64` value.
    #[inline]
    fn read_u64(&mut self) -> Option<u64> {
        self.read_pod::<u64>().map(u64::from_le)
    }
}

impl<'data> ReadRaw<'data> for &'data [u8] {
    #[inline]
    fn ensure(&self, len: usize) -> Option<()> {
        if len > self.len() {
            return None
        }
        Some(())
    }

    #[inline]
    fn read_slice(&mut self, len: usize) -> Option<&'data [u8]> {
        self.ensure(len)?;
        let (a, b) = self.split_at(len);
        *self = b;
        Some(a)
    }

    #[inline]
    fn read_padded_slice(&mut self, len: usize, align_to: usize) -> Option<&'data [u8]> {
        debug_assert!(align_to.is_power_of_two());
        let padded = len.checked_add(align_to - 1)? & !(align_to - 1);
        let data = self.read_slice(padded)?;
        data.get(..len)
    }
}


/// Format a byte slice as lower case hexadecimal string.
pub(crate) fn hexify(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let () = s.push_str(&format!("{b:02x}"));
            s
        })
}

/// Parse a hexadecimal string into the bytes it represents.
///
/// An odd number of digits is accepted, with the first digit forming a
/// byte on its own.
pub(crate) fn unhexify(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || !s.is_ascii() {
        return None
    }

    let (head, rest) = s.split_at(s.len() % 2);
    let mut bytes = Vec::with_capacity(s.len().div_ceil(2));
    if !head.is_empty() {
        let () = bytes.push(u8::from_str_radix(head, 16).ok()?);
    }

    for i in (0..rest.len()).step_by(2) {
        let byte = u8::from_str_radix(rest.get(i..i + 2)?, 16).ok()?;
        let () = bytes.push(byte);
    }
    Some(bytes)
}

/// Parse an address as printed in crash reports, i.e., hexadecimal
/// with an optional `0x` prefix.
pub(crate) fn parse_hex_addr(s: &str) -> Option<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return None
    }
    u64::from_str_radix(digits, 16).ok()
}
