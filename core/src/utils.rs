use std::fmt;
use std::io::Read;

use bytes::Bytes;
use num_enum::TryFromPrimitive;

pub fn compute_crc32(data: &[u8]) -> u32 {
    use crc32fast::Hasher;
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// CRC32 over several slices, in order, without concatenating them.
pub fn compute_crc32_parts(parts: &[&[u8]]) -> u32 {
    use crc32fast::Hasher;
    let mut hasher = Hasher::new();
    for p in parts {
        hasher.update(p);
    }
    hasher.finalize()
}

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

/// Fill up to `len` bytes from `r`, stopping early only at EOF.
///
/// Pipes hand back short reads all the time; chunking must not depend on them,
/// so every chunk except the last one of a stream is exactly `len` bytes.
pub fn read_exact_or_eof<R: Read + ?Sized>(r: &mut R, len: usize) -> std::io::Result<Bytes> {
    let mut buf = vec![0u8; len];
    let mut off = 0;

    while off < len {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(off);
    Ok(Bytes::from(buf))
}
