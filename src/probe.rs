//! Binary-name probe over raw class-file bytes.
//!
//! Reads only the fixed header: magic, version, constant pool, access
//! flags and the this-class pointer, and returns the moment the name is
//! resolved. Method bodies, debug tables and stack-map frames are never
//! touched and do not need to be well formed.

use crate::error::EnhanceError;

const MAGIC: u32 = 0xCAFE_BABE;

// Constant pool tags, JVMS table 4.4-B.
const CONSTANT_UTF8: u8 = 1;
const CONSTANT_INTEGER: u8 = 3;
const CONSTANT_FLOAT: u8 = 4;
const CONSTANT_LONG: u8 = 5;
const CONSTANT_DOUBLE: u8 = 6;
const CONSTANT_CLASS: u8 = 7;
const CONSTANT_STRING: u8 = 8;
const CONSTANT_FIELDREF: u8 = 9;
const CONSTANT_METHODREF: u8 = 10;
const CONSTANT_INTERFACE_METHODREF: u8 = 11;
const CONSTANT_NAME_AND_TYPE: u8 = 12;
const CONSTANT_METHOD_HANDLE: u8 = 15;
const CONSTANT_METHOD_TYPE: u8 = 16;
const CONSTANT_DYNAMIC: u8 = 17;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
const CONSTANT_MODULE: u8 = 19;
const CONSTANT_PACKAGE: u8 = 20;

/// Pool slots we keep while walking; everything else is skipped.
enum PoolSlot<'a> {
    Utf8(&'a [u8]),
    Class(u16),
    Other,
}

/// Extract the fully qualified binary name (dot-separated) of the class
/// declared by `bytes`.
pub fn class_name(bytes: &[u8]) -> Result<String, EnhanceError> {
    let mut r = Reader::new(bytes);

    if r.u32()? != MAGIC {
        return Err(EnhanceError::malformed("bad magic"));
    }
    r.skip(4)?; // minor + major version

    let pool_count = r.u16()?;
    let mut pool: Vec<PoolSlot<'_>> = Vec::with_capacity(pool_count as usize);
    pool.push(PoolSlot::Other); // constant pool indices start at 1

    let mut index = 1u16;
    while index < pool_count {
        let tag = r.u8()?;
        let slot = match tag {
            CONSTANT_UTF8 => {
                let len = r.u16()? as usize;
                PoolSlot::Utf8(r.bytes(len)?)
            }
            CONSTANT_CLASS => PoolSlot::Class(r.u16()?),
            CONSTANT_STRING | CONSTANT_METHOD_TYPE | CONSTANT_MODULE | CONSTANT_PACKAGE => {
                r.skip(2)?;
                PoolSlot::Other
            }
            CONSTANT_METHOD_HANDLE => {
                r.skip(3)?;
                PoolSlot::Other
            }
            CONSTANT_INTEGER
            | CONSTANT_FLOAT
            | CONSTANT_FIELDREF
            | CONSTANT_METHODREF
            | CONSTANT_INTERFACE_METHODREF
            | CONSTANT_NAME_AND_TYPE
            | CONSTANT_DYNAMIC
            | CONSTANT_INVOKE_DYNAMIC => {
                r.skip(4)?;
                PoolSlot::Other
            }
            CONSTANT_LONG | CONSTANT_DOUBLE => {
                r.skip(8)?;
                PoolSlot::Other
            }
            other => {
                return Err(EnhanceError::malformed(format!(
                    "unknown constant pool tag {other} at index {index}"
                )));
            }
        };
        pool.push(slot);
        index += 1;

        // 8-byte constants occupy two pool slots, JVMS 4.4.5.
        if matches!(tag, CONSTANT_LONG | CONSTANT_DOUBLE) {
            pool.push(PoolSlot::Other);
            index += 1;
        }
    }

    r.skip(2)?; // access_flags
    let this_class = r.u16()?;

    let name_index = match pool.get(this_class as usize) {
        Some(PoolSlot::Class(i)) => *i,
        _ => {
            return Err(EnhanceError::malformed(
                "this_class does not reference a Class entry",
            ));
        }
    };
    let raw = match pool.get(name_index as usize) {
        Some(PoolSlot::Utf8(b)) => *b,
        _ => {
            return Err(EnhanceError::malformed(
                "class name does not reference a Utf8 entry",
            ));
        }
    };
    let internal = std::str::from_utf8(raw)
        .map_err(|_| EnhanceError::malformed("class name is not valid UTF-8"))?;

    Ok(internal.replace('/', "."))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], EnhanceError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| EnhanceError::malformed("truncated class file"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), EnhanceError> {
        self.bytes(len).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, EnhanceError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, EnhanceError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, EnhanceError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_utf8(out: &mut Vec<u8>, s: &str) {
        out.push(CONSTANT_UTF8);
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    fn push_class(out: &mut Vec<u8>, name_index: u16) {
        out.push(CONSTANT_CLASS);
        out.extend_from_slice(&name_index.to_be_bytes());
    }

    /// Minimal well-formed header for a class extending java/lang/Object.
    fn class_bytes(internal_name: &str) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&MAGIC.to_be_bytes());
        b.extend_from_slice(&[0, 0, 0, 52]); // minor 0, major 52 (Java 8)
        b.extend_from_slice(&5u16.to_be_bytes()); // pool entries 1..=4
        push_utf8(&mut b, internal_name); // #1
        push_class(&mut b, 1); // #2
        push_utf8(&mut b, "java/lang/Object"); // #3
        push_class(&mut b, 3); // #4
        b.extend_from_slice(&0x0021u16.to_be_bytes()); // access_flags
        b.extend_from_slice(&2u16.to_be_bytes()); // this_class
        b.extend_from_slice(&4u16.to_be_bytes()); // super_class
        b.extend_from_slice(&0u16.to_be_bytes()); // interfaces_count
        b
    }

    #[test]
    fn resolves_dot_separated_name() {
        let bytes = class_bytes("org/example/demo/Widget");
        assert_eq!(class_name(&bytes).unwrap(), "org.example.demo.Widget");
    }

    #[test]
    fn keeps_inner_class_separator() {
        let bytes = class_bytes("org/example/Outer$Inner");
        assert_eq!(class_name(&bytes).unwrap(), "org.example.Outer$Inner");
    }

    #[test]
    fn ignores_trailing_garbage() {
        let mut bytes = class_bytes("a/b/C");
        bytes.extend_from_slice(&[0xFF; 64]);
        assert_eq!(class_name(&bytes).unwrap(), "a.b.C");
    }

    #[test]
    fn wide_constants_occupy_two_slots() {
        let mut b = Vec::new();
        b.extend_from_slice(&MAGIC.to_be_bytes());
        b.extend_from_slice(&[0, 0, 0, 52]);
        b.extend_from_slice(&7u16.to_be_bytes()); // entries 1..=6, #1 is wide
        b.push(CONSTANT_LONG); // #1 + phantom #2
        b.extend_from_slice(&42u64.to_be_bytes());
        push_utf8(&mut b, "pkg/Wide"); // #3
        push_class(&mut b, 3); // #4
        push_utf8(&mut b, "java/lang/Object"); // #5
        push_class(&mut b, 5); // #6
        b.extend_from_slice(&0x0021u16.to_be_bytes());
        b.extend_from_slice(&4u16.to_be_bytes()); // this_class
        b.extend_from_slice(&6u16.to_be_bytes()); // super_class
        b.extend_from_slice(&0u16.to_be_bytes());

        assert_eq!(class_name(&b).unwrap(), "pkg.Wide");
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            class_name(&[]),
            Err(EnhanceError::MalformedClass { .. })
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = class_bytes("a/B");
        bytes[0] = 0x00;
        assert!(matches!(
            class_name(&bytes),
            Err(EnhanceError::MalformedClass { .. })
        ));
    }

    #[test]
    fn rejects_truncated_pool() {
        let bytes = class_bytes("org/example/Truncated");
        // cut in the middle of the constant pool
        assert!(matches!(
            class_name(&bytes[..14]),
            Err(EnhanceError::MalformedClass { .. })
        ));
    }

    #[test]
    fn rejects_this_class_pointing_at_utf8() {
        let mut bytes = class_bytes("a/B");
        // this_class sits six bytes before the end (super + interfaces follow)
        let at = bytes.len() - 6;
        bytes[at] = 0;
        bytes[at + 1] = 1; // index #1 is the Utf8 entry, not a Class
        assert!(matches!(
            class_name(&bytes),
            Err(EnhanceError::MalformedClass { .. })
        ));
    }
}
