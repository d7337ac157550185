//! Compact binary encoding of a configuration.
//!
//! All integers are little-endian. The stream starts with a 16-byte header (magic, version,
//! reserved flags) followed by the section count and each section in document order:
//!
//! ```text
//! section := string name, option comment, option pre_comment, u32 count, setting*
//! setting := string name, option comment, option pre_comment, u8 shape, payload
//! payload := string              (shape 0, single value)
//!          | u32 count, string*  (shape 1, array)
//! string  := u32 byte length, UTF-8 bytes
//! option  := u8 0 | u8 1, string
//! ```

use std::io::{self, Read, Write};

use crate::error::BinaryError;
use crate::section::Section;
use crate::setting::{Setting, Value};

/// Magic bytes identifying a binary configuration.
pub const MAGIC: &[u8; 8] = b"INICFG\0\0";

/// Current format version.
pub const VERSION: u32 = 1;

const SHAPE_SCALAR: u8 = 0;
const SHAPE_ARRAY: u8 = 1;

// Upper bound on capacity reserved from a length read off the wire.
const MAX_PREALLOCATE: usize = 1024;

/// Encode `sections` to `writer`.
pub fn write_sections<W: Write>(writer: &mut W, sections: &[Section]) -> io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?; // flags (reserved)

    write_len(writer, sections.len())?;
    for section in sections {
        write_string(writer, section.name())?;
        write_option(writer, section.comment())?;
        write_option(writer, section.pre_comment())?;

        write_len(writer, section.len())?;
        for setting in section {
            write_setting(writer, setting)?;
        }
    }

    Ok(())
}

fn write_setting<W: Write>(writer: &mut W, setting: &Setting) -> io::Result<()> {
    write_string(writer, setting.name())?;
    write_option(writer, setting.comment())?;
    write_option(writer, setting.pre_comment())?;

    match setting.value() {
        Value::Raw(text) => {
            writer.write_all(&[SHAPE_SCALAR])?;
            write_string(writer, text)?;
        }
        Value::List(elements) => {
            writer.write_all(&[SHAPE_ARRAY])?;
            write_len(writer, elements.len())?;
            for element in elements {
                write_string(writer, element)?;
            }
        }
    }

    Ok(())
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("length {len} does not fit in 32 bits"),
        )
    })?;
    writer.write_all(&len.to_le_bytes())
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    write_len(writer, bytes.len())?;
    writer.write_all(bytes)
}

fn write_option<W: Write>(writer: &mut W, s: Option<&str>) -> io::Result<()> {
    match s {
        Some(s) => {
            writer.write_all(&[1])?;
            write_string(writer, s)
        }
        None => writer.write_all(&[0]),
    }
}

/// Decode sections from `reader`, which must contain exactly one encoded configuration.
pub fn read_sections<R: Read>(reader: &mut R) -> Result<Vec<Section>, BinaryError> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(BinaryError::InvalidMagic);
    }

    let version = read_u32(reader)?;
    if version != VERSION {
        return Err(BinaryError::UnsupportedVersion(version));
    }
    let _flags = read_u32(reader)?;

    let count = read_len(reader)?;
    let mut sections = Vec::with_capacity(count.min(MAX_PREALLOCATE));
    for _ in 0..count {
        let mut section = Section::new(read_string(reader)?);
        section.set_comment(read_option(reader)?);
        section.set_pre_comment(read_option(reader)?);

        let count = read_len(reader)?;
        for _ in 0..count {
            section.add(read_setting(reader)?);
        }

        sections.push(section);
    }

    let mut rest = [0u8; 1];
    if reader.read(&mut rest)? != 0 {
        return Err(BinaryError::TrailingBytes);
    }

    Ok(sections)
}

fn read_setting<R: Read>(reader: &mut R) -> Result<Setting, BinaryError> {
    let mut setting = Setting::new(read_string(reader)?);
    setting.set_comment(read_option(reader)?);
    setting.set_pre_comment(read_option(reader)?);

    let value = match read_u8(reader)? {
        SHAPE_SCALAR => Value::Raw(read_string(reader)?),
        SHAPE_ARRAY => {
            let count = read_len(reader)?;
            let mut elements = Vec::with_capacity(count.min(MAX_PREALLOCATE));
            for _ in 0..count {
                elements.push(read_string(reader)?);
            }
            Value::List(elements)
        }
        shape => return Err(BinaryError::InvalidShape(shape)),
    };
    setting.set(value);

    Ok(setting)
}

fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_len<R: Read>(reader: &mut R) -> io::Result<usize> {
    let len = read_u32(reader)?;
    usize::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("length {len} does not fit in memory"),
        )
    })
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, BinaryError> {
    let len = read_len(reader)?;

    // Grow with the data actually present rather than trusting the length up front.
    let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOCATE));
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    String::from_utf8(bytes).map_err(|_| BinaryError::InvalidUtf8)
}

fn read_option<R: Read>(reader: &mut R) -> Result<Option<String>, BinaryError> {
    match read_u8(reader)? {
        0 => Ok(None),
        1 => read_string(reader).map(Some),
        flag => Err(BinaryError::InvalidFlag(flag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(sections: &[Section]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_sections(&mut buf, sections).expect("writing to a Vec cannot fail");
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Vec<Section>, BinaryError> {
        read_sections(&mut &bytes[..])
    }

    fn sample() -> Vec<Section> {
        let mut section = Section::new("Section");
        section.set_comment(Some("inline".to_owned()));
        section.set_pre_comment(Some("line1\n\nline3".to_owned()));

        let mut scalar = Setting::with_value("Scalar", "  edge whitespace and \"odd quote ");
        scalar.set_comment(Some(String::new()));
        section.add(scalar);

        let mut list = Setting::new("List");
        list.set(Value::List(vec![
            "\"quoted\"".to_owned(),
            "multi\nline".to_owned(),
            String::new(),
        ]));
        list.set_pre_comment(Some("über".to_owned()));
        section.add(list);

        section.add(Setting::new("Empty"));

        vec![section, Section::new(""), Section::new("Section")]
    }

    #[test]
    fn header() {
        let bytes = encode(&[]);

        assert_eq!(&bytes[0..8], MAGIC);
        assert_eq!(bytes[8..12], VERSION.to_le_bytes());
        assert_eq!(bytes[12..16], [0; 4]);
        assert_eq!(bytes[16..], [0; 4]);
    }

    #[test]
    fn round_trip_keeps_text_incompatible_content() {
        let sections = sample();
        assert_eq!(decode(&encode(&sections)).expect("encoded data is valid"), sections);
    }

    #[test]
    fn setting_layout() {
        let mut section = Section::new("S");
        section.add(Setting::with_value("k", "{a}"));
        let bytes = encode(&[section]);

        #[rustfmt::skip]
        let expected: &[u8] = &[
            1, 0, 0, 0,          // section count
            1, 0, 0, 0, b'S',    // name
            0, 0,                // comment, pre-comment
            1, 0, 0, 0,          // setting count
            1, 0, 0, 0, b'k',    // name
            0, 0,                // comment, pre-comment
            SHAPE_ARRAY,
            1, 0, 0, 0,          // element count
            1, 0, 0, 0, b'a',
        ];
        assert_eq!(&bytes[16..], expected);
    }

    #[test]
    fn rejects_bad_header() {
        let mut bytes = encode(&sample());
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(BinaryError::InvalidMagic)));

        let mut bytes = encode(&sample());
        bytes[8] = 2;
        assert!(matches!(decode(&bytes), Err(BinaryError::UnsupportedVersion(2))));
    }

    #[test]
    fn rejects_truncation_everywhere() {
        let bytes = encode(&sample());

        for len in 0..bytes.len() {
            match decode(&bytes[..len]) {
                Err(BinaryError::Io(err)) => {
                    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof, "length {len}");
                }
                other => panic!("length {len}: expected truncation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode(&sample());
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(BinaryError::TrailingBytes)));
    }

    #[test]
    fn rejects_invalid_tags() {
        let mut section = Section::new("S");
        section.add(Setting::with_value("k", "v"));
        let bytes = encode(&[section]);

        // Offsets of the shape tag and the comment flag within the single setting.
        let shape = 16 + 4 + 5 + 2 + 4 + 5 + 2;
        let flag = shape - 2;

        let mut bad = bytes.clone();
        bad[shape] = 7;
        assert!(matches!(decode(&bad), Err(BinaryError::InvalidShape(7))));

        let mut bad = bytes.clone();
        bad[flag] = 2;
        assert!(matches!(decode(&bad), Err(BinaryError::InvalidFlag(2))));

        let mut bad = bytes;
        let value = bad.len() - 1;
        bad[value] = 0xFF;
        assert!(matches!(decode(&bad), Err(BinaryError::InvalidUtf8)));
    }

    #[test]
    fn huge_lengths_do_not_allocate() {
        let mut bytes = encode(&[]);
        bytes.truncate(16);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());

        match decode(&bytes) {
            Err(BinaryError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected truncation error, got {other:?}"),
        }
    }
}
