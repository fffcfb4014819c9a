//! String table decoding.
//!
//! A string table is a repeated length-delimited UTF-8 field terminated by
//! a sentinel zero tag (or the enclosing limit).  Order is semantically
//! significant: encoded objects refer to entries by positional index.

use crate::wire::{field_number, DecodeError, WireReader};

/// Field number of one table entry.
pub const STRING_TABLE_ENTRY: u32 = 1;

/// Decode a string table in insertion order.
///
/// Unknown fields are skipped generically.  A malformed entry is dropped
/// and the table read continues.  An early sentinel short of the enclosing
/// limit is logged (via [`WireReader::reached_data_end`]) but still
/// terminates the table normally.
pub fn read_string_table(reader: &mut WireReader<'_>) -> Result<Vec<String>, DecodeError> {
    let mut table = Vec::new();
    loop {
        let tag = reader.read_tag()?;
        match field_number(tag) {
            0 => {
                reader.reached_data_end();
                return Ok(table);
            }
            STRING_TABLE_ENTRY => match reader.read_string() {
                Ok(value) => table.push(value),
                Err(e) => log::debug!("dropping malformed string table entry: {e}"),
            },
            _ => reader.skip_unknown_field(tag)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::testenc::*;
    use crate::wire::WireType;

    fn table_of(entries: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        for s in entries {
            put_string(&mut buf, STRING_TABLE_ENTRY, s);
        }
        buf.push(0x00); // sentinel
        buf
    }

    #[test]
    fn preserves_insertion_order() {
        let buf = table_of(&["highway", "residential", "name", "Hauptstraße"]);
        let mut r = WireReader::new(&buf);
        let table = read_string_table(&mut r).unwrap();
        assert_eq!(table, vec!["highway", "residential", "name", "Hauptstraße"]);
    }

    #[test]
    fn empty_table_is_fine() {
        let buf = [0x00u8];
        let table = read_string_table(&mut WireReader::new(&buf)).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn limit_terminates_without_sentinel() {
        let mut buf = Vec::new();
        put_string(&mut buf, STRING_TABLE_ENTRY, "water");
        let mut r = WireReader::new(&buf);
        let table = read_string_table(&mut r).unwrap();
        assert_eq!(table, vec!["water"]);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let mut buf = Vec::new();
        put_string(&mut buf, STRING_TABLE_ENTRY, "first");
        put_tag(&mut buf, 7, WireType::Varint);
        put_varint(&mut buf, 99);
        put_string(&mut buf, STRING_TABLE_ENTRY, "second");
        buf.push(0x00);
        let table = read_string_table(&mut WireReader::new(&buf)).unwrap();
        assert_eq!(table, vec!["first", "second"]);
    }

    #[test]
    fn malformed_entry_is_dropped_not_fatal() {
        let mut buf = Vec::new();
        put_string(&mut buf, STRING_TABLE_ENTRY, "ok");
        put_tag(&mut buf, STRING_TABLE_ENTRY, WireType::LengthDelimited);
        put_len_prefixed(&mut buf, &[0xff, 0xfe]); // not UTF-8
        put_string(&mut buf, STRING_TABLE_ENTRY, "also ok");
        buf.push(0x00);
        let table = read_string_table(&mut WireReader::new(&buf)).unwrap();
        assert_eq!(table, vec!["ok", "also ok"]);
    }

    #[test]
    fn early_sentinel_leaves_trailing_bytes_unread() {
        let mut buf = Vec::new();
        put_string(&mut buf, STRING_TABLE_ENTRY, "only");
        buf.push(0x00);
        buf.extend_from_slice(&[0xaa, 0xbb]); // drift after the sentinel
        let mut r = WireReader::new(&buf);
        let table = read_string_table(&mut r).unwrap();
        assert_eq!(table, vec!["only"]);
        assert_eq!(r.bytes_until_limit(), 2);
        r.ensure_all_data_was_read();
        assert_eq!(r.bytes_until_limit(), 0);
    }
}
