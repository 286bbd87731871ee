//! A tiny, generic protobuf wire-format walker used only to recover fields a
//! typed `prost::Message` silently drops. `gtfs-realtime` decodes BKK's feed
//! against the standard GTFS-RT schema just fine, but BKK's vendor extension
//! fields on `VehiclePosition` (vehicle model, door state, stop distance) use
//! tag numbers outside that schema and prost has nowhere to put them. This
//! module walks the raw submessage bytes itself and hands back exactly the
//! fields the typed decode couldn't see, as raw bytes — it never tries to
//! re-implement the parts prost already does correctly.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_tag(tag: u64) -> Option<Self> {
        match tag & 0x7 {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

fn read_varint(data: &[u8], pos: &mut usize) -> Option<u64> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *data.get(*pos)?;
        *pos += 1;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
}

/// One top-level field of a protobuf message: its field number and the raw
/// bytes of its value (the varint itself, the 4/8 fixed-width bytes, or the
/// length-delimited payload — never including the leading tag or length).
pub struct RawField<'a> {
    pub number: u32,
    payload: &'a [u8],
}

/// Walks every top-level field of `data`, stopping (and returning what it has
/// so far) at the first byte sequence it can't parse as a valid tag/value
/// pair — a malformed or truncated submessage degrades to partial results
/// rather than an error, since this is a best-effort recovery path.
pub fn fields(data: &[u8]) -> Vec<RawField<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let Some(tag) = read_varint(data, &mut pos) else {
            break;
        };
        let number = (tag >> 3) as u32;
        let Some(wire_type) = WireType::from_tag(tag) else {
            break;
        };

        let start = pos;
        let end = match wire_type {
            WireType::Varint => {
                if read_varint(data, &mut pos).is_none() {
                    break;
                }
                pos
            }
            WireType::Fixed64 => {
                pos += 8;
                if pos > data.len() {
                    break;
                }
                pos
            }
            WireType::Fixed32 => {
                pos += 4;
                if pos > data.len() {
                    break;
                }
                pos
            }
            WireType::LengthDelimited => {
                let Some(len) = read_varint(data, &mut pos) else {
                    break;
                };
                let end = pos + len as usize;
                if end > data.len() {
                    break;
                }
                pos = end;
                end
            }
        };

        out.push(RawField {
            number,
            payload: &data[start..end],
        });
    }

    out
}

/// Fields whose number is not in `known`, i.e. the ones a standard-schema
/// `prost::Message` decode of the same bytes would have discarded.
pub fn unknown_fields<'a>(data: &'a [u8], known: &[u32]) -> Vec<RawField<'a>> {
    fields(data).into_iter().filter(|f| !known.contains(&f.number)).collect()
}

/// Every length-delimited submessage at top-level field `tag` — used to walk
/// into `FeedMessage.entity` (tag 2) and `FeedEntity.vehicle` (tag 4) without
/// needing a second typed schema.
pub fn submessages(data: &[u8], tag: u32) -> Vec<&[u8]> {
    fields(data).into_iter().filter(|f| f.number == tag).map(|f| f.payload).collect()
}

impl<'a> RawField<'a> {
    pub fn as_varint(&self) -> Option<u64> {
        let mut pos = 0;
        read_varint(self.payload, &mut pos)
    }

    pub fn as_string(&self) -> Option<String> {
        std::str::from_utf8(self.payload).ok().map(|s| s.to_string())
    }

    pub fn as_f32(&self) -> Option<f32> {
        let bytes: [u8; 4] = self.payload.try_into().ok()?;
        Some(f32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode_varint_field(number: u32, value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(((number as u64) << 3) | 0, &mut out);
        encode_varint(value, &mut out);
        out
    }

    fn encode_string_field(number: u32, value: &str) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(((number as u64) << 3) | 2, &mut out);
        encode_varint(value.len() as u64, &mut out);
        out.extend_from_slice(value.as_bytes());
        out
    }

    fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn parses_mixed_varint_and_string_fields() {
        let mut data = encode_varint_field(1, 42);
        data.extend(encode_string_field(2, "hello"));

        let parsed = fields(&data);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].number, 1);
        assert_eq!(parsed[0].as_varint(), Some(42));
        assert_eq!(parsed[1].number, 2);
        assert_eq!(parsed[1].as_string().as_deref(), Some("hello"));
    }

    #[test]
    fn unknown_fields_excludes_known_numbers() {
        let mut data = encode_varint_field(1, 1);
        data.extend(encode_varint_field(1001, 7));
        let unknown = unknown_fields(&data, &[1]);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].number, 1001);
    }

    #[test]
    fn truncated_input_yields_partial_results_not_a_panic() {
        let mut data = encode_varint_field(1, 1);
        data.push(0xff); // dangling continuation byte, no terminator
        let parsed = fields(&data);
        assert_eq!(parsed.len(), 1);
    }
}
