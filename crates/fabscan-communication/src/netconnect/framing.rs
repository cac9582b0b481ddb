//! netconnectd message framing
//!
//! A request is one compact JSON object `{"<verb>": <params>}` followed by a
//! single NUL byte. Responses use the same terminator and carry no length
//! field, so they are read in fixed-size chunks until a chunk ends in NUL.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::io::{self, Read};

use super::{NetConnectError, NetConnectResult};

/// End-of-message sentinel
pub const SENTINEL: u8 = 0x00;

/// Default read chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 16;

struct Request<'a, P> {
    verb: &'a str,
    params: &'a P,
}

impl<P: Serialize> Serialize for Request<'_, P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.verb, self.params)?;
        map.end()
    }
}

/// Compact formatter that escapes every non-ASCII character as `\uXXXX`
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Encode a request frame: compact JSON plus the NUL sentinel
pub fn encode_request<P: Serialize>(verb: &str, params: &P) -> NetConnectResult<Vec<u8>> {
    let mut frame = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut frame, AsciiFormatter);
    Request { verb, params }
        .serialize(&mut serializer)
        .map_err(|e| NetConnectError::InvalidParameters {
            verb: verb.to_string(),
            reason: e.to_string(),
        })?;
    frame.push(SENTINEL);
    Ok(frame)
}

/// Read one sentinel-terminated message
///
/// Reads at most `chunk_size` bytes at a time and stops as soon as a read
/// ends with the sentinel. If the peer closes the stream after sending a
/// sentinel that was not the last byte of a read, the message is still
/// accepted; closing without any sentinel is an error.
pub fn read_message<R>(reader: &mut R, chunk_size: usize, max_len: usize) -> NetConnectResult<Vec<u8>>
where
    R: Read + ?Sized,
{
    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        let received = match reader.read(&mut chunk) {
            Ok(0) => {
                if buffer.contains(&SENTINEL) {
                    return Ok(buffer);
                }
                return Err(NetConnectError::ConnectionClosed);
            }
            Ok(n) => &chunk[..n],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        buffer.extend_from_slice(received);
        if received.last() == Some(&SENTINEL) {
            return Ok(buffer);
        }
        if buffer.len() > max_len {
            return Err(NetConnectError::ResponseTooLarge { limit: max_len });
        }
    }
}

/// Strip whitespace and the trailing sentinel, then parse the JSON body
pub fn decode_response(raw: &[u8]) -> NetConnectResult<Value> {
    let text = std::str::from_utf8(raw).map_err(|e| NetConnectError::Malformed(e.to_string()))?;
    let trimmed = text.trim();
    let body = trimmed
        .strip_suffix(char::from(SENTINEL))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).map_err(|e| NetConnectError::Malformed(e.to_string()))
}

/// Collapse a decoded response into success or failure
///
/// `result` wins over `error`; a reply with neither is an unknown response
/// that keeps the raw object for diagnostics.
pub fn classify_response(response: Value) -> NetConnectResult<Value> {
    match response {
        Value::Object(mut fields) => {
            if let Some(result) = fields.remove("result") {
                Ok(result)
            } else if let Some(error) = fields.remove("error") {
                let message = match error {
                    Value::String(message) => message,
                    other => other.to_string(),
                };
                Err(NetConnectError::Daemon(message))
            } else {
                Err(NetConnectError::UnknownResponse {
                    raw: Value::Object(fields),
                })
            }
        }
        other => Err(NetConnectError::UnknownResponse { raw: other }),
    }
}
