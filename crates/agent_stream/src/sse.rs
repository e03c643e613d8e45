//! Incremental decoder for `data: <payload>\n\n` record streams.

const RECORD_SEPARATOR: &str = "\n\n";
const DATA_PREFIX: &str = "data:";

/// Incremental decoder that turns arbitrary byte chunks into record payloads.
///
/// Multi-byte characters split across chunks are held back until complete, and
/// a trailing partial record is carried over to the next [`SseDecoder::feed`].
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending_bytes: Vec<u8>,
    buffer: String,
}

impl SseDecoder {
    /// Feed arbitrary bytes and drain the payloads of all complete records.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.decode_utf8(bytes);
        let mut payloads = Vec::new();

        while let Some(split) = self.buffer.find(RECORD_SEPARATOR) {
            let record: String = self.buffer.drain(..split + RECORD_SEPARATOR.len()).collect();
            if let Some(payload) = extract_data_payload(&record[..split]) {
                payloads.push(payload);
            }
        }

        payloads
    }

    /// Flush a final record that was not followed by a separator.
    pub fn finish(mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        extract_data_payload(&self.buffer)
    }

    /// Decode a complete input in one shot, including a trailing unterminated record.
    pub fn decode_all(input: &[u8]) -> Vec<String> {
        let mut decoder = Self::default();
        let mut payloads = decoder.feed(input);
        payloads.extend(decoder.finish());
        payloads
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.pending_bytes.is_empty() && self.buffer.trim().is_empty()
    }

    fn decode_utf8(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);

        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid]));
                    match error.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + invalid);
                        }
                    }
                }
            }
        }
    }
}

fn extract_data_payload(record: &str) -> Option<String> {
    let payload = record.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_owned())
    }
}
