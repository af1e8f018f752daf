use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Bytes are buffered until a whole event is available, so multi-byte
/// characters split across chunks are decoded correctly.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    /// Returns the `data` payload of the next event, or `None` when the
    /// stream is exhausted.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // An event may already be buffered from an earlier chunk.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                // Trailing bytes without a terminating blank line are
                // not an event.
                return Ok(None);
            };
            self.buf.extend_from_slice(&bytes);
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // For `end-of-line`, we handle line feed and carriage return + line
        // feed. Comments are skipped, and among the fields only `data` is
        // kept. A field without a colon has an empty value.
        //
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        while let Some((end, delimiter_len)) = find_event_end(&self.buf) {
            let block: Vec<u8> =
                self.buf.drain(0..end + delimiter_len).collect();
            let Ok(block) = str::from_utf8(&block[..end]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.split('\n') {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (name, value) = line.split_once(':').unwrap_or((line, ""));
                if name != "data" {
                    trace!("ignoring sse field `{name}`");
                    continue;
                }
                let value = value.strip_prefix(' ').unwrap_or(value);
                let data = data.get_or_insert_default();
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value);
            }

            if let Some(data) = data {
                return Ok(Some(data));
            }
            // A comment-only block (keep-alive), look for the next one.
        }
        Ok(None)
    }
}

/// Finds the first blank line in `buf`, returning the index where the
/// event ends and the length of the delimiter.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let mut idx = 0;
    while idx + 1 < buf.len() {
        if buf[idx] == b'\n' {
            if buf[idx + 1] == b'\n' {
                return Some((idx, 2));
            }
            if buf[idx + 1] == b'\r' && buf.get(idx + 2) == Some(&b'\n') {
                return Some((idx, 3));
            }
        }
        idx += 1;
    }
    None
}
