//! `Content-Length` message framing.
//!
//! Each message is `Content-Length: N\r\n\r\n` followed by N bytes of JSON.
//! Other headers are tolerated and ignored.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Largest accepted message body (1 MiB). Pixels never cross the pipe,
/// only frame handles and geometry.
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

pub struct MessageReader<R> {
    reader: BufReader<R>,
    header: String,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            header: String::new(),
        }
    }

    /// Next message, or `Ok(None)` when the helper closed its stdout between messages.
    pub async fn read_message(&mut self) -> Result<Option<serde_json::Value>> {
        let Some(length) = self.read_content_length().await? else {
            return Ok(None);
        };
        if length > MAX_MESSAGE_BYTES {
            bail!("message of {length} bytes exceeds maximum {MAX_MESSAGE_BYTES}");
        }

        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading message body")?;
        let value = serde_json::from_slice(&body).context("parsing bridge message")?;
        Ok(Some(value))
    }

    async fn read_content_length(&mut self) -> Result<Option<usize>> {
        let mut length = None;
        let mut started = false;

        loop {
            self.header.clear();
            let n = self
                .reader
                .read_line(&mut self.header)
                .await
                .context("reading message header")?;
            if n == 0 {
                if started {
                    bail!("helper closed stdout inside a message header");
                }
                return Ok(None);
            }
            started = true;

            let line = self.header.trim();
            if line.is_empty() {
                return length.map(Some).context("message without Content-Length");
            }
            if let Some(value) = content_length_value(line) {
                length = Some(value.parse().context("invalid Content-Length")?);
            }
        }
    }
}

fn content_length_value(line: &str) -> Option<&str> {
    let (key, value) = line.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case("Content-Length")
        .then(|| value.trim())
}

pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_message(&mut self, message: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec(message).context("serializing bridge message")?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing message header")?;
        self.writer
            .write_all(&body)
            .await
            .context("writing message body")?;
        self.writer.flush().await.context("flushing helper stdin")
    }
}
