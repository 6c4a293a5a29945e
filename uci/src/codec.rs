//! Line codec for UCI communication.
//!
//! UCI is plain text, one command per line, over the engine's stdin/stdout.
//! [`LineReader`] and [`LineWriter`] wrap the async pipes.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Maximum line length (64 KiB). `info` lines with long PVs stay well below it.
const MAX_LINE_BYTES: usize = 64 * 1024;

pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: String,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: String::new(),
        }
    }

    /// Read the next non-empty line with the line terminator stripped.
    ///
    /// Returns `Ok(None)` on EOF (engine exited).
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            let bytes_read = self
                .reader
                .read_line(&mut self.buf)
                .await
                .context("reading engine output")?;

            if bytes_read == 0 {
                return Ok(None);
            }
            if bytes_read > MAX_LINE_BYTES {
                bail!("engine line of {bytes_read} bytes exceeds maximum {MAX_LINE_BYTES}");
            }

            let trimmed = self.buf.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }
}

pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one command followed by `\n` and flush.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        if line.contains('\n') {
            bail!("UCI command must be a single line: {line:?}");
        }
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("writing engine command")?;
        self.writer
            .write_all(b"\n")
            .await
            .context("writing line terminator")?;
        self.writer.flush().await.context("flushing engine stdin")?;
        Ok(())
    }
}
