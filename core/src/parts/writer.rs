//! parts/writer.rs
//! Drains a byte source into one bounded part file.
//!
//! Contract:
//! - Reads `chunk_size` bytes at a time; every chunk but the last of a stream is full.
//! - After each record, `plaintext >= file_part_size` ends the part, so a part
//!   overshoots by at most one chunk and never starts a record once over.
//! - The file is flushed and `sync_all`ed before either outcome is returned.
//! - The source is left positioned at the first unconsumed byte.

use std::fs::OpenOptions;
use std::io::{BufWriter, Read};
use std::path::Path;
use std::time::Instant;

use crate::codec::{compressed_len, ChunkCodec};
use crate::config::Config;
use crate::context::Context;
use crate::framing::RecordWriter;
use crate::telemetry::{Stage, TelemetryCounters};
use crate::types::BackupError;
use crate::utils::read_exact_or_eof;

/// What one part holds once closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartSummary {
    pub records: u64,
    pub plaintext_bytes: u64,
    pub file_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOutcome {
    /// The part is full; call `write` again with the next path.
    SizeLimitReached(PartSummary),
    /// The source is exhausted; this was the last part of the stream.
    StreamEnded(PartSummary),
}

impl PartOutcome {
    pub fn summary(&self) -> &PartSummary {
        match self {
            PartOutcome::SizeLimitReached(s) | PartOutcome::StreamEnded(s) => s,
        }
    }
}

pub struct FilePartWriter {
    codec: ChunkCodec,
    chunk_size: usize,
    file_part_size: u64,
    ctx: Context,
}

impl FilePartWriter {
    pub fn new(codec: ChunkCodec, chunk_size: usize, file_part_size: u64, ctx: Context) -> Result<Self, BackupError> {
        if chunk_size == 0 || file_part_size == 0 {
            return Err(BackupError::InvalidArgument("chunk and part sizes must be > 0".into()));
        }
        Ok(Self { codec, chunk_size, file_part_size, ctx })
    }

    pub fn from_config(cfg: &Config, ctx: Context) -> Result<Self, BackupError> {
        let codec = ChunkCodec::new(&cfg.password, cfg.cipher, cfg.codec)?;
        Self::new(codec, cfg.chunk_size, cfg.file_part_size, ctx)
    }

    pub fn write<R: Read + ?Sized>(&mut self, source: &mut R, target: &Path) -> Result<PartOutcome, BackupError> {
        // A part path is written exactly once.
        let file = OpenOptions::new().write(true).create_new(true).open(target)?;
        let mut out = RecordWriter::new(BufWriter::new(file));
        let mut counters = TelemetryCounters::default();
        let mut plaintext: u64 = 0;

        let ended = loop {
            let t = Instant::now();
            let chunk = read_exact_or_eof(source, self.chunk_size)?;
            self.ctx.add_stage_time(Stage::Read, t.elapsed());
            if chunk.is_empty() {
                break true;
            }

            let t = Instant::now();
            let record = self.codec.encode(&chunk)?;
            self.ctx.add_stage_time(Stage::Encode, t.elapsed());

            let t = Instant::now();
            let wire_len = out.write_record(&record)?;
            self.ctx.add_stage_time(Stage::Write, t.elapsed());

            counters.add_encoded_record(chunk.len(), compressed_len(&record), record.ciphertext.len(), wire_len);
            plaintext += chunk.len() as u64;

            if plaintext >= self.file_part_size {
                break false;
            }
            // Short chunk means the source hit EOF.
            if chunk.len() < self.chunk_size {
                break true;
            }
        };

        out.flush()?;
        let summary = PartSummary {
            records: out.records(),
            plaintext_bytes: plaintext,
            file_bytes: out.bytes_written(),
        };
        let buffered = out.into_inner();
        let file = buffered.into_inner().map_err(|e| BackupError::Io(e.into_error()))?;
        file.sync_all()?;

        counters.parts_written += 1;
        self.ctx.merge_counters(&counters);

        tracing::debug!(
            parent: self.ctx.span(),
            path = %target.display(),
            records = summary.records,
            plaintext = summary.plaintext_bytes,
            ended,
            "part closed"
        );

        Ok(if ended {
            PartOutcome::StreamEnded(summary)
        } else {
            PartOutcome::SizeLimitReached(summary)
        })
    }
}
