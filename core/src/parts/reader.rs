//! parts/reader.rs
//! Replays one part file into a sink.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Instant;

use crate::codec::{compressed_len, ChunkCodec};
use crate::config::Config;
use crate::constants::names::READY_SUFFIX;
use crate::context::Context;
use crate::framing::RecordReader;
use crate::parts::naming::{PartName, PartNameError};
use crate::parts::writer::PartSummary;
use crate::telemetry::{Stage, TelemetryCounters};
use crate::types::BackupError;

/// Part identity of `path`, accepting the `.ready` arrival suffix.
pub fn part_name_of(path: &Path) -> Result<PartName, PartNameError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PartNameError::MissingSeparator(path.display().to_string()))?;
    let bare = file_name.strip_suffix(READY_SUFFIX).unwrap_or(file_name);
    PartName::parse(bare)
}

pub struct FilePartReader {
    codec: ChunkCodec,
    max_record_len: u32,
    ctx: Context,
}

impl FilePartReader {
    pub fn new(codec: ChunkCodec, max_record_len: u32, ctx: Context) -> Self {
        Self { codec, max_record_len, ctx }
    }

    pub fn from_config(cfg: &Config, ctx: Context) -> Result<Self, BackupError> {
        let codec = ChunkCodec::new(&cfg.password, cfg.cipher, cfg.codec)?;
        Ok(Self::new(codec, cfg.max_record_len, ctx))
    }

    /// Decode every record of `path` into `sink`. `Ok` means the part was read to its end.
    ///
    /// Any decode failure is fatal for the part; plaintext of earlier records
    /// may already be in the sink.
    pub fn read<W: Write + ?Sized>(&mut self, path: &Path, sink: &mut W) -> Result<PartSummary, BackupError> {
        let name = part_name_of(path)?;

        let file = File::open(path)?;
        let file_bytes = file.metadata()?.len();
        let mut records = RecordReader::with_max_record_len(BufReader::new(file), self.max_record_len);
        let mut counters = TelemetryCounters::default();
        let mut summary = PartSummary { file_bytes, ..PartSummary::default() };

        while let Some(record) = records.read_record()? {
            let t = Instant::now();
            let plain = self.codec.decode(&record)?;
            self.ctx.add_stage_time(Stage::Decode, t.elapsed());

            let t = Instant::now();
            sink.write_all(&plain)?;
            self.ctx.add_stage_time(Stage::Deliver, t.elapsed());

            counters.add_decoded_record(plain.len(), compressed_len(&record), record.ciphertext.len());
            summary.records += 1;
            summary.plaintext_bytes += plain.len() as u64;
        }
        sink.flush()?;

        counters.parts_read += 1;
        self.ctx.merge_counters(&counters);

        tracing::debug!(
            parent: self.ctx.span(),
            part = %name,
            records = summary.records,
            plaintext = summary.plaintext_bytes,
            "end of part"
        );
        Ok(summary)
    }
}
