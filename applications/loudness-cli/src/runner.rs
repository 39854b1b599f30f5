//! Streams raw PCM through the loudness control stage

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use loudness_control::{AudioInfo, DerivedParameters, LoudnessControl, PcmBuffer, RecordingHost};
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to a stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplySummary {
    pub parameters: DerivedParameters,
    pub buffers: usize,
    pub gap_buffers: usize,
    pub bytes: usize,
    pub passthrough: bool,
}

/// Push everything from `input` through a fresh stage and write it to `output`
pub fn apply_stream<R: Read, W: Write>(
    config: &CliConfig,
    mut input: R,
    mut output: W,
) -> Result<ApplySummary> {
    config.validate()?;

    let info = AudioInfo::new(
        config.stream.format,
        config.stream.rate,
        config.stream.channels,
    );
    let host = Arc::new(RecordingHost::new());
    let mut element = LoudnessControl::with_parameters(config.loudness, host.clone());
    element.setup(info)?;

    let chunk_len = config
        .stream
        .buffer_bytes()
        .ok_or_else(|| CliError::Config("Buffer size overflows".to_string()))?;
    let mut chunk = vec![0u8; chunk_len];
    let mut summary = ApplySummary {
        parameters: element.control().snapshot(),
        buffers: 0,
        gap_buffers: 0,
        bytes: 0,
        passthrough: host.is_passthrough(),
    };

    loop {
        let filled = read_full(&mut input, &mut chunk)?;
        if filled == 0 {
            break;
        }

        let trailing = filled % info.bytes_per_frame();
        if trailing != 0 {
            return Err(CliError::TrailingBytes(trailing));
        }

        let mut buffer = PcmBuffer::new(chunk[..filled].to_vec());
        element.push(&mut buffer)?;

        summary.buffers += 1;
        summary.bytes += buffer.len();
        if buffer.is_gap() {
            summary.gap_buffers += 1;
        }
        output.write_all(buffer.as_bytes())?;

        if filled < chunk_len {
            break;
        }
    }

    output.flush()?;
    summary.passthrough = host.is_passthrough();

    debug!(?summary, "Stream finished");
    info!(
        buffers = summary.buffers,
        bytes = summary.bytes,
        gain_db = summary.parameters.gain_db(),
        "Applied loudness gain"
    );

    Ok(summary)
}

// Fill `buf` unless the reader runs dry first
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
