use std::{
    io::{stdout, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};
use zplsc::{ParticleBuffer, Summary};

use crate::config::Config;

pub struct Decoded {
    pub particles: ParticleBuffer,
    pub summary: Summary,
}

/// Decode `inputs` concurrently, one parser per file. Results are in input order.
pub fn decode_files(inputs: &[PathBuf], config: &Config) -> Vec<zplsc::Result<Decoded>> {
    inputs
        .par_iter()
        .map(|path| {
            let mut particles = ParticleBuffer::default();
            let summary = config.decoder().parse_file(path, &mut particles)?;
            Ok(Decoded { particles, summary })
        })
        .collect()
}

/// Write particles from all `inputs` to `writer` as JSON lines. Files that cannot be read
/// are logged and skipped.
///
/// Returns the number of particles written and the number of files skipped.
fn write_particles<W: Write>(
    writer: &mut W,
    inputs: &[PathBuf],
    config: &Config,
) -> Result<(usize, usize)> {
    let mut written = 0;
    let mut failed = 0;
    for (path, zult) in inputs.iter().zip(decode_files(inputs, config)) {
        let decoded = match zult {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("{path:?}: {err}");
                failed += 1;
                continue;
            }
        };
        for err in &decoded.particles.failures {
            warn!("{path:?}: {err}");
        }
        info!(
            records = decoded.summary.records,
            dropped = decoded.summary.dropped,
            "decoded {path:?}"
        );
        for particle in &decoded.particles.particles {
            serde_json::to_writer(&mut *writer, particle).context("serializing particle")?;
            writer.write_all(b"\n").context("writing particle")?;
            written += 1;
        }
    }
    Ok((written, failed))
}

pub fn particles(inputs: &[PathBuf], config: &Config) -> Result<()> {
    let mut out = BufWriter::new(stdout().lock());
    let (_, failed) = write_particles(&mut out, inputs, config)?;
    out.flush().context("writing to stdout")?;
    if failed > 0 {
        bail!("failed to decode {failed} of {} files", inputs.len());
    }
    Ok(())
}
