use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use tracing::{info, warn};
use zplsc::{EchogramData, Event};

use crate::config::Config;

/// Collect echogram data for all records in `input`.
pub fn collect(input: &Path, config: &Config) -> Result<EchogramData> {
    let file = File::open(input).with_context(|| format!("opening {input:?}"))?;
    let mut data = EchogramData::default();
    for event in config.decoder().decode(BufReader::new(file)) {
        match event.with_context(|| format!("reading {input:?}"))? {
            Event::Record(record) => data.push(&record),
            Event::Failure(err) => warn!("{input:?}: {err}"),
        }
    }
    Ok(data)
}

pub fn echogram(input: &Path, output: &Path, clobber: bool, config: &Config) -> Result<()> {
    if !clobber && output.exists() {
        anyhow::bail!("{output:?} exists; use --clobber");
    }
    let data = collect(input, config)?;
    if let Some((deepest, shallowest)) = data.depth_bounds() {
        info!(
            records = data.len(),
            channels = data.values.len(),
            "depth range {shallowest:.2} to {deepest:.2} m"
        );
    }

    let dest = File::create(output).with_context(|| format!("failed to create {output:?}"))?;
    let mut writer = BufWriter::new(dest);
    serde_json::to_writer(&mut writer, &data).context("serializing echogram")?;
    writer.flush().context("writing echogram")
}
