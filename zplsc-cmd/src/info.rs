use std::{
    collections::BTreeMap,
    io::{stdout, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use serde::Serialize;
use tracing::debug;
use zplsc::{transform::time_from_seconds_since_1900, Event, Summary};

use crate::config::Config;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct Channel {
    frequency: u16,
    num_bins: u16,
    averaged: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    serial_numbers: Vec<u16>,
    first_time: Option<String>,
    last_time: Option<String>,
    channels: Vec<Channel>,
    summary: Summary,
    /// Failure count by kind
    failures: BTreeMap<String, usize>,
}

fn format_time(secs: Option<f64>) -> Option<String> {
    time_from_seconds_since_1900(secs?).map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

fn summarize(fpath: &Path, config: &Config) -> Result<Info> {
    let file = std::fs::File::open(fpath).context("opening input")?;
    let mut parser = config.decoder().decode(std::io::BufReader::new(file));

    let mut serial_numbers = Vec::default();
    let mut channels = Vec::default();
    let mut failures: BTreeMap<String, usize> = BTreeMap::default();

    for event in parser.by_ref() {
        match event.context("reading input")? {
            Event::Record(record) => {
                let hdr = &record.header;
                if !serial_numbers.contains(&hdr.serial_num) {
                    serial_numbers.push(hdr.serial_num);
                }
                if channels.is_empty() {
                    channels = (0..record.values.len())
                        .map(|chan| Channel {
                            frequency: hdr.frequency[chan],
                            num_bins: hdr.num_bins[chan],
                            averaged: hdr.is_averaged(chan),
                        })
                        .collect();
                }
            }
            Event::Failure(err) => {
                debug!("{err}");
                *failures.entry(err.kind().to_string()).or_default() += 1;
            }
        }
    }

    let summary = parser.summary().clone();
    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        serial_numbers,
        first_time: format_time(summary.first_timestamp),
        last_time: format_time(summary.last_timestamp),
        channels,
        summary,
        failures,
    })
}

pub fn info(inputs: &[PathBuf], format: &Format, config: &Config) -> Result<()> {
    let infos = inputs
        .iter()
        .map(|fpath| summarize(fpath, config).with_context(|| format!("{fpath:?}")))
        .collect::<Result<Vec<_>>>()?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &infos).context("serializing to json")
        }
        Format::Text => {
            for info in &infos {
                let data = render_text(info).context("serializing info")?;
                stdout()
                    .write_all(str::as_bytes(&data))
                    .context("writing to stdout")?;
            }
            Ok(())
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or_default().max(v.len());
        format!("{v:>num$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Serial:     {{ #each serial_numbers }}{{ this }}{{ #if @last }}{{ else }}, {{ /if }}{{ /each }}
First:      {{ first_time }}
Last:       {{ last_time }}
Records:    {{ summary.records }}
Dropped:    {{ summary.dropped }}
Misaligned: {{ summary.misaligned_spans }} ({{ summary.bytes_skipped }} bytes)
-------------------------------------------------------------------------------
Channel  Frequency  Bins  Averaged
-------------------------------------------------------------------------------
{{ #each channels }}{{ lpad 7 @index }}  {{ lpad 9 frequency }}  {{ lpad 4 num_bins }}  {{ lpad 8 averaged }}
{{/each }}{{ #if failures }}-------------------------------------------------------------------------------
Failure                     Count
-------------------------------------------------------------------------------
{{ #each failures }}{{ @key }}{{ lpad 32 this }}
{{/each }}{{ /if }}";
