// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Files exchanged with the XL20 tube handler.
//!
//! The worklist tells the robot which tubes to move. After the run the robot
//! writes an output file with one row per step that is read back into
//! [`TubeTransfer`]s.

use std::io::Write;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use thelma_racks::RackPosition;

use crate::transfer::TubeTransfer;
use crate::{Error, Result};

const DATETIME_FORMAT: &str = "%d %b %Y %I:%M:%S %p";
const NUMBER_COLUMNS: usize = 13;

#[derive(Serialize)]
struct WorklistRow<'a> {
    #[serde(rename = "Source Rack")]
    source_rack: &'a str,
    #[serde(rename = "Source Position")]
    source_position: RackPosition,
    #[serde(rename = "Tube Barcode")]
    tube_barcode: &'a str,
    #[serde(rename = "Destination Rack")]
    target_rack: &'a str,
    #[serde(rename = "Destination Position")]
    target_position: RackPosition,
}

/// The XL20 worklist for a set of tube transfers.
#[derive(Debug, Clone, PartialEq)]
pub struct Xl20Worklist {
    transfers: Vec<TubeTransfer>,
}

impl Xl20Worklist {
    /// Rows are ordered by source rack, then tube barcode.
    pub fn new(mut transfers: Vec<TubeTransfer>) -> Self {
        transfers.sort_by(|a, b| {
            (a.source_rack.as_str(), a.tube_barcode.as_str())
                .cmp(&(b.source_rack.as_str(), b.tube_barcode.as_str()))
        });
        Xl20Worklist { transfers }
    }

    pub fn transfers(&self) -> &[TubeTransfer] {
        &self.transfers
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for transfer in &self.transfers {
            writer
                .serialize(WorklistRow {
                    source_rack: &transfer.source_rack,
                    source_position: transfer.source_position,
                    tube_barcode: &transfer.tube_barcode,
                    target_rack: &transfer.target_rack,
                    target_position: transfer.target_position,
                })
                .map_err(anyhow::Error::from)?;
        }
        writer.flush().map_err(anyhow::Error::from)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Anyhow(e.into()))
    }
}

/// One step reported by the XL20.
#[derive(Debug, Clone, PartialEq)]
pub struct Xl20Step {
    pub job_id: String,
    pub step_number: u32,
    pub timestamp: DateTime<Utc>,
    pub source_rack: String,
    pub source_position: RackPosition,
    pub target_rack: String,
    pub target_position: RackPosition,
    pub expected_tube: String,
    pub found_tube: String,
    pub weight: Option<f64>,
    pub temperature: Option<f64>,
    pub errors: Option<String>,
}

fn optional(field: &str) -> Option<&str> {
    let field = field.trim();
    (!field.is_empty()).then_some(field)
}

fn parse_number(field: &str, line: usize, name: &str) -> Result<Option<f64>> {
    optional(field)
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| Error::Parse(format!("Invalid {name} \"{value}\" in line {line}.")))
        })
        .transpose()
}

fn parse_position(field: &str, line: usize) -> Result<RackPosition> {
    RackPosition::from_label(field)
        .map_err(|_| Error::Parse(format!("Invalid rack position \"{field}\" in line {line}.")))
}

impl Xl20Step {
    fn from_fields(fields: &[&str], line: usize, offset: FixedOffset) -> Result<Self> {
        if fields.len() != NUMBER_COLUMNS {
            return Err(Error::Parse(format!(
                "Line {line} has {} columns, expected {NUMBER_COLUMNS}.",
                fields.len()
            )));
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();
        let step_number = field(1)
            .parse()
            .map_err(|_| Error::Parse(format!("Invalid step number in line {line}.")))?;
        let datetime = format!("{} {}", field(2), field(3));
        let naive = NaiveDateTime::parse_from_str(&datetime, DATETIME_FORMAT).map_err(|_| {
            Error::Parse(format!("Invalid date and time \"{datetime}\" in line {line}."))
        })?;
        let timestamp = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::Parse(format!("Ambiguous date and time in line {line}.")))?
            .with_timezone(&Utc);
        Ok(Xl20Step {
            job_id: field(0).to_string(),
            step_number,
            timestamp,
            source_rack: field(4).to_string(),
            source_position: parse_position(field(5), line)?,
            target_rack: field(6).to_string(),
            target_position: parse_position(field(7), line)?,
            expected_tube: field(8).to_string(),
            found_tube: field(9).to_string(),
            weight: parse_number(field(10), line, "weight")?,
            temperature: parse_number(field(11), line, "temperature")?,
            errors: optional(field(12)).map(str::to_string),
        })
    }
}

/// Split a line of the column-aligned output into the fields of the comma
/// separated one. Date and time span several words, weight and temperature
/// may be left blank and everything after them is the error message.
fn fixed_width_fields(line: &str) -> Vec<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() < 13 {
        return words.into_iter().map(str::to_string).collect();
    }
    let mut fields: Vec<String> = words[..2].iter().map(|w| w.to_string()).collect();
    fields.push(words[2..5].join(" "));
    fields.push(words[5..7].join(" "));
    fields.extend(words[7..13].iter().map(|w| w.to_string()));
    let mut rest = words[13..].iter().peekable();
    for _ in 0..2 {
        match rest.peek() {
            Some(word) if word.parse::<f64>().is_ok() => {
                fields.push(word.to_string());
                rest.next();
            }
            _ => fields.push(String::new()),
        }
    }
    fields.push(rest.copied().collect::<Vec<_>>().join(" "));
    fields
}

/// Parsed XL20 output file.
#[derive(Debug, Clone, PartialEq)]
pub struct Xl20Output {
    steps: Vec<Xl20Step>,
}

impl Xl20Output {
    /// Parse the robot output, either comma separated or with
    /// whitespace-aligned columns. Times in the file are local to the robot,
    /// `offset` is its offset from UTC.
    pub fn parse(content: &str, offset: FixedOffset) -> Result<Self> {
        let steps = if content.contains(',') {
            Self::parse_csv(content, offset)?
        } else {
            Self::parse_fixed_width(content, offset)?
        };
        if steps.is_empty() {
            return Err(Error::Parse("The XL20 output file is empty.".to_string()));
        }
        Ok(Xl20Output { steps })
    }

    fn parse_csv(content: &str, offset: FixedOffset) -> Result<Vec<Xl20Step>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut steps = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| Error::Parse(format!("Invalid XL20 output: {e}")))?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let fields: Vec<&str> = record.iter().collect();
            steps.push(Xl20Step::from_fields(&fields, i + 1, offset)?);
        }
        Ok(steps)
    }

    fn parse_fixed_width(content: &str, offset: FixedOffset) -> Result<Vec<Xl20Step>> {
        let mut steps = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields = fixed_width_fields(line);
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            steps.push(Xl20Step::from_fields(&fields, i + 1, offset)?);
        }
        Ok(steps)
    }

    pub fn steps(&self) -> &[Xl20Step] {
        &self.steps
    }

    /// Time of the first step.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.steps.iter().map(|step| step.timestamp).min()
    }

    /// Messages of all steps for which the robot reported an error.
    pub fn warnings(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|step| {
                step.errors.as_ref().map(|errors| {
                    format!(
                        "The XL20 reported an error for step {} (tube {}): {errors}",
                        step.step_number, step.expected_tube
                    )
                })
            })
            .collect()
    }

    /// The transfers done by the robot, in step order.
    pub fn to_tube_transfers(&self) -> Result<Vec<TubeTransfer>> {
        let mismatches: Vec<String> = self
            .steps
            .iter()
            .filter(|step| step.found_tube != step.expected_tube)
            .map(|step| {
                format!(
                    "{} {} (expected {}, found {})",
                    step.source_rack, step.source_position, step.expected_tube, step.found_tube
                )
            })
            .collect();
        if !mismatches.is_empty() {
            return Err(Error::MissingSample(format!(
                "The XL20 found unexpected tubes at the following positions: {}.",
                mismatches.join(", ")
            )));
        }
        let mut steps: Vec<&Xl20Step> = self.steps.iter().collect();
        steps.sort_by_key(|step| step.step_number);
        Ok(steps
            .into_iter()
            .map(|step| {
                TubeTransfer::new(
                    step.expected_tube.clone(),
                    (step.source_rack.as_str(), step.source_position),
                    (step.target_rack.as_str(), step.target_position),
                )
            })
            .collect())
    }
}
