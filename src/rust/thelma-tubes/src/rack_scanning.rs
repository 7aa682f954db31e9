// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Rack scanner files and their comparison with the stored tube positions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thelma_racks::RackPosition;

use crate::rack::TubeRackStore;
use crate::transfer::TubeTransfer;
use crate::{Error, Result};

const TIMESTAMP_MARKER: &str = "Date & time of Trace =";
const RACK_MARKER: &str = "Rack Base Name:";
const TIMESTAMP_FORMAT: &str = "%d %b %Y %H:%M:%S";
const NO_TUBE: &str = "No TrakMate";
const RACK_BARCODE_LENGTH: usize = 8;

/// The content of one rack scanning file.
#[derive(Debug, Clone, PartialEq)]
pub struct RackScan {
    timestamp: DateTime<Utc>,
    rack_barcode: String,
    tubes: BTreeMap<RackPosition, String>,
}

fn header_value<'a>(line: Option<&'a str>, marker: &str) -> Result<&'a str> {
    line.and_then(|line| line.trim().strip_prefix(marker))
        .map(str::trim)
        .ok_or_else(|| Error::Parse(format!("Missing \"{marker}\" line in rack scanning file.")))
}

impl RackScan {
    /// Parse a rack scanning file. `offset` is the UTC offset of the scanner clock.
    pub fn parse(content: &str, offset: FixedOffset) -> Result<Self> {
        let mut lines = content.lines().filter(|line| !line.trim().is_empty());

        let raw = header_value(lines.next(), TIMESTAMP_MARKER)?;
        let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map_err(|_| Error::Parse(format!("Invalid scan timestamp \"{raw}\".")))?;
        let timestamp = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::Parse(format!("Ambiguous scan timestamp \"{raw}\".")))?
            .with_timezone(&Utc);

        let rack_barcode = header_value(lines.next(), RACK_MARKER)?;
        if rack_barcode.len() != RACK_BARCODE_LENGTH
            || !rack_barcode.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::Parse(format!(
                "Invalid rack barcode \"{rack_barcode}\", expected {RACK_BARCODE_LENGTH} digits."
            )));
        }

        let mut tubes = BTreeMap::new();
        for line in lines {
            let (label, tube) = line
                .split_once(';')
                .ok_or_else(|| Error::Parse(format!("Invalid rack scanning line \"{line}\".")))?;
            let position = RackPosition::from_label(label)
                .map_err(|_| Error::Parse(format!("Invalid rack position \"{}\".", label.trim())))?;
            let tube = tube.trim();
            if tube == NO_TUBE || tube.is_empty() {
                continue;
            }
            if tubes.insert(position, tube.to_string()).is_some() {
                return Err(Error::Parse(format!(
                    "Duplicate position {position} in scan of rack {rack_barcode}."
                )));
            }
        }
        Ok(RackScan {
            timestamp,
            rack_barcode: rack_barcode.to_string(),
            tubes,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn rack_barcode(&self) -> &str {
        &self.rack_barcode
    }

    pub fn tubes(&self) -> &BTreeMap<RackPosition, String> {
        &self.tubes
    }
}

/// Outcome of comparing rack scans with the stored tube positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanComparison {
    pub transfers: Vec<TubeTransfer>,
    pub warnings: Vec<String>,
}

/// Derive the tube transfers that explain the differences between the
/// scans and the store.
pub fn derive_tube_transfers<S: TubeRackStore>(
    scans: &[RackScan],
    store: &S,
    now: DateTime<Utc>,
) -> Result<ScanComparison> {
    if scans.is_empty() {
        return Err(Error::InvalidInput("There are no rack scans.".to_string()));
    }
    let mut comparison = ScanComparison::default();
    let mut scanned_racks = BTreeSet::new();
    let mut scanned_tubes = BTreeSet::new();
    let mut unknown_tubes = BTreeSet::new();

    for scan in scans {
        if !scanned_racks.insert(scan.rack_barcode()) {
            return Err(Error::InvalidInput(format!(
                "Rack {} has been scanned more than once.",
                scan.rack_barcode()
            )));
        }
        if now - scan.timestamp() > Duration::days(1) {
            comparison.warnings.push(format!(
                "The scan of rack {} is older than one day ({}).",
                scan.rack_barcode(),
                scan.timestamp()
            ));
        }
        let rack = store
            .rack(scan.rack_barcode())
            .ok_or_else(|| Error::InvalidInput(format!("Unknown rack {}.", scan.rack_barcode())))?;
        for (position, tube) in scan.tubes() {
            rack.shape().check_contains(position)?;
            if !scanned_tubes.insert(tube.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Tube {tube} has been found in more than one position."
                )));
            }
            match store.locate_tube(tube) {
                Some((source_rack, source_position)) => {
                    if source_rack != scan.rack_barcode() || source_position != *position {
                        comparison.transfers.push(TubeTransfer::new(
                            tube.as_str(),
                            (source_rack.as_str(), source_position),
                            (scan.rack_barcode(), *position),
                        ));
                    }
                }
                None => {
                    unknown_tubes.insert(tube.as_str());
                }
            }
        }
    }
    if !unknown_tubes.is_empty() {
        return Err(Error::MissingSample(format!(
            "The following scanned tubes are unknown: {}.",
            unknown_tubes.into_iter().collect::<Vec<_>>().join(", ")
        )));
    }

    let mut vanished = Vec::new();
    for barcode in &scanned_racks {
        if let Some(rack) = store.rack(barcode) {
            vanished.extend(
                rack.tubes()
                    .filter(|(_, tube)| !scanned_tubes.contains(tube))
                    .map(|(position, tube)| format!("{tube} ({barcode} {position})")),
            );
        }
    }
    if !vanished.is_empty() {
        comparison.warnings.push(format!(
            "The following tubes were not found in any scanned rack: {}.",
            vanished.join(", ")
        ));
    }
    for warning in &comparison.warnings {
        thelma_log::warn!("{}", warning);
    }
    comparison.transfers.sort();
    Ok(comparison)
}
