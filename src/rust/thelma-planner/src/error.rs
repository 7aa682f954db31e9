// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    LayoutInconsistency(String),

    #[error("{0}")]
    VolumeConcentration(String),

    #[error("{0}")]
    State(String),

    #[error(transparent)]
    Layout(#[from] thelma_layouts::Error),

    #[error(transparent)]
    Sectors(#[from] thelma_sectors::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}
