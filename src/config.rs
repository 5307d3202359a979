//! configuration file handling module
//! This module provides structure and methods related to configuration file handling.
use crate::constants::*;
use crate::debug::{TimeFormat, TimeZone};
use crate::error::Error;
use crate::os::drivers::DiscoveryMethod;

// serde
use serde::Deserialize;

// std
use std::path::Path;

/// Main Configuration Structure
#[derive(Debug, Default, Deserialize)]
pub struct CConfig {
    pub debug: Option<u8>,
    pub time_zone: Option<String>,
    pub time_format: Option<String>,
    pub interface: Option<String>,
    pub interval: Option<u64>,
    pub discovery: Option<Vec<String>>,
}

impl CConfig {
    // debug() getter
    pub fn debug(&self) -> u8 {
        match self.debug {
            Some(v) => v,
            None => DEBUG_LEVEL_INFO,
        }
    }
    // time_zone() getter
    pub fn time_zone(&self) -> TimeZone {
        match &self.time_zone {
            Some(s) => match &s[..] {
                "utc" => TimeZone::Utc,
                _ => TimeZone::Local,
            },
            None => TimeZone::Local,
        }
    }
    // time_format() getter
    pub fn time_format(&self) -> TimeFormat {
        match &self.time_format {
            Some(s) => match &s[..] {
                "rfc2822" => TimeFormat::Rfc2822,
                _ => TimeFormat::Short,
            },
            None => TimeFormat::Short,
        }
    }
    // interface() getter
    pub fn interface(&self) -> Option<&str> {
        match &self.interface {
            Some(s) if !s.is_empty() => Some(&s[..]),
            _ => None,
        }
    }
    // interval() getter
    pub fn interval(&self) -> Result<u64, Error> {
        match self.interval {
            Some(0) => Err(Error::Config("interval must be at least 1 second".to_string())),
            Some(v) => Ok(v),
            None => Ok(RARPING_DFLT_INTERVAL),
        }
    }
    // discovery() getter
    pub fn discovery(&self) -> Result<Vec<DiscoveryMethod>, Error> {
        match &self.discovery {
            Some(names) => {
                if names.is_empty() {
                    return Err(Error::Config("empty discovery list".to_string()));
                }
                names
                    .iter()
                    .map(|n| n.parse::<DiscoveryMethod>().map_err(Error::Config))
                    .collect()
            }
            None => Ok(DiscoveryMethod::defaults()),
        }
    }
}

// parse_config() function
pub fn parse_config(content: &str) -> Result<CConfig, Error> {
    toml::from_str(content).map_err(|e| Error::Config(format!("cannot parse: {}", e)))
}

// decode_config() function
/// read and decode configuration file
pub fn decode_config(filename: &str) -> Result<CConfig, Error> {
    let file = std::fs::read_to_string(filename)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", filename, e)))?;
    parse_config(&file)
}

// load_config() function
/// An explicit file must exist, the default one is optional.
pub fn load_config(explicit: Option<&str>) -> Result<CConfig, Error> {
    match explicit {
        Some(f) => decode_config(f),
        None if Path::new(RARPING_DFLT_CFG_FILE).exists() => decode_config(RARPING_DFLT_CFG_FILE),
        None => Ok(CConfig::default()),
    }
}
