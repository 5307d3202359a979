//! debugging module
//! This module provides debugging related functions.
use crate::constants::*;

// chrono
use chrono::{DateTime, Local, Utc};

/// Time zone used to stamp debugging messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeZone {
    Local,
    Utc,
}

/// Time format used to stamp debugging messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeFormat {
    Short,
    Rfc2822,
}

// Verbose Structure
#[derive(Debug, Clone, Copy)]
pub struct Verbose {
    level: u8,
    time_zone: TimeZone,
    time_format: TimeFormat,
}

// Verbose type implementation
impl Verbose {
    // new() method
    pub fn new(level: u8, time_zone: TimeZone, time_format: TimeFormat) -> Verbose {
        Verbose {
            level,
            time_zone,
            time_format,
        }
    }
    // quiet() method
    // no debugging output at all
    pub fn quiet() -> Verbose {
        Verbose::new(DEBUG_LEVEL_INFO, TimeZone::Local, TimeFormat::Short)
    }
    // level() getter
    pub fn level(&self) -> u8 {
        self.level
    }
    // enabled() method
    pub fn enabled(&self, msg_level: u8) -> bool {
        msg_level > DEBUG_LEVEL_INFO && self.level >= msg_level
    }
    // timestamp() method
    fn timestamp(&self) -> String {
        match self.time_zone {
            TimeZone::Utc => {
                let now: DateTime<Utc> = Utc::now();
                match self.time_format {
                    TimeFormat::Rfc2822 => now.to_rfc2822(),
                    TimeFormat::Short => now.format(RARPING_DFLT_DATE_FORMAT).to_string(),
                }
            }
            TimeZone::Local => {
                let now: DateTime<Local> = Local::now();
                match self.time_format {
                    TimeFormat::Rfc2822 => now.to_rfc2822(),
                    TimeFormat::Short => now.format(RARPING_DFLT_DATE_FORMAT).to_string(),
                }
            }
        }
    }
}

impl Default for Verbose {
    fn default() -> Self {
        Verbose::quiet()
    }
}

// print_debug() function
/// Print debugging information on the error stream according to the specified level.
///
/// Messages of level `DEBUG_LEVEL_INFO` are never printed here, the probe
/// report itself is written on the standard output by its callers.
pub fn print_debug(debug: &Verbose, msg_level: u8, msg_src: &str, msg: String) {
    if debug.enabled(msg_level) {
        eprintln!("[{}] {}: {}", debug.timestamp(), msg_src, msg);
    }
}
