#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use sweep_engine::{cutoff_timestamp, parse_time_window, ParseError, DEFAULT_CUTOFF_GRACE};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    match parse_time_window(&raw) {
        Ok(window) => {
            assert!(window.as_secs() > 0);
            let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
            let cutoff = cutoff_timestamp(window, DEFAULT_CUTOFF_GRACE, now);
            let (seconds, micros) = cutoff.split_once('.').expect("slack ts has a fraction");
            assert!(seconds.parse::<u64>().is_ok());
            assert_eq!(micros.len(), 6);
        }
        Err(ParseError::Empty) => assert!(raw.trim().is_empty()),
        Err(error) => assert!(!error.to_string().trim().is_empty()),
    }
});
