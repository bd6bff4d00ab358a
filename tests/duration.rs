// Property tests for the xs:duration codec
//
//    cargo test --test duration

use std::time::Duration;
use proptest::prelude::*;
use dash_mpd_builder::{parse_xs_duration, format_xs_duration};


proptest! {
    #[test]
    fn test_format_then_parse (secs in 0u64..10_000_000_000, nanos in 0u32..1_000_000_000) {
        let d = Duration::new(secs, nanos);
        let formatted = format_xs_duration(&d);
        prop_assert!(formatted.starts_with("PT") && formatted.ends_with('S'), "{}", formatted);
        prop_assert_eq!(parse_xs_duration(&formatted).unwrap(), d);
    }

    #[test]
    fn test_parse_then_format (d in 0u64..1000, h in 0u64..100, m in 0u64..100, s in 0u64..100) {
        let xs = format!("P{d}DT{h}H{m}M{s}S");
        let parsed = parse_xs_duration(&xs).unwrap();
        prop_assert_eq!(parsed.as_secs(), d * 86_400 + h * 3_600 + m * 60 + s);
        // the canonical form denotes the same duration
        prop_assert_eq!(parse_xs_duration(&format_xs_duration(&parsed)).unwrap(), parsed);
    }

    #[test]
    fn test_parse_never_panics (s in "\\PC*") {
        let _ = parse_xs_duration(&s);
    }
}
