#![no_main]

use honorfx::effect::DelaySet;
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::StdRng;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(set) = DelaySet::parse(text) else {
        return;
    };

    // Every sample must fall inside one of the parsed ranges.
    let mut rng = StdRng::seed_from_u64(text.len() as u64);
    if let Some(value) = set.sample(&mut rng) {
        assert!(
            set.ranges()
                .iter()
                .any(|r| r.min() <= value && value <= r.max())
        );
    }

    // Display output parses back to the same set.
    let reparsed = DelaySet::parse(&set.to_string()).unwrap();
    assert_eq!(reparsed, set);
});
