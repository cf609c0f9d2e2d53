#![no_main]

use honorfx::store::{parse_group, render_group};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(group) = parse_group("fuzz", text) else {
        return;
    };

    // A group that parsed must render and parse back unchanged.
    let rendered = render_group(&group).unwrap();
    let reparsed = parse_group("fuzz", &rendered).unwrap();
    assert_eq!(reparsed, group);
});
