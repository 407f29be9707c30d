//! Fuzz target: host protocol decoder
//!
//! Feeds arbitrary lines into `decode` and asserts that it never panics and
//! that every accepted message survives a serialize/decode cycle unchanged.
//! Accepted `save_settings` payloads must also validate without panicking.
//!
//! cargo fuzz run fuzz_host_message

#![no_main]

use filamon::adapters::host_protocol::{HostMessage, decode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(msg) = decode(line) else {
        return;
    };

    let again = serde_json::to_string(&msg).expect("decoded message re-encodes");
    assert_eq!(decode(&again).as_ref(), Ok(&msg));

    if let HostMessage::SaveSettings { settings } = &msg {
        let _ = settings.validate();
    }
});
