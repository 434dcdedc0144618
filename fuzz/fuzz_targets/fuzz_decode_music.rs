#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode or fail cleanly; whatever decodes must re-encode.
    if let Ok(music) = cadenza_core::codec::decode_music(data) {
        let _ = cadenza_core::codec::encode_music(&music);
    }
});
