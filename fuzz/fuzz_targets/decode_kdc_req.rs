#![no_main]

use libfuzzer_sys::fuzz_target;
use bergram::session::{CodecFactory, KerberosCodecFactory};

// The first octet picks the chunk size the rest is fed in.
fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else { return };
    let mut codec = KerberosCodecFactory::default().codec();
    for chunk in data.chunks(usize::from(split).max(1)) {
        if codec.receive(chunk).is_err() {
            return
        }
    }
    let _ = codec.close();
});
