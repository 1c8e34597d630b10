#![no_main]

use libfuzzer_sys::fuzz_target;
use bergram::auth::{AnonymousAuthenticator, Authenticator};
use bergram::ldap::ProtocolOp;
use bergram::session::{CodecFactory, LdapCodecFactory};

fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else { return };
    let mut codec = LdapCodecFactory::default().codec();
    let auth = AnonymousAuthenticator::default();
    for chunk in data.chunks(usize::from(split).max(1)) {
        let Ok(messages) = codec.receive(chunk) else { return };
        for msg in messages {
            // Whatever decodes must encode again.
            let _ = codec.encode(&msg);
            if let ProtocolOp::BindRequest(bind) = msg.protocol_op {
                let _ = auth.authenticate(&bind.name);
            }
        }
    }
    let _ = codec.close();
});
