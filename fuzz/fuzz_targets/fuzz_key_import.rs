#![no_main]

use arbitrary::Arbitrary;
use csp_keyimport::prelude::*;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct KeyImportFuzzInput {
    variant: u8,
    ephemeral: bool,
    missing_opts: bool,
    missing_raw: bool,
    private_key_import: bool,
    raw: Vec<u8>,
}

fuzz_target!(|input: KeyImportFuzzInput| {
    let _ = init();

    let opts = match input.variant % 4 {
        0 => ImportOptions::PkixPublicKey { ephemeral: input.ephemeral },
        1 => ImportOptions::PrivateKey { ephemeral: input.ephemeral },
        2 => ImportOptions::EcdsaPublicKey { ephemeral: input.ephemeral },
        _ => ImportOptions::X509Certificate { ephemeral: input.ephemeral },
    };
    let policy = if input.private_key_import {
        ImportPolicy::permissive()
    } else {
        ImportPolicy::restrictive()
    };
    let csp = Csp::new(policy);

    let raw = (!input.missing_raw).then(|| RawMaterial::Bytes(&input.raw));
    let opts = (!input.missing_opts).then_some(&opts);

    match csp.key_import(raw, opts) {
        Ok(key) => {
            assert!(!key.is_private());
            assert_eq!(key.is_ephemeral(), input.ephemeral);
        }
        Err(err) => {
            if input.missing_opts {
                assert_eq!(err.kind(), ErrorKind::InvalidOpts);
            } else if input.missing_raw {
                assert_eq!(err.kind(), ErrorKind::InvalidRaw);
            }
        }
    }
});
