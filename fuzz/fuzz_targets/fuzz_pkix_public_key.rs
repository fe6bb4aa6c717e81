#![no_main]

use csp_keyimport::{Csp, ImportPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let csp = Csp::new(ImportPolicy::default());

    if let Ok(key) = csp.import_pkix_public_key(data, false) {
        // Anything accepted must re-encode to a key with the same identifier
        let der = key.to_bytes().expect("accepted public key must re-encode");
        let reimported = csp
            .import_pkix_public_key(&der, false)
            .expect("re-encoded public key must import");
        assert_eq!(key.ski(), reimported.ski());
    }
});
