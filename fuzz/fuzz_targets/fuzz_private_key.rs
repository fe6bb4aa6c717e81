#![no_main]

use std::sync::Arc;

use csp_keyimport::prelude::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let provider = MockSessionProvider::new();
    let pool = match SessionPool::new(provider.clone(), &SessionPoolConfig::default()) {
        Ok(pool) => pool,
        Err(_) => return,
    };
    let csp = Csp::new(ImportPolicy::permissive()).with_gateway(Arc::new(pool));

    match csp.import_private_key(data, false) {
        Ok(key) => {
            assert!(key.is_private());
            assert!(key.public_key().is_none());
            assert_eq!(provider.create_calls(), 1);
        }
        Err(err) => {
            // Rejected input never reaches the HSM
            if err.kind() != ErrorKind::HsmFailure {
                assert_eq!(provider.create_calls(), 0);
            }
        }
    }
});
