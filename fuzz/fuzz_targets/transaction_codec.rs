//! Fuzz target for the transaction codec.
//!
//! Feeds arbitrary bytes to the decoder. Decoding must never panic, and any
//! transaction it accepts must survive an encode/decode round trip unchanged.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run transaction_codec
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use paygate_chain::{codec, TransactionSummary};
use paygate_core::network::NetworkParameters;

fuzz_target!(|data: &[u8]| {
    // The hex entry point must reject or accept without panicking
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = codec::decode_hex(text);
    }

    let Ok(tx) = codec::decode(data) else {
        return;
    };

    let encoded = codec::encode(&tx);
    let decoded = codec::decode(&encoded).expect("encoded transaction must decode");
    assert_eq!(decoded, tx);
    assert_eq!(codec::txid(&decoded), codec::txid(&tx));

    let hex = codec::encode_hex(&tx);
    assert_eq!(codec::decode_hex(&hex).expect("hex round trip"), tx);

    // Summaries are built for arbitrary scripts
    let summary = TransactionSummary::from_transaction(&tx, NetworkParameters::testnet());
    assert_eq!(summary.inputs.len(), tx.input.len());
    assert_eq!(summary.outputs.len(), tx.output.len());
});
