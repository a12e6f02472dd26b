#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shield_kem::crypto::{base64_decode, base64_encode, hex_decode, hex_encode};
use shield_kem::crypto::combiner;
use shield_kem::SharedSecretLength;

#[derive(Arbitrary, Debug)]
struct CodecInput {
    /// Bytes to encode
    payload: Vec<u8>,
    /// Arbitrary text fed to the decoders
    text: String,
    /// Whether the PQ leg is present when combining
    with_pq: bool,
    wide: bool,
}

fuzz_target!(|input: CodecInput| {
    if input.payload.len() > 65536 {
        return;
    }

    assert_eq!(hex_decode(&hex_encode(&input.payload)).unwrap(), input.payload);
    assert_eq!(base64_decode(&base64_encode(&input.payload)).unwrap(), input.payload);

    // Decoders reject garbage with an error, never a panic
    let _ = hex_decode(&input.text);
    let _ = base64_decode(&input.text);

    // Output length follows the declared length only
    let len = if input.wide {
        SharedSecretLength::Bytes64
    } else {
        SharedSecretLength::Bytes32
    };
    let pq = if input.with_pq { Some(&input.payload[..]) } else { None };
    let secret = combiner::derive(pq, &input.payload, len);
    assert_eq!(secret.len(), len.bytes());
});
