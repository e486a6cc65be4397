use proptest::prelude::*;
use serde::{Deserialize, Serialize};

use hr_crypto::identity::Ed25519KeyPair;

use crate::canonical::to_canonical_json;
use crate::envelope::{seal, verify_and_open, SignedEnvelope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    text: String,
    count: u64,
    flag: bool,
    maybe: Option<i64>,
}

fn payload_strategy() -> impl Strategy<Value = Payload> {
    (any::<String>(), any::<u64>(), any::<bool>(), any::<Option<i64>>())
        .prop_map(|(text, count, flag, maybe)| Payload {
            text,
            count,
            flag,
            maybe,
        })
}

proptest! {
    // Envelope round-trip: verify(pk, seal(sk, P)) returns P, canonically.
    #[test]
    fn envelope_roundtrip(payload in payload_strategy(), seed in any::<[u8; 32]>()) {
        let keys = Ed25519KeyPair::from_seed(seed);
        let env = seal(keys.secret_bytes(), &payload).unwrap();
        let opened: Payload = verify_and_open(&env, keys.public()).unwrap();
        prop_assert_eq!(&opened, &payload);

        // The signed bytes are the canonical JSON, bit for bit.
        let decoded = hr_crypto::codec::b64url_decode(&env.payload).unwrap();
        prop_assert_eq!(
            String::from_utf8(decoded).unwrap(),
            to_canonical_json(&payload).unwrap()
        );
    }

    // Any single-bit flip in the signature must fail verification.
    #[test]
    fn signature_bitflip_fails(
        payload in payload_strategy(),
        seed in any::<[u8; 32]>(),
        byte in 0usize..64,
        bit in 0u8..8,
    ) {
        let keys = Ed25519KeyPair::from_seed(seed);
        let env = seal(keys.secret_bytes(), &payload).unwrap();

        let mut sig = hr_crypto::codec::b58_decode(&env.signature).unwrap();
        sig[byte] ^= 1 << bit;
        let tampered = SignedEnvelope {
            payload: env.payload,
            signature: hr_crypto::codec::b58_encode(&sig),
        };
        prop_assert!(verify_and_open::<Payload>(&tampered, keys.public()).is_err());
    }

    // Canonical JSON is insensitive to construction order.
    #[test]
    fn canonical_json_is_order_free(keys in prop::collection::btree_map("[a-z]{1,8}", any::<u32>(), 0..8)) {
        let forward = serde_json::Map::from_iter(
            keys.iter().map(|(k, v)| (k.clone(), serde_json::json!(v)))
        );
        let backward = serde_json::Map::from_iter(
            keys.iter().rev().map(|(k, v)| (k.clone(), serde_json::json!(v)))
        );
        prop_assert_eq!(
            to_canonical_json(&forward).unwrap(),
            to_canonical_json(&backward).unwrap()
        );
    }
}
