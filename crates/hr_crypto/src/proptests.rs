use proptest::prelude::*;

use crate::{aead, codec, ct, identity, kdf, sign};

proptest! {
    #[test]
    fn sign_verify_roundtrip(seed in any::<[u8; 32]>(), msg in any::<Vec<u8>>()) {
        let public = sign::public_key(&seed);
        let sig = sign::sign(&seed, &msg);
        prop_assert!(sign::verify(&public, &msg, &sig).is_ok());
    }

    #[test]
    fn signature_bitflip_never_verifies(
        seed in any::<[u8; 32]>(),
        msg in any::<Vec<u8>>(),
        byte in 0usize..64,
        bit in 0u8..8,
    ) {
        let public = sign::public_key(&seed);
        let mut sig = sign::sign(&seed, &msg);
        sig[byte] ^= 1 << bit;
        prop_assert!(sign::verify(&public, &msg, &sig).is_err());
    }

    #[test]
    fn aead_roundtrip(
        key in any::<[u8; 32]>(),
        nonce in any::<[u8; 12]>(),
        aad in any::<Vec<u8>>(),
        pt in any::<Vec<u8>>(),
    ) {
        let ct = aead::seal(&key, &nonce, &aad, &pt).unwrap();
        let opened = aead::open(&key, &nonce, &aad, &ct).unwrap();
        prop_assert_eq!(&*opened, &pt[..]);
    }

    #[test]
    fn aead_ciphertext_bitflip_never_opens(
        key in any::<[u8; 32]>(),
        nonce in any::<[u8; 12]>(),
        pt in any::<Vec<u8>>(),
        flip in any::<prop::sample::Index>(),
    ) {
        let mut ct = aead::seal(&key, &nonce, b"", &pt).unwrap();
        let i = flip.index(ct.len());
        ct[i] ^= 0x01;
        prop_assert!(aead::open(&key, &nonce, b"", &ct).is_err());
    }

    #[test]
    fn kdf_is_a_function(key in any::<[u8; 32]>(), input in any::<Vec<u8>>()) {
        prop_assert_eq!(
            kdf::kdf32("prop_ctx", &key, &input),
            kdf::kdf32("prop_ctx", &key, &input)
        );
    }

    #[test]
    fn b58_roundtrip(bytes in any::<Vec<u8>>()) {
        prop_assert_eq!(codec::b58_decode(&codec::b58_encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn b64url_roundtrip(bytes in any::<Vec<u8>>()) {
        prop_assert_eq!(codec::b64url_decode(&codec::b64url_encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn ct_eq_matches_plain_equality(a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
        prop_assert_eq!(ct::ct_eq(&a, &b), a == b);
        prop_assert!(ct::ct_eq(&a, &a));
    }

    #[test]
    fn user_keys_deterministic(ctx in any::<[u8; 32]>(), local in "[a-z]{1,12}") {
        let email = format!("{local}@example.com");
        let a = identity::derive_user_keys(&email, &ctx);
        let b = identity::derive_user_keys(&email, &ctx);
        prop_assert_eq!(a.signing.public(), b.signing.public());
        prop_assert_eq!(a.agreement.public(), b.agreement.public());
    }
}
