//! Domain-separated key derivation
//!
//! Every derivation in HashRand is BLAKE3-keyed: the 32-byte key is the
//! server master key, a user's `privkey_context`, or an ECDH shared secret,
//! and the context string separates domains. The keyed hash absorbs
//! `context || 0x00 || input` and the XOF emits as many bytes as the caller
//! asks for.
//!
//! Every call site MUST pass a unique literal context string. The literals
//! in use: `"user_id_v1"`, `"db_index"`, `"url_fingerprint_cipher"`,
//! `"url_fingerprint_mac"`, `"payload_key"`, `"sender_copy_key"`,
//! `"ed25519_seed"`, `"x25519_seed"`, `"access_token"`, `"magic_token"`,
//! `"magic_link_email"`, `"refresh_token"`, `"privkey_context"`,
//! `"privkey_context_seal"`, `"server_session"`, `"server_session_x25519"`.

/// Fill `out` with key material derived from `(context, key, input)`.
pub fn kdf(context: &str, key: &[u8; 32], input: &[u8], out: &mut [u8]) {
    let mut hasher = blake3::Hasher::new_keyed(key);
    hasher.update(context.as_bytes());
    hasher.update(&[0x00]);
    hasher.update(input);
    hasher.finalize_xof().fill(out);
}

/// Fixed-size convenience wrapper around [`kdf`].
pub fn kdf_array<const N: usize>(context: &str, key: &[u8; 32], input: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    kdf(context, key, input, &mut out);
    out
}

/// 32-byte convenience wrapper (the overwhelmingly common output size).
pub fn kdf32(context: &str, key: &[u8; 32], input: &[u8]) -> [u8; 32] {
    kdf_array::<32>(context, key, input)
}
