// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random document and token IDs.

use ring::rand::{SecureRandom, SystemRandom};

/// Generate a 24-character lowercase hex ID from 12 random bytes.
pub fn new_user_id() -> anyhow::Result<String> {
    random_hex::<12>()
}

/// Generate a 32-character hex `jti` so no two issued tokens are equal.
pub fn new_token_id() -> anyhow::Result<String> {
    random_hex::<16>()
}

fn random_hex<const N: usize>() -> anyhow::Result<String> {
    let mut bytes = [0u8; N];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("System RNG failure"))?;
    Ok(hex::encode(bytes))
}
