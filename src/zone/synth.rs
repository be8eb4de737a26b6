//! # Deterministic synthesizer (C3)
//!
//! Every cell `(x, y, zone)` conceptually holds a genesis entity even if the
//! store has never seen a write for it. This module derives that entity,
//! its aesthetics, and the tarot naming used on iterate, all from a seed
//! computed solely from the cell's coordinates, so two callers asking about
//! the same cell always agree without talking to each other.
//!
//! A SHA-256 digest of the coordinate string, truncated to 32 bits, seeds
//! `rand::rngs::StdRng`, giving a reproducible stream independent of any
//! particular platform's PRNG internals.

use rand::{RngCore, SeedableRng};
use rand::rngs::StdRng;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::store::entity::Entity;
use crate::zone::palette::palette_for_zone;
use crate::zone::tarot;

const AESTHETIC_CHANNELS: usize = 8;

/// Derive the 32-bit seed for `key` (typically `"x:y:zone"`).
fn seed_from_key(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as u64
}

fn rng_for_key(key: &str) -> StdRng {
    StdRng::seed_from_u64(seed_from_key(key))
}

/// A UUIDv4 whose 128 random bits are drawn from a seeded RNG, with the
/// version and variant bits forced per RFC 4122 section 4.4.
fn seeded_uuid(rng: &mut StdRng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Uuid::from_bytes(bytes).to_string()
}

fn draw_channels(rng: &mut StdRng, pool: &[&str]) -> Vec<String> {
    (0..AESTHETIC_CHANNELS)
        .map(|_| {
            let idx = (rng.next_u32() as usize) % pool.len();
            pool[idx].to_string()
        })
        .collect()
}

/// Build the `{bar: [...], glyphs: [...]}` aesthetics value for `zone`,
/// drawing with replacement from its palette.
fn synthesize_aesthetics(rng: &mut StdRng, zone: i64) -> serde_json::Value {
    let palette = palette_for_zone(zone);
    json!({
        "bar": draw_channels(rng, palette.colors),
        "glyphs": draw_channels(rng, palette.glyphs),
    })
}

/// Produce the unpersisted genesis entity for `(x, y, zone)`.
/// `now` is the caller-supplied current Unix timestamp (kept out of this
/// function so callers can test it deterministically).
pub fn genesis_entity(x: i64, y: i64, zone: i64, now: i64) -> Entity {
    let key = format!("{x}:{y}:{zone}");
    let mut rng = rng_for_key(&key);
    let uuid = seeded_uuid(&mut rng);
    let aesthetics = synthesize_aesthetics(&mut rng, zone);

    Entity {
        index: None,
        iter: 0,
        uuid,
        state: 0,
        name: "Void".to_string(),
        description: "Genesis".to_string(),
        position_x: x,
        position_y: y,
        position_z: zone,
        aesthetics,
        ownership: None,
        minted: false,
        timestamp: now,
        exists: false,
    }
}

/// A Fisher-Yates shuffle of `items` seeded deterministically from `key`.
pub fn deterministic_shuffle<T: Clone>(items: &[T], key: &str) -> Vec<T> {
    let mut rng = rng_for_key(key);
    let mut shuffled: Vec<T> = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = (rng.next_u32() as usize) % (i + 1);
        shuffled.swap(i, j);
    }
    shuffled
}

/// The tarot name assigned to iteration `last_iter` of the entity at
/// `(x, y, zone)`.
pub fn tarot_name_for_iter(x: i64, y: i64, zone: i64, last_iter: i64) -> &'static str {
    let key = format!("{x}:{y}:{zone}");
    let shuffled = deterministic_shuffle(tarot::ALL_CARDS, &key);
    let n = shuffled.len() as i64;
    let idx = last_iter.rem_euclid(n) as usize;
    shuffled[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_entity_is_deterministic() {
        let a = genesis_entity(3, 5, 0, 1_700_000_000);
        let b = genesis_entity(3, 5, 0, 1_700_000_000);
        assert_eq!(a.uuid, b.uuid);
        assert_eq!(a.aesthetics, b.aesthetics);
        assert_eq!(a.name, "Void");
        assert_eq!(a.description, "Genesis");
        assert!(!a.exists);
        assert!(!a.minted);
        assert_eq!(a.index, None);
    }

    #[test]
    fn different_cells_diverge() {
        let a = genesis_entity(3, 5, 0, 0);
        let b = genesis_entity(3, 6, 0, 0);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn uuid_has_version_4_bits() {
        let entity = genesis_entity(1, 1, 1, 0);
        let parsed = uuid::Uuid::parse_str(&entity.uuid).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn aesthetics_draw_from_the_registered_palette() {
        let entity = genesis_entity(10, 10, 2, 0);
        let bar = entity.aesthetics["bar"].as_array().unwrap();
        assert_eq!(bar.len(), AESTHETIC_CHANNELS);
        let glyphs = entity.aesthetics["glyphs"].as_array().unwrap();
        assert_eq!(glyphs.len(), AESTHETIC_CHANNELS);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let shuffled = deterministic_shuffle(tarot::ALL_CARDS, "3:5:0");
        assert_eq!(shuffled.len(), tarot::ALL_CARDS.len());
        for card in tarot::ALL_CARDS {
            assert!(shuffled.contains(card));
        }
    }

    #[test]
    fn shuffle_is_deterministic_per_key() {
        let a = deterministic_shuffle(tarot::ALL_CARDS, "3:5:0");
        let b = deterministic_shuffle(tarot::ALL_CARDS, "3:5:0");
        assert_eq!(a, b);
        let c = deterministic_shuffle(tarot::ALL_CARDS, "3:5:1");
        assert_ne!(a, c);
    }

    #[test]
    fn tarot_name_wraps_on_iter() {
        let n = tarot::ALL_CARDS.len() as i64;
        let name_0 = tarot_name_for_iter(3, 5, 0, 0);
        let name_n = tarot_name_for_iter(3, 5, 0, n);
        assert_eq!(name_0, name_n);
    }
}
