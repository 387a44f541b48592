//! Confirmation codes handed to restaurant and courier at pickup.
//!
//! Codes are not unique keys. Two orders may share a code.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const CODE_LEN: usize = 6;
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> String;
}

/// Draws from the calling thread's generator, so concurrent dispatches share nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngCodes;

impl CodeSource for ThreadRngCodes {
    fn next_code(&self) -> String {
        draw_code(&mut rand::thread_rng())
    }
}

/// Deterministic sequence of codes for a given seed.
#[derive(Debug)]
pub struct SeededCodes {
    rng: Mutex<StdRng>,
}

impl SeededCodes {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl CodeSource for SeededCodes {
    fn next_code(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        draw_code(&mut *rng)
    }
}

fn draw_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
