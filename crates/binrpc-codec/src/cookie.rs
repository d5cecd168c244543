//! Correlation cookies for request packets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the cookie stamped on each outgoing request.
///
/// A cookie of 0 means "do not check" on the read side, so sources must
/// never return it.
pub trait CookieSource {
    fn next_cookie(&mut self) -> u32;
}

/// Random non-zero cookies from a [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomCookies {
    rng: StdRng,
}

impl RandomCookies {
    /// Seeded from operating system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for tests and reproducible captures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomCookies {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieSource for RandomCookies {
    fn next_cookie(&mut self) -> u32 {
        self.rng.gen_range(1..=u32::MAX)
    }
}

impl<F: FnMut() -> u32> CookieSource for F {
    fn next_cookie(&mut self) -> u32 {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat() {
        let mut a = RandomCookies::seeded(7);
        let mut b = RandomCookies::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.next_cookie(), b.next_cookie());
        }
    }

    #[test]
    fn random_cookies_are_never_zero() {
        let mut cookies = RandomCookies::seeded(0);
        assert!((0..10_000).all(|_| cookies.next_cookie() != 0));
    }

    #[test]
    fn closures_are_sources() {
        let mut next = 0x6F8D_A296u32;
        let mut source = move || {
            next += 1;
            next
        };
        assert_eq!(source.next_cookie(), 0x6F8D_A297);
        assert_eq!(source.next_cookie(), 0x6F8D_A298);
    }
}
