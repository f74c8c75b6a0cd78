use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::warn;

const FALLBACK_DIGITS: &str = "1234567890";

/// Code shape and timing rules for email verification codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub length: usize,
    pub ttl: Duration,
    pub cooldown: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            length: 6,
            ttl: Duration::minutes(5),
            cooldown: Duration::seconds(60),
        }
    }
}

impl OtpPolicy {
    /// Whole seconds left before a new code may be requested, or `None` when
    /// the cooldown since `last_created` has passed. Never reports zero.
    pub fn cooldown_remaining(
        &self,
        last_created: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Option<i64> {
        let elapsed = now - last_created;
        if elapsed >= self.cooldown {
            return None;
        }
        let remaining = (self.cooldown - elapsed).whole_seconds();
        Some(remaining.max(1))
    }

    pub fn expires_at(&self, now: OffsetDateTime) -> OffsetDateTime {
        now + self.ttl
    }

    pub fn generate(&self) -> String {
        generate_code(self.length, &mut OsRng)
    }
}

/// `length` decimal digits, each a random byte reduced modulo 10. A failing
/// source yields a fixed code instead of an error.
pub fn generate_code<R: RngCore>(length: usize, rng: &mut R) -> String {
    let mut bytes = vec![0u8; length];
    match rng.try_fill_bytes(&mut bytes) {
        Ok(()) => bytes
            .iter()
            .map(|b| char::from(b'0' + b % 10))
            .collect(),
        Err(e) => {
            warn!(error = %e, "secure random source failed; using fallback otp");
            FALLBACK_DIGITS.chars().cycle().take(length).collect()
        }
    }
}
