use std::sync::Mutex;
use std::time::Instant;

/// Token-bucket rate limiter. Tokens refill continuously at `rate` per second
/// up to `burst` tokens.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

struct TokenBucket {
    tokens: f64,
    rate: f64,
    burst: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(rate: usize, burst_ratio: f64) -> Self {
        let rate = rate as f64;
        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: rate * burst_ratio,
                rate,
                burst: rate * burst_ratio,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Removes `tokens` from the bucket if available. Returns false when the
    /// caller should drop the message. A rate of zero disables limiting.
    pub fn should_pass(&self, tokens: usize) -> bool {
        let mut bucket = self.bucket.lock().unwrap();
        if bucket.rate == 0.0 {
            return true;
        }

        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        bucket.last_refill = Instant::now();
        bucket.tokens = (bucket.tokens + elapsed * bucket.rate).min(bucket.burst);

        if bucket.tokens >= tokens as f64 {
            bucket.tokens -= tokens as f64;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_limit() {
        let limiter = RateLimiter::new(10, 3.0);
        // The full burst passes
        for _ in 0..30 {
            assert!(limiter.should_pass(1));
        }
        // The bucket is now empty
        assert!(!limiter.should_pass(1));
    }

    #[test]
    fn zero_rate_disables_limiting() {
        let limiter = RateLimiter::new(0, 3.0);
        for _ in 0..1000 {
            assert!(limiter.should_pass(1));
        }
    }
}
