use super::*;

#[test]
fn admits_up_to_the_limit_then_rejects() {
    let mut limiter = RateLimiter::new();
    let now = Instant::now();
    for _ in 0..LIMIT {
        assert!(limiter.check("local", now));
    }
    assert!(!limiter.check("local", now));
}

#[test]
fn distinct_keys_have_independent_buckets() {
    let mut limiter = RateLimiter::new();
    let now = Instant::now();
    for _ in 0..LIMIT {
        assert!(limiter.check("local", now));
    }
    assert!(limiter.check("10.0.0.2:1234", now));
}

#[test]
fn window_slides_and_admits_again_after_expiry() {
    let mut limiter = RateLimiter::new();
    let start = Instant::now();
    for _ in 0..LIMIT {
        assert!(limiter.check("local", start));
    }
    let later = start + WINDOW + Duration::from_secs(1);
    assert!(limiter.check("local", later));
}
