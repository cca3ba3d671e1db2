use super::*;
use crate::FakeClock;

#[test]
fn second_lookup_within_ttl_is_deduped() {
    let clock = FakeClock::new();
    let mut cache = ProcessedKeyCache::new(clock.clone(), 45_000);
    assert!(!cache.check_and_mark("chat:message:1"));
    assert!(cache.check_and_mark("chat:message:1"));
}

#[test]
fn entry_expires_after_ttl() {
    let clock = FakeClock::new();
    let mut cache = ProcessedKeyCache::new(clock.clone(), 1_000);
    assert!(!cache.check_and_mark("k"));
    clock.advance_ms(1_001);
    assert!(!cache.check_and_mark("k"), "expired entry should not dedupe");
}

#[test]
fn distinct_keys_are_independent() {
    let clock = FakeClock::new();
    let mut cache = ProcessedKeyCache::new(clock, 45_000);
    assert!(!cache.check_and_mark("a"));
    assert!(!cache.check_and_mark("b"));
    assert_eq!(cache.len(), 2);
}
