//! Integration tests tying the token codec, blacklist, and rate limiter
//! together the way the edge gateway's authorization path does.

use zonevault::blacklist::Blacklist;
use zonevault::ratelimit::{buckets, RateLimiter};
use zonevault::token::TokenCodec;

#[test]
fn banning_a_principal_revokes_an_already_issued_token() {
    let dir = tempfile::tempdir().unwrap();
    let codec = TokenCodec::load_or_generate(&dir.path().join("key.json")).unwrap();
    let blacklist = Blacklist::load(&dir.path().join("blacklist.json"));

    let token = codec.issue(&["user:evil"]);
    let decoded = codec.decode(&token);
    assert!(decoded.is_authorized(|id| blacklist.contains(id)));

    blacklist.add("user:evil", 0);
    assert!(!decoded.is_authorized(|id| blacklist.contains(id)));
}

#[test]
fn api_key_bucket_and_ip_bucket_are_independent_limits() {
    let limiter = RateLimiter::with_default_policies();

    // Same API key from many IPs: the api-key bucket is the binding
    // constraint once it's exhausted, independent of which IP bucket is
    // checked alongside it.
    for _ in 0..50 {
        assert!(limiter.admit(buckets::API_KEY, "key-1"));
    }
    assert!(!limiter.admit(buckets::API_KEY, "key-1"));

    // A different API key is unaffected.
    assert!(limiter.admit(buckets::API_KEY, "key-2"));
}

#[test]
fn unrecognized_token_never_passes_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let codec = TokenCodec::load_or_generate(&dir.path().join("key.json")).unwrap();
    let blacklist = Blacklist::load(&dir.path().join("blacklist.json"));

    let decoded = codec.decode("this-is-not-a-valid-token");
    assert!(!decoded.is_authorized(|id| blacklist.contains(id)));
}
