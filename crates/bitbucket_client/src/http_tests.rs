use super::*;

fn test_config(trust_all: bool) -> ServerConfig {
    ServerConfig::new(
        "https://bitbucket.example.com",
        "builder",
        "s3cret",
        30,
        4,
        trust_all,
    )
    .unwrap()
}

#[test]
fn test_build_client_with_default_tls() {
    let client = build_client(&test_config(false));
    assert!(client.is_ok());
}

#[test]
fn test_build_client_with_permissive_tls() {
    let client = build_client(&test_config(true));
    assert!(client.is_ok());
}

#[test]
fn test_idle_eviction_window_is_fifteen_seconds() {
    // The eviction window is part of the server contract for pooled
    // connections and must not drift with refactoring.
    assert_eq!(POOL_IDLE_TIMEOUT, Duration::from_secs(15));
}
