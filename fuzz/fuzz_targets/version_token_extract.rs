#![no_main]

use libfuzzer_sys::fuzz_target;
use mirrorbot_release::{extract_version_token, DEFAULT_VERSION_PREFIX};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(token) = extract_version_token(&text, DEFAULT_VERSION_PREFIX) {
        assert!(token.starts_with(DEFAULT_VERSION_PREFIX));
        assert_eq!(token.matches('.').count(), 1);
        assert!(!token.chars().any(char::is_whitespace));
        assert!(text.contains(token));
    }
});
