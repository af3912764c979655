#![no_main]

use libfuzzer_sys::fuzz_target;
use mirrorbot_release::{
    release_folder_pattern, scan_mirror_index, select_latest_release, MirrorFolder,
    ReleaseLookupError,
};

const FOLDER_URL: &str = "https://mirror.invalid/ocp/";

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (version, body) = raw.split_once('\n').unwrap_or(("4.20", raw.as_ref()));
    let Ok(pattern) = release_folder_pattern(version) else {
        return;
    };

    let candidates = scan_mirror_index(&pattern, body, MirrorFolder::Primary, FOLDER_URL);
    for candidate in &candidates {
        assert!(candidate.version.starts_with(version));
        assert!(candidate.version.len() > version.len());
        assert_eq!(
            candidate.index_url,
            format!("{FOLDER_URL}{}/", candidate.version)
        );
    }

    let newest = candidates
        .iter()
        .map(|candidate| candidate.version.clone())
        .max();
    match select_latest_release(version, candidates) {
        Ok(latest) => assert_eq!(Some(latest.version), newest),
        Err(ReleaseLookupError::NoReleases { .. }) => assert!(newest.is_none()),
        Err(other) => panic!("unexpected selection error: {other}"),
    }
});
