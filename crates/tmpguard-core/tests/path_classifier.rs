use std::path::{Path, PathBuf};

use tmpguard_core::paths::{ManagedPathPrefix, UPLOAD_TMP_PREFIX};

fn sandbox_prefix() -> (PathBuf, ManagedPathPrefix) {
    let root = PathBuf::from("/sandbox/tmp");
    let prefix = ManagedPathPrefix::under(&root);
    (root, prefix)
}

#[test]
fn forward_and_back_slashes_classify_identically() {
    let prefix = ManagedPathPrefix::under(Path::new(r"C:\Users\dev\AppData\Local\Temp"));

    let forward = format!("C:/Users/dev/AppData/Local/Temp/{UPLOAD_TMP_PREFIX}/a/b");
    let backward = format!(r"C:\Users\dev\AppData\Local\Temp\{UPLOAD_TMP_PREFIX}\a\b");
    assert!(prefix.is_managed(Path::new(&forward)));
    assert!(prefix.is_managed(Path::new(&backward)));
}

#[test]
fn upload_temp_files_are_managed() {
    let (root, prefix) = sandbox_prefix();
    let upload_dir = root.join(format!("{UPLOAD_TMP_PREFIX}3f9a01"));
    assert!(prefix.is_managed(&upload_dir));
    assert!(prefix.is_managed(&upload_dir.join("image.png")));
}

#[test]
fn unrelated_paths_are_not_managed() {
    let (root, prefix) = sandbox_prefix();
    assert!(!prefix.is_managed(&root.join("other-upload-1").join("file.txt")));
    assert!(!prefix.is_managed(Path::new("/var/data/strapi-upload-x/file.txt")));
    assert!(!prefix.is_managed(&root));
    assert!(!prefix.is_managed(Path::new("")));
}

#[test]
fn classification_is_case_sensitive() {
    let (root, prefix) = sandbox_prefix();
    assert!(!prefix.is_managed(&root.join("STRAPI-UPLOAD-1")));
}

#[cfg(unix)]
#[test]
fn non_utf8_paths_are_not_managed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let (root, prefix) = sandbox_prefix();
    let mut raw = root.join(UPLOAD_TMP_PREFIX).into_os_string().into_vec();
    raw.extend_from_slice(b"\xff\xfe");
    let candidate = Path::new(OsStr::from_bytes(&raw));
    assert!(!prefix.is_managed(candidate));
}

#[test]
fn process_prefix_is_under_temp_dir() {
    let expected = ManagedPathPrefix::from_temp_dir();
    assert_eq!(ManagedPathPrefix::process(), &expected);
    assert!(ManagedPathPrefix::process()
        .is_managed(&std::env::temp_dir().join(format!("{UPLOAD_TMP_PREFIX}abc"))));
}
