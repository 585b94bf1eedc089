//! Unit tests for rkv-namespace
//!
//! Exercises namespace isolation, the access-grant matrix, policy
//! protection on `default`, and quota enforcement.

use tempfile::TempDir;
use test_case::test_case;

use crate::{Access, NamespaceError, Registry};

fn open_registry() -> (Registry, TempDir) {
    let dir = TempDir::new().unwrap();
    let registry = Registry::open(dir.path()).unwrap();
    (registry, dir)
}

// ============================================================================
// Registry Basics
// ============================================================================

#[test]
fn open_always_provides_default() {
    let (registry, _dir) = open_registry();

    assert!(registry.contains("default"));
    assert_eq!(registry.select("default", None).unwrap(), Access::ReadWrite);
}

#[test]
fn select_unknown_namespace_fails() {
    let (registry, _dir) = open_registry();

    let result = registry.select("notfound", None);
    assert!(matches!(result, Err(NamespaceError::NotFound(_))));
}

#[test]
fn create_is_idempotent() {
    let (mut registry, _dir) = open_registry();

    registry.create("twice").unwrap();
    registry
        .set("twice", Access::ReadWrite, b"key", b"value")
        .unwrap();
    registry.create("twice").unwrap();

    assert_eq!(registry.get("twice", b"key").unwrap().as_ref(), b"value");
}

#[test_case(""; "empty")]
#[test_case("a/b"; "path separator")]
#[test_case("dots.."; "dots")]
#[test_case("white space"; "whitespace")]
fn create_rejects_hostile_names(name: &str) {
    let (mut registry, _dir) = open_registry();

    let result = registry.create(name);
    assert!(matches!(result, Err(NamespaceError::InvalidName(_))));
}

// ============================================================================
// Namespace Isolation
// ============================================================================

#[test]
fn keys_do_not_leak_across_namespaces() {
    let (mut registry, _dir) = open_registry();

    registry.create("test_ns_create").unwrap();
    assert_eq!(
        registry.select("test_ns_create", None).unwrap(),
        Access::ReadWrite
    );

    registry
        .set("test_ns_create", Access::ReadWrite, b"hello", b"world")
        .unwrap();
    registry
        .set("test_ns_create", Access::ReadWrite, b"special-key", b"hello")
        .unwrap();

    assert_eq!(
        registry.get("test_ns_create", b"special-key").unwrap().as_ref(),
        b"hello"
    );

    // Back on default, the key must not exist.
    let result = registry.get("default", b"special-key");
    assert!(matches!(result, Err(NamespaceError::KeyNotFound)));
}

// ============================================================================
// Password Strictness
// ============================================================================

fn protected_registry() -> (Registry, TempDir) {
    let (mut registry, dir) = open_registry();
    registry.create("test_ns_protected").unwrap();
    registry
        .nsset("test_ns_protected", "password", "helloworld")
        .unwrap();
    registry.nsset("test_ns_protected", "public", "0").unwrap();
    (registry, dir)
}

#[test_case(Some("blabla"); "wrong password")]
#[test_case(Some("hellowo"); "correct prefix")]
#[test_case(Some("helloworldhello"); "extended prefix")]
#[test_case(None; "missing password")]
fn private_namespace_denies_bad_credentials(password: Option<&str>) {
    let (registry, _dir) = protected_registry();

    let result = registry.select("test_ns_protected", password);
    assert!(matches!(result, Err(NamespaceError::AuthDenied)));
}

#[test]
fn private_namespace_accepts_exact_password() {
    let (registry, _dir) = protected_registry();

    let access = registry
        .select("test_ns_protected", Some("helloworld"))
        .unwrap();
    assert_eq!(access, Access::ReadWrite);
}

#[test]
fn password_on_passwordless_namespace_is_denied() {
    let (mut registry, _dir) = open_registry();
    registry.create("open_ns").unwrap();

    let result = registry.select("open_ns", Some("anything"));
    assert!(matches!(result, Err(NamespaceError::AuthDenied)));
}

#[test]
fn private_passwordless_namespace_is_unselectable() {
    let (mut registry, _dir) = open_registry();
    registry.create("locked").unwrap();
    registry.nsset("locked", "public", "0").unwrap();

    let result = registry.select("locked", None);
    assert!(matches!(result, Err(NamespaceError::AuthDenied)));
}

// ============================================================================
// Read-Only Public View
// ============================================================================

#[test]
fn public_view_of_protected_namespace_is_read_only() {
    let (mut registry, _dir) = protected_registry();
    registry.nsset("test_ns_protected", "public", "1").unwrap();

    let access = registry.select("test_ns_protected", None).unwrap();
    assert_eq!(access, Access::ReadOnly);

    let result = registry.set("test_ns_protected", access, b"should", b"fails");
    assert!(matches!(result, Err(NamespaceError::ReadOnly)));

    // The password still grants a writable session.
    let access = registry
        .select("test_ns_protected", Some("helloworld"))
        .unwrap();
    registry
        .set("test_ns_protected", access, b"should", b"works")
        .unwrap();
}

// ============================================================================
// Default Namespace Protection
// ============================================================================

#[test_case("public", "0")]
#[test_case("maxsize", "42")]
#[test_case("password", "hello")]
fn default_namespace_rejects_policy_changes(field: &str, value: &str) {
    let (mut registry, _dir) = open_registry();

    let result = registry.nsset("default", field, value);
    assert!(matches!(result, Err(NamespaceError::ProtectedNamespace(_))));
}

// ============================================================================
// Policy Field Validation
// ============================================================================

#[test]
fn nsset_rejects_unknown_field() {
    let (mut registry, _dir) = open_registry();
    registry.create("ns").unwrap();

    let result = registry.nsset("ns", "nonsense", "1");
    assert!(matches!(result, Err(NamespaceError::InvalidField(_))));
}

#[test_case("public", "2")]
#[test_case("public", "yes")]
#[test_case("maxsize", "abc")]
#[test_case("maxsize", "-1")]
fn nsset_rejects_malformed_values(field: &str, value: &str) {
    let (mut registry, _dir) = open_registry();
    registry.create("ns").unwrap();

    let result = registry.nsset("ns", field, value);
    assert!(matches!(result, Err(NamespaceError::InvalidValue { .. })));
}

#[test]
fn empty_password_removes_protection() {
    let (mut registry, _dir) = protected_registry();
    registry.nsset("test_ns_protected", "public", "1").unwrap();
    registry.nsset("test_ns_protected", "password", "").unwrap();

    let access = registry.select("test_ns_protected", None).unwrap();
    assert_eq!(access, Access::ReadWrite);
}

// ============================================================================
// Quota Enforcement
// ============================================================================

#[test]
fn quota_is_enforced_byte_for_byte() {
    let (mut registry, _dir) = open_registry();
    registry.create("test_ns_maxsize").unwrap();
    registry.nsset("test_ns_maxsize", "maxsize", "16").unwrap();
    let access = registry.select("test_ns_maxsize", None).unwrap();

    let mut set = |key: &[u8], value: &[u8]| registry.set("test_ns_maxsize", access, key, value);

    // 10 + 5 + 1 = 16 bytes: exactly at the limit.
    set(b"key1", b"0123456789").unwrap();
    set(b"key2", b"abcde").unwrap();
    set(b"key3", b"+").unwrap();

    // One more byte does not fit.
    assert!(matches!(
        set(b"key4", b"X"),
        Err(NamespaceError::QuotaExceeded { .. })
    ));

    // Equal-length replacement is always permitted.
    set(b"key3", b"-").unwrap();

    // Shrinking key1 from 10 to 5 bytes frees quota...
    set(b"key1", b"12345").unwrap();

    // ...but 6 bytes would still overflow by one...
    assert!(matches!(
        set(b"key5", b"67890X"),
        Err(NamespaceError::QuotaExceeded { .. })
    ));

    // ...while 5 bytes fit exactly.
    set(b"key5", b"67890").unwrap();
}

#[test]
fn rejected_set_leaves_state_untouched() {
    let (mut registry, _dir) = open_registry();
    registry.create("small").unwrap();
    registry.nsset("small", "maxsize", "4").unwrap();

    registry.set("small", Access::ReadWrite, b"k", b"1234").unwrap();
    assert!(matches!(
        registry.set("small", Access::ReadWrite, b"other", b"x"),
        Err(NamespaceError::QuotaExceeded { .. })
    ));

    let info = registry.info("small").unwrap();
    assert_eq!(info.used_bytes, 4);
    assert_eq!(info.entries, 1);
    assert!(matches!(
        registry.get("small", b"other"),
        Err(NamespaceError::KeyNotFound)
    ));
}

#[test]
fn zero_maxsize_disables_the_limit() {
    let (mut registry, _dir) = open_registry();
    registry.create("unlimited").unwrap();

    let value = vec![b'x'; 64 * 1024];
    for i in 0..4u8 {
        registry
            .set("unlimited", Access::ReadWrite, &[b'k', i], &value)
            .unwrap();
    }
    assert_eq!(registry.info("unlimited").unwrap().used_bytes, 4 * 64 * 1024);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn policy_and_data_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let mut registry = Registry::open(dir.path()).unwrap();
        registry.create("persisted").unwrap();
        registry.nsset("persisted", "password", "secret").unwrap();
        registry.nsset("persisted", "public", "0").unwrap();
        registry.nsset("persisted", "maxsize", "4096").unwrap();
        let access = registry.select("persisted", Some("secret")).unwrap();
        registry.set("persisted", access, b"key", b"value").unwrap();
    }

    let registry = Registry::open(dir.path()).unwrap();

    assert!(matches!(
        registry.select("persisted", None),
        Err(NamespaceError::AuthDenied)
    ));
    assert_eq!(
        registry.select("persisted", Some("secret")).unwrap(),
        Access::ReadWrite
    );

    let info = registry.info("persisted").unwrap();
    assert!(!info.public);
    assert!(info.password_protected);
    assert_eq!(info.maxsize, 4096);
    assert_eq!(info.used_bytes, 5);
    assert_eq!(registry.get("persisted", b"key").unwrap().as_ref(), b"value");
}

#[test]
fn names_are_sorted_and_complete() {
    let (mut registry, _dir) = open_registry();
    registry.create("zebra").unwrap();
    registry.create("alpha").unwrap();

    assert_eq!(registry.names(), vec!["alpha", "default", "zebra"]);
}
