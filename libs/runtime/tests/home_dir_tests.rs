//! Home directory resolution when the process environment is minimal,
//! e.g. under a service manager that does not export `HOME`.
//!
//! Kept in its own test binary because it mutates the process environment.

#[cfg(unix)]
#[test]
fn default_home_resolves_without_home_env() {
    std::env::remove_var("HOME");

    let resolved = runtime::resolve_home_dir(None, ".helpdesk", false)
        .expect("home dir should come from the passwd entry");

    assert!(resolved.is_absolute());
    assert!(resolved.ends_with(".helpdesk"));
}
