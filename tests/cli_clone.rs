use predicates::prelude::*;

#[test]
fn help_lists_the_subcommands() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sitemirror");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clone"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn clone_requires_at_least_one_url() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sitemirror");
    cmd.arg("clone")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--url"));
}

#[test]
fn clone_reports_when_every_target_fails() {
    let out = tempfile::tempdir().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sitemirror");
    cmd.args(["clone", "--url", ""])
        .arg("--out")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("all clone targets failed"));
}
