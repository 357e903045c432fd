mod common;

use common::treetidy_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn sync_fails_for_missing_directory() {
    let temp = TempDir::new().unwrap();

    treetidy_cmd(temp.path())
        .arg("sync")
        .arg("missing")
        .assert()
        .failure()
        .code(255)
        .stderr(predicate::str::contains("Cannot access missing"));
}

#[test]
fn gitupdate_alias_reports_missing_branches() {
    let temp = TempDir::new().unwrap();

    treetidy_cmd(temp.path())
        .arg("gitupdate")
        .arg(".")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Neither 'main' nor 'master' branches were found",
        ));
}
