use predicates::prelude::*;

mod common;

#[test]
fn test_list_shows_assignments() {
    let ctx = common::nextmac();
    ctx.new_cmd().args(["allocate", "wl0"]).assert().success();
    ctx.new_cmd().args(["allocate", "wl0.1"]).assert().success();

    ctx.new_cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("INTERFACE"))
        .stdout(predicate::str::contains("wl0.1"))
        .stdout(predicate::str::contains("00:50:f1:12:34:01"));
}

#[test]
fn test_list_json() {
    let ctx = common::nextmac();
    ctx.new_cmd().args(["allocate", "wl0"]).assert().success();

    let output = ctx.new_cmd().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["if_name"], "wl0");
    assert_eq!(rows[0]["value"], common::BASE);
}

#[test]
fn test_list_empty() {
    let ctx = common::nextmac();

    ctx.new_cmd()
        .arg("list")
        .assert()
        .success()
        .stdout("INTERFACE  MAC\n");
}
