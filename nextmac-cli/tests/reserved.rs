mod common;

#[test]
fn test_reserved_lists_tail_of_quota() {
    let ctx = common::nextmac_with_quota(8, 2);

    ctx.new_cmd()
        .arg("reserved")
        .assert()
        .success()
        .stdout("00:50:f1:12:34:06\n00:50:f1:12:34:07\n");
}

#[test]
fn test_reserved_json() {
    let ctx = common::nextmac_with_quota(8, 3);

    let output = ctx.new_cmd().args(["reserved", "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["variant"], "standard");
    assert_eq!(report["reserved"].as_array().unwrap().len(), 3);
    assert_eq!(report["reserved"][0], "00:50:f1:12:34:05");
}

#[test]
fn test_reserved_zero() {
    let ctx = common::nextmac_with_quota(8, 0);

    ctx.new_cmd().arg("reserved").assert().success().stdout("");
}
