use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("yt-transcript-service").unwrap()
}

#[test]
fn help_lists_subcommands() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn fetch_rejects_blank_video_id() {
    bin()
        .args(["fetch", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Video id must not be empty"));
}

#[test]
fn fetch_requires_a_video() {
    bin()
        .arg("fetch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("VIDEO_ID_OR_URL"));
}

#[test]
fn serve_rejects_invalid_port() {
    bin()
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
