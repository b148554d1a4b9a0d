use std::fs;

use king_me::cli::run_with_args;
use tempfile::tempdir;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_play_then_suggest_in_one_process() {
    run_with_args(args(&[
        "kingme", "play", "--players", "2", "--iterations", "8", "--threads", "1", "--seed", "3",
        "--voting", "favorites",
    ]));

    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("turn.txt");
    let roster = dir.path().join("roster.txt");
    fs::write(&snapshot, "101,1,0,S\r\n1,A\r\n2,K\r\n").unwrap();
    fs::write(&roster, "101,alice,0\r\n202,bob,0\r\n").unwrap();

    run_with_args(args(&[
        "kingme",
        "suggest",
        snapshot.to_str().unwrap(),
        "--roster",
        roster.to_str().unwrap(),
        "--hand",
        "ABCDEG",
        "--me",
        "101",
        "--iterations",
        "16",
        "--threads",
        "2",
        "--seed",
        "5",
        "--log-level",
        "debug",
    ]));
}
