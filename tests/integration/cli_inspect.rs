#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use edgeidx::storage::adjacency::EdgeRowKey;
use edgeidx::storage::PropValue;
use edgeidx::types::{Direction, EdgeId, VertexId};
use serde_json::Value;
use tempfile::TempDir;

const EDGES: &str = "\
id,src,dst,label,created_at,props
1,1,2,knows,100,since=2020
2,1,3,knows,101,since=2024
3,1,3,likes,102,
4,4,1,knows,103,since=2019;weight=float:0.5
";

fn edges_csv() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("edges.csv");
    fs::write(&path, EDGES).expect("write csv");
    (dir, path)
}

fn row_key() -> Vec<u8> {
    EdgeRowKey::for_edge(
        EdgeId(7),
        "knows",
        VertexId(1),
        VertexId(2),
        Direction::Out,
        "since",
        PropValue::Int(2020),
    )
    .encode()
    .expect("encode row key")
}

fn stdout_of(cmd: &mut assert_cmd::Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout")
}

#[test]
fn decode_key_reports_fields_as_json() {
    let output = cargo_bin_cmd!("edgeidx")
        .args(["--format", "json", "decode-key"])
        .arg(hex::encode(row_key()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["owner"], 1);
    assert_eq!(json["direction"], "out");
    assert_eq!(json["label"], "knows");
    assert_eq!(json["key"], "since");
    assert_eq!(json["value"]["Int"], 2020);
    assert_eq!(json["counterpart"], 2);
    assert_eq!(json["edge"], 7);
    assert_eq!(json["primary"], false);
}

#[test]
fn decode_key_rejects_truncated_input() {
    let key = row_key();
    cargo_bin_cmd!("edgeidx")
        .arg("decode-key")
        .arg(hex::encode(&key[..key.len() - 3]))
        .assert()
        .failure();
}

#[test]
fn read_key_is_a_prefix_of_matching_rows() {
    let prefix = stdout_of(cargo_bin_cmd!("edgeidx").args([
        "read-key",
        "--vertex",
        "1",
        "--direction",
        "out",
        "--label",
        "knows",
        "--key",
        "since",
        "--value",
        "2020",
    ]));
    let prefix = prefix.trim();
    assert!(!prefix.is_empty());
    assert!(hex::encode(row_key()).starts_with(prefix), "{prefix}");
}

#[test]
fn query_range_with_and_without_index() {
    let (_dir, csv) = edges_csv();
    for index in [None, Some("knows:since")] {
        let mut cmd = cargo_bin_cmd!("edgeidx");
        cmd.args(["query", "--vertex", "1", "--direction", "out"])
            .arg("--edges")
            .arg(&csv)
            .args(["--label", "knows", "--key", "since"])
            .args(["--from", "2019", "--to", "2021"]);
        if let Some(index) = index {
            cmd.args(["--index", index]);
        }
        assert_eq!(stdout_of(&mut cmd).trim(), "1");
    }
}

#[test]
fn query_both_directions_as_json_vertices() {
    let (_dir, csv) = edges_csv();
    let output = cargo_bin_cmd!("edgeidx")
        .args(["--format", "json", "query", "--vertex", "1"])
        .args(["--direction", "both", "--label", "knows", "--vertices"])
        .arg("--edges")
        .arg(&csv)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    let mut ends: Vec<u64> = json
        .as_array()
        .expect("array")
        .iter()
        .filter_map(Value::as_u64)
        .collect();
    ends.sort_unstable();
    assert_eq!(ends, vec![2, 3, 4]);
}

#[test]
fn query_honours_config_file() {
    let (dir, csv) = edges_csv();
    let config = dir.path().join("graph.toml");
    fs::write(&config, "lazy_loading = true\nadjacency_cache_capacity = 0\n").expect("write config");
    let out = stdout_of(
        cargo_bin_cmd!("edgeidx")
            .arg("--config")
            .arg(&config)
            .args(["query", "--vertex", "1", "--label", "knows", "--label", "likes"])
            .arg("--edges")
            .arg(&csv),
    );
    let mut ids: Vec<&str> = out.lines().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["1", "2", "3"]);

    fs::write(&config, "lazy = true\n").expect("write config");
    cargo_bin_cmd!("edgeidx")
        .arg("--config")
        .arg(&config)
        .args(["query", "--vertex", "1"])
        .arg("--edges")
        .arg(&csv)
        .assert()
        .failure();
}

#[test]
fn property_query_needs_one_label() {
    let (_dir, csv) = edges_csv();
    cargo_bin_cmd!("edgeidx")
        .args(["query", "--vertex", "1", "--label", "knows", "--label", "likes"])
        .args(["--key", "since", "--value", "2020"])
        .arg("--edges")
        .arg(&csv)
        .assert()
        .failure();
}
