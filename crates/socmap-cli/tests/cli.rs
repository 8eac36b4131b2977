#![cfg(not(target_arch = "wasm32"))]

use std::fs;
use std::path::Path;

use tempfile::tempdir;

const MINIMAL_SOC: &str = r#"{
    "components": [
        { "type": "controller", "name": "ctrl" },
        { "type": "cpu", "name": "vexriscv", "variant": "standard",
          "buses": [ { "data_width": 32 }, { "data_width": 32 } ],
          "io_regions": [ [2147483648, 2147483648] ],
          "reset_address": 0,
          "interrupt_lines": true },
        { "type": "rom", "name": "rom", "origin": 0, "size": 32768 },
        { "type": "ram", "name": "sram", "origin": 268435456, "size": 8192 },
        { "type": "csr_bridge", "origin": 4026531840 },
        { "type": "timer", "name": "timer0" },
        { "type": "uart", "kind": { "serial": "serial" } },
        { "type": "identifier", "name": "identifier", "identifier": "socmap test SoC" }
    ]
}"#;

fn write_description(dir: &Path, contents: &str) -> String {
    let path = dir.join("soc.json");
    fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn prints_text_map() {
    let dir = tempdir().unwrap();
    let description = write_description(dir.path(), MINIMAL_SOC);

    let output = assert_cmd::cargo::cargo_bin_cmd!("socmap")
        .args(["--description", &description])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    assert!(stdout.contains("32-bit wishbone Bus, 4GiB Address Space."));
    assert!(stdout.contains("CSR Regions: (6)"));
    assert!(stdout.contains("TIMER0_INTERRUPT"));
}

#[test]
fn writes_json_map_to_file() {
    let dir = tempdir().unwrap();
    let description = write_description(dir.path(), MINIMAL_SOC);
    let out_path = dir.path().join("map.json");

    assert_cmd::cargo::cargo_bin_cmd!("socmap")
        .args([
            "--description",
            &description,
            "--format",
            "json",
            "--output",
            out_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let map: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(map["bus"]["regions"]["sram"]["origin"], 268435456);
    assert_eq!(map["constants"]["UART_INTERRUPT"], 1);
    assert_eq!(map["bus_error_sink"], "ctrl");
    assert_eq!(map["csr"]["regions"][0][0], "ctrl");
}

#[test]
fn format_can_come_from_the_environment() {
    let dir = tempdir().unwrap();
    let description = write_description(dir.path(), MINIMAL_SOC);

    let output = assert_cmd::cargo::cargo_bin_cmd!("socmap")
        .env("SOCMAP_DESCRIPTION", &description)
        .env("SOCMAP_FORMAT", "json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let map: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(map["sys_clk_freq"], 100_000_000);
}

#[test]
fn overlapping_regions_fail() {
    let dir = tempdir().unwrap();
    let description = write_description(
        dir.path(),
        r#"{
            "components": [
                { "type": "rom", "name": "rom", "origin": 0, "size": 65536 },
                { "type": "ram", "name": "sram", "origin": 32768, "size": 16384 }
            ]
        }"#,
    );

    let output = assert_cmd::cargo::cargo_bin_cmd!("socmap")
        .args(["--description", &description])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("compose SoC"));
    assert!(stderr.contains("region overlap between rom and sram"));
}

#[test]
fn missing_description_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    assert_cmd::cargo::cargo_bin_cmd!("socmap")
        .args(["--description", missing.to_str().unwrap()])
        .assert()
        .failure();
}
