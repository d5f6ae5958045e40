use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

#[test]
fn summary_describes_scene_and_simulated_frames() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args(["--summary-only", "--detail", "2", "--frames", "2"]);
    cmd.assert()
        .success()
        .stdout(contains("Mesh: icosahedron detail 2 (180 triangles"))
        .stdout(contains(
            "Lights: ambient #4255ff x0.50, directional #526cff x0.60 at (2.00, 2.00, 2.00)",
        ))
        .stdout(contains(
            "Composer: render -> bloom(strength 3.00, radius 0.00, threshold 0.00) -> output(reinhard, exposure 1.00)",
        ))
        .stdout(contains("Shader patch: vertex 2/2 anchor(s) patched"))
        .stdout(contains("Shader patch: fragment 2/2 anchor(s) patched"))
        .stdout(contains("Shader uniforms: time"))
        .stdout(contains("Rendered 2 frame(s); time uniform: [0.000, 0.017]"));
}

#[test]
fn overrides_reach_the_composer() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args([
        "--summary-only",
        "--detail",
        "0",
        "--frames",
        "0",
        "--strength",
        "1.5",
        "--exposure",
        "0.5",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("bloom(strength 1.50"))
        .stdout(contains("output(reinhard, exposure 0.06)"))
        .stdout(contains("Rendered 0 frame(s)"));
}

#[test]
fn dump_shaders_prints_patched_modules() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args(["--summary-only", "--detail", "0", "--dump-shaders"]);
    cmd.assert()
        .success()
        .stdout(contains("// ---- vertex shader ----"))
        .stdout(contains("// ---- fragment shader ----"))
        .stdout(contains("time"));
}

#[test]
fn unknown_argument_fails() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args(["--summary-only", "--bogus"]);
    cmd.assert()
        .failure()
        .stderr(contains("unknown argument: --bogus"));
}

#[test]
fn zero_size_is_rejected() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args(["--summary-only", "--size", "0x600"]);
    cmd.assert().failure().stderr(contains("zero area"));
}

#[test]
fn detail_beyond_buffer_limit_is_rejected() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args(["--summary-only", "--detail", "4294967295"]);
    cmd.assert()
        .failure()
        .stderr(contains("byte limit"));
}

#[test]
fn non_finite_setting_is_rejected() {
    let mut cmd = Command::cargo_bin("bloom-sketch").expect("binary exists");
    cmd.args(["--summary-only", "--exposure", "NaN"]);
    cmd.assert()
        .failure()
        .stderr(contains("--exposure expects a finite number"));
}
