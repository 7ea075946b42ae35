use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "virtual-world"])
        .status()
        .expect("failed to invoke cargo check for virtual-world CLI binary");

    assert!(status.success(), "cargo check --bin virtual-world should succeed");
}

#[test]
fn quiet_run_finishes_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_virtual-world"))
        .args([
            "--quiet",
            "--ticks",
            "5",
            "--columns",
            "8",
            "--rows",
            "6",
            "--ignite",
            "4,1",
        ])
        .output()
        .expect("failed to run the virtual-world binary");

    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "quiet runs print no frames");
}

#[test]
fn frames_are_printed_for_every_tick() {
    let output = Command::new(env!("CARGO_BIN_EXE_virtual-world"))
        .args(["--ticks", "3", "--columns", "6", "--rows", "4"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run the virtual-world binary");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("ascii output");
    assert_eq!(
        stdout.lines().filter(|line| line.starts_with("frame ")).count(),
        3
    );
}
