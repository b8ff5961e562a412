use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn scrollshade(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_scrollshade"));
    command
        .env("SCROLLSHADE_CONFIG_DIR", config_dir)
        .env_remove("SCROLLSHADE_CONFIG")
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn check_prints_scroll_plan() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let scene = root.path().join("scene.toml");
    fs::write(
        &scene,
        r#"
version = 1
textures = ["images/11.webp", "images/12.webp"]

[scroll]
sections = ["100vh", "100vh", 400]
scrub = "250ms"
"#,
    )
    .unwrap();

    let output = scrollshade(&config_dir)
        .args(["check", "--size", "800x600", "--config"])
        .arg(&scene)
        .output()
        .expect("failed to run scrollshade check");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Viewport: 800x600"));
    assert!(stdout.contains("#2  400px"));
    assert!(stdout.contains("Max progress: 3"));
    assert!(stdout.contains("smoothed over 250ms"));
    assert!(stdout.contains("uTexture1  missing"));
    assert!(stdout.contains(&root.path().join("images/12.webp").display().to_string()));
    assert!(stdout.contains("uTexture3  unset"));
    assert!(stdout.contains("status     ok"));
}

#[test]
fn check_rejects_invalid_config() {
    let root = TempDir::new().unwrap();
    let scene = root.path().join("scene.toml");
    fs::write(&scene, "version = 1\n[scroll]\nsections = []\n").unwrap();

    let status = scrollshade(root.path())
        .arg("check")
        .arg("--config")
        .arg(&scene)
        .output()
        .expect("failed to run scrollshade check")
        .status;

    assert!(!status.success());
}

#[test]
fn check_uses_default_location() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("scene.toml"),
        "version = 1\n[window]\nwidth = 640\nheight = 480\n",
    )
    .unwrap();

    let output = scrollshade(root.path())
        .arg("check")
        .output()
        .expect("failed to run scrollshade check");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("(default location)"));
    assert!(stdout.contains("Viewport: 640x480"));
    let first_texture = root.path().join("images/11.webp");
    assert!(stdout.contains(&format!("uTexture1  missing  {}", first_texture.display())));
}

#[test]
fn where_reports_config_directory() {
    let root = TempDir::new().unwrap();

    let output = scrollshade(root.path())
        .arg("where")
        .output()
        .expect("failed to run scrollshade where");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains(&root.path().display().to_string()));
    assert!(stdout.contains("built-in defaults apply"));
}
