use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "class_enhancer_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

fn write_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

/// Minimal well-formed class-file header declaring `internal_name`.
fn class_bytes(internal_name: &str) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    b.extend_from_slice(&[0, 0, 0, 52]);
    b.extend_from_slice(&5u16.to_be_bytes());
    b.push(1); // Utf8
    b.extend_from_slice(&(internal_name.len() as u16).to_be_bytes());
    b.extend_from_slice(internal_name.as_bytes());
    b.push(7); // Class -> #1
    b.extend_from_slice(&1u16.to_be_bytes());
    b.push(1); // Utf8
    b.extend_from_slice(&16u16.to_be_bytes());
    b.extend_from_slice(b"java/lang/Object");
    b.push(7); // Class -> #3
    b.extend_from_slice(&3u16.to_be_bytes());
    b.extend_from_slice(&0x0021u16.to_be_bytes());
    b.extend_from_slice(&2u16.to_be_bytes());
    b.extend_from_slice(&4u16.to_be_bytes());
    b.extend_from_slice(&0u16.to_be_bytes());
    b
}

fn run_json(args: &[&str], envs: &[(&str, &str)]) -> anyhow::Result<Value> {
    let bin = env!("CARGO_BIN_EXE_class-enhancer");
    let mut cmd = Command::new(bin);
    cmd.args(args);
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let out = cmd.output()?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

/// Appends an `ENH!` marker unless the class already carries it, so a
/// second pass over its own output reports nothing to do.
#[cfg(unix)]
const IDEMPOTENT_AGENT: &str = r#"#!/bin/sh
set -e
in=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --in) in="$2"; shift 2 ;;
    --out) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ "$(tail -c 4 "$in")" = "ENH!" ]; then
  exit 0
fi
cat "$in" > "$out"
printf 'ENH!' >> "$out"
"#;

#[cfg(unix)]
fn setup_project(base: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let project = base.join("project");
    let entity_jar = project.join("tools/entity-agent.jar");
    let query_jar = project.join("tools/query-agent.jar");
    write_file(&entity_jar, b"stub")?;
    write_file(&query_jar, b"stub")?;
    write_file(
        &project.join("enhancer.toml"),
        br#"
[agents]
entity-jar = "tools/entity-agent.jar"
query-bean-jar = "tools/query-agent.jar"
"#,
    )?;
    write_file(
        &project.join("target/classes/org/example/Customer.class"),
        &class_bytes("org/example/Customer"),
    )?;
    write_file(
        &project.join("target/classes/org/example/Order.class"),
        &class_bytes("org/example/Order"),
    )?;

    let fake_java = base.join("bin/java");
    write_file(&fake_java, IDEMPOTENT_AGENT.as_bytes())?;
    make_executable(&fake_java)?;

    Ok((project, fake_java))
}

#[cfg(unix)]
#[test]
fn full_build_enhances_and_reruns_idempotently() -> anyhow::Result<()> {
    let base = temp_dir("full_build");
    let (project, fake_java) = setup_project(&base)?;
    let envs = [("CLASS_ENHANCER_JAVA", fake_java.to_str().unwrap())];

    let first = run_json(
        &["--project", project.to_str().unwrap(), "build", "--full"],
        &envs,
    )?;
    assert_eq!(first["kind"], Value::String("full".to_string()));
    assert_eq!(first["attempted"], Value::from(2u64));
    assert_eq!(first["enhanced"], Value::from(2u64));
    assert_eq!(first["failures"], Value::from(0u64));

    let customer =
        std::fs::read(project.join("target/classes/org/example/Customer.class"))?;
    assert!(customer.ends_with(b"ENH!"));

    // end-to-end round trip: the agents see their own output and decline
    let second = run_json(
        &["--project", project.to_str().unwrap(), "build", "--full"],
        &envs,
    )?;
    assert_eq!(second["attempted"], Value::from(2u64));
    assert_eq!(second["enhanced"], Value::from(0u64));

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[cfg(unix)]
#[test]
fn incremental_build_honors_the_change_set() -> anyhow::Result<()> {
    let base = temp_dir("incremental");
    let (project, fake_java) = setup_project(&base)?;
    let envs = [("CLASS_ENHANCER_JAVA", fake_java.to_str().unwrap())];

    let empty_delta = base.join("empty-delta.json");
    write_file(&empty_delta, br#"{ "entries": [] }"#)?;
    let none = run_json(
        &[
            "--project",
            project.to_str().unwrap(),
            "build",
            "--delta",
            empty_delta.to_str().unwrap(),
        ],
        &envs,
    )?;
    assert_eq!(none["kind"], Value::String("incremental".to_string()));
    assert_eq!(none["attempted"], Value::from(0u64));

    let removed_delta = base.join("removed-delta.json");
    write_file(
        &removed_delta,
        br#"{ "entries": [ { "kind": "removed", "path": "target/classes/org/example/Customer.class" } ] }"#,
    )?;
    let removed = run_json(
        &[
            "--project",
            project.to_str().unwrap(),
            "build",
            "--delta",
            removed_delta.to_str().unwrap(),
        ],
        &envs,
    )?;
    assert_eq!(removed["attempted"], Value::from(0u64));
    assert_eq!(removed["annotations"], Value::from(0u64));

    let changed_delta = base.join("changed-delta.json");
    write_file(
        &changed_delta,
        br#"{ "entries": [ { "kind": "changed", "path": "target/classes/org/example/Order.class" } ] }"#,
    )?;
    let changed = run_json(
        &[
            "--project",
            project.to_str().unwrap(),
            "build",
            "--delta",
            changed_delta.to_str().unwrap(),
        ],
        &envs,
    )?;
    assert_eq!(changed["attempted"], Value::from(1u64));
    assert_eq!(changed["enhanced"], Value::from(1u64));

    let order = std::fs::read(project.join("target/classes/org/example/Order.class"))?;
    assert!(order.ends_with(b"ENH!"));
    let customer =
        std::fs::read(project.join("target/classes/org/example/Customer.class"))?;
    assert!(!customer.ends_with(b"ENH!"));

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn probe_prints_the_binary_name() -> anyhow::Result<()> {
    let base = temp_dir("probe");
    let class_file = base.join("Widget.class");
    write_file(&class_file, &class_bytes("org/example/demo/Widget"))?;

    let bin = env!("CARGO_BIN_EXE_class-enhancer");
    let out = Command::new(bin)
        .args(["probe", class_file.to_str().unwrap()])
        .output()?;
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "org.example.demo.Widget"
    );

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}
