use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("toyc-cli-tests")
        .join(format!("{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn toyc(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_toyc"))
        .args(args)
        .current_dir(cwd)
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

const FAC: &str = "\
fac(n: Int) = (n == 0 -> 1, True -> n * fac(n - 1))
print(fac(5))
";

#[test]
fn build_writes_assembly_next_to_the_input() {
    let dir = scratch("build");
    fs::write(dir.join("fac.toy"), FAC).unwrap();

    let out = toyc(&["build", "fac.toy"], &dir);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("wrote fac.asm"));

    let asm = fs::read_to_string(dir.join("fac.asm")).unwrap();
    assert!(asm.starts_with("; generated by toyc\nbits 32\n"));
    assert!(asm.contains("global _start"));
    assert!(asm.contains("fn_fac:"));
}

#[test]
fn build_honours_output_flag_and_config_entry() {
    let dir = scratch("build-config");
    fs::write(dir.join("toy.toml"), "[build]\nentry = \"main\"\n").unwrap();
    fs::write(dir.join("fac.toy"), FAC).unwrap();

    let out = toyc(&["build", "fac.toy", "-o", "out/prog.asm"], &dir);
    assert!(out.status.success(), "{}", stderr(&out));

    let asm = fs::read_to_string(dir.join("out").join("prog.asm")).unwrap();
    assert!(asm.contains("global main"));
    assert!(!asm.contains("_start"));
}

#[test]
fn build_refuses_a_64_bit_target() {
    let dir = scratch("target");
    fs::write(dir.join("fac.toy"), FAC).unwrap();

    let out = toyc(&["build", "fac.toy", "--target", "x86_64-unknown-linux-gnu"], &dir);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("toy::backend_x86"), "{}", stderr(&out));
    assert!(!dir.join("fac.asm").exists());
}

#[test]
fn run_prints_output_and_exits_with_the_last_value() {
    let dir = scratch("run");
    fs::write(dir.join("prog.toy"), format!("{FAC}40 + 2\n")).unwrap();

    let out = toyc(&["run", "prog.toy"], &dir);
    assert_eq!(stdout(&out), "120");
    assert_eq!(out.status.code(), Some(42));
}

#[test]
fn run_respects_the_configured_recursion_limit() {
    let dir = scratch("depth");
    fs::write(dir.join("toy.toml"), "[run]\nmax_depth = 50\n").unwrap();
    fs::write(dir.join("prog.toy"), "down(n: Int) = (n == 0 -> 0, True -> down(n - 1))\ndown(100)\n").unwrap();

    let out = toyc(&["run", "prog.toy"], &dir);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("toy::eval"), "{}", stderr(&out));

    let out = toyc(&["run", "prog.toy", "--max-depth", "500"], &dir);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
}

#[test]
fn leaks_warn_unless_denied() {
    let dir = scratch("leaks");
    fs::write(dir.join("leak.toy"), "s = String('x')\n").unwrap();

    let out = toyc(&["check", "leak.toy"], &dir);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("1 warnings"));
    assert!(stderr(&out).contains("toy::leak"), "{}", stderr(&out));

    let out = toyc(&["check", "leak.toy", "--deny-leaks"], &dir);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("toy::sema"), "{}", stderr(&out));
}

#[test]
fn malformed_config_is_a_diagnostic() {
    let dir = scratch("bad-config");
    fs::write(dir.join("toy.toml"), "[build\n").unwrap();
    fs::write(dir.join("fac.toy"), FAC).unwrap();

    let out = toyc(&["check", "fac.toy"], &dir);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("toy::config"), "{}", stderr(&out));
}

#[test]
fn syntax_errors_point_into_the_file() {
    let dir = scratch("syntax");
    fs::write(dir.join("bad.toy"), "print(1 +)\n").unwrap();

    let out = toyc(&["check", "bad.toy"], &dir);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("toy::parse"), "{err}");
    assert!(err.contains("bad.toy"), "{err}");
}

#[test]
fn verbose_reports_each_stage() {
    let dir = scratch("verbose");
    fs::write(dir.join("fac.toy"), FAC).unwrap();

    let out = toyc(&["--verbose", "build", "fac.toy"], &dir);
    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("toyc: lexed"), "{err}");
    assert!(err.contains("toyc: parsed"), "{err}");
    assert!(err.contains("toyc: checked"), "{err}");
    assert!(err.contains("toyc: emitted"), "{err}");
}

#[test]
fn tokens_lists_spans_and_kinds() {
    let dir = scratch("tokens");
    fs::write(dir.join("one.toy"), "print(1)").unwrap();

    let out = toyc(&["tokens", "one.toy"], &dir);
    assert!(out.status.success());
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("0..5"));
    assert!(lines[4].contains("Eof"));
}
