//! 命令行集成测试

use std::fs;
use std::process::Output;

use assert_cmd::Command;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{HtmlTestHelper, TestEnvironment};

fn pagelingo(env: &TestEnvironment) -> Command {
    let mut cmd = Command::cargo_bin("pagelingo").unwrap();
    cmd.current_dir(env.path())
        .env("NO_COLOR", "1")
        .env("HOME", env.path())
        .env_remove("DEEPL_AUTH_KEY")
        .env_remove("PAGELINGO_PRIMARY_LANG")
        .env_remove("PAGELINGO_SECONDARY_LANG")
        .env_remove("PAGELINGO_LOG_LEVEL");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_extract_writes_four_artifacts() {
    let env = TestEnvironment::new();
    env.write_page("page.html", &HtmlTestHelper::create_simple_english_page());

    pagelingo(&env)
        .args(["extract", "page.html", "--lang", "en", "--out-dir", "out"])
        .assert()
        .success();

    let out = env.path().join("out");
    for name in [
        "translatable_structured.json",
        "translatable_flat.json",
        "translatable_flat_sentences.json",
        "non_translatable.html",
    ] {
        assert!(out.join(name).exists(), "{} missing", name);
    }

    let placeholder = fs::read_to_string(out.join("non_translatable.html")).unwrap();
    assert!(placeholder.contains("BLOCK_1_S1"));
    assert!(!placeholder.contains("Hello there."));
}

#[test]
fn test_extract_rejects_same_primary_and_secondary() {
    let env = TestEnvironment::new();
    env.write_page("page.html", &HtmlTestHelper::create_simple_english_page());

    let output = pagelingo(&env)
        .args(["extract", "page.html", "--lang", "en", "--secondary-lang", "en"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("主语言与次语言不能相同"));
}

#[test]
fn test_extract_rejects_unknown_language() {
    let env = TestEnvironment::new();
    env.write_page("page.html", "<p>Hello.</p>");

    let output = pagelingo(&env)
        .args(["extract", "page.html", "--lang", "tlh"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("不支持的语言"));
}

#[test]
fn test_translate_requires_auth_key() {
    let env = TestEnvironment::new();
    fs::write(env.path().join("flat.json"), "{}").unwrap();

    let output = pagelingo(&env)
        .args(["translate", "--input", "flat.json", "--output", "out.json", "--lang", "fr"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("DEEPL_AUTH_KEY"));
    assert!(!env.path().join("out.json").exists());
}

#[test]
fn test_missing_subcommand_fails() {
    let env = TestEnvironment::new();
    pagelingo(&env).assert().failure();
}

#[test]
fn test_extract_help_describes_secondary_language() {
    let env = TestEnvironment::new();
    let output = pagelingo(&env).args(["extract", "--help"]).output().unwrap();

    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("checked against --lang"));
    assert!(!help.contains("own profile"));
}
