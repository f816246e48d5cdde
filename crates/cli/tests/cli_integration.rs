//! Integration tests for the dstrk binary

mod common;

use anyhow::Result;
use common::DstrkCommand;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    temp: TempDir,
    db: String,
}

impl Sandbox {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("db").display().to_string();
        Self { temp, db }
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn file(&self, name: &str, contents: &str) -> String {
        let path = self.path().join("data").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path.display().to_string()
    }

    /// `dstrk --dbpath <db> <args>`
    fn cmd(&self, args: &[&str]) -> DstrkCommand {
        let mut cmd = DstrkCommand::new(self.path());
        cmd.args(&["--dbpath", &self.db]).args(args);
        cmd
    }

    fn init(&self) -> Result<()> {
        self.cmd(&["init"]).assert_success()?;
        Ok(())
    }

    fn create(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["create"];
        full.extend_from_slice(args);
        let result = self.cmd(&full).assert_success()?;
        result
            .parse_hash()
            .ok_or_else(|| anyhow::anyhow!("no hash in output: {}", result.stdout))
    }
}

#[test]
fn test_no_arguments_is_usage_error() -> Result<()> {
    let sandbox = Sandbox::new();
    let result = DstrkCommand::new(sandbox.path()).execute()?;
    assert_eq!(result.exit_code, 2);
    Ok(())
}

#[test]
fn test_help() -> Result<()> {
    let sandbox = Sandbox::new();
    dstrk!(sandbox.path(), "--help").assert_success()?;
    Ok(())
}

#[test]
fn test_init_twice_fails() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    assert!(Path::new(&sandbox.db).is_dir());

    let result = sandbox.cmd(&["init"]).assert_failure()?;
    assert!(result.contains_stderr("already initialized"));
    Ok(())
}

#[test]
fn test_commands_require_store() -> Result<()> {
    let sandbox = Sandbox::new();
    let file = sandbox.file("p1.txt", "one");

    let result = sandbox.cmd(&["create", &file]).assert_failure()?;
    assert!(result.contains_stderr("not initialized"));
    Ok(())
}

#[test]
fn test_default_store_under_home() -> Result<()> {
    let sandbox = Sandbox::new();
    dstrk!(sandbox.path(), "init").assert_success()?;
    assert!(sandbox.path().join(".dstrk").is_dir());
    Ok(())
}

#[test]
fn test_store_from_environment() -> Result<()> {
    let sandbox = Sandbox::new();
    let db = sandbox.path().join("env-db");

    let mut cmd = DstrkCommand::new(sandbox.path());
    cmd.env("DSTRK_DBPATH", &db.display().to_string())
        .args(&["init"]);
    cmd.assert_success()?;
    assert!(db.is_dir());
    Ok(())
}

#[test]
fn test_store_from_config_file() -> Result<()> {
    let sandbox = Sandbox::new();
    let config_dir: PathBuf = sandbox.path().join(".config").join("dstrk");
    fs::create_dir_all(&config_dir)?;
    fs::write(
        config_dir.join("config.toml"),
        "[store]\npath = \"~/configured-db\"\n",
    )?;

    dstrk!(sandbox.path(), "init").assert_success()?;
    assert!(sandbox.path().join("configured-db").is_dir());
    Ok(())
}

#[test]
fn test_full_lifecycle() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    let p1 = sandbox.file("p1.txt", "one");
    let p2 = sandbox.file("p2.txt", "two");
    let p3 = sandbox.file("p3.txt", "three");
    let p4 = sandbox.file("p4.txt", "four");

    let a = sandbox.create(&[&p1, &p2, "--tags", "step1"])?;
    let b = sandbox.create(&[&p3, "--parents", &a, "--tags", "step2"])?;

    // Lineage through a member file
    let tree = sandbox.cmd(&["tree", &p3, "--json"]).assert_success()?.json()?;
    assert_eq!(tree["hash"], b.as_str());
    assert_eq!(tree["tags"][0], "step2");
    assert_eq!(tree["parents"][0]["hash"], a.as_str());
    assert_eq!(tree["parents"][0]["tags"][0], "step1");

    // Human tree output names both datasets
    let rendered = sandbox.cmd(&["tree", &b[..7]]).assert_success()?;
    assert!(rendered.stdout.contains(&a));
    assert!(rendered.stdout.contains(&b));

    // add-files keeps the hash
    sandbox.cmd(&["add-files", &p4, "--to", &a]).assert_success()?;
    let info = sandbox.cmd(&["info", &p4, "--json"]).assert_success()?.json()?;
    assert_eq!(info["hash"], a.as_str());
    assert_eq!(info["files"].as_array().map(|f| f.len()), Some(3));

    // Removing every file of A removes A
    sandbox
        .cmd(&["delete-files", &p1, &p2, &p4])
        .assert_success()?;
    sandbox.cmd(&["info", &a]).assert_failure()?;

    let list = sandbox.cmd(&["list", "--json"]).assert_success()?.json()?;
    assert_eq!(list.as_array().map(|l| l.len()), Some(1));
    assert_eq!(list[0]["hash"], b.as_str());

    sandbox.cmd(&["delete-dataset", &b]).assert_success()?;
    let list = sandbox.cmd(&["list", "--json"]).assert_success()?.json()?;
    assert_eq!(list.as_array().map(|l| l.len()), Some(0));

    sandbox.cmd(&["verify"]).assert_success()?;
    Ok(())
}

#[test]
fn test_create_with_glob_pattern() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    sandbox.file("a.csv", "a");
    sandbox.file("b.csv", "b");
    sandbox.file("c.txt", "c");

    let pattern = format!("{}/data/*.csv", sandbox.path().display());
    let hash = sandbox.create(&[&pattern])?;

    let info = sandbox.cmd(&["info", &hash, "--json"]).assert_success()?.json()?;
    assert_eq!(info["files"].as_array().map(|f| f.len()), Some(2));
    Ok(())
}

#[test]
fn test_create_without_matches_fails() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;

    let pattern = format!("{}/data/*.none", sandbox.path().display());
    let result = sandbox.cmd(&["create", &pattern]).assert_failure()?;
    assert!(result.contains_stderr("No files match"));
    Ok(())
}

#[test]
fn test_unknown_parent_fails() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    let p1 = sandbox.file("p1.txt", "one");

    let result = sandbox
        .cmd(&["create", &p1, "--parents", "0123456789abcdef"])
        .assert_failure()?;
    assert!(result.contains_stderr("is not an existing dataset"));
    Ok(())
}

#[test]
fn test_short_hash_needs_seven_characters() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    let hash = sandbox.create(&[&sandbox.file("p1.txt", "one")])?;

    sandbox.cmd(&["info", &hash[..7]]).assert_success()?;
    let result = sandbox.cmd(&["info", &hash[..6]]).assert_failure()?;
    assert!(result.contains_stderr("Not a tracked file or dataset hash"));
    Ok(())
}

#[test]
fn test_git_provenance_rejects_non_repository() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    let p1 = sandbox.file("p1.txt", "one");
    let not_a_repo = sandbox.path().join("plain");
    fs::create_dir_all(&not_a_repo)?;

    let result = sandbox
        .cmd(&["create", &p1, "--git-repo", &not_a_repo.display().to_string()])
        .assert_failure()?;
    assert!(result.contains_stderr("Provenance source unavailable"));
    Ok(())
}

#[test]
fn test_verify_reports_corruption() -> Result<()> {
    let sandbox = Sandbox::new();
    sandbox.init()?;
    sandbox.create(&[&sandbox.file("p1.txt", "one")])?;

    // Membership record naming a dataset that does not exist
    let shard = Path::new(&sandbox.db).join("ff").join("ff");
    fs::create_dir_all(&shard)?;
    fs::write(
        shard.join("ffff000000000000000000000000000000000000"),
        "eeee000000000000000000000000000000000000\nghost.txt\n",
    )?;

    let result = sandbox.cmd(&["verify"]).assert_failure()?;
    assert!(result.stdout.contains("not a dataset"));
    Ok(())
}
