use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::fs;
use std::path::Path;

pub fn treetidy_cmd(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("treetidy");
    cmd.arg("-C").arg(cwd);
    cmd
}

/// A small npm-style project: manifest, sources, dependencies, git metadata
/// and a build directory listed in .gitignore.
// Each integration test file is compiled as its own crate, and not all of them
// build projects.
#[allow(dead_code)]
pub fn make_project(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::create_dir_all(dir.join("node_modules/lodash")).unwrap();
    fs::create_dir_all(dir.join(".git/refs")).unwrap();
    fs::create_dir_all(dir.join("dist")).unwrap();
    fs::write(dir.join("package.json"), "{\"name\": \"demo\"}\n").unwrap();
    fs::write(dir.join("src/index.js"), "console.log('hi');\n").unwrap();
    fs::write(dir.join("node_modules/lodash/index.js"), "module.exports = {};\n").unwrap();
    fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(dir.join("dist/bundle.js"), "bundle").unwrap();
    fs::write(dir.join(".gitignore"), "# build output\ndist\n").unwrap();
}
