//! Fixture repositories shared by the analyzer tests.

use std::fs;
use std::path::Path;

use git2::{Repository, RepositoryInitOptions};

pub const BASE_EPOCH: i64 = 1_700_000_000;

pub fn create_test_repo() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();

    (dir, repo)
}

/// Write `files` into the work tree and commit them as `author`.
pub fn commit_as(
    repo: &Repository,
    author: &str,
    files: &[(&str, &str)],
    message: &str,
    epoch: i64,
) -> String {
    let email = format!("{author}@mail.com");
    let sig = git2::Signature::new(author, &email, &git2::Time::new(epoch, 0)).unwrap();
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }

    index.write().unwrap();
    let tree_oid = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_oid).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
        .to_string()
}

/// Delete `path` from the work tree and commit the removal.
pub fn remove_as(repo: &Repository, author: &str, path: &str, epoch: i64) -> String {
    let email = format!("{author}@mail.com");
    let sig = git2::Signature::new(author, &email, &git2::Time::new(epoch, 0)).unwrap();
    fs::remove_file(repo.workdir().unwrap().join(path)).unwrap();
    let mut index = repo.index().unwrap();
    index.remove_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let parent = repo.head().unwrap().peel_to_commit().unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "remove", &tree, &[&parent])
        .unwrap()
        .to_string()
}

/// Five commits, one hour apart:
///
/// 1. author1 adds `file1` = `a`
/// 2. author2 edits `file1` to `a\nb`
/// 3. author1 edits `file1` to `a\nd\nc`
/// 4. author1 edits `file1` to `a\nc`
/// 5. author3 adds `dir1/dir1.1/file2` = `a\nb\nc\nd\ne`
///
/// Returns the commit ids oldest first.
pub fn ownership_repo() -> (tempfile::TempDir, Vec<String>) {
    let (dir, repo) = create_test_repo();
    let hour = 3600;
    let ids = vec![
        commit_as(&repo, "author1", &[("file1", "a")], "c1", BASE_EPOCH),
        commit_as(&repo, "author2", &[("file1", "a\nb")], "c2", BASE_EPOCH + hour),
        commit_as(&repo, "author1", &[("file1", "a\nd\nc")], "c3", BASE_EPOCH + 2 * hour),
        commit_as(&repo, "author1", &[("file1", "a\nc")], "c4", BASE_EPOCH + 3 * hour),
        commit_as(
            &repo,
            "author3",
            &[("dir1/dir1.1/file2", "a\nb\nc\nd\ne")],
            "c5",
            BASE_EPOCH + 4 * hour,
        ),
    ];
    (dir, ids)
}

pub const DUP_BLOCK: &str = "let total_value = compute_total(items);\n\
let average_value = total_value / items.len();\n\
println!(\"average = {average_value}\");\n\
return average_value * scale_factor;\n";

/// Two files sharing a four line block plus a file with unique content.
pub fn duplicates_repo() -> (tempfile::TempDir, Vec<String>) {
    let (dir, repo) = create_test_repo();
    let first = format!("fn first_function_name() {{\n{DUP_BLOCK}}}\n");
    let second = format!("fn second_function_name() {{\n{DUP_BLOCK}}}\n");
    let unique = "fn unrelated_function_body() {\n    let something_else = 42 * 1000;\n}\n";
    let ids = vec![
        commit_as(&repo, "author1", &[("src/a.rs", first.as_str())], "a", BASE_EPOCH),
        commit_as(
            &repo,
            "author2",
            &[("src/b.rs", second.as_str()), ("src/c.rs", unique)],
            "b",
            BASE_EPOCH + 3600,
        ),
    ];
    (dir, ids)
}
