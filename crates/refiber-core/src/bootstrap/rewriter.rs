//! Go module name rewriting across an extracted project
//!
//! One walker thread per scan root feeds file paths into a rendezvous
//! channel; a single consumer thread does every read/replace/write, so no
//! file is ever written by two threads. The walker that finishes last
//! queues the root-level files and drops the final sender, which closes
//! the channel.

use crate::error::RewriteError;
use anyhow::Result;
use crossbeam::channel::{self, Receiver, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;
use walkdir::WalkDir;

/// Directories (relative to the project root) scanned for Go sources
pub const SCAN_DIRS: &[&str] = &["routes", "app"];

/// Root-level files rewritten after every scanned source file
pub const EXTRA_FILES: &[&str] = &["go.mod", "main.go"];

/// File name marker for files worth rewriting
const SOURCE_MARKER: &str = ".go";

/// What one rewrite pass touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Every path handed to the consumer, in processing order
    pub processed: Vec<PathBuf>,
    /// How many of those files actually contained the default identifier
    pub changed: usize,
}

/// Directories to walk plus the files queued once all walks are done
#[derive(Debug, Clone)]
pub struct RewriteJob {
    roots: Vec<PathBuf>,
    extra_files: Vec<PathBuf>,
}

impl RewriteJob {
    pub fn new(roots: Vec<PathBuf>, extra_files: Vec<PathBuf>) -> Self {
        Self { roots, extra_files }
    }

    /// The standard Refiber layout: `routes/` and `app/`, then `go.mod` and `main.go`
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(
            SCAN_DIRS.iter().map(|d| project_root.join(d)).collect(),
            EXTRA_FILES.iter().map(|f| project_root.join(f)).collect(),
        )
    }

    /// Replace every `from` with `to` in all files of the job
    ///
    /// Failures inside the pipeline do not fail the call: the first one is
    /// pushed onto `warnings` as a message and the rest are dropped. `Err` is
    /// only returned when a worker thread panicked.
    pub fn run(
        &self,
        from: &[u8],
        to: &[u8],
        warnings: &mut Vec<String>,
    ) -> Result<RewriteReport> {
        self.run_with(warnings, |path| rewrite_file(path, from, to))
    }

    /// Drive the walkers and the consumer with `rewrite` as the per-file step
    fn run_with<F>(&self, warnings: &mut Vec<String>, rewrite: F) -> Result<RewriteReport>
    where
        F: Fn(&Path) -> Result<bool, RewriteError> + Sync,
    {
        let first_error: OnceLock<RewriteError> = OnceLock::new();
        let report_error = |err: RewriteError| {
            tracing::debug!(error = %err, "rewrite error");
            // Later errors lose the race and are dropped
            let _ = first_error.set(err);
        };

        let (tx, rx) = channel::bounded::<PathBuf>(0);
        let finished = AtomicUsize::new(0);
        let producer_count = self.roots.len();

        let joined = thread::scope(|s| {
            let consumer = s.spawn(|| consume(rx, &rewrite, &report_error));

            let mut producers = Vec::with_capacity(producer_count);
            if producer_count == 0 {
                self.queue_extra_files(&tx);
            }
            for root in &self.roots {
                let tx = tx.clone();
                let finished = &finished;
                let report_error = &report_error;
                producers.push(s.spawn(move || {
                    if let Err(err) = walk_sources(root, &tx) {
                        report_error(err);
                    }

                    // A failed walk still counts as finished
                    if finished.fetch_add(1, Ordering::AcqRel) + 1 == producer_count {
                        self.queue_extra_files(&tx);
                    }
                }));
            }
            drop(tx);

            let producers_ok = producers
                .into_iter()
                .map(|handle| handle.join().is_ok())
                .fold(true, |acc, ok| acc && ok);
            let consumed = consumer.join();

            match (producers_ok, consumed) {
                (true, Ok(report)) => Ok(report),
                _ => Err(anyhow::anyhow!("module rewrite worker panicked")),
            }
        });

        if let Some(err) = first_error.into_inner() {
            tracing::warn!(error = %err, "module rewrite finished with errors");
            warnings.push(err.to_string());
        }

        joined
    }

    fn queue_extra_files(&self, tx: &Sender<PathBuf>) {
        for file in &self.extra_files {
            if tx.send(file.clone()).is_err() {
                break;
            }
        }
    }
}

/// Rewrite the module identifier of a freshly extracted Refiber project
///
/// Convenience wrapper around [`RewriteJob::for_project`].
pub fn rewrite_module_name(
    project_root: &Path,
    default_identifier: &str,
    target_identifier: &str,
    warnings: &mut Vec<String>,
) -> Result<RewriteReport> {
    RewriteJob::for_project(project_root).run(
        default_identifier.as_bytes(),
        target_identifier.as_bytes(),
        warnings,
    )
}

/// Send every source file under `root`; stops at the first walk error
fn walk_sources(root: &Path, tx: &Sender<PathBuf>) -> Result<(), RewriteError> {
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| RewriteError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }
        if !entry.file_name().to_string_lossy().contains(SOURCE_MARKER) {
            continue;
        }

        // Receiver gone means the consumer died; nothing left to feed
        if tx.send(entry.into_path()).is_err() {
            break;
        }
    }
    Ok(())
}

fn consume(
    rx: Receiver<PathBuf>,
    rewrite: &(dyn Fn(&Path) -> Result<bool, RewriteError> + Sync),
    report_error: &(dyn Fn(RewriteError) + Sync),
) -> RewriteReport {
    let mut report = RewriteReport::default();

    for path in rx {
        match rewrite(&path) {
            Ok(true) => report.changed += 1,
            Ok(false) => {}
            Err(err) => report_error(err),
        }
        report.processed.push(path);
    }

    report
}

/// Returns whether the file content changed
fn rewrite_file(path: &Path, from: &[u8], to: &[u8]) -> Result<bool, RewriteError> {
    let content = fs::read(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (rewritten, count) = replace_all(&content, from, to);
    if count == 0 {
        return Ok(false);
    }

    // Writing over the existing file keeps its permission bits
    fs::write(path, rewritten).map_err(|source| RewriteError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), replacements = count, "rewrote module name");
    Ok(true)
}

/// Literal, non-overlapping byte replacement; returns the new buffer and the match count
pub(crate) fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> (Vec<u8>, usize) {
    if from.is_empty() || haystack.len() < from.len() {
        return (haystack.to_vec(), 0);
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut count = 0;
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
            count += 1;
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }

    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const DEFAULT: &str = "bykevin.work/refiber";
    const TARGET: &str = "example.com/app";

    fn count(haystack: &[u8], needle: &str) -> usize {
        replace_all(haystack, needle.as_bytes(), b"").1
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_project(root: &Path) {
        write(root, "go.mod", &format!("module {DEFAULT}\n\ngo 1.22\n"));
        write(
            root,
            "main.go",
            &format!("package main\n\nimport \"{DEFAULT}/routes\"\n"),
        );
        write(
            root,
            "routes/web.go",
            &format!("import (\n\t\"{DEFAULT}/app/controllers\"\n\t\"{DEFAULT}/app/middleware\"\n)\n"),
        );
        write(root, "routes/api.go", "package routes\n");
        write(
            root,
            "app/controllers/web/home.go",
            &format!("import \"{DEFAULT}/app/models\"\n"),
        );
        write(root, "app/models/user.go", &format!("// {DEFAULT}\n"));
        write(root, "app/README.md", &format!("see {DEFAULT}\n"));
    }

    fn all_rewritable(root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = SCAN_DIRS
            .iter()
            .flat_map(|d| WalkDir::new(root.join(d)))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().contains(".go"))
            .map(|e| e.into_path())
            .collect();
        files.extend(EXTRA_FILES.iter().map(|f| root.join(f)));
        files
    }

    #[test]
    fn test_replace_all() {
        assert_eq!(replace_all(b"a-b-a", b"a", b"xy"), (b"xy-b-xy".to_vec(), 2));
        assert_eq!(replace_all(b"aaa", b"aa", b"b"), (b"ba".to_vec(), 1));
        assert_eq!(replace_all(b"abc", b"", b"x"), (b"abc".to_vec(), 0));
        assert_eq!(replace_all(b"ab", b"abc", b"x"), (b"ab".to_vec(), 0));
        assert_eq!(replace_all(b"", b"a", b"x"), (Vec::new(), 0));
    }

    #[test]
    fn test_rewrites_main_go() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("routes")).unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        write(dir.path(), "main.go", "module bykevin.work/refiber");
        write(dir.path(), "go.mod", "module bykevin.work/refiber");

        let mut warnings = Vec::new();
        rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("main.go")).unwrap(),
            "module example.com/app"
        );
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        sample_project(dir.path());

        let files = all_rewritable(dir.path());
        let before: Vec<(usize, usize)> = files
            .iter()
            .map(|f| {
                let c = fs::read(f).unwrap();
                (count(&c, DEFAULT), count(&c, TARGET))
            })
            .collect();

        let mut warnings = Vec::new();
        let report = rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        for (file, (defaults, targets)) in files.iter().zip(before) {
            let c = fs::read(file).unwrap();
            assert_eq!(count(&c, DEFAULT), 0, "{}", file.display());
            assert_eq!(count(&c, TARGET), targets + defaults, "{}", file.display());
        }
        // routes/api.go has nothing to replace
        assert_eq!(report.processed.len(), files.len());
        assert_eq!(report.changed, files.len() - 1);

        // Non-Go files are left alone
        assert_eq!(
            fs::read_to_string(dir.path().join("app/README.md")).unwrap(),
            format!("see {DEFAULT}\n")
        );
    }

    #[test]
    fn test_second_run_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        sample_project(dir.path());

        let mut warnings = Vec::new();
        rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();
        let snapshot: Vec<Vec<u8>> = all_rewritable(dir.path())
            .iter()
            .map(|f| fs::read(f).unwrap())
            .collect();

        let report = rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(report.changed, 0);
        let after: Vec<Vec<u8>> = all_rewritable(dir.path())
            .iter()
            .map(|f| fs::read(f).unwrap())
            .collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn test_each_path_processed_once_and_extras_last() {
        let dir = tempfile::tempdir().unwrap();
        sample_project(dir.path());
        for i in 0..40 {
            write(dir.path(), &format!("routes/gen/r{i}.go"), DEFAULT);
            write(dir.path(), &format!("app/gen/a{i}.go"), DEFAULT);
        }

        let mut warnings = Vec::new();
        let report = rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        let unique: HashSet<&PathBuf> = report.processed.iter().collect();
        assert_eq!(unique.len(), report.processed.len());

        let n = report.processed.len();
        assert_eq!(report.processed[n - 2], dir.path().join("go.mod"));
        assert_eq!(report.processed[n - 1], dir.path().join("main.go"));
    }

    #[test]
    fn test_no_path_rewritten_while_in_progress() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Mutex;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        sample_project(dir.path());
        for i in 0..20 {
            write(dir.path(), &format!("routes/gen/r{i}.go"), DEFAULT);
            write(dir.path(), &format!("app/gen/a{i}.go"), DEFAULT);
        }

        let busy = AtomicBool::new(false);
        let in_progress: Mutex<HashSet<PathBuf>> = Mutex::new(HashSet::new());
        let overlaps = AtomicUsize::new(0);

        let job = RewriteJob::for_project(dir.path());
        let mut warnings = Vec::new();
        let report = job
            .run_with(&mut warnings, |path| {
                if busy.swap(true, Ordering::SeqCst) {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                assert!(
                    in_progress.lock().unwrap().insert(path.to_path_buf()),
                    "{} already in progress",
                    path.display()
                );
                // Widen the window for a second writer to show up
                thread::sleep(Duration::from_millis(1));
                let changed = rewrite_file(path, DEFAULT.as_bytes(), TARGET.as_bytes());
                in_progress.lock().unwrap().remove(path);
                busy.store(false, Ordering::SeqCst);
                changed
            })
            .unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(report.processed.len(), all_rewritable(dir.path()).len());
        for file in all_rewritable(dir.path()) {
            assert_eq!(count(&fs::read(&file).unwrap(), DEFAULT), 0);
        }
    }

    #[test]
    fn test_missing_scan_root_becomes_single_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "go.mod", &format!("module {DEFAULT}\n"));
        write(dir.path(), "main.go", &format!("import \"{DEFAULT}/app\"\n"));
        write(dir.path(), "app/app.go", &format!("import \"{DEFAULT}/app/models\"\n"));
        // no routes/ directory

        let mut warnings = Vec::new();
        let report = rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("routes"), "{}", warnings[0]);
        assert_eq!(report.changed, 3);
        assert!(fs::read_to_string(dir.path().join("app/app.go"))
            .unwrap()
            .contains(TARGET));
        assert!(fs::read_to_string(dir.path().join("go.mod"))
            .unwrap()
            .contains(TARGET));
    }

    #[test]
    fn test_only_first_error_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        // Neither scan root nor extra files exist

        let mut warnings = vec!["earlier warning".to_string()];
        let report = rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0], "earlier warning");
        assert_eq!(report.changed, 0);
        assert_eq!(report.processed.len(), EXTRA_FILES.len());
    }

    #[test]
    fn test_job_without_roots_still_rewrites_extras() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "go.mod", DEFAULT);

        let job = RewriteJob::new(Vec::new(), vec![dir.path().join("go.mod")]);
        let mut warnings = Vec::new();
        let report = job
            .run(DEFAULT.as_bytes(), TARGET.as_bytes(), &mut warnings)
            .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(report.changed, 1);
        assert_eq!(fs::read_to_string(dir.path().join("go.mod")).unwrap(), TARGET);
    }

    #[cfg(unix)]
    #[test]
    fn test_keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        sample_project(dir.path());
        let script = dir.path().join("app/tool.go");
        fs::write(&script, DEFAULT).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

        let mut warnings = Vec::new();
        rewrite_module_name(dir.path(), DEFAULT, TARGET, &mut warnings).unwrap();

        let mode = fs::metadata(&script).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
        assert_eq!(fs::read_to_string(&script).unwrap(), TARGET);
    }
}
