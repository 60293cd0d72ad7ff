//! The external typesetting toolchain: compiler, cropper and rasterizer.
//!
//! Every step is fire-and-forget. Exit codes are not inspected; the pipeline
//! only looks at which files exist afterwards.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use texquiz_shared::ToolchainConfig;

/// `file:line: message` diagnostics printed by `-file-line-error`.
static DIAGNOSTIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.+?):(\d+): (.*)$").expect("diagnostic regex"));

/// One invocation per step. Implementations produce files next to their
/// inputs and never fail: absence of the expected output is the only signal.
pub trait Toolchain: Send + Sync {
    /// Typeset `source` into `<base>.pdf` inside `out_dir`.
    fn compile(&self, source: &Path, out_dir: &Path);

    /// Crop `pdf`, producing a `-crop` suffixed sibling.
    fn crop(&self, pdf: &Path);

    /// Rasterize `pdf` at `density` into `target`, or into numbered
    /// `<target stem>-<k>.png` files when the document has several pages.
    fn rasterize(&self, pdf: &Path, density: u32, target: &Path);
}

/// Spawns the configured commands with `std::process::Command`.
#[derive(Debug, Clone)]
pub struct ExternalToolchain {
    config: ToolchainConfig,
}

impl ExternalToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Option<Output> {
        debug!(program, ?args, cwd = %cwd.display(), "spawning");
        match Command::new(program).args(args).current_dir(cwd).output() {
            Ok(output) => {
                debug!(program, status = ?output.status, "exited");
                Some(output)
            }
            Err(e) => {
                warn!(program, error = %e, "could not spawn external tool");
                None
            }
        }
    }
}

impl Toolchain for ExternalToolchain {
    fn compile(&self, source: &Path, out_dir: &Path) {
        let args = vec![
            format!("-output-directory={}", out_dir.display()),
            "-interaction=nonstopmode".to_string(),
            "-file-line-error".to_string(),
            source.display().to_string(),
        ];
        if let Some(output) = self.run(&self.config.compiler, &args, working_dir(source)) {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for diag in diagnostics(&stdout) {
                warn!(file = %diag.file, line = diag.line, "{}", diag.message);
            }
        }
    }

    fn crop(&self, pdf: &Path) {
        let args = vec!["--noverbose".to_string(), pdf.display().to_string()];
        self.run(&self.config.cropper, &args, working_dir(pdf));
    }

    fn rasterize(&self, pdf: &Path, density: u32, target: &Path) {
        let args = vec![
            "-density".to_string(),
            density.to_string(),
            pdf.display().to_string(),
            target.display().to_string(),
        ];
        self.run(&self.config.rasterizer, &args, working_dir(pdf));
    }
}

fn working_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// A compiler diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// Pick the `file:line: message` lines out of compiler output.
pub fn diagnostics(output: &str) -> Vec<Diagnostic> {
    DIAGNOSTIC_RE
        .captures_iter(output)
        .filter_map(|c| {
            Some(Diagnostic {
                file: c[1].to_string(),
                line: c[2].parse().ok()?,
                message: c[3].trim_end().to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

/// Whether one configured tool resolves on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    /// `compiler`, `cropper` or `rasterizer`.
    pub role: &'static str,
    pub command: String,
    pub resolved: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Resolve every configured command with `which`.
pub fn probe_toolchain(config: &ToolchainConfig) -> Vec<ToolStatus> {
    [
        ("compiler", &config.compiler),
        ("cropper", &config.cropper),
        ("rasterizer", &config.rasterizer),
    ]
    .into_iter()
    .map(|(role, command)| {
        let resolved = which::which(command).ok();
        if resolved.is_none() {
            debug!(role, command, "not found on PATH");
        }
        ToolStatus {
            role,
            command: command.clone(),
            resolved,
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_file_line_diagnostics() {
        let out = "This is pdfTeX, Version 3.14\n\
                   (./tex-q1.tex\n\
                   ./tex-q1.tex:12: Undefined control sequence.\n\
                   l.12 \\foo\n\
                   ./tex-q1.tex:30: Missing $ inserted.\n";
        let diags = diagnostics(out);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].file, "./tex-q1.tex");
        assert_eq!(diags[0].line, 12);
        assert_eq!(diags[0].message, "Undefined control sequence.");
        assert_eq!(diags[1].line, 30);
    }

    #[test]
    fn clean_output_has_no_diagnostics() {
        assert!(diagnostics("Output written on tex-q1.pdf (1 page).\n").is_empty());
    }

    #[test]
    fn probe_reports_unknown_commands() {
        let config = ToolchainConfig {
            compiler: "texquiz-no-such-compiler".into(),
            cropper: "texquiz-no-such-cropper".into(),
            rasterizer: "texquiz-no-such-rasterizer".into(),
        };
        let status = probe_toolchain(&config);
        assert_eq!(status.len(), 3);
        assert_eq!(status[0].role, "compiler");
        assert!(status.iter().all(|s| !s.is_available()));
    }

    #[test]
    fn spawn_failure_is_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let tools = ExternalToolchain::new(ToolchainConfig {
            compiler: "texquiz-no-such-compiler".into(),
            cropper: "texquiz-no-such-cropper".into(),
            rasterizer: "texquiz-no-such-rasterizer".into(),
        });
        let source = dir.path().join("tex-q.tex");
        tools.compile(&source, dir.path());
        tools.crop(&dir.path().join("tex-q.pdf"));
        tools.rasterize(&dir.path().join("tex-q.pdf"), 600, &dir.path().join("tex-q.png"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn working_dir_of_bare_name_is_current() {
        assert_eq!(working_dir(Path::new("tex-q.tex")), Path::new("."));
        assert_eq!(working_dir(Path::new("/a/tex-q.tex")), Path::new("/a"));
    }
}
