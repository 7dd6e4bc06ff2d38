//! Deployable archive assembly.

pub mod runtime;

use crate::core::config::PackageConfig;
use crate::core::error::AppError;
use fsb_types::LoadedFlow;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Runtime files copied from the runtime directory; all are required.
const RUNTIME_FILES: &[&str] = &["host.json", "package.json", "package-lock.json"];
const NODE_MODULES: &str = "node_modules";

/// Builds the zip that the function host runs from.
#[derive(Debug, Clone)]
pub struct Packager {
    runtime_dir: PathBuf,
    function_name: String,
}

impl Packager {
    pub fn new<P: Into<PathBuf>, N: Into<String>>(runtime_dir: P, function_name: N) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            function_name: function_name.into(),
        }
    }

    pub fn from_config(config: &PackageConfig) -> Self {
        Self::new(config.runtime_dir.clone(), config.function_name.clone())
    }

    /// Assemble the archive for `flow` with `entrypoint` as its handler.
    ///
    /// Entry order: bindings, handler, runtime files, step modules (one per
    /// distinct source digest), proxies. Any failure discards the archive.
    pub fn package(&self, entrypoint: &str, flow: &LoadedFlow) -> Result<Vec<u8>, AppError> {
        let mut zw = ZipWriter::new(Cursor::new(Vec::new()));

        self.write_entry(
            &mut zw,
            &format!("{}/function.json", self.function_name),
            runtime::FUNCTION_BINDINGS.as_bytes(),
        )?;
        self.write_entry(
            &mut zw,
            &format!("{}/index.js", self.function_name),
            entrypoint.as_bytes(),
        )?;

        self.write_entry(&mut zw, ".funcignore", runtime::FUNC_IGNORE.as_bytes())?;
        for name in RUNTIME_FILES {
            let contents = read_static(&self.runtime_dir.join(name))?;
            self.write_entry(&mut zw, name, &contents)?;
        }
        let modules_dir = self.runtime_dir.join(NODE_MODULES);
        if modules_dir.is_dir() {
            for file in collect_files(&modules_dir)? {
                let contents = read_static(&file)?;
                let name = archive_name(&self.runtime_dir, &file)?;
                self.write_entry(&mut zw, &name, &contents)?;
            }
        }

        let mut written = HashSet::new();
        for step in &flow.steps {
            let filename = step.filename();
            if !written.insert(filename.clone()) {
                debug!(step = %step.name, file = %filename, "step source already packaged");
                continue;
            }
            self.write_entry(&mut zw, &filename, step.source_code.as_bytes())?;
        }

        self.write_entry(&mut zw, "proxies.json", runtime::PROXIES_CONFIG.as_bytes())?;

        let cursor = zw.finish()?;
        let archive = cursor.into_inner();
        debug!(flow = %flow.name, bytes = archive.len(), "packaged function archive");
        Ok(archive)
    }

    fn write_entry(
        &self,
        zw: &mut ZipWriter<Cursor<Vec<u8>>>,
        name: &str,
        contents: &[u8],
    ) -> Result<(), AppError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zw.start_file(name, options)?;
        zw.write_all(contents).map_err(|err| {
            AppError::with_source(
                crate::core::types::ErrorCategory::PackagingError,
                format!("writing archive entry {}", name),
                err,
            )
        })
    }
}

fn read_static(path: &Path) -> Result<Vec<u8>, AppError> {
    fs::read(path).map_err(|err| {
        AppError::with_source(
            crate::core::types::ErrorCategory::PackagingError,
            format!("reading {}: {}", path.display(), err),
            err,
        )
        .with_code("FSB-PACKAGE-003")
    })
}

/// All files below `dir`, sorted for a reproducible archive.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|err| {
            AppError::packaging(format!("listing {}: {}", current.display(), err))
        })?;
        for entry in entries {
            let path = entry
                .map_err(|err| AppError::packaging(format!("listing {}: {}", current.display(), err)))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn archive_name(base: &Path, file: &Path) -> Result<String, AppError> {
    let relative = file.strip_prefix(base).map_err(|_| {
        AppError::packaging(format!(
            "{} is outside {}",
            file.display(),
            base.display()
        ))
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}
