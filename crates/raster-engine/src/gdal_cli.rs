//! Production engine backed by the GDAL command-line tools.
//!
//! This shells out to `gdal_translate` and `gdaladdo` instead of binding
//! libgdal, the same way the NetCDF tooling in this workspace shells out to
//! `ncdump`. The transcode is staged through a scratch file and the result
//! is registered as an in-memory virtual buffer, so everything downstream of
//! `translate` (stat/open/read/unlink) is served by [`MemoryVfs`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::memory::MemoryVfs;
use crate::{
    DatasetDescriptor, EngineFault, RasterEngine, TranslateOptions, VsiHandle, OVERVIEW_LEVELS,
    OVERVIEW_RESAMPLING,
};

/// Locations of the GDAL binaries and scratch storage.
#[derive(Debug, Clone)]
pub struct GdalCliConfig {
    pub translate_bin: PathBuf,
    pub addo_bin: PathBuf,
    pub scratch_dir: PathBuf,
}

impl Default for GdalCliConfig {
    fn default() -> Self {
        Self {
            translate_bin: PathBuf::from("gdal_translate"),
            addo_bin: PathBuf::from("gdaladdo"),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// [`RasterEngine`] implementation driving the GDAL CLI.
pub struct GdalCliEngine {
    vfs: MemoryVfs,
    config: GdalCliConfig,
}

impl GdalCliEngine {
    pub fn new(config: GdalCliConfig) -> Self {
        Self {
            vfs: MemoryVfs::new(),
            config,
        }
    }

    /// Verify the engine binaries are reachable and log their version.
    pub async fn preflight(&self) -> Result<String, EngineFault> {
        let output = Command::new(&self.config.translate_bin)
            .arg("--version")
            .output()
            .await
            .map_err(|err| {
                EngineFault::new(format!(
                    "failed to launch {}: {err}",
                    self.config.translate_bin.display()
                ))
            })?;
        if !output.status.success() {
            return Err(EngineFault::new(format!(
                "{} --version exited with {}",
                self.config.translate_bin.display(),
                output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(version = %version, "raster engine available");
        Ok(version)
    }

    fn scratch_path(&self) -> PathBuf {
        self.config
            .scratch_dir
            .join(format!("transcode-{}.tif", Uuid::new_v4()))
    }

    fn translate_args(input: &str, output: &Path, options: &TranslateOptions) -> Vec<String> {
        let mut args = vec!["-of".to_string(), "GTiff".to_string()];
        for creation_option in options.creation_options() {
            args.push("-co".to_string());
            args.push(creation_option);
        }
        if let Some(window) = options.window {
            args.push("-projwin".to_string());
            for bound in [window.ulx, window.uly, window.lrx, window.lry] {
                args.push(bound.to_string());
            }
        }
        args.push(input.to_string());
        args.push(output.display().to_string());
        args
    }

    fn addo_args(target: &Path) -> Vec<String> {
        let mut args = vec![
            "-r".to_string(),
            OVERVIEW_RESAMPLING.to_string(),
            target.display().to_string(),
        ];
        args.extend(OVERVIEW_LEVELS.iter().map(|level| level.to_string()));
        args
    }

    async fn run(&self, bin: &Path, args: &[String]) -> Result<(), EngineFault> {
        debug!(bin = %bin.display(), ?args, "running raster engine command");
        let output = Command::new(bin).args(args).output().await.map_err(|err| {
            EngineFault::new(format!("failed to launch {}: {err}", bin.display()))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineFault::new(format!(
                "{} exited with {}: {}",
                bin.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn remove_scratch(&self, path: &Path) {
        if let Err(err) = tokio::fs::remove_file(path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to remove scratch file");
            }
        }
    }

    /// Run the transcode chain into `staged` and return the output bytes.
    async fn produce(
        &self,
        input: &DatasetDescriptor,
        staged: &Path,
        options: &TranslateOptions,
    ) -> Result<Vec<u8>, EngineFault> {
        let source = input.to_engine_string();

        if options.build_overviews {
            // Overviews are built on an intermediate copy, then carried into
            // the final tiled output via COPY_SRC_OVERVIEWS.
            let base = self.scratch_path();
            let subset_options = TranslateOptions {
                window: options.window,
                build_overviews: false,
            };
            let chain = async {
                self.run(
                    &self.config.translate_bin,
                    &Self::translate_args(&source, &base, &subset_options),
                )
                .await?;
                self.run(&self.config.addo_bin, &Self::addo_args(&base)).await?;
                self.run(
                    &self.config.translate_bin,
                    &Self::translate_args(
                        &base.display().to_string(),
                        staged,
                        &TranslateOptions::default(),
                    ),
                )
                .await
            }
            .await;
            self.remove_scratch(&base).await;
            chain?;
        } else {
            self.run(
                &self.config.translate_bin,
                &Self::translate_args(&source, staged, options),
            )
            .await?;
        }

        tokio::fs::read(staged)
            .await
            .map_err(|err| EngineFault::new(format!("failed to read transcode output: {err}")))
    }
}

#[async_trait]
impl RasterEngine for GdalCliEngine {
    fn stat_size(&self, path: &str) -> Option<u64> {
        self.vfs.stat_size(path)
    }

    fn open_read(&self, path: &str) -> Option<VsiHandle> {
        self.vfs.open_read(path)
    }

    fn seek(&self, handle: VsiHandle, position: u64) -> bool {
        self.vfs.seek(handle, position)
    }

    fn read(&self, handle: VsiHandle, max_bytes: usize) -> Bytes {
        self.vfs.read(handle, max_bytes)
    }

    fn close(&self, handle: VsiHandle) {
        self.vfs.close(handle)
    }

    fn buffer_exists(&self, path: &str) -> bool {
        self.vfs.exists(path)
    }

    fn unlink(&self, path: &str) -> bool {
        self.vfs.unlink(path)
    }

    fn last_error(&self) -> Option<EngineFault> {
        self.vfs.last_error()
    }

    async fn translate(
        &self,
        input: &DatasetDescriptor,
        target: &str,
        options: &TranslateOptions,
    ) -> Result<(), EngineFault> {
        let staged = self.scratch_path();
        let produced = self.produce(input, &staged, options).await;
        self.remove_scratch(&staged).await;

        let bytes = produced?;
        debug!(target, size = bytes.len(), "transcode complete");
        self.vfs.create(target, Bytes::from(bytes));
        Ok(())
    }
}
