//! Persistence of completed utterances.

use crate::config::AssetConfig;
use crate::error::Result;
use chrono::Local;
use logging::Logger;
use media::UtteranceAsset;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives every utterance the turn controller completes.
pub trait AssetSink: Send + 'static {
    fn store(&mut self, asset: &UtteranceAsset) -> Result<()>;
}

impl<T: AssetSink + ?Sized> AssetSink for Box<T> {
    fn store(&mut self, asset: &UtteranceAsset) -> Result<()> {
        (**self).store(asset)
    }
}

/// Writes each asset to `<dir>/<utterance_id>_<timestamp>.wav`.
pub struct WavFileSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
    logger: Logger,
}

impl WavFileSink {
    /// Creates the output directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P, logger: &Logger) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
            logger: logger.for_component("Assets"),
        })
    }

    /// Builds the sink described by `config`, or one that discards assets.
    pub fn from_config(config: &AssetConfig, logger: &Logger) -> Result<Box<dyn AssetSink>> {
        if !config.enabled {
            logger.info("Utterance persistence disabled");
            return Ok(Box::new(DiscardSink));
        }
        Ok(Box::new(Self::new(&config.output_dir, logger)?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, oldest first
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, asset: &UtteranceAsset) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S%.3f");
        let id: String = asset
            .utterance_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!(
            "{}_{}.{}",
            id,
            stamp,
            asset.container.extension()
        ))
    }
}

impl AssetSink for WavFileSink {
    fn store(&mut self, asset: &UtteranceAsset) -> Result<()> {
        let path = self.path_for(asset);
        let mut writer = BufWriter::new(File::create(&path)?);
        asset.container.write_to(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?;

        self.logger.info(&format!(
            "Saved {} ({:.2}s, {} Hz, {} ch) to {}",
            asset.utterance_id,
            asset.duration.as_secs_f64(),
            asset.sample_rate,
            asset.channels,
            path.display()
        ));
        self.written.push(path);
        Ok(())
    }
}

/// Keeps assets in memory; clones share the same list.
#[derive(Clone, Default)]
pub struct MemorySink {
    assets: Arc<Mutex<Vec<UtteranceAsset>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assets(&self) -> Vec<UtteranceAsset> {
        self.assets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.assets.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetSink for MemorySink {
    fn store(&mut self, asset: &UtteranceAsset) -> Result<()> {
        self.assets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(asset.clone());
        Ok(())
    }
}

/// Drops every asset
pub struct DiscardSink;

impl AssetSink for DiscardSink {
    fn store(&mut self, _asset: &UtteranceAsset) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media::WavSpec;
    use tempfile::tempdir;

    fn asset(id: &str) -> UtteranceAsset {
        UtteranceAsset::encode(id.to_string(), &WavSpec::pcm16(24000, 1), &[500; 2400]).unwrap()
    }

    #[test]
    fn test_wav_file_sink_writes_container() {
        let dir = tempdir().unwrap();
        let mut sink = WavFileSink::new(dir.path().join("out"), &Logger::disabled()).unwrap();
        sink.store(&asset("utt_1")).unwrap();

        assert_eq!(sink.written().len(), 1);
        let path = &sink.written()[0];
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("utt_1_"));
        assert!(name.ends_with(".wav"));

        let bytes = fs::read(path).unwrap();
        assert_eq!(bytes.len(), 44 + 4800);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn test_unsafe_ids_are_sanitized() {
        let dir = tempdir().unwrap();
        let mut sink = WavFileSink::new(dir.path(), &Logger::disabled()).unwrap();
        sink.store(&asset("../escape")).unwrap();

        let path = &sink.written()[0];
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_memory_sink_shares_between_clones() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.store(&asset("a")).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.assets()[0].utterance_id, "a");
    }

    #[test]
    fn test_disabled_config_discards() {
        let dir = tempdir().unwrap();
        let config = AssetConfig {
            output_dir: dir.path().join("never").to_string_lossy().into_owned(),
            enabled: false,
        };
        let mut sink = WavFileSink::from_config(&config, &Logger::disabled()).unwrap();
        sink.store(&asset("a")).unwrap();
        assert!(!dir.path().join("never").exists());
    }
}
