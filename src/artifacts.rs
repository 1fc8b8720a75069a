//! Lifecycle management for the files the pipeline stages exchange.
//!
//! Every stage writes its output to a staging path and promotes it with
//! [`ArtifactStore::finalize`]; the next stage fetches it with
//! [`ArtifactStore::get`]. A stage that fails leaves nothing visible.

use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{DubError, DubResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    RawVideo,
    RawAudio,
    Transcript,
    Translation,
    ReferenceAudio,
    DubbedAudio,
    DubbedVideo,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::RawVideo,
        ArtifactKind::RawAudio,
        ArtifactKind::Transcript,
        ArtifactKind::Translation,
        ArtifactKind::ReferenceAudio,
        ArtifactKind::DubbedAudio,
        ArtifactKind::DubbedVideo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::RawVideo => "raw_video",
            ArtifactKind::RawAudio => "raw_audio",
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Translation => "translation",
            ArtifactKind::ReferenceAudio => "reference_audio",
            ArtifactKind::DubbedAudio => "dubbed_audio",
            ArtifactKind::DubbedVideo => "dubbed_video",
        }
    }

    /// Fixed on-disk name inside the job working directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::RawVideo => "source_video.mp4",
            ArtifactKind::RawAudio => "source_audio.wav",
            ArtifactKind::Transcript => "transcript.vtt",
            ArtifactKind::Translation => "translated.vtt",
            ArtifactKind::ReferenceAudio => "reference_audio.wav",
            ArtifactKind::DubbedAudio => "dubbed_audio.wav",
            ArtifactKind::DubbedVideo => "dubbed_video.mp4",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = DubError;

    fn from_str(s: &str) -> DubResult<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DubError::InvalidArtifactKind(s.to_string()))
    }
}

/// Owns artifact paths and their cleanup inside one job's working directory.
pub struct ArtifactStore {
    work_dir: PathBuf,
    ready: HashSet<ArtifactKind>,
}

impl ArtifactStore {
    pub fn new(work_dir: impl Into<PathBuf>) -> DubResult<ArtifactStore> {
        let work_dir = work_dir.into();
        std::fs::create_dir_all(&work_dir)?;
        Ok(ArtifactStore {
            work_dir,
            ready: HashSet::new(),
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Deterministic final path for an artifact kind.
    pub fn reserve(&self, kind: ArtifactKind) -> PathBuf {
        self.work_dir.join(kind.file_name())
    }

    /// Staging path a producing stage writes to before `finalize`.
    ///
    /// The marker sits before the extension so tools that sniff formats
    /// from file names still work on the staged file.
    pub fn stage_path(&self, kind: ArtifactKind) -> PathBuf {
        let name = kind.file_name();
        let staged = match name.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}.part.{ext}"),
            None => format!("{name}.part"),
        };
        self.work_dir.join(staged)
    }

    /// Atomically promote a staged file to its reserved path.
    ///
    /// Rejects empty output: a stage that wrote zero bytes did not actually
    /// produce anything, even if it reported no error.
    pub fn finalize(&mut self, kind: ArtifactKind, tmp: &Path) -> DubResult<PathBuf> {
        let size = std::fs::metadata(tmp).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            let _ = std::fs::remove_file(tmp);
            return Err(DubError::EmptyArtifact(format!(
                "{kind} stage wrote no data to {}",
                tmp.display()
            )));
        }

        let path = self.reserve(kind);
        std::fs::rename(tmp, &path)?;
        self.ready.insert(kind);
        debug!("artifact {} finalized at {} ({} bytes)", kind, path.display(), size);
        Ok(path)
    }

    /// Fetch a finalized artifact; the input handshake for every stage.
    pub fn get(&self, kind: ArtifactKind) -> DubResult<PathBuf> {
        if !self.ready.contains(&kind) {
            return Err(DubError::ArtifactNotReady(kind.to_string()));
        }
        Ok(self.reserve(kind))
    }

    pub fn is_ready(&self, kind: ArtifactKind) -> bool {
        self.ready.contains(&kind)
    }

    /// Remove every artifact except the listed deliverables.
    ///
    /// Best-effort: cleanup problems are logged and never fail the job.
    pub fn cleanup(&mut self, keep: &[ArtifactKind]) {
        for kind in ArtifactKind::ALL {
            if keep.contains(&kind) {
                continue;
            }
            for path in [self.reserve(kind), self.stage_path(kind)] {
                if path.exists() {
                    match std::fs::remove_file(&path) {
                        Ok(()) => debug!("removed {}", path.display()),
                        Err(e) => warn!("failed to remove {}: {}", path.display(), e),
                    }
                }
            }
            self.ready.remove(&kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("job")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_get_before_finalize_fails() {
        let (_dir, store) = store();
        let err = store.get(ArtifactKind::Transcript).unwrap_err();
        assert!(matches!(err, DubError::ArtifactNotReady(_)));
    }

    #[test]
    fn test_finalize_then_get() {
        let (_dir, mut store) = store();
        let tmp = store.stage_path(ArtifactKind::Transcript);
        std::fs::write(&tmp, "WEBVTT\n").unwrap();

        let path = store.finalize(ArtifactKind::Transcript, &tmp).unwrap();
        assert_eq!(path, store.reserve(ArtifactKind::Transcript));
        assert!(!tmp.exists());
        assert_eq!(store.get(ArtifactKind::Transcript).unwrap(), path);
    }

    #[test]
    fn test_finalize_rejects_empty_output() {
        let (_dir, mut store) = store();
        let tmp = store.stage_path(ArtifactKind::DubbedAudio);
        std::fs::write(&tmp, "").unwrap();

        let err = store.finalize(ArtifactKind::DubbedAudio, &tmp).unwrap_err();
        assert!(matches!(err, DubError::EmptyArtifact(_)));
        assert!(!tmp.exists());
        // the artifact must not become visible afterwards
        assert!(matches!(
            store.get(ArtifactKind::DubbedAudio),
            Err(DubError::ArtifactNotReady(_))
        ));
    }

    #[test]
    fn test_failed_stage_leaves_no_visible_artifact() {
        // A stage that errors out never calls finalize; its staged file must
        // not be reachable through get().
        let (_dir, mut store) = store();
        let tmp = store.stage_path(ArtifactKind::DubbedVideo);
        std::fs::write(&tmp, "half a container").unwrap();

        assert!(matches!(
            store.get(ArtifactKind::DubbedVideo),
            Err(DubError::ArtifactNotReady(_))
        ));
        store.cleanup(&[]);
        assert!(!tmp.exists());
    }

    #[test]
    fn test_cleanup_keeps_deliverables() {
        let (_dir, mut store) = store();
        for kind in [
            ArtifactKind::RawAudio,
            ArtifactKind::DubbedAudio,
            ArtifactKind::DubbedVideo,
        ] {
            let tmp = store.stage_path(kind);
            std::fs::write(&tmp, "data").unwrap();
            store.finalize(kind, &tmp).unwrap();
        }

        store.cleanup(&[ArtifactKind::DubbedAudio, ArtifactKind::DubbedVideo]);

        assert!(store.get(ArtifactKind::DubbedAudio).is_ok());
        assert!(store.get(ArtifactKind::DubbedVideo).is_ok());
        assert!(!store.reserve(ArtifactKind::RawAudio).exists());
        assert!(matches!(
            store.get(ArtifactKind::RawAudio),
            Err(DubError::ArtifactNotReady(_))
        ));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "dubbed_audio".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::DubbedAudio
        );
        let err = "thumbnail".parse::<ArtifactKind>().unwrap_err();
        assert!(matches!(err, DubError::InvalidArtifactKind(_)));
    }
}
