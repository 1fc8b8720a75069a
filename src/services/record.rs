//! Reference audio acquisition for voice cloning: either validate a
//! user-supplied file or capture a sample from the default input device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::errors::{DubError, DubResult};

pub const SAMPLE_RATE: u32 = 16_000;

/// Anything shorter cannot meaningfully condition the cloning model.
pub const MIN_REFERENCE_SECS: f64 = 1.0;

/// Validate a supplied reference file. No re-encoding happens here;
/// format checks are the synthesis backend's concern at use time.
pub fn from_file(path: &Path) -> DubResult<PathBuf> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(path.to_path_buf()),
        _ => Err(DubError::ReferenceAudioNotFound(
            path.display().to_string(),
        )),
    }
}

/// Record `duration_secs` of audio from the default input device into the
/// `reference_audio` artifact. Blocks until the capture completes.
pub fn record(store: &mut ArtifactStore, duration_secs: u32) -> DubResult<PathBuf> {
    if (duration_secs as f64) < MIN_REFERENCE_SECS {
        return Err(DubError::RecordingTooShort(format!(
            "requested {duration_secs}s, need at least {MIN_REFERENCE_SECS}s"
        )));
    }

    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        DubError::RecordingDeviceUnavailable("no default input device".to_string())
    })?;
    if let Ok(name) = device.name() {
        info!("Recording from input device: {}", name);
    }

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let samples = Arc::new(Mutex::new(Vec::<f32>::new()));
    let samples_cb = Arc::clone(&samples);
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = samples_cb.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| warn!("audio input error: {}", err),
            None,
        )
        .map_err(|e| {
            DubError::RecordingDeviceUnavailable(format!("failed to open input stream: {e}"))
        })?;

    info!("Recording {}s reference sample, speak now...", duration_secs);
    stream.play().map_err(|e| {
        DubError::RecordingDeviceUnavailable(format!("failed to start capture: {e}"))
    })?;
    std::thread::sleep(Duration::from_secs(u64::from(duration_secs)));
    drop(stream);

    let samples = match samples.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => Vec::new(),
    };
    let captured_secs = samples.len() as f64 / f64::from(SAMPLE_RATE);
    if captured_secs < MIN_REFERENCE_SECS {
        return Err(DubError::RecordingTooShort(format!(
            "captured only {captured_secs:.2}s of audio"
        )));
    }

    let tmp = store.stage_path(ArtifactKind::ReferenceAudio);
    write_wav(&tmp, &samples).map_err(DubError::from)?;
    let path = store.finalize(ArtifactKind::ReferenceAudio, &tmp)?;
    info!(
        "Reference sample saved to {} ({:.1}s)",
        path.display(),
        captured_secs
    );
    Ok(path)
}

fn write_wav(path: &Path, samples: &[f32]) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        let value = (sample * f32::from(i16::MAX)).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}
