use gg_util::async_trait;
use gg_util::eyre::{bail, Result};

use crate::{Asset, AssetContent, AssetKind, BytesAssetLoader, Device, DeviceHandle, LoaderCtx};

const FORMAT_PCM: u16 = 1;
const FORMAT_FLOAT: u16 = 3;

/// Interleaved PCM samples.
#[derive(Clone, Debug, Default)]
pub struct Audio {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub samples: Vec<u8>,
    pub device_handle: Option<DeviceHandle>,
}

impl Audio {
    pub fn frame_count(&self) -> usize {
        let frame_size = usize::from(self.channels) * usize::from(self.bits_per_sample / 8);
        if frame_size == 0 {
            return 0;
        }
        self.samples.len() / frame_size
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f32 / self.sample_rate as f32
    }

    /// Parses a RIFF/WAVE file with PCM or float samples.
    pub fn parse_wav(bytes: &[u8]) -> Result<Audio> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            bail!("not a RIFF/WAVE file");
        }

        let mut format = None;
        let mut samples = None;
        let mut rest = &bytes[12..];

        while rest.len() >= 8 {
            let chunk_id = &rest[0..4];
            let size = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
            let body = &rest[8..];
            if body.len() < size {
                bail!("truncated {:?} chunk", String::from_utf8_lossy(chunk_id));
            }

            match chunk_id {
                b"fmt " => format = Some(parse_format(&body[..size])?),
                b"data" => samples = Some(body[..size].to_vec()),
                _ => {}
            }

            // Chunks are padded to an even length.
            let advance = (size + 1) & !1;
            rest = &body[advance.min(body.len())..];
        }

        let (channels, sample_rate, bits_per_sample) = match format {
            Some(v) => v,
            None => bail!("missing fmt chunk"),
        };

        let samples = match samples {
            Some(v) => v,
            None => bail!("missing data chunk"),
        };

        Ok(Audio {
            channels,
            sample_rate,
            bits_per_sample,
            samples,
            device_handle: None,
        })
    }
}

fn parse_format(body: &[u8]) -> Result<(u16, u32, u16)> {
    if body.len() < 16 {
        bail!("fmt chunk too short");
    }

    let u16_at = |i: usize| u16::from_le_bytes([body[i], body[i + 1]]);
    let format = u16_at(0);
    let channels = u16_at(2);
    let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
    let bits_per_sample = u16_at(14);

    if format != FORMAT_PCM && format != FORMAT_FLOAT {
        bail!("unsupported sample format {}", format);
    }

    if channels == 0 || sample_rate == 0 || bits_per_sample == 0 || bits_per_sample % 8 != 0 {
        bail!(
            "invalid format: {} channels, {} Hz, {} bits",
            channels,
            sample_rate,
            bits_per_sample
        );
    }

    Ok((channels, sample_rate, bits_per_sample))
}

impl Asset for Audio {
    const KIND: AssetKind = AssetKind::Audio;

    fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn needs_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, device: &dyn Device) -> Result<()> {
        self.device_handle = Some(device.upload_audio(self)?);
        Ok(())
    }

    fn from_content(content: &AssetContent) -> Option<&Self> {
        match content {
            AssetContent::Audio(v) => Some(v),
            _ => None,
        }
    }

    fn into_content(self) -> AssetContent {
        AssetContent::Audio(self)
    }
}

pub struct AudioLoader;

#[async_trait]
impl BytesAssetLoader<Audio> for AudioLoader {
    async fn load(&self, _: &mut LoaderCtx, bytes: Vec<u8>) -> Result<Audio> {
        Audio::parse_wav(&bytes)
    }
}
