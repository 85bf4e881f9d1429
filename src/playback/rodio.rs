//! Audio-device backend built on rodio. Compiled only with the `audio`
//! feature so the default build carries no system audio dependency.

use super::backend::{FALLBACK_DURATION, MediaBackend, MediaError, MediaHandle};
use async_trait::async_trait;
use rodio::source::Source;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::time::Duration;

pub struct RodioBackend {
    client: reqwest::Client,
    output: OutputStreamHandle,
    timeout: Duration,
}

impl RodioBackend {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Result<Self, MediaError> {
        let (stream, output) = OutputStream::try_default()
            .map_err(|e| MediaError::Device(e.to_string()))?;
        // OutputStream is !Send and closing it kills the device; leak it
        // for the lifetime of the process and keep only the handle.
        std::mem::forget(stream);
        Ok(Self {
            client,
            output,
            timeout,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| MediaError::Timeout)?
            .map_err(MediaError::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus(status.as_u16()));
        }
        let bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| MediaError::Timeout)?
            .map_err(MediaError::Network)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl MediaBackend for RodioBackend {
    async fn load(&self, url: &str) -> Result<Box<dyn MediaHandle>, MediaError> {
        let bytes = self.fetch(url).await?;
        tracing::debug!(url, len = bytes.len(), "Fetched audio body");

        let decoder = Decoder::new(Cursor::new(bytes.clone()))
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        let duration = decoder.total_duration().unwrap_or(FALLBACK_DURATION);

        let sink = Sink::try_new(&self.output).map_err(|e| MediaError::Device(e.to_string()))?;
        sink.pause();
        sink.append(decoder);

        Ok(Box::new(RodioMedia {
            sink,
            bytes,
            duration,
        }))
    }
}

struct RodioMedia {
    sink: Sink,
    /// Kept so seek can rebuild the decoder from the start.
    bytes: Vec<u8>,
    duration: Duration,
}

impl MediaHandle for RodioMedia {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        // Leave the sink paused with a fresh source queued: a later
        // replay must start from the top, not find an empty sink whose
        // `finished()` fires on the next poll.
        self.sink.clear();
        if let Ok(decoder) = Decoder::new(Cursor::new(self.bytes.clone())) {
            self.sink.append(decoder);
        }
    }

    fn seek(&mut self, position: Duration) {
        if self.sink.try_seek(position).is_err() {
            // Format without seek support: rebuild the decoder and skip.
            if let Ok(decoder) = Decoder::new(Cursor::new(self.bytes.clone())) {
                let was_paused = self.sink.is_paused();
                self.sink.stop();
                self.sink.append(decoder.skip_duration(position));
                if !was_paused {
                    self.sink.play();
                }
            }
        }
    }

    fn position(&self) -> Option<Duration> {
        Some(self.sink.get_pos())
    }

    fn finished(&self) -> bool {
        self.sink.empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One second of 8 kHz mono 16-bit PCM silence.
    fn wav_fixture() -> Vec<u8> {
        let data_len: u32 = 8_000 * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8_000u32.to_le_bytes());
        bytes.extend_from_slice(&16_000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        bytes
    }

    fn idle_media() -> RodioMedia {
        let bytes = wav_fixture();
        let decoder = Decoder::new(Cursor::new(bytes.clone())).expect("wav decodes");
        let duration = decoder.total_duration().unwrap_or(FALLBACK_DURATION);
        // Detached sink: no output device needed.
        let (sink, _queue) = Sink::new_idle();
        sink.pause();
        sink.append(decoder);
        RodioMedia {
            sink,
            bytes,
            duration,
        }
    }

    #[test]
    fn test_stop_requeues_the_track_for_replay() {
        let mut media = idle_media();
        media.play();

        media.stop();
        assert!(!media.finished());

        media.play();
        assert!(!media.sink.is_paused());
        assert!(!media.finished());
    }
}
