//! Scripted in-memory backend for pipeline unit tests.

use crate::backend::{
    CodecBackend, MediaContainer, Packet, RawFrame, ReceiveStatus, SendStatus, StreamCandidate,
    StreamDecoder,
};
use crate::error::{DecodeError, Result};
use crate::types::{AudioCodec, AudioSource, TimeBase};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// One scripted packet and the frames decoding it produces.
#[derive(Clone)]
pub struct FakePacket {
    pub stream_index: usize,
    pub timestamp: u64,
    pub frames: Vec<RawFrame>,
}

/// Behaviour of a [`FakeBackend`].
#[derive(Clone)]
pub struct Script {
    pub open_error: Option<DecodeError>,
    pub stream_info_error: Option<DecodeError>,
    pub decoder_error: Option<DecodeError>,
    pub seek_error: Option<DecodeError>,
    pub has_audio: bool,
    pub stream_index: usize,
    pub time_base: Option<TimeBase>,
    pub sample_rate: Option<u32>,
    pub decoder_sample_rate: Option<u32>,
    pub channel_count: Option<usize>,
    pub duration: Option<f64>,
    pub packets: Vec<FakePacket>,
    /// Submission that fails
    pub send_error_at: Option<usize>,
    /// Submissions that report "try again"
    pub send_busy_at: Vec<usize>,
    /// Frame retrieval fails once more than this many packets were submitted
    pub receive_error_at: Option<usize>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            open_error: None,
            stream_info_error: None,
            decoder_error: None,
            seek_error: None,
            has_audio: true,
            stream_index: 0,
            time_base: Some(TimeBase::new(1, 1000)),
            sample_rate: Some(1000),
            decoder_sample_rate: None,
            channel_count: Some(1),
            duration: None,
            packets: Vec::new(),
            send_error_at: None,
            send_busy_at: Vec::new(),
            receive_error_at: None,
        }
    }
}

impl Script {
    /// Audio stream of `packets` packets, each one mono f32 frame of
    /// `frames_per_packet` samples with value `0.5`, at 1000 Hz and
    /// millisecond timestamps.
    pub fn mono_f32(packets: usize, frames_per_packet: usize) -> Self {
        let frame = RawFrame::from_interleaved(1, &vec![0.5f32; frames_per_packet]).unwrap();
        Self {
            duration: Some((packets * frames_per_packet) as f64 / 1000.0),
            packets: (0..packets)
                .map(|i| FakePacket {
                    stream_index: 0,
                    timestamp: (i * frames_per_packet) as u64,
                    frames: vec![frame.clone()],
                })
                .collect(),
            ..Default::default()
        }
    }
}

/// Counters shared between a backend and everything it creates.
#[derive(Clone, Default)]
pub struct Tracker {
    pub containers_opened: Rc<Cell<usize>>,
    pub containers_dropped: Rc<Cell<usize>>,
    pub decoders_opened: Rc<Cell<usize>>,
    pub decoders_dropped: Rc<Cell<usize>>,
    /// Decoders still alive when a container was dropped
    pub decoders_alive_at_container_drop: Rc<Cell<usize>>,
    pub seeks: Rc<RefCell<Vec<u64>>>,
    pub packets_read: Rc<Cell<usize>>,
}

impl Tracker {
    pub fn all_released(&self) -> bool {
        self.containers_opened.get() == self.containers_dropped.get()
            && self.decoders_opened.get() == self.decoders_dropped.get()
    }
}

pub struct FakeBackend {
    pub script: Rc<Script>,
    pub tracker: Tracker,
}

impl FakeBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script: Rc::new(script),
            tracker: Tracker::default(),
        }
    }
}

impl CodecBackend for FakeBackend {
    fn open(&self, _source: &AudioSource) -> Result<Box<dyn MediaContainer>> {
        if let Some(err) = &self.script.open_error {
            return Err(err.clone());
        }
        self.tracker
            .containers_opened
            .set(self.tracker.containers_opened.get() + 1);
        Ok(Box::new(FakeContainer {
            script: Rc::clone(&self.script),
            tracker: self.tracker.clone(),
            cursor: 0,
        }))
    }
}

struct FakeContainer {
    script: Rc<Script>,
    tracker: Tracker,
    cursor: usize,
}

impl MediaContainer for FakeContainer {
    fn find_stream_info(&mut self) -> Result<()> {
        match &self.script.stream_info_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn find_best_audio_stream(&self) -> Result<StreamCandidate> {
        if !self.script.has_audio {
            return Err(DecodeError::NoAudioStream("video only".to_string()));
        }
        Ok(StreamCandidate {
            stream_index: self.script.stream_index,
            codec: AudioCodec::Pcm,
            time_base: self.script.time_base,
            sample_rate: self.script.sample_rate,
            channel_count: self.script.channel_count,
            sample_format: None,
        })
    }

    fn open_decoder(&mut self, _stream_index: usize) -> Result<Box<dyn StreamDecoder>> {
        if let Some(err) = &self.script.decoder_error {
            return Err(err.clone());
        }
        self.tracker
            .decoders_opened
            .set(self.tracker.decoders_opened.get() + 1);
        Ok(Box::new(FakeDecoder {
            script: Rc::clone(&self.script),
            tracker: self.tracker.clone(),
            queue: VecDeque::new(),
            sent: 0,
        }))
    }

    fn duration_seconds(&self) -> Option<f64> {
        self.script.duration
    }

    fn seek(&mut self, _stream_index: usize, timestamp: u64) -> Result<()> {
        if let Some(err) = &self.script.seek_error {
            return Err(err.clone());
        }
        self.tracker.seeks.borrow_mut().push(timestamp);
        self.cursor = self
            .script
            .packets
            .iter()
            .position(|p| p.timestamp >= timestamp)
            .unwrap_or(self.script.packets.len());
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let Some(packet) = self.script.packets.get(self.cursor) else {
            return Ok(None);
        };
        let number = self.cursor as u32;
        self.cursor += 1;
        self.tracker
            .packets_read
            .set(self.tracker.packets_read.get() + 1);
        Ok(Some(Packet::new(
            packet.stream_index,
            packet.timestamp,
            1,
            number.to_le_bytes().to_vec(),
        )))
    }
}

impl Drop for FakeContainer {
    fn drop(&mut self) {
        let alive = self.tracker.decoders_opened.get() - self.tracker.decoders_dropped.get();
        self.tracker.decoders_alive_at_container_drop.set(alive);
        self.tracker
            .containers_dropped
            .set(self.tracker.containers_dropped.get() + 1);
    }
}

struct FakeDecoder {
    script: Rc<Script>,
    tracker: Tracker,
    queue: VecDeque<RawFrame>,
    sent: usize,
}

impl StreamDecoder for FakeDecoder {
    fn codec_name(&self) -> &str {
        "fake_pcm"
    }

    fn sample_rate(&self) -> Option<u32> {
        self.script.decoder_sample_rate
    }

    fn channel_count(&self) -> Option<usize> {
        None
    }

    fn send_packet(&mut self, packet: Packet) -> Result<SendStatus> {
        let sent = self.sent;
        self.sent += 1;

        if self.script.send_error_at == Some(sent) {
            return Err(DecodeError::PacketDecode(format!("corrupt packet {}", sent)));
        }
        if self.script.send_busy_at.contains(&sent) {
            return Ok(SendStatus::TryAgain);
        }

        let mut number = [0u8; 4];
        number.copy_from_slice(&packet.data[..4]);
        let index = u32::from_le_bytes(number) as usize;
        self.queue
            .extend(self.script.packets[index].frames.iter().cloned());
        Ok(SendStatus::Accepted)
    }

    fn receive_frame(&mut self) -> Result<ReceiveStatus> {
        if let Some(at) = self.script.receive_error_at {
            if self.sent > at {
                return Err(DecodeError::FrameDecode("broken frame".to_string()));
            }
        }
        Ok(match self.queue.pop_front() {
            Some(frame) => ReceiveStatus::Frame(frame),
            None => ReceiveStatus::TryAgain,
        })
    }
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        self.tracker
            .decoders_dropped
            .set(self.tracker.decoders_dropped.get() + 1);
    }
}
