use logging::Logger;
use media::{
    AudioConfig, CaptureChunk, CaptureStatus, MediaError, TurnEvent, VirtualInput, VirtualOutput,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use voice::{LoopbackClient, MemorySink, SessionClient, VoiceError, VoiceSession};

fn config() -> AudioConfig {
    AudioConfig::new(24000, 1, 480).unwrap()
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn pcm(value: i16, samples: usize) -> Vec<u8> {
    std::iter::repeat_n(value.to_le_bytes(), samples)
        .flatten()
        .collect()
}

#[derive(Default)]
struct Record {
    chunks: Vec<CaptureChunk>,
    truncations: Vec<(String, Duration)>,
}

/// Records what the session hands to the client.
#[derive(Clone, Default)]
struct RecordingClient {
    record: Arc<Mutex<Record>>,
    fail_sends: bool,
}

impl RecordingClient {
    fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    fn truncations(&self) -> Vec<(String, Duration)> {
        self.record.lock().unwrap().truncations.clone()
    }

    fn chunks(&self) -> usize {
        self.record.lock().unwrap().chunks.len()
    }
}

impl SessionClient for RecordingClient {
    fn send_audio(&mut self, chunk: CaptureChunk) -> voice::Result<()> {
        if self.fail_sends {
            return Err(VoiceError::Transport("connection reset".into()));
        }
        self.record.lock().unwrap().chunks.push(chunk);
        Ok(())
    }

    fn truncate(&mut self, utterance_id: &str, played: Duration) {
        self.record
            .lock()
            .unwrap()
            .truncations
            .push((utterance_id.to_string(), played));
    }
}

#[test]
fn test_loopback_echoes_and_stores_utterances() {
    let config = config();
    let input = VirtualInput::new(1);
    let output = VirtualOutput::new(1);
    let sink = MemorySink::new();
    let logger = Logger::disabled();

    let mut session = VoiceSession::new(
        &config,
        input.clone(),
        output.clone(),
        LoopbackClient::new(2400, &logger),
        sink.clone(),
        &logger,
    )
    .unwrap();
    session.start().unwrap();
    assert_eq!(session.capture_status(), CaptureStatus::Recording);

    for _ in 0..10 {
        assert!(input.push_block(&[0.25; 480]));
    }

    assert!(wait_until(|| sink.len() == 2));
    let assets = sink.assets();
    assert_ne!(assets[0].utterance_id, assets[1].utterance_id);
    for asset in &assets {
        assert_eq!(asset.duration, Duration::from_millis(100));
        assert_eq!(asset.container.len(), 44 + 4800);
    }

    let block = output.pull_block(4800).unwrap();
    assert!(block.iter().all(|&s| s == 0.25));
    assert!(wait_until(|| session.frames_sent() == 10));

    session.shutdown();
    assert!(!input.is_open());
    assert!(!output.is_open());
}

#[test]
fn test_interrupt_truncates_on_client() {
    let config = config();
    let output = VirtualOutput::new(1);
    let client = RecordingClient::default();
    let logger = Logger::disabled();

    let session = VoiceSession::new(
        &config,
        VirtualInput::new(1),
        output.clone(),
        client.clone(),
        MemorySink::new(),
        &logger,
    )
    .unwrap();

    session
        .inbound()
        .send(TurnEvent::audio(pcm(1000, 4800), "reply_1"))
        .unwrap();
    assert!(wait_until(|| session.playback().len() == 4800));

    output.pull_block(2400).unwrap();
    session.interrupt();

    assert!(wait_until(|| !client.truncations().is_empty()));
    assert_eq!(
        client.truncations(),
        vec![("reply_1".to_string(), Duration::from_millis(100))]
    );
    assert!(output.pull_block(480).unwrap().iter().all(|&s| s == 0.0));
    session.shutdown();
}

#[test]
fn test_interrupt_during_back_to_back_utterances() {
    let config = config();
    let output = VirtualOutput::new(1);
    let client = RecordingClient::default();
    let sink = MemorySink::new();
    let logger = Logger::disabled();

    let session = VoiceSession::new(
        &config,
        VirtualInput::new(1),
        output.clone(),
        client.clone(),
        sink.clone(),
        &logger,
    )
    .unwrap();
    let inbound = session.inbound();

    inbound
        .send(TurnEvent::complete(pcm(1000, 4800), "reply_1"))
        .unwrap();
    assert!(wait_until(|| sink.len() == 1));
    output.pull_block(2400).unwrap();

    inbound
        .send(TurnEvent::audio(pcm(-1000, 4800), "reply_2"))
        .unwrap();
    assert!(wait_until(|| session.playback().len() == 9600));

    // Still on the first reply: 3600 of its samples out, none of the second.
    output.pull_block(1200).unwrap();
    session.interrupt();

    assert!(wait_until(|| !client.truncations().is_empty()));
    assert_eq!(
        client.truncations(),
        vec![("reply_1".to_string(), Duration::from_millis(150))]
    );
    assert!(output.pull_block(480).unwrap().iter().all(|&s| s == 0.0));

    // Second round: the next reply is reported from its own first sample.
    inbound
        .send(TurnEvent::complete(pcm(1000, 2400), "reply_3"))
        .unwrap();
    assert!(wait_until(|| sink.len() == 2));
    inbound
        .send(TurnEvent::audio(pcm(-1000, 4800), "reply_4"))
        .unwrap();
    assert!(wait_until(|| session.playback().len() == 7200));

    output.pull_block(2400 + 1200).unwrap();
    session.interrupt();

    assert!(wait_until(|| client.truncations().len() == 2));
    assert_eq!(
        client.truncations()[1],
        ("reply_4".to_string(), Duration::from_millis(50))
    );
    session.shutdown();
}

#[test]
fn test_send_failure_flushes_playback() {
    let config = config();
    let input = VirtualInput::new(1);
    let output = VirtualOutput::new(1);
    let logger = Logger::disabled();

    let mut session = VoiceSession::new(
        &config,
        input.clone(),
        output.clone(),
        RecordingClient::failing(),
        MemorySink::new(),
        &logger,
    )
    .unwrap();

    session
        .inbound()
        .send(TurnEvent::audio(pcm(1000, 1000), "reply"))
        .unwrap();
    assert!(wait_until(|| session.playback().len() == 1000));

    session.start().unwrap();
    input.push_block(&[0.1; 480]);

    assert!(wait_until(|| session.playback().is_empty()));
    assert!(output.pull_block(480).unwrap().iter().all(|&s| s == 0.0));
    assert_eq!(session.frames_sent(), 0);
    session.shutdown();
}

#[test]
fn test_shutdown_delivers_end_of_capture() {
    let config = config();
    let input = VirtualInput::new(1);
    let client = RecordingClient::default();
    let logger = Logger::disabled();

    let mut session = VoiceSession::new(
        &config,
        input.clone(),
        VirtualOutput::new(1),
        client.clone(),
        MemorySink::new(),
        &logger,
    )
    .unwrap();
    session.start().unwrap();
    input.push_block(&[0.1; 960]);
    input.push_block(&[0.1; 100]);
    session.shutdown();

    let record = client.record.lock().unwrap();
    assert_eq!(record.chunks.len(), 3);
    assert!(record.chunks[2].is_final);
    assert!(record.chunks[2].pcm.is_empty());
}

#[test]
fn test_check_capture_releases_lost_device() {
    let config = config();
    let input = VirtualInput::new(1);
    let client = RecordingClient::default();
    let logger = Logger::disabled();

    let mut session = VoiceSession::new(
        &config,
        input.clone(),
        VirtualOutput::new(1),
        client.clone(),
        MemorySink::new(),
        &logger,
    )
    .unwrap();
    session.start().unwrap();
    assert_eq!(session.check_capture(), CaptureStatus::Recording);

    input.fail("stream invalidated");
    assert_eq!(session.check_capture(), CaptureStatus::Error);
    assert!(!input.is_open());

    // The client hears that the capture run ended.
    assert!(wait_until(|| client.chunks() == 1));
    assert!(client.record.lock().unwrap().chunks[0].is_final);

    session.start().unwrap();
    assert_eq!(session.check_capture(), CaptureStatus::Recording);
    session.shutdown();
}

#[test]
fn test_unavailable_output_fails_construction() {
    let logger = Logger::disabled();
    let result = VoiceSession::new(
        &config(),
        VirtualInput::new(1),
        VirtualOutput::unavailable(),
        RecordingClient::default(),
        MemorySink::new(),
        &logger,
    );
    assert!(matches!(
        result,
        Err(VoiceError::Media(MediaError::DeviceUnavailable(_)))
    ));
}

#[test]
fn test_unavailable_input_fails_start() {
    let logger = Logger::disabled();
    let client = RecordingClient::default();
    let mut session = VoiceSession::new(
        &config(),
        VirtualInput::unavailable(),
        VirtualOutput::new(1),
        client.clone(),
        MemorySink::new(),
        &logger,
    )
    .unwrap();

    assert!(matches!(
        session.start(),
        Err(VoiceError::Media(MediaError::DeviceUnavailable(_)))
    ));
    assert_eq!(session.capture_status(), CaptureStatus::Idle);
    session.shutdown();
    assert_eq!(client.chunks(), 0);
}
