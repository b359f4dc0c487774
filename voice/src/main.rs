use logging::{LogLevel, Logger};
use media::{AudioConfig, AudioDetection, CaptureStatus, CpalInput, CpalOutput};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use voice::{LoopbackClient, VoiceConfig, VoiceSession, WavFileSink};

/// Environment variable holding the whole configuration as inline JSON
const CONFIG_ENV: &str = "VOICE_CONFIG";

/// Length of each echoed utterance in seconds
const LOOPBACK_UTTERANCE_SECS: usize = 3;

/// How often the loopback loop checks the input device
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(250);

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let list_only = args.iter().any(|a| a == "--list-devices");
    let config_path = args.iter().find(|a| !a.starts_with("--")).cloned();

    // Load configuration
    let config = load_config(config_path.as_deref());

    // Initialize logger
    let logger = initialize_logger(&config);

    if list_only {
        list_devices(&logger);
        return;
    }

    let audio = match config.audio.to_audio_config() {
        Ok(audio) => audio,
        Err(e) => {
            logger.error(&format!("Invalid audio configuration: {}", e));
            eprintln!("Invalid audio configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_loopback(&config, &audio, &logger) {
        logger.error(&format!("Session failed: {}", e));
        eprintln!("Session failed: {}", e);
        std::process::exit(1);
    }
}

/// Initializes the main logger from configuration
fn initialize_logger(config: &VoiceConfig) -> Logger {
    match config.logging.build_logger("Main") {
        Ok(logger) => {
            println!(
                "Logging initialized: {} (level: {})",
                config.logging.log_file_path, config.logging.log_level
            );
            logger
        }
        Err(e) => {
            eprintln!("Failed to create logger: {}", e);
            eprintln!("Falling back to console logging");
            Logger::console(LogLevel::Info).for_component("Main")
        }
    }
}

/// Loads configuration in this order:
/// 1. `VOICE_CONFIG` environment variable holding inline JSON
/// 2. Path given as the first command-line argument
/// 3. `voice_config.json` found by `config_loader`
/// 4. Built-in defaults
fn load_config(path: Option<&str>) -> VoiceConfig {
    if let Ok(json_str) = std::env::var(CONFIG_ENV) {
        match VoiceConfig::from_json(&json_str) {
            Ok(cfg) => {
                println!("Configuration loaded from {} env as JSON string", CONFIG_ENV);
                return cfg;
            }
            Err(e) => eprintln!("{} env is not valid JSON: {}", CONFIG_ENV, e),
        }
    }

    if let Some(path) = path {
        match VoiceConfig::load_from_file(path) {
            Ok(cfg) => {
                println!("Configuration loaded from: {}", path);
                return cfg;
            }
            Err(e) => eprintln!("Failed to load configuration from {}: {}", path, e),
        }
    }

    match VoiceConfig::find() {
        Ok(cfg) => {
            println!("Configuration loaded from {}", voice::config::voice_config::CONFIG_FILE_NAME);
            cfg
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Using default values...");
            VoiceConfig::default()
        }
    }
}

fn list_devices(logger: &Logger) {
    match AudioDetection::list_devices(logger) {
        Ok(devices) if devices.is_empty() => println!("No audio devices found"),
        Ok(devices) => {
            for device in devices {
                println!("{}", device);
            }
        }
        Err(e) => {
            eprintln!("Failed to list devices: {}", e);
            std::process::exit(1);
        }
    }
}

/// Echoes the microphone back through the speaker until Enter is pressed.
fn run_loopback(config: &VoiceConfig, audio: &AudioConfig, logger: &Logger) -> voice::Result<()> {
    let sink = WavFileSink::from_config(&config.assets, logger)?;
    let utterance_samples =
        audio.sample_rate as usize * audio.channel_count as usize * LOOPBACK_UTTERANCE_SECS;
    let client = LoopbackClient::new(utterance_samples, logger);

    let mut session = VoiceSession::new(
        audio,
        CpalInput::new(logger),
        CpalOutput::new(logger),
        client,
        sink,
        logger,
    )?;
    session.start()?;

    println!("Loopback running. Speak into the microphone; press Enter to stop.");
    let (enter_tx, enter_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        let _ = enter_tx.send(());
    });

    let mut device_lost = false;
    while let Err(RecvTimeoutError::Timeout) = enter_rx.recv_timeout(HEALTH_CHECK_INTERVAL) {
        let lost = session.check_capture() == CaptureStatus::Error;
        if lost && !device_lost {
            eprintln!("Microphone lost; press Enter to stop.");
        }
        device_lost = lost;
    }

    println!(
        "Captured {:.1}s in {} frames",
        session.capture_elapsed().as_secs_f64(),
        session.frames_sent()
    );
    session.shutdown();
    logger.info("Loopback finished");
    Ok(())
}
