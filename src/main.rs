use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use stt_audio::AudioSource;
use stt_core::{AppConfig, TransportError};
use stt_engine::grpc::{ApiKey, ConnectOptions, GrpcChannel};
use stt_engine::{transcribe_batch, transcribe_streaming, NullChannel, PipelineOptions, RecognizerChannel};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Stream frames as they are decoded
    Streaming,
    /// Decode everything, then send one request
    Batch,
}

#[derive(Parser)]
#[command(name = "aiq-stt", about = "Transcribe an audio file with a remote speech recognizer")]
struct Cli {
    /// Audio file to transcribe
    #[arg(default_value = "resources/hello.wav")]
    path: PathBuf,

    /// Optional configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    api_key: Option<String>,

    /// Use a plaintext channel instead of TLS
    #[arg(long)]
    insecure: bool,

    /// Phrases that hint the recognizer
    #[arg(long, num_args = 1..)]
    speech_context_phrases: Vec<String>,

    /// Prefix each line with the first word's start and end offsets
    #[arg(long)]
    enable_word_time_offsets: bool,

    #[arg(long)]
    language_code: Option<String>,

    #[arg(long, value_enum, default_value_t = Mode::Streaming)]
    mode: Mode,

    /// Use an in-process recognizer instead of the network
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(key) = &self.api_key {
            config.server.api_key = Some(key.clone());
        }
        if self.insecure {
            config.server.insecure = true;
        }
        if !self.speech_context_phrases.is_empty() {
            config.recognition.context_phrases = self.speech_context_phrases.clone();
        }
        if self.enable_word_time_offsets {
            config.recognition.word_time_offsets = true;
        }
        if let Some(language_code) = &self.language_code {
            config.recognition.language_code = language_code.clone();
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

async fn transcribe<C, F, Fut, W>(
    mode: Mode,
    path: &Path,
    options: &PipelineOptions,
    connect: F,
    out: &mut W,
) -> Result<()>
where
    C: RecognizerChannel,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, TransportError>>,
    W: Write,
{
    let source = AudioSource::Path(path.to_path_buf());
    let transcript = match mode {
        Mode::Streaming => transcribe_streaming(source, options, connect, out).await,
        Mode::Batch => transcribe_batch(source, options, connect, out).await,
    }
    .with_context(|| format!("failed to transcribe {}", path.display()))?;

    tracing::info!(lines = transcript.lines().len(), "transcription finished");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path:?}"))?,
        None => AppConfig::default(),
    };
    cli.apply_overrides(&mut config);

    init_tracing(&config.general.log_level)?;
    tracing::info!(path = %cli.path.display(), mode = ?cli.mode, "aiq-stt starting");

    let options = PipelineOptions::from_config(&config);
    let mut stdout = std::io::stdout().lock();

    if cli.dry_run {
        tracing::info!("dry run, audio stays in process");
        return transcribe(
            cli.mode,
            &cli.path,
            &options,
            || async { Ok::<_, TransportError>(NullChannel::new()) },
            &mut stdout,
        )
        .await;
    }

    let api_key = config
        .server
        .api_key
        .as_deref()
        .context("an API key is required (--api-key or [server] api_key)")?;
    let connect_options = ConnectOptions {
        host: config.server.host.clone(),
        port: config.server.port,
        insecure: config.server.insecure,
        api_key: ApiKey::new(api_key).context("invalid API key")?,
    };

    transcribe(
        cli.mode,
        &cli.path,
        &options,
        || GrpcChannel::connect(connect_options),
        &mut stdout,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["aiq-stt"]);
        assert_eq!(cli.path, PathBuf::from("resources/hello.wav"));
        assert_eq!(cli.mode, Mode::Streaming);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "aiq-stt",
            "speech.flac",
            "--host",
            "localhost",
            "--port",
            "50051",
            "--api-key",
            "k",
            "--insecure",
            "--speech-context-phrases",
            "AIQ",
            "Skelter",
            "--enable-word-time-offsets",
            "--mode",
            "batch",
        ]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(cli.mode, Mode::Batch);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 50051);
        assert_eq!(config.server.api_key.as_deref(), Some("k"));
        assert!(config.server.insecure);
        assert_eq!(config.recognition.context_phrases, vec!["AIQ", "Skelter"]);
        assert!(config.recognition.word_time_offsets);
        assert_eq!(config.recognition.language_code, "ko-KR");
    }

    #[test]
    fn test_cli_keeps_config_values_without_flags() {
        let mut config = AppConfig::from_toml_str(
            r#"
[server]
host = "stt.internal"
port = 8443

[recognition]
context_phrases = ["hello"]
"#,
        )
        .unwrap();
        Cli::parse_from(["aiq-stt"]).apply_overrides(&mut config);
        assert_eq!(config.server.host, "stt.internal");
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.recognition.context_phrases, vec!["hello"]);
    }
}
