use super::proto::{
    RecognizeRequest, RecognizeResponse, StreamingRecognizeRequest, StreamingRecognizeResponse,
};
use crate::channel::{RecognizerChannel, ResponseStream};
use async_trait::async_trait;
use std::fmt;
use stt_core::{
    EncodedChunk, RecognitionConfig, RecognitionError, RecognitionResult, StreamingFrame,
    TransportError,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};
use tokio_stream::StreamExt;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Request, Status};

/// Metadata entry carrying the API key on every call.
pub const API_KEY_HEADER: &str = "x-api-key";

const RECOGNIZE_PATH: &str = "/google.cloud.speech.v1.Speech/Recognize";
const STREAMING_RECOGNIZE_PATH: &str = "/google.cloud.speech.v1.Speech/StreamingRecognize";

/// Opaque credentials. The value never appears in `Debug` output.
#[derive(Clone)]
pub struct ApiKey(AsciiMetadataValue);

impl ApiKey {
    pub fn new(key: &str) -> Result<Self, TransportError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(TransportError::InvalidCredentials(
                "api key is empty".to_string(),
            ));
        }
        let invalid =
            || TransportError::InvalidCredentials("api key must be printable ASCII".to_string());
        // Header values also admit obs-text bytes at or above 0x80.
        if !key.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(invalid());
        }
        key.parse::<AsciiMetadataValue>()
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub insecure: bool,
    pub api_key: ApiKey,
}

impl ConnectOptions {
    pub fn uri(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// A recognizer reached over gRPC.
#[derive(Clone)]
pub struct GrpcChannel {
    channel: Channel,
    api_key: ApiKey,
}

impl GrpcChannel {
    pub async fn connect(options: ConnectOptions) -> Result<Self, TransportError> {
        let uri = options.uri();
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| TransportError::InvalidEndpoint(format!("{uri}: {e}")))?;
        if !options.insecure {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().domain_name(options.host.clone()))
                .map_err(|e| TransportError::Connect(e.to_string()))?;
        }

        tracing::info!(%uri, insecure = options.insecure, "connecting to recognizer");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| TransportError::Connect(format!("{uri}: {e}")))?;

        Ok(Self {
            channel,
            api_key: options.api_key,
        })
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request
            .metadata_mut()
            .insert(API_KEY_HEADER, self.api_key.0.clone());
        request
    }
}

fn not_ready(e: impl fmt::Display) -> Status {
    Status::new(Code::Unknown, format!("service was not ready: {e}"))
}

fn transport_error(status: Status) -> TransportError {
    TransportError::Status {
        code: format!("{:?}", status.code()),
        message: status.message().to_string(),
    }
}

fn recognition_error(status: Status) -> RecognitionError {
    RecognitionError::Service {
        code: format!("{:?}", status.code()),
        message: status.message().to_string(),
    }
}

#[async_trait]
impl RecognizerChannel for GrpcChannel {
    fn name(&self) -> &str {
        "grpc"
    }

    async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: EncodedChunk,
    ) -> Result<Vec<RecognitionResult>, RecognitionError> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| recognition_error(not_ready(e)))?;

        let codec = ProstCodec::<RecognizeRequest, RecognizeResponse>::default();
        let request = self.request(RecognizeRequest::new(config, audio.into_bytes()));
        let response = grpc
            .unary(request, PathAndQuery::from_static(RECOGNIZE_PATH), codec)
            .await
            .map_err(recognition_error)?;

        Ok(response
            .into_inner()
            .results
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn streaming_recognize(
        &self,
        outbound: mpsc::Receiver<StreamingFrame>,
    ) -> Result<ResponseStream, TransportError> {
        let request = self.request(ReceiverStream::new(outbound).map(StreamingRecognizeRequest::from));
        let channel = self.channel.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        // Some servers hold response headers until audio arrives, so the call
        // runs on its own task and the writer is never blocked on it.
        tokio::spawn(async move {
            let mut grpc = tonic::client::Grpc::new(channel);
            if let Err(e) = grpc.ready().await {
                let _ = tx.send(Err(transport_error(not_ready(e))));
                return;
            }

            let codec =
                ProstCodec::<StreamingRecognizeRequest, StreamingRecognizeResponse>::default();
            let path = PathAndQuery::from_static(STREAMING_RECOGNIZE_PATH);
            let mut inbound = match grpc.streaming(request, path, codec).await {
                Ok(response) => response.into_inner(),
                Err(status) => {
                    let _ = tx.send(Err(transport_error(status)));
                    return;
                }
            };

            loop {
                match inbound.message().await {
                    Ok(Some(message)) => {
                        if tx.send(Ok(message.into())).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) => {
                        let _ = tx.send(Err(transport_error(status)));
                        break;
                    }
                }
            }
            tracing::debug!("streaming response stream finished");
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
