use std::io::Write;
use std::time::Duration;

use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, MethodDescriptor};
use prost_types::FileDescriptorSet;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{AsciiMetadataKey, MetadataMap, MetadataValue};
use tonic::transport::Endpoint;
use tonic::Request;
use tracing::debug;

use crate::codec::DynamicCodec;
use crate::error::GrpcError;

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// `host:port`.
    pub address: String,
    /// `package.Service/Method`.
    pub method: String,
    /// Metadata pairs sent with the call.
    pub headers: Vec<(String, String)>,
    /// Bound on total call wall time.
    pub call_timeout: Duration,
    /// Bound on dialing.
    pub connect_timeout: Duration,
    /// HTTP/2 keepalive ping interval.
    pub keepalive: Option<Duration>,
}

/// Where request messages come from.
#[derive(Debug)]
pub enum CallInput {
    /// A single JSON message.
    Data(String),
    /// Line-delimited JSON messages on stdin.
    Stdin,
}

/// Invoke `config.method` against `config.address` using the schema
/// in `descriptors`, writing each response message as pretty JSON to
/// `out`. All four streaming shapes are supported.
pub async fn invoke<W: Write>(
    descriptors: FileDescriptorSet,
    config: &CallConfig,
    input: CallInput,
    out: &mut W,
) -> Result<(), GrpcError> {
    let pool = DescriptorPool::from_file_descriptor_set(descriptors)
        .map_err(|e| GrpcError::Descriptor(e.to_string()))?;
    let method = resolve_method(&pool, &config.method)?;
    let path = PathAndQuery::try_from(format!(
        "/{}/{}",
        method.parent_service().full_name(),
        method.name()
    ))
    .map_err(|_| GrpcError::InvalidMethod(config.method.clone()))?;
    let metadata = build_metadata(&config.headers)?;

    let mut endpoint = Endpoint::from_shared(format!("http://{}", config.address))
        .map_err(|_| GrpcError::InvalidAddress(config.address.clone()))?
        .connect_timeout(config.connect_timeout)
        .timeout(config.call_timeout);
    if let Some(keepalive) = config.keepalive {
        endpoint = endpoint.http2_keep_alive_interval(keepalive);
    }
    let channel = endpoint
        .connect()
        .await
        .map_err(|e| GrpcError::Connect(e.to_string()))?;
    let mut grpc = Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|e| GrpcError::Connect(e.to_string()))?;

    let codec = DynamicCodec::new(method.output());
    debug!(method = %config.method, "dispatching rpc");
    match (method.is_client_streaming(), method.is_server_streaming()) {
        (false, false) => {
            let message = read_single(&method.input(), input).await?;
            let response = grpc
                .unary(with_metadata(message, &metadata), path, codec)
                .await?;
            write_message(out, response.into_inner())?;
        }
        (true, false) => {
            let RequestReader { stream, handle } = spawn_reader(method.input(), input);
            let response = grpc
                .client_streaming(with_metadata(stream, &metadata), path, codec)
                .await?;
            join_reader(handle).await?;
            write_message(out, response.into_inner())?;
        }
        (false, true) => {
            let message = read_single(&method.input(), input).await?;
            let response = grpc
                .server_streaming(with_metadata(message, &metadata), path, codec)
                .await?;
            let mut streaming = response.into_inner();
            while let Some(message) = streaming.message().await? {
                write_message(out, message)?;
            }
        }
        (true, true) => {
            let RequestReader { stream, handle } = spawn_reader(method.input(), input);
            let response = grpc
                .streaming(with_metadata(stream, &metadata), path, codec)
                .await?;
            let mut streaming = response.into_inner();
            let receive = async {
                while let Some(message) = streaming.message().await? {
                    write_message(out, message)?;
                }
                Ok::<(), GrpcError>(())
            };
            // Either side failing tears the whole call down.
            match receive.await {
                Ok(()) => join_reader(handle).await?,
                Err(e) => {
                    handle.abort();
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

fn resolve_method(pool: &DescriptorPool, method: &str) -> Result<MethodDescriptor, GrpcError> {
    let (service_name, method_name) = method
        .split_once('/')
        .ok_or_else(|| GrpcError::InvalidMethod(method.to_string()))?;
    let service = pool
        .get_service_by_name(service_name)
        .ok_or_else(|| GrpcError::MethodNotFound(method.to_string()))?;
    let found = service
        .methods()
        .find(|m| m.name() == method_name)
        .ok_or_else(|| GrpcError::MethodNotFound(method.to_string()));
    found
}

fn build_metadata(headers: &[(String, String)]) -> Result<MetadataMap, GrpcError> {
    let mut metadata = MetadataMap::new();
    for (key, value) in headers {
        let key = AsciiMetadataKey::from_bytes(key.to_ascii_lowercase().as_bytes())
            .map_err(|_| GrpcError::InvalidHeader(format!("{key}:{value}")))?;
        let value = MetadataValue::try_from(value.as_str())
            .map_err(|_| GrpcError::InvalidHeader(format!("{key}:{value}")))?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn with_metadata<T>(message: T, metadata: &MetadataMap) -> Request<T> {
    let mut request = Request::new(message);
    *request.metadata_mut() = metadata.clone();
    request
}

fn parse_json_message(
    descriptor: &MessageDescriptor,
    json: &str,
) -> Result<DynamicMessage, GrpcError> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let message = DynamicMessage::deserialize(descriptor.clone(), &mut deserializer)
        .map_err(|e| GrpcError::Json(e.to_string()))?;
    deserializer
        .end()
        .map_err(|e| GrpcError::Json(e.to_string()))?;
    Ok(message)
}

fn write_message<W: Write>(out: &mut W, message: DynamicMessage) -> Result<(), GrpcError> {
    let json =
        serde_json::to_string_pretty(&message).map_err(|e| GrpcError::Json(e.to_string()))?;
    writeln!(out, "{json}")?;
    Ok(())
}

async fn read_single(
    descriptor: &MessageDescriptor,
    input: CallInput,
) -> Result<DynamicMessage, GrpcError> {
    match input {
        CallInput::Data(json) => parse_json_message(descriptor, &json),
        CallInput::Stdin => {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            loop {
                let Some(line) = lines.next_line().await? else {
                    return Err(GrpcError::Json("no request message on stdin".to_string()));
                };
                if !line.trim().is_empty() {
                    return parse_json_message(descriptor, &line);
                }
            }
        }
    }
}

struct RequestReader {
    stream: ReceiverStream<DynamicMessage>,
    handle: tokio::task::JoinHandle<Result<(), GrpcError>>,
}

/// Surface JSON or IO errors from the reader task once sending
/// is done. An aborted reader (torn-down call) is not an error.
async fn join_reader(handle: tokio::task::JoinHandle<Result<(), GrpcError>>) -> Result<(), GrpcError> {
    match handle.await {
        Ok(result) => result,
        Err(join_err) if join_err.is_cancelled() => Ok(()),
        Err(join_err) => Err(GrpcError::Connect(join_err.to_string())),
    }
}

/// Feed request messages into a bounded channel from a background
/// task, so sending and receiving can run concurrently.
fn spawn_reader(descriptor: MessageDescriptor, input: CallInput) -> RequestReader {
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(async move {
        match input {
            CallInput::Data(json) => {
                let message = parse_json_message(&descriptor, &json)?;
                let _ = tx.send(message).await;
            }
            CallInput::Stdin => {
                let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
                while let Some(line) = lines.next_line().await? {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let message = parse_json_message(&descriptor, &line)?;
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    });
    RequestReader {
        stream: ReceiverStream::new(rx),
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{
        field_descriptor_proto, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
        MethodDescriptorProto, ServiceDescriptorProto,
    };

    fn echo_descriptors() -> FileDescriptorSet {
        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("foo.proto".to_string()),
                package: Some("foo".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![DescriptorProto {
                    name: Some("EchoRequest".to_string()),
                    field: vec![FieldDescriptorProto {
                        name: Some("v".to_string()),
                        number: Some(1),
                        label: Some(field_descriptor_proto::Label::Optional as i32),
                        r#type: Some(field_descriptor_proto::Type::String as i32),
                        json_name: Some("v".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                service: vec![ServiceDescriptorProto {
                    name: Some("S".to_string()),
                    method: vec![MethodDescriptorProto {
                        name: Some("Unary".to_string()),
                        input_type: Some(".foo.EchoRequest".to_string()),
                        output_type: Some(".foo.EchoRequest".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn resolves_methods_by_full_name() {
        let pool = DescriptorPool::from_file_descriptor_set(echo_descriptors()).unwrap();
        let method = resolve_method(&pool, "foo.S/Unary").unwrap();
        assert_eq!(method.name(), "Unary");
        assert!(!method.is_client_streaming());

        assert!(matches!(
            resolve_method(&pool, "foo.S/Missing"),
            Err(GrpcError::MethodNotFound(_))
        ));
        assert!(matches!(
            resolve_method(&pool, "no-slash"),
            Err(GrpcError::InvalidMethod(_))
        ));
    }

    #[test]
    fn json_binds_to_dynamic_messages_and_back() {
        let pool = DescriptorPool::from_file_descriptor_set(echo_descriptors()).unwrap();
        let descriptor = pool.get_message_by_name("foo.EchoRequest").unwrap();
        let message = parse_json_message(&descriptor, r#"{"v": "hi"}"#).unwrap();

        let mut out = Vec::new();
        write_message(&mut out, message).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"v\": \"hi\"\n}\n");
    }

    #[test]
    fn malformed_json_is_rejected() {
        let pool = DescriptorPool::from_file_descriptor_set(echo_descriptors()).unwrap();
        let descriptor = pool.get_message_by_name("foo.EchoRequest").unwrap();
        assert!(matches!(
            parse_json_message(&descriptor, "{nope"),
            Err(GrpcError::Json(_))
        ));
    }

    #[test]
    fn metadata_keys_are_lowercased() {
        let metadata =
            build_metadata(&[("X-Token".to_string(), "abc".to_string())]).unwrap();
        assert_eq!(metadata.get("x-token").unwrap(), "abc");
    }
}
