//! HTTP host for the filter

use std::convert::Infallible;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Frame};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use kiln_core::{Error, Result};
use kiln_filter::{AppFilter, FilterOutcome};
use kiln_static::ResponseSink;

/// Bytes buffered between the filter and the connection
const CHUNK_SIZE: usize = 16 * 1024;

/// Body type of every response produced by the host
pub type ResponseBody = BoxBody<Bytes, io::Error>;

type FilterTask = JoinHandle<(Result<FilterOutcome>, Option<String>)>;

/// Accept connections on `listener` and run every request through `filter`
pub async fn serve(listener: TcpListener, filter: Arc<AppFilter>) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("🔥 Kiln listening on http://{}", addr);

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let filter = filter.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(move |req| handle_request(req, filter.clone())))
                .await
            {
                tracing::error!("Error serving connection: {:?}", err);
            }
        });
    }
}

/// Run a single request through the filter and build the HTTP response.
///
/// The filter runs on its own task and writes into a bounded pipe. Status and
/// headers are committed the first time it touches the body; a filter that
/// never does is answered from its outcome (404 when unhandled, 500 on error).
pub async fn handle_request<B>(
    req: Request<B>,
    filter: Arc<AppFilter>,
) -> std::result::Result<Response<ResponseBody>, Infallible> {
    let Some(path) = decode_path(req.uri().path()) else {
        tracing::debug!("Rejected undecodable path {}", req.uri().path());
        return Ok(text(StatusCode::BAD_REQUEST, "Bad Request"));
    };
    let method = req.method().clone();

    let (writer, reader) = tokio::io::duplex(CHUNK_SIZE);
    let (head_tx, head_rx) = oneshot::channel();
    let mut sink = StreamingResponse {
        content_type: None,
        head: Some(head_tx),
        body: writer,
    };

    let task: FilterTask = tokio::spawn(async move {
        let outcome = filter.do_filter(&path, &mut sink).await;
        if let Err(e) = &outcome {
            tracing::error!("❌ {} {} failed: {}", method, path, e);
        }
        (outcome, sink.content_type)
    });

    if let Ok(content_type) = head_rx.await {
        return Ok(streamed(content_type, reader, Some(task)));
    }

    let response = match task.await {
        Ok((Ok(FilterOutcome::Static | FilterOutcome::Routed), content_type)) => {
            streamed(content_type, reader, None)
        }
        Ok((Ok(FilterOutcome::Unhandled), _)) => text(StatusCode::NOT_FOUND, "Not Found"),
        Ok((Err(_), _)) => text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        Err(e) => {
            let e = Error::Internal(format!("Filter task failed: {}", e));
            tracing::error!("❌ {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    };

    Ok(response)
}

/// Percent-decode a request path; `None` when the result is not UTF-8
fn decode_path(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|path| path.into_owned())
}

/// Response handed to the filter; the head is sent on first body access
struct StreamingResponse {
    content_type: Option<String>,
    head: Option<oneshot::Sender<Option<String>>>,
    body: DuplexStream,
}

impl ResponseSink for StreamingResponse {
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn body(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        if let Some(head) = self.head.take() {
            // A dropped receiver shows up as a write error on the pipe
            let _ = head.send(self.content_type.clone());
        }
        &mut self.body
    }
}

/// Reads the filter's output off the pipe.
///
/// Once the pipe is drained the filter task is checked, so a failure half way
/// through aborts the response instead of ending it cleanly.
struct PipeBody {
    reader: DuplexStream,
    buf: Box<[u8]>,
    task: Option<FilterTask>,
}

impl Body for PipeBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Bytes>, io::Error>>> {
        let this = &mut *self;
        let mut buf = ReadBuf::new(&mut this.buf);

        match Pin::new(&mut this.reader).poll_read(cx, &mut buf) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(e))),
            Poll::Ready(Ok(())) if !buf.filled().is_empty() => {
                return Poll::Ready(Some(Ok(Frame::data(Bytes::copy_from_slice(buf.filled())))));
            }
            Poll::Ready(Ok(())) => {}
        }

        let Some(task) = this.task.as_mut() else {
            return Poll::Ready(None);
        };
        let result = match Pin::new(task).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };
        this.task = None;

        match result {
            Ok((Ok(_), _)) => Poll::Ready(None),
            Ok((Err(e), _)) => Poll::Ready(Some(Err(io::Error::other(e.to_string())))),
            Err(e) => Poll::Ready(Some(Err(io::Error::other(e)))),
        }
    }
}

fn streamed(content_type: Option<String>, reader: DuplexStream, task: Option<FilterTask>) -> Response<ResponseBody> {
    let body = PipeBody {
        reader,
        buf: vec![0; CHUNK_SIZE].into_boxed_slice(),
        task,
    };
    with_content_type(Response::new(body.boxed()), content_type)
}

fn with_content_type(mut response: Response<ResponseBody>, content_type: Option<String>) -> Response<ResponseBody> {
    if let Some(content_type) = content_type {
        match HeaderValue::from_str(&content_type) {
            Ok(value) => {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            Err(_) => tracing::warn!("Dropping invalid content type {:?}", content_type),
        }
    }
    response
}

fn text(status: StatusCode, body: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(
        Full::new(Bytes::from_static(body.as_bytes()))
            .map_err(|never| match never {})
            .boxed(),
    );
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
