//! Main WebRTSP client implementation

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use webrtsp_core::{
    is_request, parse_ice_candidate, parse_options, parse_parameters, parse_request,
    parse_response, serialize_request, serialize_response,
    uri::{decode_uri, encode_uri},
    CSeq, ContentType, IceCandidate, Method, Options, Request, Response, Uri2Description,
};
use webrtsp_transport::{ConnectionState, Transport};

use crate::builder::WebRtspClientBuilder;
use crate::completion::{completion, Completion};
use crate::error::{ClientError, Result};

/// Remote ICE candidate callback
pub type IceCandidateHandler = Arc<dyn Fn(IceCandidate) + Send + Sync>;

/// Remote teardown callback
pub type TeardownHandler = Arc<dyn Fn() + Send + Sync>;

/// Connected/disconnected callback
pub type ClientEventHandler = Arc<dyn Fn(&WebRtspClient) + Send + Sync>;

/// Result of a successful DESCRIBE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    /// Server's SDP offer
    pub offer: String,
    /// Server-assigned media session id
    pub media_session: String,
}

struct PendingRequest {
    request: Request,
    completion: Completion<Response>,
    /// Installed for the response's session before the caller resumes
    media_session_handlers: Option<MediaSessionHandlers>,
}

#[derive(Clone)]
struct MediaSessionHandlers {
    ice_candidate: IceCandidateHandler,
    teardown: TeardownHandler,
}

/// Protocol state, guarded by a single mutex
struct ProtocolState {
    next_cseq: CSeq,
    pending: IndexMap<CSeq, PendingRequest>,
    media_sessions: HashMap<String, MediaSessionHandlers>,
}

impl ProtocolState {
    fn new() -> Self {
        Self {
            next_cseq: 1,
            pending: IndexMap::new(),
            media_sessions: HashMap::new(),
        }
    }

    /// Next CSeq not held by an outstanding request
    fn allocate_cseq(&mut self) -> Result<CSeq> {
        if self.pending.len() >= CSeq::MAX as usize {
            return Err(ClientError::CSeqExhausted);
        }

        let mut cseq = self.next_cseq;
        while cseq == 0 || self.pending.contains_key(&cseq) {
            cseq = cseq.wrapping_add(1);
        }
        self.next_cseq = cseq.wrapping_add(1);

        Ok(cseq)
    }
}

#[derive(Default)]
struct ClientHandlers {
    connected: Option<ClientEventHandler>,
    disconnected: Option<ClientEventHandler>,
}

struct ClientInner {
    transport: Transport,
    trace_messages: bool,
    state: Mutex<ProtocolState>,
    handlers: RwLock<ClientHandlers>,
}

/// A WebRTSP client.
///
/// Cheap to clone; clones share the connection, the pending-request table
/// and the media sessions.
#[derive(Clone)]
pub struct WebRtspClient {
    inner: Arc<ClientInner>,
}

impl WebRtspClient {
    /// Create a client on top of an existing transport.
    ///
    /// Takes over the transport's callbacks.
    pub fn with_transport(transport: Transport, trace_messages: bool) -> Self {
        let inner = Arc::new(ClientInner {
            transport,
            trace_messages,
            state: Mutex::new(ProtocolState::new()),
            handlers: RwLock::new(ClientHandlers::default()),
        });

        let weak = Arc::downgrade(&inner);
        inner.transport.on_message(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.on_message(&message);
            }
        });

        let weak = Arc::downgrade(&inner);
        inner.transport.on_connected(move || {
            if let Some(inner) = weak.upgrade() {
                let handler = inner.handlers.read().connected.clone();
                if let Some(handler) = handler {
                    handler(&WebRtspClient { inner });
                }
            }
        });

        let weak = Arc::downgrade(&inner);
        inner.transport.on_disconnected(move || {
            if let Some(inner) = weak.upgrade() {
                inner.cleanup();
                let handler = inner.handlers.read().disconnected.clone();
                if let Some(handler) = handler {
                    handler(&WebRtspClient { inner });
                }
            }
        });

        Self { inner }
    }

    /// Create a builder
    pub fn builder(url: &str) -> WebRtspClientBuilder {
        WebRtspClientBuilder::new(url)
    }

    /// Client over WebSocket with default settings
    pub fn new(url: &str) -> Self {
        WebRtspClientBuilder::new(url).build()
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.transport.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.transport.subscribe_state()
    }

    /// Register the connected callback, replacing any previous one
    pub fn on_connected<F>(&self, handler: F)
    where
        F: Fn(&WebRtspClient) + Send + Sync + 'static,
    {
        self.inner.handlers.write().connected = Some(Arc::new(handler));
    }

    /// Register the disconnected callback, replacing any previous one.
    ///
    /// Outstanding requests have already been failed when it runs.
    pub fn on_disconnected<F>(&self, handler: F)
    where
        F: Fn(&WebRtspClient) + Send + Sync + 'static,
    {
        self.inner.handlers.write().disconnected = Some(Arc::new(handler));
    }

    /// Start connecting (with auto-reconnect)
    pub fn connect(&self) -> Result<()> {
        self.inner.transport.connect()?;
        Ok(())
    }

    /// Close the connection and fail every outstanding request
    pub async fn disconnect(&self) -> Result<()> {
        let result = self.inner.transport.disconnect().await;
        self.inner.cleanup();
        result.map_err(Into::into)
    }

    /// Number of requests waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn has_media_session(&self, session: &str) -> bool {
        self.inner.state.lock().media_sessions.contains_key(session)
    }

    /// Drop the handlers registered for a media session
    pub fn release_media_session(&self, session: &str) -> bool {
        self.inner
            .state
            .lock()
            .media_sessions
            .remove(session)
            .is_some()
    }

    /// Query the methods the server supports
    pub async fn options(&self, uri: &str) -> Result<Options> {
        let response = self.inner.request(Method::Options, uri, None, None).await?;
        Ok(parse_options(&response)?)
    }

    /// List available streams
    pub async fn list(&self, uri: &str) -> Result<Uri2Description> {
        let response = self.inner.request(Method::List, uri, None, None).await?;
        check_content_type(&response, ContentType::TEXT_PARAMETERS)?;

        let parameters = parse_parameters(&response.body)
            .map_err(|_| ClientError::InvalidResponse(format!("invalid URI list:\n{}", response.body)))?;

        Ok(parameters
            .into_iter()
            .map(|(uri, description)| (decode_uri(&uri).into_owned(), description))
            .collect())
    }

    /// Request an SDP offer and open a media session.
    ///
    /// The handlers receive the server's ICE candidates and teardown for
    /// the returned session.
    pub async fn describe<I, T>(
        &self,
        uri: &str,
        on_ice_candidate: I,
        on_teardown: T,
    ) -> Result<Description>
    where
        I: Fn(IceCandidate) + Send + Sync + 'static,
        T: Fn() + Send + Sync + 'static,
    {
        let handlers = MediaSessionHandlers {
            ice_candidate: Arc::new(on_ice_candidate),
            teardown: Arc::new(on_teardown),
        };

        let response = self
            .inner
            .send_request(Method::Describe, uri, None, None, Some(handlers))
            .await?;
        check_content_type(&response, ContentType::APPLICATION_SDP)?;

        let media_session = response
            .session
            .ok_or_else(|| ClientError::InvalidResponse("media session is missing".to_string()))?;

        Ok(Description {
            offer: response.body,
            media_session,
        })
    }

    /// Send the local SDP answer
    pub async fn play(&self, uri: &str, media_session: &str, answer: &str) -> Result<()> {
        self.inner
            .request(
                Method::Play,
                uri,
                Some(media_session),
                Some((ContentType::APPLICATION_SDP, answer)),
            )
            .await?;
        Ok(())
    }

    /// Send a local ICE candidate body (`<index>/<candidate>\r\n`)
    pub async fn setup(&self, uri: &str, media_session: &str, ice_candidate: &str) -> Result<()> {
        self.inner
            .request(
                Method::Setup,
                uri,
                Some(media_session),
                Some((ContentType::APPLICATION_ICE_CANDIDATE, ice_candidate)),
            )
            .await?;
        Ok(())
    }

    /// Send a typed local ICE candidate
    pub async fn setup_candidate(
        &self,
        uri: &str,
        media_session: &str,
        candidate: &IceCandidate,
    ) -> Result<()> {
        self.setup(uri, media_session, &candidate.to_body()).await
    }

    /// Close a media session on the server and drop its handlers
    pub async fn teardown(&self, uri: &str, media_session: &str) -> Result<()> {
        self.release_media_session(media_session);
        self.inner
            .request(Method::Teardown, uri, Some(media_session), None)
            .await?;
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response> {
    if !response.is_ok() {
        return Err(ClientError::RequestFailed {
            status_code: response.status_code,
            reason_phrase: response.reason_phrase,
        });
    }
    Ok(response)
}

/// Session opened by a successful DESCRIBE response
fn opened_media_session(response: &Response) -> Option<&str> {
    if !response.is_ok() || response.content_type() != Some(ContentType::APPLICATION_SDP) {
        return None;
    }
    response.session.as_deref()
}

fn check_content_type(response: &Response, content_type: &str) -> Result<()> {
    if response.content_type() != Some(content_type) {
        return Err(ClientError::InvalidResponse(format!(
            "unexpected Content-Type: {:?}",
            response.content_type()
        )));
    }
    Ok(())
}

impl ClientInner {
    /// Send a request and wait for the matching response
    async fn request(
        &self,
        method: Method,
        uri: &str,
        media_session: Option<&str>,
        content: Option<(&str, &str)>,
    ) -> Result<Response> {
        self.send_request(method, uri, media_session, content, None).await
    }

    async fn send_request(
        &self,
        method: Method,
        uri: &str,
        media_session: Option<&str>,
        content: Option<(&str, &str)>,
        media_session_handlers: Option<MediaSessionHandlers>,
    ) -> Result<Response> {
        let (cseq, message, pending) = {
            let mut state = self.state.lock();
            let cseq = state.allocate_cseq()?;

            let mut request = Request::new(
                method,
                encode_uri(uri),
                cseq,
                media_session.map(str::to_string),
            );
            if let Some((content_type, body)) = content {
                request.set_content_type(content_type);
                request.body = body.to_string();
            }

            let message = serialize_request(&request);
            let (completion, pending) = completion();
            state.pending.insert(
                cseq,
                PendingRequest {
                    request,
                    completion,
                    media_session_handlers,
                },
            );

            (cseq, message, pending)
        };

        if self.trace_messages {
            debug!("->\n{}", message);
        }

        if let Err(e) = self.transport.send(message) {
            self.state.lock().pending.shift_remove(&cseq);
            return Err(e.into());
        }

        check_status(pending.wait().await?)
    }

    fn send_response(&self, response: &Response) {
        let message = serialize_response(response);

        if self.trace_messages {
            debug!("->\n{}", message);
        }

        if let Err(e) = self.transport.send(message) {
            error!("Failed to send response: {}", e);
        }
    }

    fn on_message(&self, message: &str) {
        if self.trace_messages {
            debug!("<-\n{}", message);
        }

        if is_request(message) {
            let request = match parse_request(message) {
                Ok(request) => request,
                Err(e) => {
                    error!("Failed to parse message ({}):\n{}", e, message);
                    return;
                }
            };

            let Some(session) = request.session.clone() else {
                error!("Got {} request without media session", request.method);
                return;
            };

            let handlers = self.state.lock().media_sessions.get(&session).cloned();
            match handlers {
                Some(handlers) => self.on_media_session_request(request, &session, handlers),
                None => error!("Got {} request for unknown media session \"{}\"", request.method, session),
            }
        } else {
            let response = match parse_response(message) {
                Ok(response) => response,
                Err(e) => {
                    error!("Failed to parse message ({}):\n{}", e, message);
                    return;
                }
            };

            let pending = {
                let mut state = self.state.lock();
                let pending = state.pending.shift_remove(&response.cseq);

                // Must be in place before the next queued message is dispatched
                let handlers = pending
                    .as_ref()
                    .and_then(|p| p.media_session_handlers.clone());
                if let (Some(handlers), Some(session)) =
                    (handlers, opened_media_session(&response))
                {
                    state.media_sessions.insert(session.to_string(), handlers);
                }

                pending
            };

            match pending {
                Some(PendingRequest {
                    request,
                    completion,
                    ..
                }) => {
                    debug!("{} (CSeq {}) completed", request.method, request.cseq);
                    completion.resume(response);
                }
                None => error!("Can't find request for message:\n{}", message),
            }
        }
    }

    /// Dispatch a server-initiated request; always answers `200 OK`
    fn on_media_session_request(
        &self,
        request: Request,
        session: &str,
        handlers: MediaSessionHandlers,
    ) {
        let outcome = catch_unwind(AssertUnwindSafe(|| match request.method {
            Method::Setup => match parse_ice_candidate(&request) {
                Ok(candidate) => (handlers.ice_candidate)(candidate),
                Err(e) => error!("Invalid ICE candidate for session \"{}\": {}", session, e),
            },
            Method::Teardown => {
                self.state.lock().media_sessions.remove(session);
                (handlers.teardown)();
            }
            method => warn!("There is no handler for \"{}\" request", method),
        }));

        if outcome.is_err() {
            error!("{} handler for session \"{}\" panicked", request.method, session);
        }

        self.send_response(&Response::ok(request.cseq, Some(session.to_string())));
    }

    /// Fail every outstanding request
    fn cleanup(&self) {
        let pending: Vec<PendingRequest> = self
            .state
            .lock()
            .pending
            .drain(..)
            .map(|(_, pending)| pending)
            .collect();

        for PendingRequest { completion, .. } in pending {
            completion.resume_with_error(ClientError::Disconnected);
        }
    }
}
