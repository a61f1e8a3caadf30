//! A session with one peer: authenticate, then issue queries one at a time.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    document::AuthDocument,
    error::{Error, Result},
    handshake::{HandshakeConfig, HandshakeEngine, Step},
    keys::{Signer, Verifier},
    request::{self, Request},
    response::{self, Response},
    transport::Transport,
    types::Randomness,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshaking,
    Established,
    Failed,
}

/// Drive `engine` over `transport` until the peer is authenticated. Timeouts are up to the caller,
/// dropping the returned future leaves nothing half sent.
pub async fn authenticate<T: Transport + ?Sized>(
    transport: &mut T,
    engine: &mut HandshakeEngine,
    rng: &mut dyn Randomness,
) -> Result<()> {
    let connect = engine.start(rng)?;
    transport.send(connect).await?;

    loop {
        let frame = transport.receive().await?;
        match engine.on_frame(&frame)? {
            Step::Reply(reply) => transport.send(reply).await?,
            Step::Ignored => {}
            Step::Established => return Ok(()),
        }
    }
}

pub struct SessionClient<T: Transport> {
    transport: T,
    engine: HandshakeEngine,
    rng: Box<dyn Randomness>,
    state: SessionState,
    last_error: Option<Error>,
}

impl<T: Transport> SessionClient<T> {
    pub fn new(
        transport: T,
        config: HandshakeConfig,
        signer: Arc<dyn Signer>,
        verifier: Arc<dyn Verifier>,
        rng: Box<dyn Randomness>,
    ) -> Self {
        Self {
            transport,
            engine: HandshakeEngine::new(config, signer, verifier),
            rng,
            state: SessionState::Handshaking,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    /// The most recent error, fatal or not.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The authenticated peer's CONNECT document.
    pub fn peer(&self) -> Option<&AuthDocument> {
        self.engine.peer()
    }

    /// Authenticate the peer. Any failure is terminal for the session.
    pub async fn handshake(&mut self) -> Result<()> {
        if self.state != SessionState::Handshaking {
            return Err(Error::InvalidState("handshake already completed"));
        }

        match authenticate(&mut self.transport, &mut self.engine, self.rng.as_mut()).await {
            Ok(()) => {
                let peer = self.engine.peer().map(AuthDocument::pubkey);
                info!(peer, "session established");
                self.state = SessionState::Established;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "session failed during handshake");
                self.state = SessionState::Failed;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Send one query and wait for its answer. An error answer from the peer is a successful
    /// [`Response::Error`], not an `Err`.
    pub async fn request(&mut self, request: &Request) -> Result<Response> {
        if self.state != SessionState::Established {
            let e = Error::InvalidState("session is not established");
            self.last_error = Some(e.clone());
            return Err(e);
        }

        let result = self.exchange(request).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(error = %e, request = request.name(), "session failed");
                self.state = SessionState::Failed;
            } else {
                warn!(error = %e, request = request.name(), "request failed");
            }
            self.last_error = Some(e.clone());
        }

        result
    }

    /// Issue queries in order, one at a time. Stops early once the session has failed, so the
    /// result list may be shorter than the input.
    pub async fn requests(
        &mut self,
        requests: impl IntoIterator<Item = Request>,
    ) -> Vec<Result<Response>> {
        let mut results = Vec::new();
        for request in requests {
            if self.state == SessionState::Failed {
                break;
            }
            results.push(self.request(&request).await);
        }
        results
    }

    async fn exchange(&mut self, request: &Request) -> Result<Response> {
        let (req_id, frame) = request::build_request(request, None, self.rng.as_mut())?;
        debug!(%req_id, request = request.name(), "sending request");
        self.transport.send(frame).await?;

        loop {
            let raw = self.transport.receive().await?;
            let value: Value = serde_json::from_str(&raw)?;

            if value.get("resId").and_then(Value::as_str) != Some(req_id.as_str()) {
                debug!(expected = %req_id, "skipping frame that answers another request");
                continue;
            }

            return response::response_from_value(value, request.expected_kind());
        }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
    use serde_json::json;

    use super::*;
    use crate::{
        keys::{Ed25519Verifier, KeyManager},
        response::ResponseBody,
        schemas::fixtures,
        transport::{channel_pair, ChannelTransport},
    };

    const CURRENCY: &str = "g1-test";

    fn session(transport: ChannelTransport, seed: u8) -> SessionClient<ChannelTransport> {
        SessionClient::new(
            transport,
            HandshakeConfig::new(CURRENCY),
            Arc::new(KeyManager::from_secret([seed; 32]).unwrap()),
            Arc::new(Ed25519Verifier),
            Box::new(ChaCha20Rng::seed_from_u64(u64::from(seed))),
        )
    }

    /// Authenticate as the remote peer, then hand the raw transport back.
    async fn remote_peer(mut transport: ChannelTransport) -> ChannelTransport {
        let mut engine = HandshakeEngine::new(
            HandshakeConfig::new(CURRENCY),
            Arc::new(KeyManager::from_secret([42; 32]).unwrap()),
            Arc::new(Ed25519Verifier),
        );
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        authenticate(&mut transport, &mut engine, &mut rng)
            .await
            .unwrap();
        transport
    }

    async fn next_req_id(transport: &mut ChannelTransport) -> String {
        let frame: Value = serde_json::from_str(&transport.receive().await.unwrap()).unwrap();
        frame["reqId"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn two_sessions_authenticate_each_other() {
        let (a, b) = channel_pair();
        let (mut a, mut b) = (session(a, 1), session(b, 2));

        let (ra, rb) = tokio::join!(a.handshake(), b.handshake());
        ra.unwrap();
        rb.unwrap();

        assert!(a.is_established() && b.is_established());
        let b_key = KeyManager::from_secret([2; 32]).unwrap();
        assert_eq!(a.peer().unwrap().pubkey(), b_key.public_key());
        assert!(a.last_error().is_none());
        assert!(matches!(a.handshake().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn request_before_handshake_is_rejected() {
        let (a, _b) = channel_pair();
        let mut a = session(a, 1);

        let err = a.request(&Request::Current {}).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(matches!(a.last_error(), Some(Error::InvalidState(_))));
        assert_eq!(a.state(), SessionState::Handshaking);
    }

    #[tokio::test]
    async fn peer_leaving_during_handshake_fails_the_session() {
        let (a, b) = channel_pair();
        let mut a = session(a, 1);
        drop(b);

        assert!(matches!(a.handshake().await, Err(Error::TransportClosed)));
        assert_eq!(a.state(), SessionState::Failed);
        assert!(matches!(a.last_error(), Some(Error::TransportClosed)));
    }

    #[tokio::test]
    async fn answers_are_matched_by_request_id() {
        let (a, b) = channel_pair();
        let mut a = session(a, 1);

        let peer = tokio::spawn(async move {
            let mut transport = remote_peer(b).await;
            let req_id = next_req_id(&mut transport).await;

            // an answer to some other query comes first
            let stray = json!({"resId": "Zz00Yy11", "err": "late"});
            transport.send(stray.to_string()).await.unwrap();
            let answer = json!({"resId": req_id, "body": fixtures::block(360_000)});
            transport.send(answer.to_string()).await.unwrap();
            transport
        });

        a.handshake().await.unwrap();
        let response = a
            .request(&Request::BlockByNumber { number: 360_000 })
            .await
            .unwrap();
        let Response::Success {
            body: ResponseBody::Block(block),
            ..
        } = response
        else {
            panic!("expected a block, got {response:?}");
        };
        assert_eq!(block.number, 360_000);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn query_failures_keep_the_session_open() {
        let (a, b) = channel_pair();
        let mut a = session(a, 1);

        let peer = tokio::spawn(async move {
            let mut transport = remote_peer(b).await;

            let req_id = next_req_id(&mut transport).await;
            let wrong = json!({"resId": req_id, "body": fixtures::requirements()});
            transport.send(wrong.to_string()).await.unwrap();

            let req_id = next_req_id(&mut transport).await;
            let error = json!({"resId": req_id, "err": "no such block"});
            transport.send(error.to_string()).await.unwrap();
            transport
        });

        a.handshake().await.unwrap();
        let results = a
            .requests([Request::Current {}, Request::BlockByNumber { number: 1 }])
            .await;

        assert!(matches!(results[0], Err(Error::UnrecognizedResponse(_))));
        assert!(matches!(
            &results[1],
            Ok(Response::Error { message, .. }) if message == "no such block"
        ));
        assert!(a.is_established());
        assert!(matches!(a.last_error(), Some(Error::UnrecognizedResponse(_))));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn peer_leaving_mid_query_stops_the_queue() {
        let (a, b) = channel_pair();
        let mut a = session(a, 1);

        let peer = tokio::spawn(async move {
            let mut transport = remote_peer(b).await;
            next_req_id(&mut transport).await;
        });

        a.handshake().await.unwrap();
        let results = a
            .requests([Request::Current {}, Request::WotRequirementsOfPending { min_cert: 3 }])
            .await;
        peer.await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::TransportClosed)));
        assert_eq!(a.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn non_json_answer_is_malformed() {
        let (a, b) = channel_pair();
        let mut a = session(a, 1);

        let peer = tokio::spawn(async move {
            let mut transport = remote_peer(b).await;
            next_req_id(&mut transport).await;
            transport.send("<html>".into()).await.unwrap();
            transport
        });

        a.handshake().await.unwrap();
        assert!(matches!(
            a.request(&Request::Current {}).await,
            Err(Error::MalformedInput(_))
        ));
        assert!(a.is_established());
        peer.await.unwrap();
    }
}
