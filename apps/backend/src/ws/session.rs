//! Per-connection websocket actor.
//!
//! The actor owns the socket and nothing else: it keeps the heartbeat,
//! parses inbound frames, and dispatches into [`MatchService`]. Outbound
//! traffic arrives over an unbounded channel handed to the match flow at
//! auth time; when the match flow drops the sender (prune, forced
//! disconnect) the forwarding stream ends and the socket closes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web_actors::ws;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::match_flow::MatchService;
use crate::ws::protocol::{ClientMsg, ServerMsg};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub struct WsSession {
    conn_id: Uuid,
    service: Arc<MatchService>,
    /// Outbound sender held until a successful auth hands it to the
    /// match flow. `None` afterwards.
    pending_outbound: Option<UnboundedSender<ServerMsg>>,
    last_heartbeat: Instant,
}

impl WsSession {
    pub fn new(conn_id: Uuid, service: Arc<MatchService>) -> Self {
        Self {
            conn_id,
            service,
            pending_outbound: None,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "failed to serialize outbound message"),
        }
    }

    fn send_error(ctx: &mut ws::WebsocketContext<Self>, message: impl Into<String>) {
        Self::send_json(
            ctx,
            &ServerMsg::Error {
                message: message.into(),
            },
        );
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %actor.conn_id, "heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn handle_client_msg(&mut self, msg: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMsg::Auth { token } => {
                let Some(outbound) = self.pending_outbound.take() else {
                    Self::send_error(ctx, "You are already authenticated");
                    return;
                };
                let service = self.service.clone();
                let conn_id = self.conn_id;
                ctx.spawn(
                    async move { service.join(conn_id, &token, outbound).await }
                        .into_actor(self)
                        .map(|res, _actor, ctx| {
                            if let Err(err) = res {
                                Self::send_error(ctx, err.to_string());
                                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Policy)));
                                ctx.stop();
                            }
                        }),
                );
            }

            ClientMsg::Vote { san } => {
                if let Err(err) = self.service.vote(self.conn_id, &san) {
                    Self::send_error(ctx, err.to_string());
                }
            }

            ClientMsg::Leaderboard => {
                let service = self.service.clone();
                let conn_id = self.conn_id;
                ctx.spawn(
                    async move { service.leaderboard(conn_id).await }
                        .into_actor(self)
                        .map(|res, _actor, ctx| match res {
                            Ok(entries) => {
                                Self::send_json(ctx, &ServerMsg::Leaderboard { entries })
                            }
                            Err(err) => Self::send_error(ctx, err.to_string()),
                        }),
                );
            }

            ClientMsg::PlayerStats => {
                let service = self.service.clone();
                let conn_id = self.conn_id;
                ctx.spawn(
                    async move { service.player_stats(conn_id).await }
                        .into_actor(self)
                        .map(|res, _actor, ctx| match res {
                            Ok(stats) => Self::send_json(ctx, &ServerMsg::PlayerStats { stats }),
                            Err(err) => Self::send_error(ctx, err.to_string()),
                        }),
                );
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "websocket session started");
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending_outbound = Some(tx);
        ctx.add_stream(UnboundedReceiverStream::new(rx));
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.service.disconnect(self.conn_id);
        info!(conn_id = %self.conn_id, "websocket session stopped");
    }
}

/// Outbound messages from the match flow.
impl StreamHandler<ServerMsg> for WsSession {
    fn handle(&mut self, msg: ServerMsg, ctx: &mut Self::Context) {
        Self::send_json(ctx, &msg);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // The match flow dropped our sender (prune / forced disconnect).
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
        ctx.stop();
    }
}

/// Inbound websocket frames.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(cmd) => self.handle_client_msg(cmd, ctx),
                    Err(_) => Self::send_error(ctx, "Malformed request"),
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_error(ctx, "Binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "websocket protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}
