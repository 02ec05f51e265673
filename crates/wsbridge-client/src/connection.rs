//! A single WebSocket connection.
//!
//! Each connection runs in its own task. It reports socket events back to
//! the supervisor tagged with the generation it was opened under, and takes
//! sends and close requests through a control channel. The supervisor drops
//! its [`Connection`] before closing it, so events from a replaced socket
//! arrive with an outdated generation and are ignored.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error};

use wsbridge_protocol::InboundFrame;

use crate::error::SendError;
use crate::supervisor::Event;

/// Close code for a graceful close.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the peer's close frame carried no code.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code reported when the socket went away without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// How long a graceful close waits for the peer's acknowledgement.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Events reported by a connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Frame(InboundFrame),
    Ping,
    Error(String),
    Closed { code: u16 },
}

enum Control {
    Send {
        text: String,
        debug: bool,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
    Close(u16),
    Terminate,
}

/// Handle to a running connection task.
#[derive(Debug)]
pub(crate) struct Connection {
    generation: u64,
    control: mpsc::UnboundedSender<Control>,
}

impl Connection {
    /// Spawn a task connecting to `url`.
    pub fn open(url: &str, generation: u64, events: mpsc::UnboundedSender<Event>) -> Self {
        let (control, control_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(url.to_string(), generation, events, control_rx));
        Self {
            generation,
            control,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a text frame. The outcome is delivered on `reply`.
    pub fn send(&self, text: String, debug: bool, reply: oneshot::Sender<Result<(), SendError>>) {
        let command = Control::Send { text, debug, reply };
        if let Err(mpsc::error::SendError(Control::Send { reply, .. })) = self.control.send(command) {
            let _ = reply.send(Err(SendError::NotConnected));
        }
    }

    /// Close gracefully with `code`.
    pub fn close(self, code: u16) {
        let _ = self.control.send(Control::Close(code));
    }

    /// Drop the socket without a closing handshake.
    pub fn terminate(&self) {
        let _ = self.control.send(Control::Terminate);
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::Send { text, .. } => f.debug_struct("Send").field("text", text).finish(),
            Control::Close(code) => f.debug_tuple("Close").field(code).finish(),
            Control::Terminate => f.write_str("Terminate"),
        }
    }
}

async fn run(
    url: String,
    generation: u64,
    events: mpsc::UnboundedSender<Event>,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    let emit = |event: SocketEvent| {
        let _ = events.send(Event::Socket { generation, event });
    };

    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _)) => break stream,
                Err(e) => {
                    emit(SocketEvent::Error(e.to_string()));
                    emit(SocketEvent::Closed { code: ABNORMAL_CLOSURE });
                    return;
                }
            },
            command = control.recv() => match command {
                Some(Control::Send { reply, .. }) => {
                    let _ = reply.send(Err(SendError::NotOpen));
                }
                Some(Control::Terminate) => {
                    emit(SocketEvent::Closed { code: ABNORMAL_CLOSURE });
                    return;
                }
                Some(Control::Close(_)) | None => return,
            },
        }
    };

    emit(SocketEvent::Opened);

    let (mut write, mut read) = stream.split();
    let mut close_code: Option<u16> = None;

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => emit(SocketEvent::Frame(InboundFrame::Text(text))),
                Some(Ok(Message::Binary(data))) => emit(SocketEvent::Frame(InboundFrame::Binary(data))),
                // tungstenite queues the pong itself
                Some(Ok(Message::Ping(_))) => emit(SocketEvent::Ping),
                Some(Ok(Message::Close(frame))) => {
                    close_code = Some(frame.map_or(NO_STATUS_RECEIVED, |f| u16::from(f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    emit(SocketEvent::Closed { code: close_code.unwrap_or(ABNORMAL_CLOSURE) });
                    return;
                }
                Some(Err(e)) => {
                    emit(SocketEvent::Error(e.to_string()));
                    emit(SocketEvent::Closed { code: close_code.unwrap_or(ABNORMAL_CLOSURE) });
                    return;
                }
            },
            command = control.recv() => match command {
                Some(Control::Send { text, debug, reply }) => {
                    let result = write
                        .send(Message::Text(text))
                        .await
                        .map_err(|e| SendError::Transport(e.to_string()));
                    if debug {
                        match &result {
                            Ok(()) => debug!("Message sent successfully."),
                            Err(_) => error!("Sending message failed."),
                        }
                    }
                    let _ = reply.send(result);
                }
                Some(Control::Close(code)) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: "".into(),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    let _ = tokio::time::timeout(CLOSE_GRACE, async {
                        while let Some(Ok(_)) = read.next().await {}
                    })
                    .await;
                    return;
                }
                Some(Control::Terminate) => {
                    emit(SocketEvent::Closed { code: ABNORMAL_CLOSURE });
                    return;
                }
                None => return,
            },
        }
    }
}
