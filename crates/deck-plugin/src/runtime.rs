use crate::action::ActionCatalog;
use crate::delegate::PluginDelegate;
use crate::dispatch::Dispatcher;
use crate::sender::CommandSender;
use crate::stream::{spawn_writer, subscribe, Demand, OutboundFrame, Outbox};
use deck_core::{ControllerInfo, DeckError, Registration};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

/// Everything needed to reach the controller, resolved from the launch flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub port: u16,
    pub plugin_uuid: String,
    pub register_event: String,
    pub info: ControllerInfo,
}

impl ConnectionConfig {
    /// The controller only listens on loopback.
    pub fn url(&self) -> Result<Url, DeckError> {
        Url::parse(&format!("ws://127.0.0.1:{}", self.port))
            .map_err(|err| DeckError::ConnectionFailure(format!("invalid controller url: {err}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Registered,
    Running,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Registered => "registered",
            ConnectionState::Running => "running",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One connection to the controller, from handshake to close. There is no
/// reconnect: once `run` returns the runtime is spent.
pub struct PluginRuntime<D> {
    config: ConnectionConfig,
    dispatcher: Dispatcher<D>,
    outbound: Option<mpsc::UnboundedReceiver<OutboundFrame>>,
    state: ConnectionState,
}

impl<D: PluginDelegate> PluginRuntime<D> {
    pub fn new(config: ConnectionConfig, delegate: D, catalog: ActionCatalog) -> Self {
        let (outbox, outbound) = Outbox::channel();
        let sender = CommandSender::new(outbox, config.plugin_uuid.clone());
        Self {
            config,
            dispatcher: Dispatcher::new(delegate, catalog, sender),
            outbound: Some(outbound),
            state: ConnectionState::Disconnected,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Outbound handle usable outside callbacks. Commands queued before `run`
    /// go out right after the registration frame.
    pub fn sender(&self) -> CommandSender {
        self.dispatcher.sender().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher<D> {
        &self.dispatcher
    }

    pub fn into_delegate(self) -> D {
        self.dispatcher.into_delegate()
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(event = "deck_state_change", from = %self.state, to = %next);
        self.state = next;
    }

    /// Connects, registers and dispatches until the socket ends. A clean close
    /// is `Ok`; transport failures are `ConnectionFailure`.
    pub async fn run(&mut self) -> Result<(), DeckError> {
        let Some(outbound) = self.outbound.take() else {
            return Err(DeckError::ConnectionFailure(
                "runtime has already been run".to_string(),
            ));
        };
        let url = self.config.url()?;

        self.transition(ConnectionState::Connecting);
        let (mut ws, _) = match connect_async(url.as_str()).await {
            Ok(value) => value,
            Err(err) => {
                warn!(event = "deck_connect_failed", url = %url, error = %err);
                self.transition(ConnectionState::Closed);
                return Err(DeckError::ConnectionFailure(err.to_string()));
            }
        };
        info!(event = "deck_connected", url = %url);

        let registration = Registration::new(
            self.config.register_event.as_str(),
            self.config.plugin_uuid.as_str(),
        );
        let handshake = match registration.encode() {
            Ok(text) => ws.send(Message::Text(text)).await.map_err(|err| {
                DeckError::ConnectionFailure(format!("registration send failed: {err}"))
            }),
            Err(err) => Err(err),
        };
        if let Err(err) = handshake {
            warn!(event = "deck_registration_failed", error = %err);
            let _ = ws.close(None).await;
            self.transition(ConnectionState::Closed);
            return Err(err);
        }
        self.transition(ConnectionState::Registered);
        info!(
            event = "deck_registered",
            register_event = %self.config.register_event,
            plugin_uuid = %self.config.plugin_uuid
        );

        let (sink, stream) = ws.split();
        let writer = spawn_writer(sink, outbound, Message::Text);
        let mut inbound = subscribe(stream, Demand::Unbounded);
        self.transition(ConnectionState::Running);

        let result = loop {
            match inbound.next().await {
                Some(Ok(message)) => match self.handle_message(message) {
                    Ok(true) => {}
                    Ok(false) => {
                        info!(event = "deck_connection_closed", reason = "close_frame");
                        break Ok(());
                    }
                    Err(err) if err.is_recoverable() => {
                        debug!(event = "deck_message_skipped", error = %err);
                    }
                    Err(err) => break Err(err),
                },
                Some(Err(err)) => {
                    warn!(event = "deck_connection_failed", error = %err);
                    break Err(DeckError::ConnectionFailure(err.to_string()));
                }
                None => {
                    info!(event = "deck_connection_closed", reason = "stream_end");
                    break Ok(());
                }
            }
        };

        drop(inbound);
        writer.abort();
        self.transition(ConnectionState::Closed);
        result
    }

    /// `Ok(false)` once the controller has sent a close frame. Errors belong
    /// to this one message.
    fn handle_message(&mut self, message: Message) -> Result<bool, DeckError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8(bytes).map_err(|err| {
                let err = DeckError::malformed(err);
                warn!(event = "deck_malformed_envelope", error = %err);
                err
            })?,
            Message::Close(_) => return Ok(false),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(true),
        };
        self.dispatcher.dispatch_text(&text)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{
        ActionEvent, AppearPayload, DeviceConnectEvent, DeviceDisconnectEvent,
        GlobalSettingsEvent, KeyPayload, PropertyInspectorEvent, SendToPluginEvent,
        SettingsPayload, TitlePayload,
    };

    #[derive(Default)]
    struct WakeCount(usize);

    impl PluginDelegate for WakeCount {
        fn did_receive_settings(&mut self, _: &CommandSender, _: &ActionEvent<SettingsPayload>) {}
        fn did_receive_global_settings(&mut self, _: &CommandSender, _: &GlobalSettingsEvent) {}
        fn key_down(&mut self, _: &CommandSender, _: &ActionEvent<KeyPayload>) {}
        fn key_up(&mut self, _: &CommandSender, _: &ActionEvent<KeyPayload>) {}
        fn will_appear(&mut self, _: &CommandSender, _: &ActionEvent<AppearPayload>) {}
        fn will_disappear(&mut self, _: &CommandSender, _: &ActionEvent<AppearPayload>) {}
        fn title_parameters_did_change(
            &mut self,
            _: &CommandSender,
            _: &ActionEvent<TitlePayload>,
        ) {
        }
        fn device_did_connect(&mut self, _: &CommandSender, _: &DeviceConnectEvent) {}
        fn device_did_disconnect(&mut self, _: &CommandSender, _: &DeviceDisconnectEvent) {}
        fn application_did_launch(&mut self, _: &CommandSender, _: &str) {}
        fn application_did_terminate(&mut self, _: &CommandSender, _: &str) {}
        fn system_did_wake_up(&mut self, _: &CommandSender) {
            self.0 += 1;
        }
        fn property_inspector_did_appear(
            &mut self,
            _: &CommandSender,
            _: &PropertyInspectorEvent,
        ) {
        }
        fn property_inspector_did_disappear(
            &mut self,
            _: &CommandSender,
            _: &PropertyInspectorEvent,
        ) {
        }
        fn sent_to_plugin(&mut self, _: &CommandSender, _: &SendToPluginEvent) {}
    }

    fn config(port: u16) -> ConnectionConfig {
        ConnectionConfig {
            port,
            plugin_uuid: "com.example.plugin".to_string(),
            register_event: "registerPlugin".to_string(),
            info: ControllerInfo::parse(
                r#"{"application":{"language":"en","platform":"mac","version":"6.4.0"}}"#,
            )
            .expect("info"),
        }
    }

    #[test]
    fn url_targets_loopback() {
        let url = config(28196).url().expect("url");
        assert_eq!(url.as_str(), "ws://127.0.0.1:28196/");
        assert_eq!(url.port(), Some(28196));
    }

    #[test]
    fn state_names_are_lowercase() {
        assert_eq!(ConnectionState::Registered.to_string(), "registered");
        assert_eq!(ConnectionState::Closed.as_str(), "closed");
    }

    #[test]
    fn binary_frames_are_read_as_utf8_text() {
        let mut runtime =
            PluginRuntime::new(config(28196), WakeCount::default(), ActionCatalog::new());
        let wake = br#"{"event":"systemDidWakeUp"}"#.to_vec();
        assert_eq!(runtime.handle_message(Message::Binary(wake)), Ok(true));
        assert_eq!(runtime.dispatcher().delegate().0, 1);

        let garbled = runtime.handle_message(Message::Binary(vec![0x7b, 0xff, 0xfe]));
        assert!(matches!(garbled, Err(DeckError::MalformedEnvelope(_))));
        assert!(garbled.is_err_and(|err| err.is_recoverable()));
        assert_eq!(runtime.dispatcher().delegate().0, 1);
        assert_eq!(runtime.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn close_frame_ends_and_control_frames_pass() {
        let mut runtime =
            PluginRuntime::new(config(28196), WakeCount::default(), ActionCatalog::new());
        assert_eq!(runtime.handle_message(Message::Ping(vec![1])), Ok(true));
        let unknown = Message::Text(r#"{"event":"keydown"}"#.to_string());
        assert!(matches!(
            runtime.handle_message(unknown),
            Err(DeckError::MalformedEnvelope(_))
        ));
        assert_eq!(runtime.handle_message(Message::Close(None)), Ok(false));
    }
}
