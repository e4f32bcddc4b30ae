use deck_core::{
    ActionEvent, AppearPayload, Coordinates, DeckError, DeviceConnectEvent, DeviceDisconnectEvent,
    DeviceType, EventKind, GlobalSettingsEvent, KeyPayload, PropertyInspectorEvent,
    SendToPluginEvent, SettingsPayload, TitlePayload,
};
use deck_plugin::{
    Action, ActionCatalog, ActionDescriptor, ActionMetadata, CommandSender, Dispatcher,
    InstanceDispatch, Outbox, PluginDelegate,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<String>>>;

/// Writes every instance callback into a shared journal so the test can see
/// the interleaving with the delegate.
struct Witness {
    context: String,
    journal: Journal,
}

impl Witness {
    fn note(&self, what: &str) {
        self.journal
            .lock()
            .expect("journal")
            .push(format!("instance:{what}:{}", self.context));
    }
}

impl Action for Witness {
    fn will_appear(&mut self, _: &CommandSender, _: &str, _: &AppearPayload) {
        self.note("appear");
    }

    fn key_down(&mut self, _: &CommandSender, _: &str, payload: &KeyPayload) {
        let mode = payload.settings.get("mode").map_or("-", String::as_str);
        self.note(&format!("keyDown({mode})"));
    }

    fn will_disappear(&mut self, _: &CommandSender, _: &str, _: &AppearPayload) {
        self.note("disappear");
    }

    fn did_receive_settings(&mut self, _: &CommandSender, _: &str, payload: &SettingsPayload) {
        self.note(&format!("settings({})", payload.settings.len()));
    }
}

struct Delegate {
    journal: Journal,
    devices: Vec<(String, DeviceType)>,
}

impl Delegate {
    fn note(&self, what: &str, context: &str) {
        self.journal
            .lock()
            .expect("journal")
            .push(format!("delegate:{what}:{context}"));
    }
}

impl PluginDelegate for Delegate {
    fn did_receive_settings(&mut self, _: &CommandSender, e: &ActionEvent<SettingsPayload>) {
        self.note("settings", &e.context);
    }
    fn did_receive_global_settings(&mut self, _: &CommandSender, _: &GlobalSettingsEvent) {}
    fn key_down(&mut self, _: &CommandSender, e: &ActionEvent<KeyPayload>) {
        self.note("keyDown", &e.context);
    }
    fn key_up(&mut self, _: &CommandSender, _: &ActionEvent<KeyPayload>) {}
    fn will_appear(&mut self, _: &CommandSender, e: &ActionEvent<AppearPayload>) {
        self.note("appear", &e.context);
    }
    fn will_disappear(&mut self, _: &CommandSender, e: &ActionEvent<AppearPayload>) {
        self.note("disappear", &e.context);
    }
    fn title_parameters_did_change(&mut self, _: &CommandSender, _: &ActionEvent<TitlePayload>) {}
    fn device_did_connect(&mut self, _: &CommandSender, e: &DeviceConnectEvent) {
        self.devices
            .push((e.device.clone(), e.device_info.device_type()));
    }
    fn device_did_disconnect(&mut self, _: &CommandSender, _: &DeviceDisconnectEvent) {}
    fn application_did_launch(&mut self, _: &CommandSender, _: &str) {}
    fn application_did_terminate(&mut self, _: &CommandSender, _: &str) {}
    fn system_did_wake_up(&mut self, _: &CommandSender) {}
    fn property_inspector_did_appear(&mut self, _: &CommandSender, _: &PropertyInspectorEvent) {}
    fn property_inspector_did_disappear(&mut self, _: &CommandSender, _: &PropertyInspectorEvent) {}
    fn sent_to_plugin(&mut self, _: &CommandSender, _: &SendToPluginEvent) {}
}

const WITNESS_UUID: &str = "com.example.witness";

fn setup() -> (Dispatcher<Delegate>, Journal) {
    let journal: Journal = Arc::default();
    let factory_journal = journal.clone();
    let catalog = ActionCatalog::new().with_descriptor(ActionDescriptor::new(
        WITNESS_UUID,
        ActionMetadata::new("Witness", "Icons/witness"),
        move |context, _coordinates| -> Box<dyn Action> {
            Box::new(Witness {
                context,
                journal: factory_journal.clone(),
            })
        },
    ));
    let (outbox, _rx) = Outbox::channel();
    let sender = CommandSender::new(outbox, "com.example.plugin");
    let delegate = Delegate {
        journal: journal.clone(),
        devices: Vec::new(),
    };
    (Dispatcher::new(delegate, catalog, sender), journal)
}

fn envelope(event: &str, context: &str, settings: serde_json::Value) -> String {
    json!({
        "event": event,
        "action": WITNESS_UUID,
        "context": context,
        "device": "dev-7",
        "payload": {
            "settings": settings,
            "coordinates": {"column": 1, "row": 2},
            "isInMultiAction": false
        }
    })
    .to_string()
}

#[test]
fn appear_key_disappear_lifecycle() {
    let (mut dispatcher, journal) = setup();

    dispatcher
        .dispatch_text(&envelope("willAppear", "ctx-1", json!({})))
        .expect("appear");
    assert_eq!(dispatcher.registry().at(Coordinates::new(1, 2)).len(), 1);

    let report = dispatcher
        .dispatch_text(&envelope("keyDown", "ctx-1", json!({"mode": "fast"})))
        .expect("keyDown");
    assert_eq!(report.kind, EventKind::KeyDown);
    assert_eq!(report.instance, InstanceDispatch::Delivered);

    dispatcher
        .dispatch_text(&envelope("didReceiveSettings", "ctx-1", json!({"a": "1", "b": "2"})))
        .expect("settings");
    dispatcher
        .dispatch_text(&envelope("willDisappear", "ctx-1", json!({})))
        .expect("disappear");
    assert!(dispatcher.registry().is_empty());

    let late = dispatcher
        .dispatch_text(&envelope("keyDown", "ctx-1", json!({})))
        .expect("late keyDown");
    assert_eq!(
        late.instance,
        InstanceDispatch::Skipped(DeckError::UnknownTargetInstance {
            context: "ctx-1".to_string()
        })
    );

    assert_eq!(
        *journal.lock().expect("journal"),
        vec![
            "instance:appear:ctx-1",
            "delegate:appear:ctx-1",
            "instance:keyDown(fast):ctx-1",
            "delegate:keyDown:ctx-1",
            "instance:settings(2):ctx-1",
            "delegate:settings:ctx-1",
            "instance:disappear:ctx-1",
            "delegate:disappear:ctx-1",
            "delegate:keyDown:ctx-1",
        ]
    );
}

#[test]
fn repeated_appear_keeps_the_first_instance() {
    let (mut dispatcher, journal) = setup();
    dispatcher
        .dispatch_text(&envelope("willAppear", "ctx-1", json!({})))
        .expect("appear");
    dispatcher
        .dispatch_text(&envelope("willAppear", "ctx-1", json!({})))
        .expect("appear again");
    assert_eq!(dispatcher.registry().len(), 1);
    assert_eq!(dispatcher.registry().by_action(WITNESS_UUID).len(), 1);
    let appears = journal
        .lock()
        .expect("journal")
        .iter()
        .filter(|line| line.starts_with("instance:appear"))
        .count();
    assert_eq!(appears, 2);
}

#[test]
fn device_connect_requires_device_info() {
    let (mut dispatcher, _journal) = setup();
    let missing = json!({"event": "deviceDidConnect", "device": "dev-1"}).to_string();
    assert!(matches!(
        dispatcher.dispatch_text(&missing),
        Err(DeckError::MalformedEnvelope(_))
    ));

    let full = json!({
        "event": "deviceDidConnect",
        "device": "dev-1",
        "deviceInfo": {"name": "Desk", "type": 7, "size": {"columns": 4, "rows": 2}}
    })
    .to_string();
    let report = dispatcher.dispatch_text(&full).expect("connect");
    assert_eq!(report.instance, InstanceDispatch::NotAddressed);
    assert_eq!(
        dispatcher.delegate().devices,
        vec![("dev-1".to_string(), DeviceType::StreamDeckPlus)]
    );
}
