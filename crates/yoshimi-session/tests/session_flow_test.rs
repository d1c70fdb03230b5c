//! End-to-end tests driving session hosts the way the SSH transport does.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use yoshimi_core::{ActionResult, Dimensions, FeatureSet, Result, SessionId, Stage};
use yoshimi_session::{
    ActionSet, FrameSink, HostExit, InputEvent, LocalActions, MachineConfig, ScriptInvoker,
    SessionHost, SessionMachine, SessionRegistry,
};
use yoshimi_terminal::InputDecoder;

#[derive(Clone, Default)]
struct Screen {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl Screen {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }
}

#[async_trait]
impl FrameSink for Screen {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Records every call and answers like `echo "$1" "$2"`.
#[derive(Default)]
struct RecordingInvoker {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ScriptInvoker for RecordingInvoker {
    async fn invoke(&self, title: &str, body: &str) -> ActionResult {
        self.calls
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        ActionResult::success(format!("{title} {body}\n"))
    }
}

struct Client {
    tx: mpsc::UnboundedSender<InputEvent>,
    decoder: InputDecoder,
}

impl Client {
    /// Send raw terminal bytes as the SSH channel would deliver them.
    fn send(&mut self, bytes: &[u8]) {
        for key in self.decoder.decode(bytes) {
            self.tx.send(InputEvent::KeyPress(key)).unwrap();
        }
    }
}

fn start(
    secret: &str,
    features: FeatureSet,
    script: Arc<dyn ScriptInvoker>,
    local: LocalActions,
) -> (Client, Screen, tokio::task::JoinHandle<HostExit>) {
    let screen = Screen::default();
    let machine = SessionMachine::new(Arc::new(MachineConfig::new(secret, features)));
    let actions = ActionSet {
        script,
        local: Arc::new(local),
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let host = SessionHost::new(SessionId::new(), machine, actions, screen.clone(), rx);
    let handle = tokio::spawn(host.run());
    let client = Client {
        tx,
        decoder: InputDecoder::new(),
    };
    (client, screen, handle)
}

fn no_menu() -> FeatureSet {
    FeatureSet {
        has_menu: false,
        multiline_body: false,
    }
}

async fn finish(handle: tokio::task::JoinHandle<HostExit>) -> HostExit {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("session did not finish")
        .expect("session task panicked")
}

#[tokio::test]
async fn test_open_sesame_flow() {
    let invoker = Arc::new(RecordingInvoker::default());
    let (mut client, screen, handle) = start(
        "open-sesame",
        no_menu(),
        invoker.clone(),
        LocalActions::new(None, "true"),
    );

    client.tx.send(InputEvent::Resize(Dimensions::new(24, 80))).unwrap();
    client.send(b"wrong\r");
    client.send(b"open-sesame\r");
    client.send(b"Hello\tWorld\t\r");
    client.send(&[0x03]);

    assert_eq!(finish(handle).await, HostExit::Quit);
    assert_eq!(
        *invoker.calls.lock().unwrap(),
        vec![("Hello".to_string(), "World".to_string())]
    );

    let text = screen.text();
    assert!(text.contains("Hello World"));
    assert!(text.contains("Press Ctrl+C to exit."));
    assert!(!text.contains("open-sesame"), "secret echoed in clear");
}

#[tokio::test]
async fn test_escape_sequences_split_across_packets() {
    let invoker = Arc::new(RecordingInvoker::default());
    let (mut client, _screen, handle) = start(
        "pw",
        no_menu(),
        invoker.clone(),
        LocalActions::new(None, "true"),
    );

    client.send(b"pw\r");
    // Shift+Tab from Title wraps to Submit; the CSI arrives in pieces.
    client.send(b"\x1b[");
    client.send(b"Z");
    client.send(b"\r");
    client.send(&[0x03]);

    assert_eq!(finish(handle).await, HostExit::Quit);
    assert_eq!(
        *invoker.calls.lock().unwrap(),
        vec![(String::new(), String::new())]
    );
}

#[tokio::test]
async fn test_lone_escape_does_not_eat_next_key() {
    let invoker = Arc::new(RecordingInvoker::default());
    let (mut client, _screen, handle) = start(
        "pw",
        no_menu(),
        invoker.clone(),
        LocalActions::new(None, "true"),
    );

    client.send(b"\x1b");
    client.send(b"pw\r");
    client.send(b"T");
    client.send(b"\x1b");
    client.send(b"x\t\t\r");
    client.send(&[0x03]);

    assert_eq!(finish(handle).await, HostExit::Quit);
    assert_eq!(
        *invoker.calls.lock().unwrap(),
        vec![("Tx".to_string(), String::new())]
    );
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let invoker = Arc::new(RecordingInvoker::default());
    let registry = Arc::new(SessionRegistry::new(8));

    let mut clients = Vec::new();
    for n in 0..2 {
        let id = registry.register(None, &format!("user{n}")).unwrap();
        let screen = Screen::default();
        let machine = SessionMachine::new(Arc::new(MachineConfig::new("pw", no_menu())));
        let actions = ActionSet {
            script: invoker.clone(),
            local: Arc::new(LocalActions::new(None, "true")),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let host = SessionHost::new(id, machine, actions, screen.clone(), rx)
            .with_registry(registry.clone());
        clients.push((id, tx, screen, tokio::spawn(host.run())));
    }

    let mut decoder = InputDecoder::new();
    let mut send = |tx: &mpsc::UnboundedSender<InputEvent>, bytes: &[u8]| {
        for key in decoder.decode(bytes) {
            tx.send(InputEvent::KeyPress(key)).unwrap();
        }
    };

    // Only the first session unlocks and submits.
    send(&clients[0].1, b"pw\rA\tB\t\r");
    send(&clients[1].1, b"nope\r");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(registry.get(&clients[0].0).unwrap().stage, Stage::ShowingResult);
    assert_eq!(registry.get(&clients[1].0).unwrap().stage, Stage::AwaitingSecret);
    assert!(clients[0].2.text().contains("A B"));
    assert!(!clients[1].2.text().contains("A B"));

    for (_, tx, _, _) in &clients {
        tx.send(InputEvent::ConnectionClosed).unwrap();
    }
    for (_, _, _, handle) in clients {
        assert_eq!(finish(handle).await, HostExit::Disconnected);
    }
    assert_eq!(registry.count(), 0);
    assert_eq!(invoker.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_menu_ssh_key_flow() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("id_ed25519.pub");
    std::fs::write(&key_path, "ssh-ed25519 AAAAFLOW flow@test\n").unwrap();

    let features = FeatureSet {
        has_menu: true,
        multiline_body: false,
    };
    let (mut client, screen, handle) = start(
        "pw",
        features,
        Arc::new(RecordingInvoker::default()),
        LocalActions::new(Some(key_path), "true"),
    );

    client.send(b"pw\r");
    client.send(b"\x1b[B\r");
    client.send(&[0x03]);

    assert_eq!(finish(handle).await, HostExit::Quit);
    assert!(screen.text().contains("ssh-ed25519 AAAAFLOW flow@test"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_script_receives_form_values() {
    use std::os::unix::fs::PermissionsExt;
    use yoshimi_session::ProcessInvoker;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("notify.sh");
    std::fs::write(&script, "#!/bin/sh\necho \"$1\" \"$2\"\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let (mut client, screen, handle) = start(
        "pw",
        no_menu(),
        Arc::new(ProcessInvoker::new(script, Some(Duration::from_secs(5)))),
        LocalActions::new(None, "true"),
    );

    client.send(b"pw\rHello\tWorld\t\r");
    client.send(&[0x03]);

    assert_eq!(finish(handle).await, HostExit::Quit);
    assert!(screen.text().contains("Hello World"));
}
