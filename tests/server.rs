use orbis::config::Config;
use orbis::{Registry, Repos, game, net};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    game: JoinHandle<()>,
    listener: JoinHandle<()>,
    _data: tempfile::TempDir,
}

async fn start_server(max_clients: usize) -> TestServer {
    let data = tempfile::tempdir().unwrap();
    let cfg = Arc::new(Config {
        tcp_addr: "127.0.0.1:0".into(),
        max_clients,
        data_dir: data.path().to_path_buf(),
        departure_ms: 20,
        // keep periodic noise out of the assertions
        player_count_ms: 3_600_000,
        ..Config::default()
    });

    let listener = TcpListener::bind(cfg.socket_addr().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let registry = Registry::new(cfg.clone(), Repos::open(&cfg));
    let (tx, rx) = mpsc::channel(cfg.event_queue);
    let listener = tokio::spawn(net::serve(listener, tx, cfg.clone()));
    let game = tokio::spawn(game::run(registry, rx, std::future::pending()));

    TestServer {
        addr,
        game,
        listener,
        _data: data,
    }
}

struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream: BufReader::new(stream),
        }
    }

    async fn send(&mut self, text: &str) {
        self.send_bytes(text.as_bytes()).await;
    }

    async fn send_bytes(&mut self, frame: &[u8]) {
        let mut bytes = frame.to_vec();
        bytes.push(0);
        self.stream.get_mut().write_all(&bytes).await.unwrap();
    }

    /// Next frame, `None` on EOF.
    async fn recv(&mut self) -> Option<String> {
        self.recv_bytes()
            .await
            .map(|frame| String::from_utf8(frame).unwrap())
    }

    async fn recv_bytes(&mut self) -> Option<Vec<u8>> {
        let mut buf = Vec::new();
        let n = tokio::time::timeout(Duration::from_secs(15), self.stream.read_until(0, &mut buf))
            .await
            .expect("timed out waiting for frame")
            .unwrap();
        if n == 0 {
            return None;
        }
        assert_eq!(buf.pop(), Some(0), "frame without terminator: {buf:?}");
        Some(buf)
    }

    async fn expect(&mut self) -> String {
        self.recv().await.expect("connection closed")
    }
}

#[tokio::test]
async fn two_players_relay_and_load_chunks() {
    let server = start_server(4).await;

    let mut a = Client::connect(server.addr).await;
    assert_eq!(a.expect().await, "OK");
    a.send("!use:Alice").await;

    let mut b = Client::connect(server.addr).await;
    assert_eq!(b.expect().await, "OK");

    a.send("hello").await;
    assert_eq!(b.expect().await, "hello");

    a.send("!loadchunk:3,4~").await;
    let mut first = Vec::new();
    for _ in 0..10 {
        // the relay never echoes, so the chunk rows are the next thing A sees
        let row = a.expect().await;
        assert!(row.starts_with("retchunk3~4~"), "unexpected frame {row:?}");
        first.push(row);
    }

    a.send("!loadchunk:3,4~").await;
    for row in &first {
        assert_eq!(&a.expect().await, row);
    }
}

#[tokio::test]
async fn relay_is_byte_exact() {
    let server = start_server(2).await;

    let mut a = Client::connect(server.addr).await;
    assert_eq!(a.expect().await, "OK");
    let mut b = Client::connect(server.addr).await;
    assert_eq!(b.expect().await, "OK");

    a.send_bytes(b"caf\xe9").await;
    assert_eq!(b.recv_bytes().await.unwrap(), b"caf\xe9");

    // a command that is not UTF-8 is dropped, later traffic still flows
    a.send_bytes(b"!use:\xff").await;
    a.send("after").await;
    assert_eq!(b.expect().await, "after");
}

#[tokio::test]
async fn full_server_rejects_and_keeps_count() {
    let server = start_server(2).await;

    let mut a = Client::connect(server.addr).await;
    assert_eq!(a.expect().await, "OK");
    let mut b = Client::connect(server.addr).await;
    assert_eq!(b.expect().await, "OK");

    let mut c = Client::connect(server.addr).await;
    assert_eq!(c.expect().await, "FULL");
    assert_eq!(c.recv().await, None);

    // the freed slot is handed out again
    drop(b);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut d = Client::connect(server.addr).await;
    assert_eq!(d.expect().await, "OK");

    a.send("ping").await;
    assert_eq!(d.expect().await, "ping");
}

#[tokio::test]
async fn accounts_and_departures_over_tcp() {
    let server = start_server(4).await;

    let mut a = Client::connect(server.addr).await;
    assert_eq!(a.expect().await, "OK");
    let mut b = Client::connect(server.addr).await;
    assert_eq!(b.expect().await, "OK");

    a.send("!login:erin/pw~").await;
    assert_eq!(a.expect().await, "usrdec");
    a.send("!signup:erin/pw~").await;
    assert_eq!(a.expect().await, "signacpt");
    a.send("!login:erin/pw~").await;
    assert_eq!(a.expect().await, "usracpt");

    a.send("!use:erin").await;
    b.send("!login:erin/pw~").await;
    assert_eq!(b.expect().await, "usralon");

    drop(a);
    assert_eq!(b.expect().await, "usrl:erin");
}

#[tokio::test]
async fn sentinel_stops_the_server() {
    let server = start_server(2).await;

    let mut a = Client::connect(server.addr).await;
    assert_eq!(a.expect().await, "OK");
    let mut b = Client::connect(server.addr).await;
    assert_eq!(b.expect().await, "OK");

    a.send("/shutdown").await;
    tokio::time::timeout(Duration::from_secs(5), server.game)
        .await
        .unwrap()
        .unwrap();

    // serve only returns once every writer has flushed and closed
    tokio::time::timeout(Duration::from_secs(5), server.listener)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b.expect().await, "/shutdown");
    assert_eq!(b.recv().await, None);
    assert_eq!(a.recv().await, None);
}
