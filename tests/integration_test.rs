use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::LocalSet;
use tokio::time::{sleep, timeout};

use mpd_bridge::server::Error;
use mpd_bridge::{Config, MemoryPlayer, Server, Track};

fn config(password: Option<&str>) -> Config {
    Config {
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        password: password.map(str::to_string),
    }
}

fn tracks() -> Vec<Track> {
    vec![
        Track::new("/music/one.flac")
            .with_tag("title", "One")
            .with_length(Duration::from_secs(100))
            .with_format(44100, 16, 2),
        Track::new("/music/two.flac")
            .with_tag("title", "Two")
            .with_length(Duration::from_secs(200))
            .with_format(48000, 24, 2),
    ]
}

fn local<F: Future>(f: F) -> impl Future<Output = F::Output> {
    async move { LocalSet::new().run_until(f).await }
}

/// Waits until `cond` holds, giving the server tasks time to run.
async fn eventually(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Client {
            stream: BufReader::new(stream),
        };
        assert_eq!(client.line().await, "OK MPD 0.17.0");
        client
    }

    async fn send(&mut self, request: &str) {
        let stream = self.stream.get_mut();
        stream.write_all(request.as_bytes()).await.unwrap();
        stream.write_all(b"\n").await.unwrap();
    }

    async fn line(&mut self) -> String {
        let mut line = String::new();
        timeout(Duration::from_secs(2), self.stream.read_line(&mut line))
            .await
            .expect("no answer from the server")
            .unwrap();
        assert!(line.ends_with('\n'), "unterminated line {:?}", line);
        line.pop();
        line
    }

    /// Sends `request` and collects the answer up to and including the
    /// final `OK` or `ACK` line.
    async fn request(&mut self, request: &str) -> Vec<String> {
        self.send(request).await;

        let mut lines = vec![];
        loop {
            let line = self.line().await;
            let done = line == "OK" || line.starts_with("ACK ");
            lines.push(line);
            if done {
                return lines;
            }
        }
    }
}

#[tokio::test]
async fn ts_on_status_and_playback() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player.clone()).await.unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        let status = client.request("status").await;
        assert!(status.contains(&"state: stop".to_string()));
        assert_eq!(status.last().unwrap(), "OK");

        assert_eq!(client.request("play").await, vec!["OK"]);
        let status = client.request("status").await;
        assert!(status.contains(&"state: play".to_string()));
        assert!(status.contains(&"audio: 44100:16:2".to_string()));

        let song = client.request("currentsong").await;
        assert_eq!(song[0], "file: /music/one.flac");
        assert!(song.contains(&"Title: One".to_string()));

        assert_eq!(client.request("setvol 42").await, vec!["OK"]);
        let status = client.request("status").await;
        assert!(status.contains(&"volume: 42".to_string()));

        assert_eq!(
            client.request("setvol loud").await,
            vec!["ACK [2] {setvol} invalid arg"]
        );

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_empty_queue() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(vec![]));
        let mut server = Server::start(&config(None), player).await.unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        assert_eq!(client.request("play").await, vec!["OK"]);
        let status = client.request("status").await;
        assert!(status.contains(&"state: stop".to_string()));
        assert_eq!(client.request("currentsong").await, vec!["OK"]);

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_close() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player).await.unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        // nothing after `close` is answered
        client
            .stream
            .get_mut()
            .write_all(b"close\nping\n")
            .await
            .unwrap();
        let mut rest = vec![];
        let n = timeout(Duration::from_secs(2), client.stream.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);

        eventually(|| server.connection_count() == 0).await;
        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_password() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(Some("secret")), player)
            .await
            .unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        assert_eq!(client.request("ping").await, vec!["OK"]);
        assert_eq!(
            client.request("status").await,
            vec!["ACK [4] {status} Insufficient permission"]
        );
        assert_eq!(
            client.request("password wrong").await,
            vec!["ACK [3] {password} Password incorrect"]
        );
        assert_eq!(client.request("password secret").await, vec!["OK"]);
        assert_eq!(client.request("status").await.last().unwrap(), "OK");

        // permissions are per connection
        let mut other = Client::connect(server.local_addr()).await;
        assert_eq!(
            other.request("play").await,
            vec!["ACK [4] {play} Insufficient permission"]
        );

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_command_list() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player).await.unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        client.send("command_list_ok_begin").await;
        client.send("ping").await;
        client.send("setvol 10").await;
        assert_eq!(
            client.request("command_list_end").await,
            vec!["list_OK", "list_OK", "OK"]
        );

        client.send("command_list_begin").await;
        client.send("ping").await;
        client.send("pause 2").await;
        client.send("ping").await;
        assert_eq!(
            client.request("command_list_end").await,
            vec!["ACK [2@1] {pause} invalid arg"]
        );

        // the failed list is gone, the connection is usable again
        assert_eq!(client.request("ping").await, vec!["OK"]);
        assert_eq!(
            client.request("command_list_end").await,
            vec!["ACK [1@0] {command_list_end} list_end without begin"]
        );

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_idle() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player).await.unwrap();
        let mut idler = Client::connect(server.local_addr()).await;
        let mut other = Client::connect(server.local_addr()).await;

        idler.send("idle mixer").await;
        // not a mixer change, the idler stays quiet
        assert_eq!(other.request("repeat 1").await, vec!["OK"]);
        assert_eq!(other.request("setvol 30").await, vec!["OK"]);
        assert_eq!(idler.line().await, "changed: mixer");
        assert_eq!(idler.line().await, "OK");

        // the options change was queued while waiting on the mixer
        assert_eq!(
            idler.request("idle").await,
            vec!["changed: options", "OK"]
        );

        // `noidle` ends a wait with nothing pending
        idler.send("idle player").await;
        assert_eq!(idler.request("noidle").await, vec!["OK"]);

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_song_change_in_command_list() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player).await.unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        client.send("command_list_begin").await;
        client.send("next").await;
        client.send("status").await;
        client.send("plchanges 0").await;
        let out = client.request("command_list_end").await;
        assert!(out.contains(&"playlist: 1".to_string()), "{:?}", out);
        assert!(out.contains(&"file: /music/one.flac".to_string()), "{:?}", out);

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_fresh_service_after_close() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player).await.unwrap();

        let mut first = Client::connect(server.local_addr()).await;
        first.stream.get_mut().write_all(b"next\nclose\n").await.unwrap();
        let mut rest = vec![];
        timeout(Duration::from_secs(2), first.stream.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        eventually(|| !server.has_service()).await;

        let mut second = Client::connect(server.local_addr()).await;
        let status = second.request("status").await;
        assert!(status.contains(&"playlist: 0".to_string()), "{:?}", status);

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_fixed_replies() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(vec![]));
        let mut server = Server::start(&config(None), player).await.unwrap();
        let mut client = Client::connect(server.local_addr()).await;

        assert_eq!(
            client.request("outputs").await,
            vec!["outputid: 0", "outputname: dummy", "outputenabled: 1", "OK"]
        );
        assert_eq!(
            client.request("count").await,
            vec!["songs: 0", "playtime: 0", "OK"]
        );

        let tagtypes = client.request("tagtypes").await;
        assert_eq!(tagtypes.len(), 19);
        assert_eq!(tagtypes[0], "tagtype: Artist");
        assert!(tagtypes.contains(&"tagtype: Date".to_string()));
        assert_eq!(tagtypes[17], "tagtype: MUSICBRAINZ_TRACKID");
        assert_eq!(tagtypes[18], "OK");

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_service_lifecycle() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(tracks()));
        let mut server = Server::start(&config(None), player.clone()).await.unwrap();
        assert!(!server.has_service());
        assert_eq!(player.subscriber_count(), 0);

        let first = Client::connect(server.local_addr()).await;
        let mut second = Client::connect(server.local_addr()).await;
        assert!(server.has_service());
        assert_eq!(player.subscriber_count(), 1);
        assert_eq!(server.connection_count(), 2);

        drop(first);
        eventually(|| server.connection_count() == 1).await;
        assert!(server.has_service());

        assert_eq!(second.request("ping").await, vec!["OK"]);
        drop(second);
        eventually(|| !server.has_service()).await;
        assert_eq!(player.subscriber_count(), 0);

        // a new client brings the service back
        let mut third = Client::connect(server.local_addr()).await;
        assert!(server.has_service());

        server.stop().await;
        let mut rest = vec![];
        let n = timeout(Duration::from_secs(2), third.stream.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
        assert!(!server.is_running());
        assert_eq!(server.connection_count(), 0);
        assert!(!server.has_service());
        assert_eq!(player.subscriber_count(), 0);

        server.stop().await;
    })
    .await;
}

#[tokio::test]
async fn ts_on_bind_error() {
    local(async {
        let player = Rc::new(MemoryPlayer::new(vec![]));
        let mut server = Server::start(&config(None), player.clone()).await.unwrap();

        let taken = Config {
            port: server.local_addr().port(),
            ..config(None)
        };
        match Server::start(&taken, player).await {
            Err(Error::BindError { addr, .. }) => assert_eq!(addr, taken.addr()),
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("bound a port twice"),
        }

        server.stop().await;
    })
    .await;
}
