use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::protocol::{ClientEvent, PlayerId};
use crate::session::RoomRegistry;

/// Accepts websocket connections forever, one task per connection.
pub async fn serve(listener: TcpListener, registry: Arc<RoomRegistry>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "tcp connection accepted");
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, registry).await {
                warn!(%addr, error = ?e, "connection error");
            }
        });
    }
}

async fn handle_conn(stream: TcpStream, registry: Arc<RoomRegistry>) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let player = registry.register(outbox);
    info!(%player, "player connected");

    let outcome = async {
        loop {
            tokio::select! {
                Some(event) = inbox.recv() => {
                    let text = serde_json::to_string(&event)?;
                    ws_tx.send(Message::Text(text)).await?;
                }
                msg = ws_rx.next() => match msg {
                    Some(Ok(Message::Text(text))) => handle_frame(&registry, player, text).await?,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    // Connection loss goes through the same per-room locks as any action.
    registry.disconnect(player);
    outcome
}

// Room actions may reshuffle under the room lock, so they run on the
// blocking pool. Awaiting keeps one connection's events in order.
async fn handle_frame(
    registry: &Arc<RoomRegistry>,
    player: PlayerId,
    text: String,
) -> anyhow::Result<()> {
    match serde_json::from_str::<ClientEvent>(&text) {
        Ok(event) => {
            let registry = Arc::clone(registry);
            task::spawn_blocking(move || registry.dispatch(player, event)).await?;
        }
        Err(e) => {
            debug!(%player, error = %e, "malformed frame");
            registry.send_error(player, format!("malformed event: {e}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::protocol::ServerEvent;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    #[tokio::test]
    async fn busy_room_does_not_stall_other_players() {
        let registry = Arc::new(RoomRegistry::new(GameConfig::default()).unwrap());
        let (alice_tx, _alice_rx) = mpsc::unbounded_channel();
        let alice = registry.register(alice_tx);
        let room = registry.create_room(alice, "alice").unwrap();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        let bob = registry.register(bob_tx);
        assert!(matches!(bob_rx.recv().await, Some(ServerEvent::Connected { .. })));

        // Another thread sits inside the room's critical section until bob
        // has been served, or gives up after a while.
        let (locked_tx, locked_rx) = std_mpsc::channel();
        let (served_tx, served_rx) = std_mpsc::channel::<()>();
        let handle = registry.handle(room.as_str()).unwrap();
        let holder = std::thread::spawn(move || {
            let _room = handle.lock();
            locked_tx.send(()).unwrap();
            served_rx.recv_timeout(Duration::from_secs(3)).is_ok()
        });
        locked_rx.recv().unwrap();

        let restart = format!(r#"{{"event":"restart","data":{{"room":"{room}"}}}}"#);
        let busy = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { handle_frame(&registry, alice, restart).await }
        });
        task::yield_now().await;

        let create = r#"{"event":"create_room","data":{"name":"bob"}}"#.to_string();
        handle_frame(&registry, bob, create).await.unwrap();
        assert!(matches!(bob_rx.recv().await, Some(ServerEvent::RoomCreated { .. })));
        let _ = served_tx.send(());

        assert!(holder.join().unwrap(), "bob was only served after the lock was released");
        busy.await.unwrap().unwrap();
        assert_eq!(registry.room_count(), 2);
    }
}
