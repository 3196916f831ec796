//! Integration tests for the arena engine and its TCP transport
//!
//! These tests drive the public `ArenaHandle` and a real listener, the same
//! way the server binary does.

use server::arena::{Arena, ArenaHandle, PlayerSession};
use server::config::ArenaConfig;
use server::network::Server;
use shared::{read_frame, write_frame, ClientPacket, Direction, Event, JoinSnapshot, TickUpdate};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Small arena whose ticker never fires during a test; ticks are injected.
fn manual_config() -> ArenaConfig {
    ArenaConfig {
        width: 10,
        height: 10,
        initial_length: 3,
        tick_interval: Duration::from_secs(3600),
        seed: Some(42),
        ..ArenaConfig::default()
    }
}

async fn next_event(session: &mut PlayerSession) -> Event {
    timeout(Duration::from_secs(2), session.events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("mailbox closed unexpectedly")
}

async fn expect_snapshot(session: &mut PlayerSession) -> JoinSnapshot {
    match next_event(session).await {
        Event::Joined(snapshot) => snapshot,
        other => panic!("expected join snapshot, got {:?}", other),
    }
}

async fn expect_tick(session: &mut PlayerSession) -> TickUpdate {
    match next_event(session).await {
        Event::Tick(update) => update,
        other => panic!("expected tick update, got {:?}", other),
    }
}

/// END-TO-END ARENA TESTS
mod arena_tests {
    use super::*;

    /// Two players join, steer in opposite directions and see the same tick
    #[tokio::test]
    async fn two_players_share_one_tick_update() {
        let (arena, _task) = Arena::spawn(manual_config()).unwrap();

        let mut a = arena.join("alice").await.unwrap();
        let snapshot_a = expect_snapshot(&mut a).await;
        assert!(snapshot_a.others.is_empty());
        assert_eq!(snapshot_a.berries.len(), 3);
        assert_eq!(snapshot_a.player.body.len(), 3);

        let mut b = arena.join("bob").await.unwrap();
        let snapshot_b = expect_snapshot(&mut b).await;
        assert_eq!(snapshot_b.others.len(), 1);
        assert_eq!(snapshot_b.others[0].id, a.id);

        match next_event(&mut a).await {
            Event::PeerJoined(peer) => {
                assert_eq!(peer.id, b.id);
                assert_eq!(peer.username, "bob");
                assert_eq!(peer.body.len(), 3);
            }
            other => panic!("expected peer joined, got {:?}", other),
        }

        arena.change_direction(a.id, Direction::Right).await.unwrap();
        arena.change_direction(b.id, Direction::Left).await.unwrap();
        arena.tick().await.unwrap();

        let tick_a = expect_tick(&mut a).await;
        let tick_b = expect_tick(&mut b).await;
        assert_eq!(tick_a, tick_b);
        assert_eq!(tick_a.tick, 1);
        assert_eq!(tick_a.updates.len(), 2);

        let start_a = snapshot_a.player.body[0];
        let start_b = snapshot_b.player.body[0];
        let update_a = tick_a.updates.iter().find(|u| u.id == a.id).unwrap();
        let update_b = tick_a.updates.iter().find(|u| u.id == b.id).unwrap();
        assert_eq!(update_a.prev_head, start_a);
        assert_eq!(update_a.head, start_a.step(Direction::Right, 10, 10));
        assert_eq!(update_b.prev_head, start_b);
        assert_eq!(update_b.head, start_b.step(Direction::Left, 10, 10));
        // Both snakes are still uncoiling, so their tails stay put.
        assert!(!update_a.clear_tail);
        assert!(!update_b.clear_tail);
    }

    /// The tail starts clearing once the snake has fully uncoiled
    #[tokio::test]
    async fn tail_clears_after_uncoiling() {
        let config = ArenaConfig {
            initial_berries: 0,
            ..manual_config()
        };
        let (arena, _task) = Arena::spawn(config).unwrap();
        let mut a = arena.join("alice").await.unwrap();
        let start = expect_snapshot(&mut a).await.player.body[0];

        arena.change_direction(a.id, Direction::Down).await.unwrap();
        let mut clears = Vec::new();
        for _ in 0..4 {
            arena.tick().await.unwrap();
            let update = expect_tick(&mut a).await;
            clears.push(update.updates[0].clear_tail);
        }

        assert_eq!(clears, vec![false, false, true, true]);
        arena.tick().await.unwrap();
        let update = expect_tick(&mut a).await;
        let second_cell = start
            .step(Direction::Down, 10, 10)
            .step(Direction::Down, 10, 10);
        assert_eq!(update.updates[0].tail, second_cell);
    }

    /// A client replaying updates on its own copy of the body agrees with
    /// every clear_tail flag, even when the snake doubles back on itself
    #[tokio::test]
    async fn clear_tail_matches_replayed_body_through_reversal() {
        let config = ArenaConfig {
            initial_berries: 0,
            ..manual_config()
        };
        let (arena, _task) = Arena::spawn(config).unwrap();
        let mut a = arena.join("alice").await.unwrap();
        let mut body: VecDeque<_> = expect_snapshot(&mut a).await.player.body.into();

        let moves = [
            Direction::Right,
            Direction::Left,
            Direction::Left,
            Direction::Left,
            Direction::Up,
            Direction::Down,
        ];
        for direction in moves {
            arena.change_direction(a.id, direction).await.unwrap();
            arena.tick().await.unwrap();
            let update = expect_tick(&mut a).await.updates[0];

            assert_eq!(body.pop_back(), Some(update.tail));
            body.push_front(update.head);
            assert_eq!(
                update.clear_tail,
                !body.contains(&update.tail),
                "moving {:?} to {}",
                direction,
                update.head
            );
        }
    }

    /// A player that never steered is left out of tick updates
    #[tokio::test]
    async fn idle_players_are_not_reported() {
        let (arena, _task) = Arena::spawn(manual_config()).unwrap();
        let mut a = arena.join("alice").await.unwrap();
        let mut b = arena.join("bob").await.unwrap();
        expect_snapshot(&mut a).await;
        expect_snapshot(&mut b).await;
        next_event(&mut a).await;

        arena.change_direction(b.id, Direction::Up).await.unwrap();
        arena.tick().await.unwrap();

        let update = expect_tick(&mut a).await;
        assert_eq!(update.updates.len(), 1);
        assert_eq!(update.updates[0].id, b.id);
    }

    /// Tick numbers increase by one per pulse, with or without players
    #[tokio::test]
    async fn tick_numbers_are_sequential() {
        let (arena, _task) = Arena::spawn(manual_config()).unwrap();
        arena.tick().await.unwrap();
        arena.tick().await.unwrap();

        let mut a = arena.join("alice").await.unwrap();
        expect_snapshot(&mut a).await;
        arena.tick().await.unwrap();
        arena.tick().await.unwrap();

        assert_eq!(expect_tick(&mut a).await.tick, 3);
        assert_eq!(expect_tick(&mut a).await.tick, 4);
    }
}

/// PLAYER LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// Duplicate usernames are refused by closing the requester's mailbox
    #[tokio::test]
    async fn duplicate_username_is_refused() {
        let (arena, _task) = Arena::spawn(manual_config()).unwrap();
        let mut first = arena.join("alice").await.unwrap();
        expect_snapshot(&mut first).await;

        let mut second = arena.join("alice").await.unwrap();
        let closed = timeout(Duration::from_secs(2), second.events.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
    }

    /// Every colour in the palette is handed out once, then joins are refused
    #[tokio::test]
    async fn palette_caps_concurrent_players() {
        let config = ArenaConfig {
            palette_size: 3,
            ..manual_config()
        };
        let (arena, _task) = Arena::spawn(config).unwrap();

        let mut colors = HashSet::new();
        let mut sessions = Vec::new();
        for name in ["a", "b", "c"] {
            let mut session = arena.join(name).await.unwrap();
            colors.insert(expect_snapshot(&mut session).await.player.color);
            sessions.push(session);
        }
        assert_eq!(colors.len(), 3);

        let mut refused = arena.join("d").await.unwrap();
        assert!(refused.events.recv().await.is_none());
    }

    /// Leaving returns the colour and the username for reuse
    #[tokio::test]
    async fn leave_frees_colour_and_username() {
        let config = ArenaConfig {
            palette_size: 1,
            ..manual_config()
        };
        let (arena, _task) = Arena::spawn(config).unwrap();

        let mut first = arena.join("alice").await.unwrap();
        let color = expect_snapshot(&mut first).await.player.color;
        arena.leave(first.id).await.unwrap();
        assert!(first.events.recv().await.is_none());

        let mut again = arena.join("alice").await.unwrap();
        let snapshot = expect_snapshot(&mut again).await;
        assert_eq!(snapshot.player.color, color);
        assert_ne!(again.id, first.id);
    }

    /// A player whose receiver is dropped is removed on the next broadcast
    #[tokio::test]
    async fn dropped_receiver_is_reaped() {
        let config = ArenaConfig {
            palette_size: 1,
            ..manual_config()
        };
        let (arena, _task) = Arena::spawn(config).unwrap();

        let mut gone = arena.join("alice").await.unwrap();
        expect_snapshot(&mut gone).await;
        drop(gone);
        arena.tick().await.unwrap();

        let mut next = arena.join("bob").await.unwrap();
        let snapshot = expect_snapshot(&mut next).await;
        assert!(snapshot.others.is_empty());
    }

    /// Shutdown closes every mailbox and the handle reports the arena gone
    #[tokio::test]
    async fn shutdown_closes_everything() {
        let (arena, task) = Arena::spawn(manual_config()).unwrap();
        let mut a = arena.join("alice").await.unwrap();
        let mut b = arena.join("bob").await.unwrap();

        arena.shutdown().await.unwrap();
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

        for session in [&mut a, &mut b] {
            while session.events.recv().await.is_some() {}
        }
        assert!(arena.is_closed());
        assert!(arena.join("carol").await.is_err());
    }
}

/// TCP TRANSPORT TESTS
mod transport_tests {
    use super::*;
    use std::net::SocketAddr;

    async fn start(config: ArenaConfig) -> (ArenaHandle, SocketAddr) {
        let (arena, _task) = Arena::spawn(config).unwrap();
        let server = Server::bind("127.0.0.1:0", arena.clone()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        (arena, addr)
    }

    async fn join(addr: SocketAddr, username: &str) -> (TcpStream, JoinSnapshot) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let packet = ClientPacket::Join {
            username: username.to_string(),
        };
        write_frame(&mut stream, &packet).await.unwrap();
        match read_frame::<_, Event>(&mut stream).await.unwrap() {
            Some(Event::Joined(snapshot)) => (stream, snapshot),
            other => panic!("expected join snapshot, got {:?}", other),
        }
    }

    /// Two TCP clients see each other and receive the same tick
    #[tokio::test]
    async fn tcp_clients_play_together() {
        let (arena, addr) = start(manual_config()).await;
        let (mut alice, _) = join(addr, "alice").await;
        let (mut bob, snapshot) = join(addr, "bob").await;
        assert_eq!(snapshot.others.len(), 1);

        match read_frame::<_, Event>(&mut alice).await.unwrap() {
            Some(Event::PeerJoined(peer)) => assert_eq!(peer.username, "bob"),
            other => panic!("expected peer joined, got {:?}", other),
        }

        let turn = ClientPacket::ChangeDirection(Direction::Right);
        write_frame(&mut alice, &turn).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        arena.tick().await.unwrap();

        let seen_by_alice: Option<Event> = read_frame(&mut alice).await.unwrap();
        let seen_by_bob: Option<Event> = read_frame(&mut bob).await.unwrap();
        assert_eq!(seen_by_alice, seen_by_bob);
        match seen_by_alice {
            Some(Event::Tick(update)) => assert_eq!(update.updates.len(), 1),
            other => panic!("expected tick, got {:?}", other),
        }
    }

    /// A Leave packet ends the session and frees the username
    #[tokio::test]
    async fn leave_packet_frees_username() {
        let (_arena, addr) = start(manual_config()).await;
        let (mut alice, _) = join(addr, "alice").await;

        write_frame(&mut alice, &ClientPacket::Leave).await.unwrap();
        let closed: Option<Event> = read_frame(&mut alice).await.unwrap();
        assert!(closed.is_none());

        let (_again, snapshot) = join(addr, "alice").await;
        assert!(snapshot.others.is_empty());
    }

    /// Closing the socket without a Leave still removes the player
    #[tokio::test]
    async fn disconnect_removes_player() {
        let (_arena, addr) = start(manual_config()).await;
        let (alice, _) = join(addr, "alice").await;
        drop(alice);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (_bob, snapshot) = join(addr, "bob").await;
        assert!(snapshot.others.is_empty());
    }
}
