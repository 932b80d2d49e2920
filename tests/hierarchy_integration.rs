//! Integration tests for the node hierarchy
//!
//! These tests validate attach/detach cascades through the public API:
//! - Server and client lifecycle policies
//! - Subtree teardown on detach and stop
//! - Types embedding a node via `Relay`
//! - Context propagation and cancellation

mod common;

use common::builders::NodeBuilder;
use common::relays::{RecordingSink, Shouter};
use common::{test_timeout, wait_until};
use relay_hierarchy::{Context, Lifecycle, Node, Relay, State, StopSignal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

#[test]
fn test_chain_detach_stops_subtree() {
    let a: Node<u32> = NodeBuilder::new("a").build();
    let b: Node<u32> = NodeBuilder::new("b").build();
    let c: Node<u32> = NodeBuilder::new("c").client().build();

    b.add_client(&c);
    a.add_client(&b);
    assert!(a.is_running() && b.is_running() && c.is_running());

    a.remove_client(&b);

    assert_eq!(b.state(), State::Stopped);
    assert_eq!(c.state(), State::Stopped);
    assert!(!a.is_running(), "server without clients should stop");
    assert!(!c.has_parent());
}

#[test]
fn test_root_stop_stops_wide_tree() {
    let root: Node<u32> = Node::new("root");
    let mids: Vec<Node<u32>> = (0..3).map(|i| Node::new(format!("mid{}", i))).collect();
    let leaves: Vec<Node<u32>> = (0..9).map(|i| Node::client(format!("leaf{}", i))).collect();

    for (i, leaf) in leaves.iter().enumerate() {
        mids[i % 3].add_client(leaf);
    }
    for mid in &mids {
        root.add_client(mid);
    }
    assert_eq!(root.snapshot().node_count(), 13);

    root.stop();

    assert!(mids.iter().all(|n| n.is_stopped()));
    assert!(leaves.iter().all(|n| n.is_stopped()));
    assert_eq!(root.snapshot().node_count(), 1);
}

#[test]
fn test_relay_wrappers_attach_and_detach() {
    let shouter = Shouter::new("shouter");
    let sink = RecordingSink::new("sink");

    shouter.add_client(&sink);
    assert!(shouter.is_running());
    assert!(sink.is_running());

    shouter.remove_client(&sink);
    assert!(!sink.is_running());
    assert!(!shouter.is_running());
}

#[test]
fn test_relay_wrapper_stop_cascades() {
    let root: Node<String> = Node::new("root");
    let shouter = Shouter::new("shouter");
    let sink = RecordingSink::new("sink");

    shouter.add_client(&sink);
    root.add_client(&shouter);

    shouter.stop();
    assert!(!sink.is_running());
    assert!(!root.is_running(), "root lost its only client");
    assert_eq!(root.client_count(), 0);
}

#[test]
fn test_events_along_cascade() {
    let server: Node<u32> = Node::new("server");
    let client: Node<u32> = Node::client("client");

    let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for node in [&server, &client] {
        for event in [Lifecycle::Start, Lifecycle::Stop] {
            let log = log.clone();
            let id = node.id().to_string();
            node.on(event, move |e| log.lock().push(format!("{}:{}", id, e)));
        }
    }

    server.add_client(&client);
    server.remove_client(&client);

    assert_eq!(
        *log.lock(),
        vec!["client:start", "server:start", "client:stop", "server:stop"]
    );
}

#[test]
fn test_off_removes_listener() {
    let node: Node<u32> = Node::new("n");
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let id = node.on(Lifecycle::Start, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    node.start();
    node.stop();
    assert!(node.off(id));
    assert!(!node.off(id));
    node.start();
    node.stop();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_context_reaches_grandchildren() {
    let ctx = Context::new();
    let root: Node<u32> = NodeBuilder::new("root").context(ctx.clone()).build();
    let mid: Node<u32> = Node::new("mid");
    let leaf: Node<u32> = Node::client("leaf");

    root.add_client(&mid);
    mid.add_client(&leaf);

    assert!(mid.context().unwrap().same_as(&ctx));
    assert!(leaf.context().unwrap().same_as(&ctx));
    root.stop();
}

#[test]
fn test_context_timeout_tears_down_tree() {
    let root: Node<u32> = Node::new("root");
    let leaf: Node<u32> = Node::client("leaf");
    root.watch_context(Context::with_timeout(std::time::Duration::from_millis(20)));

    root.add_client(&leaf);
    assert!(root.is_running());

    assert!(root.wait_timeout(test_timeout()));
    assert!(wait_until(test_timeout(), || leaf.is_stopped()));
    assert!(!leaf.has_parent());
}

#[test]
fn test_attach_detach_from_many_threads_with_task() {
    let server: Node<u32> = Node::new("server");
    server.set_task(|stop: StopSignal| stop.wait());
    let clients: Vec<Node<u32>> = (0..4).map(|i| Node::client(format!("c{}", i))).collect();
    let barrier = Barrier::new(clients.len());

    std::thread::scope(|s| {
        for client in &clients {
            let server = &server;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    server.add_client(client);
                    assert!(server.is_running());
                    server.remove_client(client);
                }
            });
        }
    });

    assert_eq!(server.client_count(), 0);
    assert!(server.is_stopped());
    assert!(clients.iter().all(|c| c.is_stopped()));
}

#[test]
fn test_concurrent_attach_and_detach() {
    let server: Node<u32> = Node::new("server");
    let clients: Vec<Node<u32>> = (0..8).map(|i| Node::client(format!("c{}", i))).collect();

    std::thread::scope(|s| {
        for client in &clients {
            let server = &server;
            s.spawn(move || {
                for _ in 0..20 {
                    server.add_client(client);
                    server.remove_client(client);
                }
            });
        }
    });

    assert_eq!(server.client_count(), 0);
    assert!(clients.iter().all(|c| c.is_stopped() && !c.has_parent()));
    assert!(server.is_stopped(), "server without clients is {:?}", server.state());
}
