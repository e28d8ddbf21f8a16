// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Port Integration Tests
//!
//! Ports fed by object signals and user packets from several threads.

use crate::config::USER_PACKET_PAYLOAD_SIZE;
use crate::object::{
    channel_create, channel_read, channel_write, event_create, object_signal, MessagePacket,
    PacketType, Port, PortPacket, Signals, WaitAsyncMode,
};
use crate::sched::{deadline_after, Deadline};
use crate::status::RxStatus;
use core::time::Duration;
use std::collections::BTreeSet;
use std::thread;
use std::vec::Vec;

fn short_deadline() -> Deadline {
    deadline_after(Duration::from_millis(10))
}

fn long_deadline() -> Deadline {
    deadline_after(Duration::from_secs(10))
}

/// Test two firings before a wait come out as one packet with count 2
#[test]
fn test_two_signals_one_packet() {
    let port = Port::create();
    let handle = event_create();
    port.bind(&handle, 11, Signals::SIGNALED, WaitAsyncMode::Repeating)
        .unwrap();

    object_signal(&handle, Signals::empty(), Signals::SIGNALED).unwrap();
    object_signal(&handle, Signals::SIGNALED, Signals::empty()).unwrap();
    object_signal(&handle, Signals::empty(), Signals::SIGNALED).unwrap();

    let packet = port.wait(short_deadline()).unwrap();
    assert_eq!(packet.key, 11);
    assert_eq!(packet.packet_type, PacketType::SignalRepeating);
    assert_eq!(packet.signal().unwrap().count, 2);
    assert_eq!(port.pending_count(), 0);
    handle.close();
}

/// Test a port driving a channel reader loop
#[test]
fn test_port_driven_channel_reader() {
    const MESSAGES: u8 = 5;

    let port = Port::create();
    let (a, b) = channel_create();
    port.bind(&b, 1, Signals::READABLE, WaitAsyncMode::Repeating)
        .unwrap();

    let writer = thread::spawn(move || {
        for i in 0..MESSAGES {
            channel_write(&a, MessagePacket::create(&[i], 0).unwrap()).unwrap();
        }
        a
    });

    let mut received = Vec::new();
    while received.len() < MESSAGES as usize {
        let packet = port.wait(long_deadline()).unwrap();
        assert_eq!(packet.key, 1);
        loop {
            match channel_read(&b) {
                Ok(msg) => received.push(msg.data()[0]),
                Err(RxStatus::ERR_SHOULD_WAIT) => break,
                Err(err) => panic!("unexpected {:?}", err),
            }
        }
    }

    assert_eq!(received, (0..MESSAGES).collect::<Vec<_>>());
    writer.join().unwrap().close();
    b.close();
}

/// Test several consumers drain user packets exactly once
#[test]
fn test_multiple_consumers() {
    const PACKETS: u64 = 64;
    const CONSUMERS: usize = 4;

    let port = Port::create();
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let port = port.clone();
            thread::spawn(move || {
                let mut keys = Vec::new();
                while let Ok(packet) = port.wait(deadline_after(Duration::from_millis(200))) {
                    keys.push(packet.key);
                }
                keys
            })
        })
        .collect();

    for key in 0..PACKETS {
        port.queue(PortPacket::user(key, 0, [0; USER_PACKET_PAYLOAD_SIZE]))
            .unwrap();
    }

    let mut seen = BTreeSet::new();
    for consumer in consumers {
        for key in consumer.join().unwrap() {
            assert!(seen.insert(key), "packet {} delivered twice", key);
        }
    }
    assert_eq!(seen.len(), PACKETS as usize);
}

/// Test closing the bound object's last handle stops further packets
#[test]
fn test_destroyed_object_parks_packet() {
    let port = Port::create();
    let handle = event_create();
    port.bind(&handle, 2, Signals::SIGNALED, WaitAsyncMode::Repeating)
        .unwrap();
    object_signal(&handle, Signals::empty(), Signals::SIGNALED).unwrap();

    let object = handle.object().clone();
    handle.close();
    assert!(object.is_destroying());
    assert_eq!(object.tracker().observer_count(), 0);

    assert_eq!(port.wait(short_deadline()).unwrap().key, 2);
    assert_eq!(port.zero_ref_count(), 1);
    assert_eq!(port.wait(short_deadline()), Err(RxStatus::ERR_TIMED_OUT));
}
