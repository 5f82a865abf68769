use super::*;
use crate::runtime::channel::local_channel;
use std::time::Duration;

#[test]
fn test_input_gate_single_channel() {
    let (sender, receiver) = local_channel::<i32>(10);
    let mut gate = InputGate::new(vec![receiver]);

    sender.send(StreamElement::record(1)).unwrap();
    sender.send(StreamElement::record(2)).unwrap();
    sender.send(StreamElement::End).unwrap();

    let (idx, elem) = gate.next().unwrap();
    assert_eq!(idx, 0);
    assert_eq!(elem, StreamElement::record(1));

    let (_, elem) = gate.next().unwrap();
    assert_eq!(elem, StreamElement::record(2));

    let (_, elem) = gate.next().unwrap();
    assert_eq!(elem, StreamElement::End);
    assert!(gate.all_ended());
    assert!(gate.next().is_err());
}

#[test]
fn test_end_surfaces_only_after_all_channels() {
    let (sender1, receiver1) = local_channel::<i32>(10);
    let (sender2, receiver2) = local_channel::<i32>(10);
    let mut gate = InputGate::new(vec![receiver1, receiver2]);

    sender1.send(StreamElement::End).unwrap();
    sender2.send(StreamElement::record(7)).unwrap();
    sender2.send(StreamElement::End).unwrap();

    let mut seen = Vec::new();
    loop {
        let (_, elem) = gate.next().unwrap();
        let done = elem == StreamElement::End;
        seen.push(elem);
        if done {
            break;
        }
    }

    assert_eq!(seen, vec![StreamElement::record(7), StreamElement::End]);
    assert!(gate.all_ended());
}

#[test]
fn test_flush_request_passes_through() {
    let (sender1, receiver1) = local_channel::<i32>(10);
    let (_sender2, receiver2) = local_channel::<i32>(10);
    let mut gate = InputGate::new(vec![receiver1, receiver2]);

    sender1.request_flush().unwrap();
    let (idx, elem) = gate.next().unwrap();
    assert_eq!(idx, 0);
    assert_eq!(elem, StreamElement::Flush);
    assert!(!gate.all_ended());
}

#[test]
fn test_next_timeout_returns_none_when_idle() {
    let (sender, receiver) = local_channel::<i32>(10);
    let mut gate = InputGate::new(vec![receiver]);

    assert!(gate
        .next_timeout(Duration::from_millis(5))
        .unwrap()
        .is_none());

    sender.send(StreamElement::record(3)).unwrap();
    let (_, elem) = gate
        .next_timeout(Duration::from_millis(100))
        .unwrap()
        .unwrap();
    assert_eq!(elem, StreamElement::record(3));
}

#[test]
fn test_disconnect_without_end_is_error() {
    let (sender, receiver) = local_channel::<i32>(10);
    let mut gate = InputGate::new(vec![receiver]);
    drop(sender);

    assert!(gate.next().is_err());
}
