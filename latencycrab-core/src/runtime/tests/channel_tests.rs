use super::*;
use crate::types::StreamRecord;

#[test]
fn test_local_channel_send_recv() {
    let (sender, receiver) = local_channel::<i32>(10);

    sender.send(StreamElement::record(42)).unwrap();

    match receiver.recv().unwrap() {
        StreamElement::Record(rec) => assert_eq!(rec.value, 42),
        _ => panic!("Expected Record"),
    }
}

#[test]
fn test_flush_request_keeps_order() {
    let (sender, receiver) = local_channel::<i32>(10);

    sender.send(StreamElement::record(1)).unwrap();
    sender.request_flush().unwrap();
    sender.send(StreamElement::record(2)).unwrap();

    assert_eq!(
        receiver.recv().unwrap(),
        StreamElement::Record(StreamRecord::new(1))
    );
    assert_eq!(receiver.recv().unwrap(), StreamElement::Flush);
    assert_eq!(
        receiver.recv().unwrap(),
        StreamElement::Record(StreamRecord::new(2))
    );
}

#[test]
fn test_local_channel_backpressure() {
    let (sender, receiver) = local_channel::<i32>(2);

    sender.send(StreamElement::record(1)).unwrap();
    sender.send(StreamElement::record(2)).unwrap();
    assert_eq!(receiver.len(), 2);

    // try_send should fail (channel full)
    assert!(sender.try_send(StreamElement::record(3)).is_err());

    receiver.recv().unwrap();
    sender.try_send(StreamElement::record(3)).unwrap();
}

#[test]
fn test_local_channel_closed() {
    let (sender, receiver) = local_channel::<i32>(10);

    sender.send(StreamElement::record(42)).unwrap();
    drop(sender);

    // Buffered element is still delivered.
    assert!(matches!(receiver.recv().unwrap(), StreamElement::Record(_)));
    assert!(receiver.recv().is_err());
    assert!(receiver.try_recv().is_err());
}

#[test]
fn test_try_recv_empty() {
    let (_sender, receiver) = local_channel::<i32>(10);
    assert!(receiver.is_empty());
    assert!(receiver.try_recv().unwrap().is_none());
}
