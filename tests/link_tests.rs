use cubesat_fsw::link::{self, MAX_LINK_FRAME};
use std::io::ErrorKind;
use tokio::io::{duplex, AsyncWriteExt};

#[tokio::test]
async fn test_frames_arrive_in_order() {
    let (mut client, mut server) = duplex(1024);

    link::write_frame(&mut client, b"first").await.unwrap();
    link::write_frame(&mut client, b"").await.unwrap();
    link::write_frame(&mut client, &[0xAB; 300]).await.unwrap();
    drop(client);

    assert_eq!(link::read_frame(&mut server).await.unwrap(), Some(b"first".to_vec()));
    assert_eq!(link::read_frame(&mut server).await.unwrap(), Some(Vec::new()));
    assert_eq!(link::read_frame(&mut server).await.unwrap(), Some(vec![0xAB; 300]));
    assert_eq!(link::read_frame(&mut server).await.unwrap(), None);
}

#[tokio::test]
async fn test_oversized_length_is_rejected() {
    let (mut client, mut server) = duplex(64);
    let len = (MAX_LINK_FRAME as u32 + 1).to_be_bytes();
    client.write_all(&len).await.unwrap();

    let err = link::read_frame(&mut server).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[tokio::test]
async fn test_truncated_frame_is_an_error() {
    let (mut client, mut server) = duplex(64);
    client.write_all(&10u32.to_be_bytes()).await.unwrap();
    client.write_all(b"abc").await.unwrap();
    drop(client);

    let err = link::read_frame(&mut server).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn test_oversized_write_is_refused() {
    let (mut client, _server) = duplex(64);
    let err = link::write_frame(&mut client, &vec![0; MAX_LINK_FRAME + 1])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_encode_prefix() {
    assert_eq!(link::encode(b"hi"), vec![0, 0, 0, 2, b'h', b'i']);
}
