use std::{sync::Arc, time::Duration};

use memodb::{
    connection::handle_client_connection,
    rdb::EMPTY_RDB,
    resp::RespValue,
    server::RedisServer,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Semaphore,
};

use crate::test_utils::{TestEnv, TestUtils};

async fn connect_and_ping(address: std::net::SocketAddr) -> TcpStream {
    let mut client = TcpStream::connect(address).await.unwrap();

    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::ping_command(),
        &TestUtils::expected_simple_string("PONG"),
    )
    .await;

    client
}

/// Runs the replica side of the handshake by hand and consumes the full resync.
async fn promote_to_replica(client: &mut TcpStream, port: &str) {
    TestUtils::send_command_and_receive(
        client,
        TestUtils::replconf_command("listening-port", port),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;
    TestUtils::send_command_and_receive(
        client,
        TestUtils::replconf_command("capa", "psync2"),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    client
        .write_all(TestUtils::encode(&TestUtils::psync_command("?", "-1")).as_bytes())
        .await
        .unwrap();

    let full_resync = TestUtils::read_line(client).await;
    assert!(
        full_resync.starts_with("+FULLRESYNC ") && full_resync.ends_with(" 0\r\n"),
        "unexpected full resync line {:?}",
        full_resync
    );

    assert_eq!(TestUtils::read_line(client).await, "$88\r\n");
    let rdb = TestUtils::read_exactly(client, EMPTY_RDB.len()).await;
    assert_eq!(rdb, String::from_utf8_lossy(&EMPTY_RDB));
}

#[tokio::test]
async fn test_basic_commands_over_tcp() {
    let address = TestUtils::spawn_server(RedisServer::default()).await;
    let mut client = connect_and_ping(address).await;

    let test_cases = vec![
        (
            TestUtils::echo_command(&["hello", "world"]),
            TestUtils::expected_bulk_string("hello world"),
        ),
        (
            TestUtils::set_command("grape", "mango"),
            TestUtils::expected_simple_string("OK"),
        ),
        (
            TestUtils::get_command("grape"),
            TestUtils::expected_bulk_string("mango"),
        ),
        (TestUtils::get_command("kiwi"), TestUtils::expected_null()),
        (
            TestUtils::keys_command("*"),
            TestUtils::expected_bulk_string_array(&["grape"]),
        ),
        (
            TestUtils::invalid_command(&["FLUSHALL"]),
            "-ERR unknown command 'FLUSHALL'\r\n".to_string(),
        ),
        (
            TestUtils::invalid_command(&["GET"]),
            "-ERR wrong number of arguments for 'get' command\r\n".to_string(),
        ),
    ];

    for (command, expected) in test_cases {
        TestUtils::send_command_and_receive(&mut client, command, &expected).await;
    }
}

#[tokio::test]
async fn test_protocol_error_keeps_connection_open() {
    let address = TestUtils::spawn_server(RedisServer::default()).await;
    let mut client = TcpStream::connect(address).await.unwrap();

    client
        .write_all(b"*1\r\n*1\r\n$4\r\nPING\r\n")
        .await
        .unwrap();

    let expected = "-ERR Protocol error: nested arrays are not supported\r\n";
    assert_eq!(
        TestUtils::read_exactly(&mut client, expected.len()).await,
        expected
    );

    client.write_all(b"+PING\r\n").await.unwrap();

    let expected = "-ERR Invalid command\r\n";
    assert_eq!(
        TestUtils::read_exactly(&mut client, expected.len()).await,
        expected
    );

    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::ping_command(),
        &TestUtils::expected_simple_string("PONG"),
    )
    .await;
}

#[tokio::test]
async fn test_pipelined_commands_are_answered_in_order() {
    let address = TestUtils::spawn_server(RedisServer::default()).await;
    let mut client = TcpStream::connect(address).await.unwrap();

    let mut input = TestUtils::encode(&TestUtils::set_command("grape", "mango"));
    input.push_str(&TestUtils::encode(&TestUtils::get_command("grape")));
    input.push_str(&TestUtils::encode(&TestUtils::echo_command(&["hey"])));
    client.write_all(input.as_bytes()).await.unwrap();

    let expected = "+OK\r\n$5\r\nmango\r\n$3\r\nhey\r\n";
    assert_eq!(
        TestUtils::read_exactly(&mut client, expected.len()).await,
        expected
    );
}

#[tokio::test]
async fn test_command_split_across_writes_is_executed_once_complete() {
    let address = TestUtils::spawn_server(RedisServer::default()).await;
    let mut client = TcpStream::connect(address).await.unwrap();

    let second_set = TestUtils::encode(&TestUtils::set_command("lemon", "lime"));
    let (head, tail) = second_set.split_at(second_set.len() / 2);

    let mut input = TestUtils::encode(&TestUtils::set_command("grape", "mango"));
    input.push_str(head);
    client.write_all(input.as_bytes()).await.unwrap();

    assert_eq!(
        TestUtils::read_exactly(&mut client, "+OK\r\n".len()).await,
        "+OK\r\n"
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.write_all(tail.as_bytes()).await.unwrap();

    assert_eq!(
        TestUtils::read_exactly(&mut client, "+OK\r\n".len()).await,
        "+OK\r\n"
    );

    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::get_command("lemon"),
        &TestUtils::expected_bulk_string("lime"),
    )
    .await;
    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::get_command("grape"),
        &TestUtils::expected_bulk_string("mango"),
    )
    .await;
}

#[tokio::test]
async fn test_admission_gate() {
    let address = TestUtils::spawn_server(RedisServer::default()).await;

    let mut clients = Vec::new();
    for _ in 0..10 {
        clients.push(connect_and_ping(address).await);
    }

    let mut rejected = TcpStream::connect(address).await.unwrap();
    assert!(TestUtils::is_closed_by_peer(&mut rejected).await);

    drop(clients.pop());

    // The slot is released once the handler notices the disconnect.
    let mut admitted = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut client = TcpStream::connect(address).await.unwrap();
        client
            .write_all(TestUtils::encode(&TestUtils::ping_command()).as_bytes())
            .await
            .unwrap();

        let mut buffer = [0; 7];
        if let Ok(Ok(_)) =
            tokio::time::timeout(Duration::from_millis(500), client.read_exact(&mut buffer)).await
        {
            assert_eq!(&buffer, b"+PONG\r\n");
            admitted = true;
            break;
        }
    }

    assert!(admitted, "no client admitted after a slot was freed");
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let address = TestUtils::spawn_server(RedisServer {
        max_clients: 1,
        idle_timeout: Some(Duration::from_millis(300)),
        ..RedisServer::default()
    })
    .await;

    let mut idle_client = connect_and_ping(address).await;
    assert!(TestUtils::is_closed_by_peer(&mut idle_client).await);

    // The evicted client's slot can be reused.
    tokio::time::sleep(Duration::from_millis(50)).await;
    connect_and_ping(address).await;
}

#[tokio::test]
async fn test_active_connection_is_not_closed() {
    let address = TestUtils::spawn_server(RedisServer {
        idle_timeout: Some(Duration::from_millis(300)),
        ..RedisServer::default()
    })
    .await;

    let mut client = connect_and_ping(address).await;

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(150)).await;

        TestUtils::send_command_and_receive(
            &mut client,
            TestUtils::ping_command(),
            &TestUtils::expected_simple_string("PONG"),
        )
        .await;
    }
}

#[tokio::test]
async fn test_slave_clients_write_locally() {
    let env = TestEnv::new_replica_server();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let gate = Arc::new(Semaphore::new(1));

    let server = Arc::clone(&env.server);
    let store = Arc::clone(&env.store);
    let worker = Arc::clone(&env.worker);
    tokio::spawn(async move {
        let (stream, client_address) = listener.accept().await.unwrap();
        let permit = gate.try_acquire_owned().unwrap();

        handle_client_connection(
            stream,
            client_address.to_string(),
            server,
            store,
            worker,
            permit,
        )
        .await;
    });

    let mut client = connect_and_ping(address).await;

    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::set_command("grape", "mango"),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;
    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::get_command("grape"),
        &TestUtils::expected_bulk_string("mango"),
    )
    .await;
    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::replconf_command("listening-port", "6381"),
        "-ERR replication commands are only served by a master\r\n",
    )
    .await;

    assert_eq!(env.get_store().await.get("grape"), Some("mango".to_string()));
}

#[tokio::test]
async fn test_psync_without_listening_port() {
    let address = TestUtils::spawn_server(RedisServer::default()).await;
    let mut client = connect_and_ping(address).await;

    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::psync_command("?", "-1"),
        "-ERR PSYNC requires REPLCONF listening-port first\r\n",
    )
    .await;

    TestUtils::send_command_and_receive(
        &mut client,
        TestUtils::ping_command(),
        &TestUtils::expected_simple_string("PONG"),
    )
    .await;
}

#[tokio::test]
async fn test_replica_connection_receives_propagated_writes() {
    let address = TestUtils::spawn_server(RedisServer {
        max_clients: 2,
        idle_timeout: Some(Duration::from_millis(300)),
        ..RedisServer::default()
    })
    .await;

    let mut replica = connect_and_ping(address).await;
    promote_to_replica(&mut replica, "6380").await;

    let mut first_client = connect_and_ping(address).await;
    assert!(TestUtils::wait_for_connected_replicas(&mut first_client, 1).await);

    // The replica no longer holds an admission slot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut second_client = connect_and_ping(address).await;

    let set_grape = TestUtils::set_command("grape", "mango");
    TestUtils::send_command_and_receive(
        &mut second_client,
        set_grape.clone(),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let expected = TestUtils::encode(&set_grape);
    assert_eq!(
        TestUtils::read_exactly(&mut replica, expected.len()).await,
        expected
    );

    // Plain clients idle out while the replica link stays up and its input is ignored.
    assert!(TestUtils::is_closed_by_peer(&mut first_client).await);
    assert!(TestUtils::is_closed_by_peer(&mut second_client).await);
    replica
        .write_all(TestUtils::encode(&TestUtils::ping_command()).as_bytes())
        .await
        .unwrap();

    let mut third_client = connect_and_ping(address).await;
    let set_lemon = RespValue::command(&["SET", "lemon", "lime", "px", "10000"]);
    TestUtils::send_command_and_receive(
        &mut third_client,
        set_lemon.clone(),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let expected = TestUtils::encode(&set_lemon);
    assert_eq!(
        TestUtils::read_exactly(&mut replica, expected.len()).await,
        expected
    );
}
