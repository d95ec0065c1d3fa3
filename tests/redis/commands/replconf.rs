use memodb::commands::{CommandError, CommandResult};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_replconf_listening_port() {
    let env = TestEnv::new_master_server();

    let result = env
        .exec_command(TestUtils::replconf_command("listening-port", "6380"))
        .await;

    assert_eq!(
        result,
        Ok(CommandResult::DeclareReplicaPort {
            port: "6380".to_string(),
            response: TestUtils::expected_simple_string("OK"),
        })
    );
}

#[tokio::test]
async fn test_replconf_capabilities() {
    let env = TestEnv::new_master_server();

    for capability in ["psync2", "eof"] {
        env.exec_command_immediate_success_response(
            TestUtils::replconf_command("capa", capability),
            &TestUtils::expected_simple_string("OK"),
        )
        .await;
    }
}

#[tokio::test]
async fn test_replconf_invalid_arguments() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        vec!["REPLCONF"],
        vec!["REPLCONF", "listening-port"],
        vec!["REPLCONF", "listening-port", "port"],
        vec!["REPLCONF", "listening-port", "65536"],
        vec!["REPLCONF", "getack", "*"],
    ];

    for command in test_cases {
        env.exec_command_immediate_error_response(
            TestUtils::invalid_command(&command),
            CommandError::InvalidReplconfCommand,
        )
        .await;
    }
}

#[tokio::test]
async fn test_replconf_on_replica_is_rejected() {
    let env = TestEnv::new_replica_server();

    env.exec_command_immediate_error_response(
        TestUtils::replconf_command("listening-port", "6381"),
        CommandError::ReplicationCommandOnReplica,
    )
    .await;
}
