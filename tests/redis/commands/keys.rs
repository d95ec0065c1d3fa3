use std::time::Duration;

use memodb::commands::CommandError;

use crate::test_utils::{TestEnv, TestUtils};

async fn populated_env() -> TestEnv {
    let env = TestEnv::new_master_server();

    {
        let mut store = env.get_store().await;
        for key in ["banana", "apple", "apricot", "cherry"] {
            store.set(key.to_string(), "fruit".to_string(), None).unwrap();
        }
    }

    env
}

#[tokio::test]
async fn test_keys_with_patterns() {
    let env = populated_env().await;

    let test_cases = vec![
        ("*", vec!["apple", "apricot", "banana", "cherry"]),
        ("ap*", vec!["apple", "apricot"]),
        ("?herry", vec!["cherry"]),
        ("[bc]*", vec!["banana", "cherry"]),
        ("kiwi", vec![]),
    ];

    for (pattern, expected_keys) in test_cases {
        env.exec_command_immediate_success_response(
            TestUtils::keys_command(pattern),
            &TestUtils::expected_bulk_string_array(&expected_keys),
        )
        .await;
    }
}

#[tokio::test]
async fn test_keys_skips_expired_keys() {
    let env = populated_env().await;
    env.get_store()
        .await
        .set(
            "avocado".to_string(),
            "fruit".to_string(),
            Some(Duration::from_millis(20)),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    env.exec_command_immediate_success_response(
        TestUtils::keys_command("a*"),
        &TestUtils::expected_bulk_string_array(&["apple", "apricot"]),
    )
    .await;
    assert_eq!(env.get_store().await.len(), 4);
}

#[tokio::test]
async fn test_keys_on_empty_store() {
    let env = TestEnv::new_replica_server();

    env.exec_command_immediate_success_response(TestUtils::keys_command("*"), "*0\r\n")
        .await;
}

#[tokio::test]
async fn test_keys_invalid_arguments() {
    let env = populated_env().await;

    env.exec_command_immediate_error_response(
        TestUtils::invalid_command(&["KEYS"]),
        CommandError::InvalidKeysCommand,
    )
    .await;
    env.exec_command_immediate_error_response(
        TestUtils::invalid_command(&["KEYS", "a*", "b*"]),
        CommandError::InvalidKeysCommand,
    )
    .await;

    let result = env.exec_command(TestUtils::keys_command("[a")).await;
    assert!(
        matches!(result, Err(CommandError::InvalidGlobPattern(_))),
        "unexpected result {:?}",
        result
    );
}
