//! Offline QA runner for the remote adapter.
//!
//! Exercises the wire surface that needs no live backend: id round trips,
//! envelope parsing, row conversions, subscription frames, and config
//! layering. Usage: `remote_qa_runner --scenario <name>|all`.

use std::env;

use serde_json::json;
use snafu::Snafu;

use parlor_remote::config::RemoteConfig;
use parlor_remote::graphql::{
    GraphQlRequest, GraphQlResponse, INSERT_MESSAGE, InsertMessageData, ListConversationsData,
};
use parlor_remote::subscription::{ClientFrame, FrameAction, classify_frame};
use parlor_remote::{DEFAULT_HTTP_URL, DEFAULT_WS_URL};
use parlor_storage::{ConversationId, FeedEvent, MessageId, MessageRecord, StoreError};
use tokio_tungstenite::tungstenite::Message as WsMessage;

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    IdRoundtrip,
    IdInvalid,
    EnvelopeParse,
    WireRowConvert,
    SubscribeFrames,
    ConfigDefaults,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "id_roundtrip" => Some(Self::IdRoundtrip),
            "id_invalid" => Some(Self::IdInvalid),
            "envelope_parse" => Some(Self::EnvelopeParse),
            "wire_row_convert" => Some(Self::WireRowConvert),
            "subscribe_frames" => Some(Self::SubscribeFrames),
            "config_defaults" => Some(Self::ConfigDefaults),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::IdRoundtrip => "id_roundtrip",
            Self::IdInvalid => "id_invalid",
            Self::EnvelopeParse => "envelope_parse",
            Self::WireRowConvert => "wire_row_convert",
            Self::SubscribeFrames => "subscribe_frames",
            Self::ConfigDefaults => "config_defaults",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    match parse_args().and_then(run) {
        Ok(()) => {}
        Err(error) => {
            eprintln!("FAIL: {error}");
            std::process::exit(1);
        }
    }
}

fn parse_args() -> Result<RunnerArgs, RunnerError> {
    let mut scenario = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scenario" => {
                let raw = args.next().ok_or(RunnerError::MissingArgumentValue {
                    stage: "parse-args",
                    arg: "--scenario",
                })?;
                scenario = Some(Scenario::parse(&raw).ok_or(RunnerError::UnknownScenario {
                    stage: "parse-args",
                    raw,
                })?);
            }
            other => {
                return Err(RunnerError::UnknownArgument {
                    stage: "parse-args",
                    raw: other.to_string(),
                });
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.ok_or(RunnerError::MissingScenario {
            stage: "parse-args",
        })?,
    })
}

fn run(args: RunnerArgs) -> Result<(), RunnerError> {
    let scenarios: Vec<Scenario> = match args.scenario {
        Scenario::All => vec![
            Scenario::IdRoundtrip,
            Scenario::IdInvalid,
            Scenario::EnvelopeParse,
            Scenario::WireRowConvert,
            Scenario::SubscribeFrames,
            Scenario::ConfigDefaults,
        ],
        single => vec![single],
    };

    for scenario in &scenarios {
        match scenario {
            Scenario::IdRoundtrip => run_id_roundtrip()?,
            Scenario::IdInvalid => run_id_invalid()?,
            Scenario::EnvelopeParse => run_envelope_parse()?,
            Scenario::WireRowConvert => run_wire_row_convert()?,
            Scenario::SubscribeFrames => run_subscribe_frames()?,
            Scenario::ConfigDefaults => run_config_defaults()?,
            Scenario::All => unreachable!("expanded above"),
        }
        println!("PASS: {}", scenario.name());
    }

    Ok(())
}

fn check(scenario: &'static str, condition: bool, reason: &str) -> Result<(), RunnerError> {
    if condition {
        Ok(())
    } else {
        Err(RunnerError::ScenarioFailed {
            stage: "run-scenario",
            scenario,
            reason: reason.to_string(),
        })
    }
}

fn run_id_roundtrip() -> Result<(), RunnerError> {
    let minted = MessageId::mint();
    let parsed = MessageId::parse(&minted.to_string()).map_err(|error| {
        RunnerError::ScenarioFailed {
            stage: "run-scenario",
            scenario: "id_roundtrip",
            reason: error.to_string(),
        }
    })?;
    check("id_roundtrip", parsed == minted, "parsed id differs")
}

fn run_id_invalid() -> Result<(), RunnerError> {
    let result = ConversationId::parse("definitely-not-a-uuid");
    check(
        "id_invalid",
        matches!(result, Err(StoreError::InvalidId { .. })),
        "garbage id parsed or failed with the wrong variant",
    )
}

fn run_envelope_parse() -> Result<(), RunnerError> {
    let ok_body = r#"{
        "data": {
            "insert_messages_one": {
                "id": "7f1c6a6e-55b2-4de2-93d5-0a8f7d3c9f01",
                "chat_id": "3b74a2a1-9a1c-4f1d-8c25-2d9f53b9f9a2",
                "user_id": "52f3ce31-8a2e-4ce7-9a56-3dd1d0cf2b17",
                "content": "hello",
                "created_at": "2024-05-01T12:00:00+00:00",
                "is_bot": false
            }
        }
    }"#;
    let envelope: GraphQlResponse<InsertMessageData> =
        serde_json::from_str(ok_body).map_err(|error| RunnerError::ScenarioFailed {
            stage: "run-scenario",
            scenario: "envelope_parse",
            reason: error.to_string(),
        })?;
    check(
        "envelope_parse",
        envelope.error_details().is_none() && envelope.data.is_some(),
        "ok envelope misread",
    )?;

    let error_body = r#"{ "errors": [ { "message": "permission denied" } ] }"#;
    let envelope: GraphQlResponse<ListConversationsData> = serde_json::from_str(error_body)
        .map_err(|error| RunnerError::ScenarioFailed {
            stage: "run-scenario",
            scenario: "envelope_parse",
            reason: error.to_string(),
        })?;
    check(
        "envelope_parse",
        envelope.error_details().as_deref() == Some("permission denied"),
        "error envelope misread",
    )?;

    let request = GraphQlRequest {
        query: INSERT_MESSAGE,
        variables: json!({ "content": "hello" }),
    };
    let serialized = serde_json::to_string(&request).map_err(|error| {
        RunnerError::ScenarioFailed {
            stage: "run-scenario",
            scenario: "envelope_parse",
            reason: error.to_string(),
        }
    })?;
    check(
        "envelope_parse",
        serialized.contains("insert_messages_one"),
        "request body lost the operation document",
    )
}

fn run_wire_row_convert() -> Result<(), RunnerError> {
    let frame = r#"{
        "type": "next",
        "id": "1",
        "payload": {
            "data": {
                "messages": [{
                    "id": "7f1c6a6e-55b2-4de2-93d5-0a8f7d3c9f01",
                    "chat_id": "3b74a2a1-9a1c-4f1d-8c25-2d9f53b9f9a2",
                    "user_id": "52f3ce31-8a2e-4ce7-9a56-3dd1d0cf2b17",
                    "content": "hello",
                    "created_at": "2024-05-01T12:00:00+00:00",
                    "is_bot": true
                }]
            }
        }
    }"#;

    match classify_frame(WsMessage::Text(frame.to_string().into())) {
        FrameAction::Deliver(FeedEvent::Snapshot(records)) => {
            let record: &MessageRecord =
                records
                    .first()
                    .ok_or_else(|| RunnerError::ScenarioFailed {
                        stage: "run-scenario",
                        scenario: "wire_row_convert",
                        reason: "snapshot was empty".to_string(),
                    })?;
            check(
                "wire_row_convert",
                record.is_automated && record.content == "hello",
                "row fields did not survive conversion",
            )
        }
        other => Err(RunnerError::ScenarioFailed {
            stage: "run-scenario",
            scenario: "wire_row_convert",
            reason: format!("unexpected frame action: {other:?}"),
        }),
    }
}

fn run_subscribe_frames() -> Result<(), RunnerError> {
    let init = ClientFrame::ConnectionInit {
        payload: json!({ "headers": { "x-user-id": "qa" } }),
    };
    let value = serde_json::to_value(&init).map_err(|error| RunnerError::ScenarioFailed {
        stage: "run-scenario",
        scenario: "subscribe_frames",
        reason: error.to_string(),
    })?;
    check(
        "subscribe_frames",
        value["type"] == "connection_init",
        "init frame had the wrong type tag",
    )?;

    let complete_frame = r#"{ "type": "complete", "id": "1" }"#;
    let action = classify_frame(WsMessage::Text(complete_frame.to_string().into()));
    check(
        "subscribe_frames",
        matches!(action, FrameAction::DeliverAndStop(FeedEvent::Lost { .. })),
        "server complete did not end the feed",
    )
}

fn run_config_defaults() -> Result<(), RunnerError> {
    let config = RemoteConfig::default();
    check(
        "config_defaults",
        config.graphql_http_url == DEFAULT_HTTP_URL && config.graphql_ws_url == DEFAULT_WS_URL,
        "defaults drifted from the documented endpoints",
    )
}
