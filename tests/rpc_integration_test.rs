use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_trade_scanner::sources::rpc::TOKEN_PROGRAM_ID;
use solana_trade_scanner::{
    AcceptAll, BuyDetector, RpcSource, ScanWindow, ScannerConfigBuilder, Termination,
    TransactionSource, WindowScanner, find_focus_trades, token_creation_date,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Setup common RPC mocks
async fn setup_rpc_mocks(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("getVersion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": { "solana-core": "1.18.26", "feature-set": 0 },
            "id": 1
        })))
        .mount(mock_server)
        .await;
}

fn signature(seed: u8) -> String {
    Signature::from([seed; 64]).to_string()
}

fn status(sig: &str, block_time: Option<i64>) -> Value {
    json!({
        "signature": sig,
        "slot": 250000000,
        "err": null,
        "memo": null,
        "blockTime": block_time,
        "confirmationStatus": "finalized"
    })
}

/// `getTransaction` result for a swap by `wallet`: native balance drops by
/// 0.1 SOL and the wallet's `mint` balance goes from 0 to 5.
fn swap_transaction(sig: &str, block_time: i64, wallet: &str, mint: &str) -> Value {
    json!({
        "slot": 250000000,
        "blockTime": block_time,
        "transaction": {
            "signatures": [sig],
            "message": {
                "header": {
                    "numRequiredSignatures": 1,
                    "numReadonlySignedAccounts": 0,
                    "numReadonlyUnsignedAccounts": 1
                },
                "accountKeys": [wallet, "11111111111111111111111111111111"],
                "instructions": [],
                "recentBlockhash": "11111111111111111111111111111111"
            }
        },
        "meta": {
            "err": null,
            "status": { "Ok": null },
            "fee": 5000,
            "preBalances": [1000000000, 1],
            "postBalances": [900000000, 1],
            "innerInstructions": [],
            "logMessages": ["Program log: ray_log", "Program log: Instruction: Swap"],
            "preTokenBalances": [],
            "postTokenBalances": [{
                "accountIndex": 1,
                "mint": mint,
                "owner": wallet,
                "uiTokenAmount": {
                    "uiAmount": 0.000005,
                    "decimals": 6,
                    "amount": "5",
                    "uiAmountString": "0.000005"
                }
            }],
            "rewards": []
        }
    })
}

async fn mount_signatures(server: &MockServer, before: Option<&str>, result: Value) {
    let mut builder = Mock::given(method("POST")).and(body_string_contains("getSignaturesForAddress"));
    if let Some(cursor) = before {
        builder = builder.and(body_string_contains(cursor));
    }

    let mock = builder.respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": 1
    })));

    // Cursor-specific pages win over the newest page.
    let mock = if before.is_some() { mock.with_priority(1) } else { mock };
    mock.mount(server).await;
}

async fn mount_transaction(server: &MockServer, sig: &str, result: Value) {
    Mock::given(method("POST"))
        .and(body_string_contains("getTransaction"))
        .and(body_string_contains(sig))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1
        })))
        .mount(server)
        .await;
}

fn rpc_source(server: &MockServer) -> RpcSource {
    rpc_source_with(server, 2, 2)
}

fn rpc_source_with(server: &MockServer, page_size: usize, concurrency: usize) -> RpcSource {
    let config = ScannerConfigBuilder::new()
        .with_rpc(server.uri())
        .with_page_size(page_size)
        .with_concurrency(concurrency)
        .build()
        .expect("Failed to build config");

    RpcSource::new(&config).expect("Failed to create source")
}

/// Answers `getTransaction` after a per-signature delay and records when
/// each request arrived together with that delay.
struct DelayedTransactions {
    responses: Vec<(String, Duration, Value)>,
    arrivals: Arc<Mutex<Vec<(Instant, Duration)>>>,
}

impl Respond for DelayedTransactions {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = String::from_utf8_lossy(&request.body);
        let Some((_, delay, result)) = self
            .responses
            .iter()
            .find(|(sig, _, _)| body.contains(sig.as_str()))
        else {
            return ResponseTemplate::new(404);
        };

        self.arrivals.lock().unwrap().push((Instant::now(), *delay));
        ResponseTemplate::new(200)
            .set_body_json(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }))
            .set_delay(*delay)
    }
}

#[tokio::test]
async fn test_page_skips_pruned_transaction_but_keeps_cursor() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    let wallet = Pubkey::new_unique().to_string();
    let (first, pruned) = (signature(1), signature(2));

    mount_signatures(
        &mock_server,
        None,
        json!([status(&first, Some(1_733_047_200)), status(&pruned, Some(1_733_047_100))]),
    )
    .await;
    mount_transaction(
        &mock_server,
        &first,
        swap_transaction(&first, 1_733_047_200, &wallet, "mint"),
    )
    .await;
    mount_transaction(&mock_server, &pruned, Value::Null).await;

    let source = rpc_source(&mock_server);
    let page = source.fetch_page(&wallet, None).await.unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].signature, first);
    assert_eq!(page.cursor.as_deref(), Some(pruned.as_str()));
}

#[tokio::test]
async fn test_scan_walks_to_exhaustion() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    let wallet = Pubkey::new_unique().to_string();
    let (first, second) = (signature(3), signature(4));

    mount_signatures(
        &mock_server,
        None,
        json!([status(&first, Some(1_733_047_200)), status(&second, Some(1_733_047_100))]),
    )
    .await;
    mount_signatures(&mock_server, Some(&second), json!([])).await;
    for (sig, time) in [(&first, 1_733_047_200), (&second, 1_733_047_100)] {
        mount_transaction(&mock_server, sig, swap_transaction(sig, time, &wallet, "mint")).await;
    }

    let scanner = WindowScanner::new(rpc_source(&mock_server));
    let outcome = scanner
        .scan(&wallet, ScanWindow::unbounded(), None, &AcceptAll)
        .await;

    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(outcome.pages_fetched, 2);
    let signatures: Vec<&str> = outcome.records.iter().map(|r| r.signature.as_str()).collect();
    assert_eq!(signatures, vec![first.as_str(), second.as_str()]);
}

#[tokio::test]
async fn test_focus_trades_from_rpc_history() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    let wallet = Pubkey::new_unique().to_string();
    let mint = Pubkey::new_unique().to_string();
    let buy = signature(5);

    mount_signatures(&mock_server, None, json!([status(&buy, Some(1_733_047_200))])).await;
    mount_transaction(
        &mock_server,
        &buy,
        swap_transaction(&buy, 1_733_047_200, &wallet, &mint),
    )
    .await;

    let scanner = WindowScanner::new(rpc_source(&mock_server)).with_max_pages(Some(1));
    let detector = BuyDetector::new(wallet.as_str(), mint.as_str(), ["ray_log", "swap"]);
    let trades = find_focus_trades(&scanner, &detector, ScanWindow::unbounded()).await;

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].signature, buy);
    assert_eq!(trades[0].wallet, wallet);
    assert_eq!(trades[0].timestamp, 1_733_047_200);
    assert_eq!(trades[0].token_pair, format!("{mint}/SOL"));
    let spent = trades[0].sol_spent.expect("buy should report SOL spent");
    assert!((spent - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_rpc_error_ends_scan_with_fetch_failure() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("getSignaturesForAddress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": -32005, "message": "Node is behind" },
            "id": 1
        })))
        .mount(&mock_server)
        .await;

    let wallet = Pubkey::new_unique().to_string();
    let scanner = WindowScanner::new(rpc_source(&mock_server));
    let outcome = scanner
        .scan(&wallet, ScanWindow::unbounded(), None, &AcceptAll)
        .await;

    assert!(outcome.records.is_empty());
    assert!(matches!(outcome.termination, Termination::FetchFailed(_)));
    assert_eq!(outcome.pages_fetched, 1);
}

#[tokio::test]
async fn test_token_creation_date_uses_oldest_signature() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    let mint = Pubkey::new_unique().to_string();
    let (newest, middle, oldest) = (signature(6), signature(7), signature(8));

    mount_signatures(
        &mock_server,
        None,
        json!([status(&newest, Some(1_733_047_200)), status(&middle, Some(1_700_000_000))]),
    )
    .await;
    mount_signatures(&mock_server, Some(&middle), json!([status(&oldest, None)])).await;
    mount_signatures(&mock_server, Some(&oldest), json!([])).await;
    mount_transaction(
        &mock_server,
        &oldest,
        swap_transaction(&oldest, 1_600_000_000, &mint, &mint),
    )
    .await;

    let source = rpc_source(&mock_server);
    let created = token_creation_date(&source, &mint, 2, None, &CancellationToken::new())
        .await
        .unwrap()
        .expect("creation date should be found");

    assert_eq!(created.timestamp(), 1_600_000_000);
}

#[tokio::test]
async fn test_token_creation_date_without_history() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;
    mount_signatures(&mock_server, None, json!([])).await;

    let source = rpc_source(&mock_server);
    let mint = Pubkey::new_unique().to_string();

    assert!(token_creation_date(&source, &mint, 10, None, &CancellationToken::new())
            .await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancelled_creation_date_walk_sends_no_requests() {
    let mock_server = MockServer::start().await;
    let mint = Pubkey::new_unique().to_string();
    mount_signatures(&mock_server, None, json!([status(&signature(9), Some(1_700_000_000))])).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let source = rpc_source(&mock_server);
    let created = token_creation_date(&source, &mint, 10, None, &cancel)
        .await
        .unwrap();

    assert!(created.is_none());
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty(), "{} request(s) sent", requests.len());
}

#[tokio::test]
async fn test_detail_fetches_are_bounded_and_keep_listing_order() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    let wallet = Pubkey::new_unique().to_string();
    let sigs: Vec<String> = (20..24).map(signature).collect();
    let statuses: Vec<Value> = sigs
        .iter()
        .map(|sig| status(sig, Some(1_733_047_200)))
        .collect();
    mount_signatures(&mock_server, None, Value::Array(statuses)).await;

    // The first listed transaction answers last.
    let responses = sigs
        .iter()
        .enumerate()
        .map(|(i, sig)| {
            let delay = Duration::from_millis(if i == 0 { 300 } else { 150 });
            (sig.clone(), delay, swap_transaction(sig, 1_733_047_200, &wallet, "mint"))
        })
        .collect();
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("POST"))
        .and(body_string_contains("getTransaction"))
        .respond_with(DelayedTransactions {
            responses,
            arrivals: Arc::clone(&arrivals),
        })
        .mount(&mock_server)
        .await;

    let source = rpc_source_with(&mock_server, 4, 2);
    let page = source.fetch_page(&wallet, None).await.unwrap();

    let order: Vec<&str> = page.records.iter().map(|r| r.signature.as_str()).collect();
    let expected: Vec<&str> = sigs.iter().map(String::as_str).collect();
    assert_eq!(order, expected);

    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 4);
    for (arrived, _) in &arrivals {
        // Requests whose server-side delay had not yet elapsed are still in flight.
        let in_flight = arrivals
            .iter()
            .filter(|(other, delay)| other <= arrived && *arrived < *other + *delay)
            .count();
        assert!(in_flight <= 2, "{in_flight} detail requests in flight");
    }
}

#[tokio::test]
async fn test_token_accounts_by_owner() {
    let mock_server = MockServer::start().await;
    setup_rpc_mocks(&mock_server).await;

    let owner = Pubkey::new_unique().to_string();
    let (ata, mint) = (Pubkey::new_unique().to_string(), Pubkey::new_unique().to_string());

    Mock::given(method("POST"))
        .and(body_string_contains("getTokenAccountsByOwner"))
        .and(body_string_contains(TOKEN_PROGRAM_ID))
        .and(body_string_contains(owner.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 250000000 },
                "value": [{
                    "pubkey": ata,
                    "account": {
                        "lamports": 2039280,
                        "owner": TOKEN_PROGRAM_ID,
                        "data": {
                            "program": "spl-token",
                            "parsed": {
                                "info": {
                                    "isNative": false,
                                    "mint": mint,
                                    "owner": owner,
                                    "state": "initialized",
                                    "tokenAmount": {
                                        "amount": "1500000",
                                        "decimals": 6,
                                        "uiAmount": 1.5,
                                        "uiAmountString": "1.5"
                                    }
                                },
                                "type": "account"
                            },
                            "space": 165
                        },
                        "executable": false,
                        "rentEpoch": 0,
                        "space": 165
                    }
                }]
            },
            "id": 1
        })))
        .mount(&mock_server)
        .await;

    let accounts = rpc_source(&mock_server).token_accounts(&owner).await.unwrap();

    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].address, ata);
    assert_eq!(accounts[0].mint, mint);
    assert_eq!(accounts[0].raw_amount(), 1_500_000);
    assert_eq!(accounts[0].decimals, 6);
}
