use chrono::{DateTime, TimeZone, Utc};
use gaugeledger::datasource::{
    MockBlockHeightLookup, MockDatasetLoader, MockDistributionReader, MockPoolCatalog,
    MockPriceFeed, MockSnapshotGateway,
};
use gaugeledger::domain::{
    Address, BribeEvent, Decimal, EmissionRecord, Epoch, EpochRecord, FeeEvent, GaugeReward,
    Partner, PoolIdentity, PoolSymbol, RebaseEntry, UnixSecs, VoteRecord,
};
use gaugeledger::publish::{Cell, MemoryPublisher};
use gaugeledger::{
    Collaborators, Destination, Job, JobSettings, Orchestrator, PublishMode, RunError,
};
use std::str::FromStr;
use std::sync::Arc;

// 2024-01-04 00:00:00 UTC, a Thursday. Table epoch 11 starts here.
const BOUNDARY: i64 = 1_704_326_400;
const WEEK: i64 = 7 * 24 * 3600;
const TOKEN: u128 = 1_000_000_000_000_000_000;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn num(s: &str) -> Cell {
    Cell::Number(dec(s))
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

fn addr(byte: char) -> Address {
    Address::new(format!("0x{}", byte.to_string().repeat(40)))
}

/// Thursday 05:00 UTC, past the cutover hour.
fn run_time() -> DateTime<Utc> {
    Utc.timestamp_opt(BOUNDARY + 5 * 3600, 0).unwrap()
}

fn epochs() -> Vec<EpochRecord> {
    (10..=12)
        .map(|epoch| EpochRecord {
            epoch: Epoch::new(epoch),
            boundary: UnixSecs::new(BOUNDARY + (i64::from(epoch) - 11) * WEEK),
        })
        .collect()
}

fn pool(symbol: &str, gauge: char, bribe: Address) -> PoolIdentity {
    PoolIdentity {
        symbol: PoolSymbol::new(symbol),
        gauge: addr(gauge),
        bribe,
    }
}

fn vote(epoch: u32, symbol: &str, weight: &str, price: &str) -> VoteRecord {
    VoteRecord {
        pool: PoolSymbol::new(symbol),
        epoch: Epoch::new(epoch),
        vote_weight: dec(weight),
        price: dec(price),
        vote_value: dec(weight).checked_mul(dec(price)).unwrap(),
    }
}

/// Ledger inputs where ledger epoch 10 is closed and epoch 11 is accruing.
fn ledger_loader() -> MockDatasetLoader {
    MockDatasetLoader::new()
        .with_epochs(epochs())
        .with_fees(vec![FeeEvent {
            epoch: Epoch::new(10),
            pool: PoolSymbol::new("A"),
            amount: dec("50"),
            total_amount: dec("50"),
        }])
        .with_bribes(vec![
            BribeEvent {
                epoch: Epoch::new(10),
                pool: PoolSymbol::new("A"),
                amount: dec("30"),
            },
            BribeEvent {
                epoch: Epoch::new(11),
                pool: PoolSymbol::new("A"),
                amount: dec("20"),
            },
        ])
        .with_votes(vec![vote(10, "A", "1000", "2.0")])
}

struct Harness {
    orchestrator: Orchestrator,
    publisher: Arc<MemoryPublisher>,
}

fn collaborators(
    loader: MockDatasetLoader,
    snapshots: MockSnapshotGateway,
    publisher: Arc<MemoryPublisher>,
) -> Collaborators {
    Collaborators {
        loader: Arc::new(loader),
        snapshots: Arc::new(snapshots),
        prices: Arc::new(MockPriceFeed::new().with_price("RETRO", dec("0.5"))),
        blocks: Arc::new(
            MockBlockHeightLookup::new().with_height(UnixSecs::new(BOUNDARY), 51_000_000),
        ),
        catalog: Arc::new(MockPoolCatalog::new()),
        distributions: Arc::new(MockDistributionReader::new()),
        publisher,
    }
}

fn harness(
    loader: MockDatasetLoader,
    snapshots: MockSnapshotGateway,
    settings: JobSettings,
) -> Harness {
    let publisher = Arc::new(MemoryPublisher::new());
    Harness {
        orchestrator: Orchestrator::new(
            settings,
            collaborators(loader, snapshots, publisher.clone()),
        ),
        publisher,
    }
}

fn apr_settings() -> JobSettings {
    JobSettings {
        ve_contract: Some(addr('e')),
        ..JobSettings::default()
    }
}

#[tokio::test]
async fn test_revenue_job_replaces_ledger() {
    let h = harness(ledger_loader(), MockSnapshotGateway::new(), JobSettings::default());

    let report = h.orchestrator.run(Job::Revenue, run_time()).await.unwrap();
    assert_eq!(report.epoch, Some(Epoch::new(10)));
    assert!(report.fingerprint.is_some());

    let rows = h.publisher.rows(Destination::RevenueLedger).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], Cell::Int(10));
    assert_eq!(rows[1][1], text("A"));
    // fee_apr and bribe_apr close the row.
    assert_eq!(rows[1][13], num("130"));
    assert_eq!(rows[1][14], num("78"));

    // A second run replaces rather than accumulates.
    h.orchestrator.run(Job::Revenue, run_time()).await.unwrap();
    assert_eq!(h.publisher.rows(Destination::RevenueLedger).await.len(), 2);
    assert_eq!(
        h.publisher.publishes().await,
        vec![
            (Destination::RevenueLedger, PublishMode::Replace),
            (Destination::RevenueLedger, PublishMode::Replace),
        ]
    );
}

#[tokio::test]
async fn test_votes_job_refreshes_upcoming_epoch() {
    let bribe_a = addr('1');
    let bribe_c = addr('3');
    let loader = MockDatasetLoader::new()
        .with_epochs(epochs())
        .with_pool(pool("A", 'a', bribe_a.clone()))
        .with_pool(pool("B", 'b', Address::zero()))
        .with_pool(pool("C", 'c', bribe_c.clone()))
        .with_votes(vec![
            vote(10, "A", "900", "0.4"),
            vote(11, "A", "1", "0.1"),
        ]);
    let snapshots = MockSnapshotGateway::new()
        .with_total_supply(bribe_a, 1_234_567 * TOKEN / 1000)
        .with_failure(bribe_c);
    let h = harness(loader, snapshots, JobSettings::default());

    let report = h.orchestrator.run(Job::Votes, run_time()).await.unwrap();
    // Past the cutover the upcoming boundary is next week's: table 12, ledger 11.
    assert_eq!(report.epoch, Some(Epoch::new(11)));
    assert_eq!(report.skipped, 1);

    let rows = h.publisher.rows(Destination::VoteWeights).await;
    assert_eq!(
        rows,
        vec![
            vec![Cell::Int(10), text("A"), num("900"), num("0.4"), num("360")],
            vec![
                Cell::Int(11),
                text("A"),
                num("1234.57"),
                num("0.5"),
                num("617.285"),
            ],
            vec![Cell::Int(11), text("B"), num("0"), num("0.5"), num("0")],
        ]
    );
    assert_eq!(
        h.publisher.publishes().await,
        vec![(Destination::VoteWeights, PublishMode::Replace)]
    );
}

#[tokio::test]
async fn test_apr_job_appends_epoch_row() {
    let loader = ledger_loader().with_rebase(RebaseEntry {
        table_epoch: Epoch::new(11),
        rebase: dec("26"),
    });
    let snapshots = MockSnapshotGateway::new().with_total_supply(addr('e'), 1300 * TOKEN);
    let h = harness(loader, snapshots, apr_settings());

    let report = h.orchestrator.run(Job::Apr, run_time()).await.unwrap();
    assert_eq!(report.epoch, Some(Epoch::new(10)));

    let expected = vec![vec![
        Cell::Int(10),
        num("130"),
        num("78"),
        num("208"),
        num("104"),
    ]];
    assert_eq!(h.publisher.rows(Destination::AprHistory).await, expected);

    // Re-running the same epoch leaves a single row.
    h.orchestrator.run(Job::Apr, run_time()).await.unwrap();
    assert_eq!(h.publisher.rows(Destination::AprHistory).await, expected);
}

#[tokio::test]
async fn test_apr_job_requires_ve_contract() {
    let loader = ledger_loader().with_rebase(RebaseEntry {
        table_epoch: Epoch::new(11),
        rebase: dec("26"),
    });
    let h = harness(loader, MockSnapshotGateway::new(), JobSettings::default());

    let err = h.orchestrator.run(Job::Apr, run_time()).await.unwrap_err();
    assert!(matches!(err, RunError::Configuration(_)), "{err}");
    assert!(h.publisher.publishes().await.is_empty());
}

#[tokio::test]
async fn test_apr_job_missing_rebase_entry() {
    let snapshots = MockSnapshotGateway::new().with_total_supply(addr('e'), 1300 * TOKEN);
    let h = harness(ledger_loader(), snapshots, apr_settings());

    let err = h.orchestrator.run(Job::Apr, run_time()).await.unwrap_err();
    assert!(matches!(err, RunError::MissingReference(_)), "{err}");
    assert!(h.publisher.publishes().await.is_empty());
}

#[tokio::test]
async fn test_apr_job_remote_failure_publishes_nothing() {
    let loader = ledger_loader().with_rebase(RebaseEntry {
        table_epoch: Epoch::new(11),
        rebase: dec("26"),
    });
    let snapshots = MockSnapshotGateway::new().with_failure(addr('e'));
    let h = harness(loader, snapshots, apr_settings());

    let err = h.orchestrator.run(Job::Apr, run_time()).await.unwrap_err();
    assert!(matches!(err, RunError::RemoteCall { .. }), "{err}");
    assert!(h.publisher.publishes().await.is_empty());
}

#[tokio::test]
async fn test_job_fails_when_boundary_not_in_table() {
    let h = harness(
        ledger_loader(),
        MockSnapshotGateway::new(),
        JobSettings::default(),
    );
    // A Thursday two years later has no table entry.
    let later = Utc.timestamp_opt(BOUNDARY + 104 * WEEK, 0).unwrap();

    let err = h.orchestrator.run(Job::Emissions, later).await.unwrap_err();
    assert!(matches!(err, RunError::EpochNotFound(_)), "{err}");
    assert!(h.publisher.publishes().await.is_empty());
}

#[tokio::test]
async fn test_partners_job_attributes_closed_epoch() {
    let bribe_a = addr('1');
    let loader = ledger_loader()
        .with_pool(pool("A", 'a', bribe_a.clone()))
        .with_pool(pool("B", 'b', Address::zero()))
        .with_partner(Partner {
            name: "alpha".to_string(),
            nft_address: addr('7'),
        })
        .with_partner(Partner {
            name: "beta".to_string(),
            nft_address: addr('8'),
        })
        .with_emissions(vec![EmissionRecord {
            epoch: Epoch::new(11),
            pool: PoolSymbol::new("A"),
            emissions: dec("500"),
            value: dec("250"),
            price: dec("0.5"),
        }]);
    let snapshots = MockSnapshotGateway::new().with_balance(bribe_a, addr('7'), 40 * TOKEN);
    let h = harness(loader, snapshots, JobSettings::default());

    let report = h.orchestrator.run(Job::Partners, run_time()).await.unwrap();
    assert_eq!(report.epoch, Some(Epoch::new(10)));
    assert_eq!(report.skipped, 0);

    // beta holds no weight; pool B has no bribe contract.
    let rows = h.publisher.rows(Destination::PartnerVotes).await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row[0], Cell::Int(10));
    assert_eq!(row[1], text("alpha"));
    assert_eq!(row[3], text("A"));
    assert_eq!(row[4], num("40"));
    assert_eq!(row[5], num("100"));
    assert_eq!(row[6], num("30"));
    assert_eq!(row[7], num("1000"));
    assert_eq!(row[8], num("500"));
    assert_eq!(row[9], num("250"));
    match &row[10] {
        // 30 * 40 / 1000.001
        Cell::Number(revenue) => assert!(
            *revenue > dec("1.1999") && *revenue < dec("1.2"),
            "{revenue}"
        ),
        other => panic!("unexpected cell {other:?}"),
    }
    assert_eq!(
        h.publisher.publishes().await,
        vec![(Destination::PartnerVotes, PublishMode::Append)]
    );
}

#[tokio::test]
async fn test_emissions_job_uses_current_table_epoch() {
    let loader = MockDatasetLoader::new()
        .with_epochs(epochs())
        .with_pool(pool("A", 'a', addr('1')))
        .with_pool(pool("B", 'b', addr('2')))
        .with_gauge_reward(GaugeReward {
            gauge: addr('a'),
            raw_reward: dec("2000000000000000000"),
        })
        .with_gauge_reward(GaugeReward {
            gauge: addr('a'),
            raw_reward: dec("1000000000000000000"),
        })
        .with_gauge_reward(GaugeReward {
            gauge: addr('b'),
            raw_reward: dec("0"),
        })
        .with_gauge_reward(GaugeReward {
            gauge: addr('f'),
            raw_reward: dec("5000000000000000000"),
        });
    let h = harness(loader, MockSnapshotGateway::new(), JobSettings::default());

    let report = h.orchestrator.run(Job::Emissions, run_time()).await.unwrap();
    assert_eq!(report.epoch, Some(Epoch::new(11)));

    assert_eq!(
        h.publisher.rows(Destination::Emissions).await,
        vec![vec![
            Cell::Int(11),
            text("A"),
            num("3"),
            num("1.5"),
            num("0.5"),
        ]]
    );
}

#[tokio::test]
async fn test_votes_job_keeps_epochs_already_published() {
    let bribe_a = addr('1');
    let loader = MockDatasetLoader::new()
        .with_epochs(epochs())
        .with_pool(pool("A", 'a', bribe_a.clone()))
        .with_votes(vec![vote(9, "A", "900", "0.4")]);
    let snapshots = MockSnapshotGateway::new().with_total_supply(bribe_a, 7 * TOKEN);
    let h = harness(loader, snapshots, JobSettings::default());

    // One week earlier the upcoming boundary is table epoch 11: ledger epoch 10.
    let week_before = Utc.timestamp_opt(BOUNDARY - WEEK + 5 * 3600, 0).unwrap();
    let first = h.orchestrator.run(Job::Votes, week_before).await.unwrap();
    assert_eq!(first.epoch, Some(Epoch::new(10)));

    // Epoch 10 is only in the sink now; the seed dataset never sees it.
    let second = h.orchestrator.run(Job::Votes, run_time()).await.unwrap();
    assert_eq!(second.epoch, Some(Epoch::new(11)));
    let epochs: Vec<Cell> = h
        .publisher
        .rows(Destination::VoteWeights)
        .await
        .into_iter()
        .map(|row| row[0].clone())
        .collect();
    assert_eq!(epochs, vec![Cell::Int(9), Cell::Int(10), Cell::Int(11)]);
}

#[tokio::test]
async fn test_partners_job_skips_failed_snapshot() {
    let bribe_a = addr('1');
    let bribe_c = addr('3');
    let loader = ledger_loader()
        .with_pool(pool("A", 'a', bribe_a.clone()))
        .with_pool(pool("C", 'c', bribe_c.clone()))
        .with_partner(Partner {
            name: "alpha".to_string(),
            nft_address: addr('7'),
        });
    let snapshots = MockSnapshotGateway::new()
        .with_balance(bribe_a, addr('7'), 40 * TOKEN)
        .with_balance(bribe_c.clone(), addr('7'), 10 * TOKEN)
        .with_failure(bribe_c);
    let h = harness(loader, snapshots, JobSettings::default());

    let report = h.orchestrator.run(Job::Partners, run_time()).await.unwrap();
    assert_eq!(report.skipped, 1);

    let rows = h.publisher.rows(Destination::PartnerVotes).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], text("alpha"));
    assert_eq!(rows[0][3], text("A"));
    assert_eq!(rows[0][4], num("40"));
    assert_eq!(
        h.publisher.publishes().await,
        vec![(Destination::PartnerVotes, PublishMode::Append)]
    );
}

#[tokio::test]
async fn test_pools_job_lists_active_distributions() {
    let catalog = MockPoolCatalog::new()
        .with_pool("vAMM-WETH/USDC", addr('a'))
        .with_pool("sAMM-USDC/USDT", addr('b'))
        .with_pool("vAMM-DAI/USDC", addr('c'))
        .with_pool("vAMM-WBTC/WETH", addr('d'));
    let reader = Arc::new(
        MockDistributionReader::new()
            .with_distributions(addr('a'), 2)
            .with_distributions(addr('b'), 5)
            .with_failure(addr('d')),
    );
    let publisher = Arc::new(MemoryPublisher::new());
    let collaborators = Collaborators {
        catalog: Arc::new(catalog),
        distributions: reader.clone(),
        ..collaborators(
            MockDatasetLoader::new().with_epochs(epochs()),
            MockSnapshotGateway::new(),
            publisher.clone(),
        )
    };
    let settings = JobSettings {
        merkl_contract: Some(addr('9')),
        ..JobSettings::default()
    };
    let orchestrator = Orchestrator::new(settings, collaborators);

    let report = orchestrator.run(Job::Pools, run_time()).await.unwrap();
    assert_eq!(report.epoch, Some(Epoch::new(11)));
    assert_eq!(report.skipped, 1);
    // The stable USDC/USDT pool is never queried.
    assert_eq!(reader.calls(), 3);

    let rows = publisher.rows(Destination::PoolDistributions).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Cell::Int(11));
    assert_eq!(rows[0][1], text("vAMM-WETH/USDC"));
    assert_eq!(rows[0][2], text(addr('a').as_str()));
    assert_eq!(rows[0][3], Cell::Int(2));
    assert_eq!(
        publisher.publishes().await,
        vec![(Destination::PoolDistributions, PublishMode::Replace)]
    );
}

#[tokio::test]
async fn test_pools_job_requires_distributor_contract() {
    let h = harness(
        MockDatasetLoader::new().with_epochs(epochs()),
        MockSnapshotGateway::new(),
        JobSettings::default(),
    );

    let err = h.orchestrator.run(Job::Pools, run_time()).await.unwrap_err();
    assert!(matches!(err, RunError::Configuration(_)), "{err}");
    assert!(h.publisher.publishes().await.is_empty());
}
