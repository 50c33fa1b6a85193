use std::time::Duration;

use anyhow::Result;

use crate::config::OptionsError;
use crate::config::TopologyOptions;

#[test]
fn test_build_default_options() -> Result<()> {
    let options = TopologyOptions::build(&["foo"])?;

    assert_eq!(2000, options.heartbeat_interval);
    assert_eq!(10_000, options.heartbeat_timeout);
    assert_eq!(10_000, options.election_timeout);
    assert_eq!(30, options.max_sync_source_lag_secs);
    assert_eq!(Duration::from_secs(2), options.heartbeat_interval());
    assert_eq!(Duration::from_secs(10), options.election_timeout());

    Ok(())
}

#[test]
fn test_build_explicit_options() -> Result<()> {
    let options = TopologyOptions::build(&[
        "foo",
        "--heartbeat-interval=500",
        "--election-timeout=4000",
        "--max-sync-source-lag-secs=10",
    ])?;

    assert_eq!(500, options.heartbeat_interval);
    assert_eq!(4000, options.election_timeout);
    assert_eq!(10, options.max_sync_source_lag_secs);

    Ok(())
}

#[test]
fn test_validation_rejects_degenerate_timing() {
    let res = TopologyOptions::build(&["foo", "--heartbeat-interval=0"]);
    assert_eq!(Err(OptionsError::HeartbeatIntervalIs0), res);

    let res = TopologyOptions::build(&["foo", "--heartbeat-interval=5000", "--election-timeout=5000"]);
    assert_eq!(
        Err(OptionsError::ElectionTimeoutLTHeartbeat {
            election_timeout: 5000,
            heartbeat_interval: 5000,
        }),
        res
    );

    let res = TopologyOptions::build(&["foo", "--heartbeat-timeout=1000"]);
    assert_eq!(
        Err(OptionsError::HeartbeatTimeoutLTInterval {
            heartbeat_timeout: 1000,
            heartbeat_interval: 2000,
        }),
        res
    );
}
