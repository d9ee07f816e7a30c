use ach_maint::{run_simulator, SimulatorConfig};
use tokio_test::assert_ok;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simulator_finds_one_winner_per_race() {
    let config = SimulatorConfig {
        rounds: 20,
        reviewers: 6,
        stop_on_first_violation: true,
    };
    let report = assert_ok!(run_simulator(config).await);

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.stats.races, 20);
    assert_eq!(report.stats.verified + report.stats.rejected, 20);
    assert_eq!(
        report.stats.conflicts + report.stats.invalid_transitions,
        20 * 5
    );
}

#[tokio::test]
async fn test_single_reviewer_is_raised_to_a_pair() {
    let config = SimulatorConfig {
        rounds: 3,
        reviewers: 1,
        stop_on_first_violation: false,
    };
    let report = assert_ok!(run_simulator(config).await);
    assert!(report.passed());
    assert_eq!(report.stats.conflicts + report.stats.invalid_transitions, 3);
}

#[tokio::test]
async fn test_report_text_and_json() {
    let report = assert_ok!(
        run_simulator(SimulatorConfig {
            rounds: 2,
            ..SimulatorConfig::default()
        })
        .await
    );
    let text = report.generate_text();
    assert!(text.contains("Races run: 2"));
    assert!(text.contains("Result: PASS"));

    let json = assert_ok!(serde_json::to_value(&report));
    assert_eq!(json["stats"]["races"], 2);
    assert!(json["violations"].as_array().is_some_and(Vec::is_empty));
}
