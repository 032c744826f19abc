//! End-to-end tests for the dicesim pipeline.
//!
//! These exercise the full path — script text → parser → compiled trees →
//! evaluator → distributions — and pin the statistical and deterministic
//! properties the language guarantees.

use dicesim_dsl::{parse_expression, ParseError, SimParams};
use dicesim_runtime::{run_simulation, Distribution, RunConfig, Stats};
use dicesim_tests::{
    eval_expr, eval_fixed, nominal_params, sample, sample_stats, sample_with_crit, TestHarness,
};

const SAMPLES: u64 = 20_000;

/// Sampling `NdY` only ever produces values in `[N, N*Y]`, and repeated
/// single dice have mean `N * (Y + 1) / 2`.
#[test]
fn dice_bounds_and_means() {
    let stats = sample_stats("3d6", nominal_params(), SAMPLES, 11);
    assert!(stats.min >= 3.0);
    assert!(stats.max <= 18.0);
    assert!((stats.mean - 10.5).abs() < 0.2, "mean {}", stats.mean);

    let stats = sample_stats("1d8+1d8+1d8", nominal_params(), SAMPLES, 12);
    assert!(stats.min >= 3.0);
    assert!(stats.max <= 24.0);
    assert!((stats.mean - 13.5).abs() < 0.2, "mean {}", stats.mean);
}

/// `kh1`/`kl1` on a single die changes nothing: same RNG stream, same
/// distribution.
#[test]
fn keep_suffix_on_single_die_is_a_noop() {
    let plain = sample("1d6", nominal_params(), 5_000, 77);
    assert_eq!(sample("1d6kh1", nominal_params(), 5_000, 77), plain);
    assert_eq!(sample("1d6kl1", nominal_params(), 5_000, 77), plain);
}

/// Advantage beats disadvantage: `2d20kh1` stochastically dominates
/// `2d20kl1`.
#[test]
fn keep_highest_dominates_keep_lowest() {
    let high = sample_stats("2d20kh1", nominal_params(), SAMPLES, 21);
    let low = sample_stats("2d20kl1", nominal_params(), SAMPLES, 22);
    assert!(high.mean > low.mean + 5.0);
    assert!((high.mean - 13.825).abs() < 0.2, "kh mean {}", high.mean);
    assert!((low.mean - 7.175).abs() < 0.2, "kl mean {}", low.mean);
}

/// With the crit flag held, `1D6` rolls exactly twice the dice: it matches
/// the `2d6` distribution, not a doubled `1d6` value.
#[test]
fn crit_doubling_matches_two_dice() {
    let crit = Stats::from_distribution(&sample_with_crit(
        "1D6",
        nominal_params(),
        SAMPLES,
        31,
        true,
    ))
    .unwrap();
    let two = sample_stats("2d6", nominal_params(), SAMPLES, 32);
    assert!(crit.min >= 2.0 && crit.max <= 12.0);
    // Doubling the value of one die would only ever produce even sums.
    let dist = sample_with_crit("1D6", nominal_params(), 1_000, 33, true);
    assert!(dist.entries().any(|(v, _)| v % 2 == 1));
    assert!((crit.mean - two.mean).abs() < 0.15);

    // Without the flag, uppercase D is an ordinary roll.
    let plain = Stats::from_distribution(&sample_with_crit(
        "1D6",
        nominal_params(),
        SAMPLES,
        34,
        false,
    ))
    .unwrap();
    assert!((plain.mean - 3.5).abs() < 0.1);
}

#[test]
fn repeat_semantics() {
    assert_eq!(eval_fixed("2#3", &[1], nominal_params()), 6.0);
    // Each repetition re-evaluates the operand, observable via assignment.
    assert_eq!(eval_fixed("5#($a=$a+1);$a", &[1], nominal_params()), 5.0);

    let err = eval_expr(
        "(-1)#3",
        nominal_params(),
        Box::new(dicesim_dsl::Mulberry32::new(1)),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot repeat a negative (-1) number of times: (-1)#3"
    );
}

#[test]
fn check_short_circuits_assignments() {
    assert_eq!(eval_fixed("(0=>($a=9))+$a", &[1], nominal_params()), 0.0);
    assert_eq!(eval_fixed("(1=>($a=9))+$a", &[1], nominal_params()), 18.0);
}

/// `:=` stores, yields zero; function stores re-roll on each reference.
#[test]
fn assignment_and_function_semantics() {
    assert_eq!(eval_fixed("$a:=123", &[1], nominal_params()), 0.0);
    assert_eq!(eval_fixed("$a:=123;$a", &[1], nominal_params()), 123.0);

    // Two references, two independent rolls.
    assert_eq!(eval_fixed("(@f:=1d6);@f+@f", &[20, 1], nominal_params()), 7.0);

    // A cached function result could only produce even sums.
    let dist = sample("(@f:=1d6);@f+@f", nominal_params(), 2_000, 41);
    assert!(dist.entries().any(|(v, _)| v % 2 == 1));
}

#[test]
fn paren_stripping_is_idempotent_end_to_end() {
    let plain = parse_expression("3+PB=atk>1D12+3").unwrap();
    assert_eq!(parse_expression("(3+PB=atk>1D12+3)").unwrap(), plain);
    assert_eq!(parse_expression("((3+PB=atk>1D12+3))").unwrap(), plain);
    assert!(matches!(
        parse_expression("((3+PB=atk>1D12+3)"),
        Err(ParseError::UnbalancedParens { .. })
    ));
}

/// The spec's worked example: at AC 10 / PB 2, a fixed d20 of 15 hits and
/// returns the damage roll; a natural 20 doubles the d12.
#[test]
fn fixed_rng_attack_example() {
    // d20 = 15 -> 3 + 2 + 15 = 20 >= 10: hit. The d12 face maxes out at 12,
    // plus the flat 3.
    assert_eq!(
        eval_fixed("3+PB=atk>1D12+3", &[15, 20], nominal_params()),
        15.0
    );
    // Natural 20: crit, two d12s (faces 15 -> 9 and 20 -> 12), plus 3.
    assert_eq!(
        eval_fixed("3+PB=atk>1D12+3", &[20, 15, 20], nominal_params()),
        24.0
    );
    // d20 = 4 -> 9 < 10: miss.
    assert_eq!(eval_fixed("3+PB=atk>1D12+3", &[4], nominal_params()), 0.0);
}

/// A definition spanning several physical lines inside unbalanced parens is
/// one error covering those lines; definitions after it still parse and
/// still run.
#[test]
fn script_recovery_keeps_later_definitions_runnable() {
    let harness = TestHarness::from_source_lenient(concat!(
        "broken@1: (\n",
        "  3+PB =atk> 1D12+3\n",
        "  + 1d6\n",
        "\n",
        "ok@1-2: 2d6+3\n",
    ));
    assert_eq!(harness.script.errors.len(), 1);
    let err = &harness.script.errors[0];
    assert_eq!(err.line_start, 0);
    assert_eq!(err.line_count, Some(4));
    assert!(err.message.contains("Unbalanced parentheses"));

    assert_eq!(harness.script.names(), vec!["ok"]);
    let sim = harness.sim("ok", 2);
    let config = RunConfig {
        iterations: 2_000,
        seed: 5,
        ..RunConfig::default()
    };
    let dist = run_simulation(sim, SimParams::for_level(2, 15, 0), &config).unwrap();
    assert_eq!(dist.total_count(), 2_000);
    assert!(dist.min().unwrap() >= 5);
    assert!(dist.max().unwrap() <= 15);
}

/// Partial distributions merge associatively and commutatively.
#[test]
fn distribution_merge_orderings_agree() {
    let a = sample("1d20", nominal_params(), 3_000, 1);
    let b = sample("1d20", nominal_params(), 3_000, 2);
    let c = sample("1d20", nominal_params(), 3_000, 3);

    let left = Distribution::merged([&Distribution::merged([&a, &b]), &c]);
    let right = Distribution::merged([&a, &Distribution::merged([&b, &c])]);
    let shuffled = Distribution::merged([&c, &a, &b]);
    assert_eq!(left, right);
    assert_eq!(left, shuffled);
    assert_eq!(left.total_count(), 9_000);
}

/// Full pipeline: script to distributions over a level/AC grid, with a
/// reproducible seed, and monotone damage against rising AC.
#[test]
fn script_to_distribution_grid() {
    let harness = TestHarness::from_source(concat!(
        "GreatAxe@1-2: 3+PB =atk> 1D12+3\n",
        "GreatSword@1: 3+PB =atk> 2D6rrle2 + 3\n",
    ));
    assert_eq!(harness.script.names(), vec!["GreatAxe", "GreatSword"]);

    let sim = harness.sim("GreatAxe", 1);
    let config = RunConfig {
        iterations: 20_000,
        seed: 99,
        ..RunConfig::default()
    };
    let easy = run_simulation(sim, SimParams::for_level(1, 10, 0), &config).unwrap();
    let hard = run_simulation(sim, SimParams::for_level(1, 18, 0), &config).unwrap();
    let easy_mean = Stats::from_distribution(&easy).unwrap().mean;
    let hard_mean = Stats::from_distribution(&hard).unwrap().mean;
    assert!(easy_mean > hard_mean);

    // Same seed, same distribution.
    let again = run_simulation(sim, SimParams::for_level(1, 10, 0), &config).unwrap();
    assert_eq!(easy, again);
}

/// Attack misses always yield zero, so the distribution has mass at 0 and
/// none between 0 and the minimum hit damage.
#[test]
fn attack_distribution_shape() {
    let dist = sample(
        "3+PB=atk>1d8+3",
        SimParams::new(15, 2, 1, 0),
        SAMPLES,
        55,
    );
    assert!(dist.count(0) > 0);
    for v in 1..4 {
        assert_eq!(dist.count(v), 0);
    }
    assert!(dist.max().unwrap() <= 11);
}
