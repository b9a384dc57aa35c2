//! Soft-max value and Boltzmann policy operators over an action subset
//!
//! All functions take the full per-action array plus the indices of the
//! actions that are available in one state. An empty action set means the
//! model is malformed for the call site, and the functions panic.

/// Highest action value among `actions`; first action wins ties.
///
/// # Panics
///
/// Panics if `actions` is empty.
#[must_use]
pub fn best_action(q: &[f64], actions: &[usize]) -> usize {
    assert!(!actions.is_empty(), "best action over an empty action set");
    let mut best = actions[0];
    for &a in &actions[1..] {
        if q[best] < q[a] {
            best = a;
        }
    }
    best
}

/// Soft-max state value `alpha * log(sum(exp(q / alpha)))`, or the plain max
/// when `alpha == 0`. The max is subtracted before exponentiating.
///
/// # Panics
///
/// Panics if `actions` is empty.
#[must_use]
pub fn soft_max(q: &[f64], actions: &[usize], alpha: f64) -> f64 {
    assert!(!actions.is_empty(), "soft-max over an empty action set");
    let max_q = q[best_action(q, actions)];
    if alpha == 0.0 {
        return max_q;
    }
    let sum: f64 = actions
        .iter()
        .map(|&a| ((q[a] - max_q) / alpha).exp())
        .sum();
    alpha * sum.ln() + max_q
}

/// Write the Boltzmann distribution of `actions` into `policy`.
///
/// With `alpha == 0` the distribution is one-hot on [`best_action`].
///
/// # Panics
///
/// Panics if `actions` is empty.
pub fn boltzmann(q: &[f64], actions: &[usize], alpha: f64, policy: &mut [f64]) {
    let best = best_action(q, actions);
    if alpha == 0.0 {
        for &a in actions {
            policy[a] = 0.0;
        }
        policy[best] = 1.0;
        return;
    }

    let max_q = q[best];
    let mut z = 0.0;
    for &a in actions {
        policy[a] = ((q[a] - max_q) / alpha).exp();
        z += policy[a];
    }
    for &a in actions {
        policy[a] /= z;
    }
}

/// Inverse-CDF draw from `policy` restricted to `actions`, given `u` in `[0, 1)`.
///
/// Rounding slack falls through to the last action.
///
/// # Panics
///
/// Panics if `actions` is empty.
#[must_use]
pub fn sample_action(policy: &[f64], actions: &[usize], u: f64) -> usize {
    assert!(!actions.is_empty(), "sampling from an empty action set");
    let (rest, last) = (&actions[..actions.len() - 1], actions[actions.len() - 1]);
    let mut cumulative = 0.0;
    for &a in rest {
        cumulative += policy[a];
        if u < cumulative {
            return a;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_best_action_first_wins_ties() {
        let q = [1.0, 3.0, 3.0, -2.0];
        assert_eq!(best_action(&q, &[0, 1, 2, 3]), 1);
        assert_eq!(best_action(&q, &[3, 0]), 0);
    }

    #[test]
    fn test_soft_max_zero_temperature_is_max() {
        let q = [-1.0, 0.0, -4.0];
        assert_eq!(soft_max(&q, &[0, 1, 2], 0.0), 0.0);
    }

    #[test]
    fn test_soft_max_is_log_sum_exp() {
        let q = [1.0, 2.0];
        let expected = (1f64.exp() + 2f64.exp()).ln();
        assert_relative_eq!(soft_max(&q, &[0, 1], 1.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_soft_max_is_stable_for_large_values() {
        let q = [1000.0, 1000.0];
        let v = soft_max(&q, &[0, 1], 0.5);
        assert_relative_eq!(v, 1000.0 + 0.5 * 2f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_boltzmann_sums_to_one() {
        let q = [0.0, -1.0, -2.0, 5.0];
        let mut policy = [0.0; 4];
        boltzmann(&q, &[0, 1, 2], 0.5, &mut policy);
        assert_relative_eq!(policy[0] + policy[1] + policy[2], 1.0, epsilon = 1e-12);
        assert!(policy[0] > policy[1] && policy[1] > policy[2]);
        assert_eq!(policy[3], 0.0);
    }

    #[test]
    fn test_boltzmann_one_hot() {
        let q = [2.0, 2.0, 1.0];
        let mut policy = [0.3; 3];
        boltzmann(&q, &[0, 1, 2], 0.0, &mut policy);
        assert_eq!(policy, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sample_action_inverse_cdf() {
        let policy = [0.25, 0.5, 0.25];
        let actions = [0, 1, 2];
        assert_eq!(sample_action(&policy, &actions, 0.1), 0);
        assert_eq!(sample_action(&policy, &actions, 0.5), 1);
        assert_eq!(sample_action(&policy, &actions, 0.9), 2);
        assert_eq!(sample_action(&policy, &[2], 0.99), 2);
    }

    #[test]
    #[should_panic(expected = "empty action set")]
    fn test_empty_action_set_panics() {
        let _ = soft_max(&[], &[], 0.0);
    }
}
