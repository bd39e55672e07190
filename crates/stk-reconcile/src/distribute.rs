use stk_schemas::QuantityMap;

/// Rejected distributor input. Well-formed input never errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DistributeError {
    NegativeTarget { target: i64 },
    NegativeQuantity { option_id: String, quantity: i64 },
}

impl std::fmt::Display for DistributeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeTarget { target } => {
                write!(f, "cannot distribute a negative total ({target})")
            }
            Self::NegativeQuantity {
                option_id,
                quantity,
            } => write!(
                f,
                "option '{option_id}' has negative current quantity {quantity}"
            ),
        }
    }
}

impl std::error::Error for DistributeError {}

/// Split `target` across the options of `current`, preserving each option's
/// share of the current total as closely as integer rounding allows.
///
/// - Empty input → empty output.
/// - Current total 0 → even split; the first `target % n` options (map
///   order) get one extra unit.
/// - Otherwise `floor(target * q / total)` per option, then the remainder
///   (always `< n`) goes one unit each to the options with the largest
///   current quantity, ties broken by map order.
///
/// Post-condition: output has the same keys in the same order, every value
/// is `>= 0`, and the values sum to `target` exactly.
pub fn distribute(target: i64, current: &QuantityMap) -> Result<QuantityMap, DistributeError> {
    if target < 0 {
        return Err(DistributeError::NegativeTarget { target });
    }
    if let Some((option_id, quantity)) = current.iter().find(|(_, q)| *q < 0) {
        return Err(DistributeError::NegativeQuantity {
            option_id: option_id.to_string(),
            quantity,
        });
    }

    let n = current.len();
    if n == 0 {
        return Ok(QuantityMap::new());
    }

    let target_wide = i128::from(target);
    let current_total = current.total();
    let weights: Vec<i128> = current.iter().map(|(_, q)| i128::from(q)).collect();

    let shares: Vec<i128> = if current_total == 0 {
        even_split(target_wide, n)
    } else {
        proportional_split(target_wide, &weights, current_total)
    };

    // Every share is <= target, so narrowing back to i64 is lossless.
    Ok(current
        .option_ids()
        .zip(shares)
        .map(|(id, share)| (id, share as i64))
        .collect())
}

fn even_split(target: i128, n: usize) -> Vec<i128> {
    let n_wide = n as i128;
    let base = target / n_wide;
    let extra = (target % n_wide) as usize;
    (0..n)
        .map(|idx| if idx < extra { base + 1 } else { base })
        .collect()
}

fn proportional_split(target: i128, weights: &[i128], total: i128) -> Vec<i128> {
    let mut shares: Vec<i128> = weights.iter().map(|w| target * w / total).collect();
    let distributed: i128 = shares.iter().sum();
    let remainder = (target - distributed) as usize;

    // Stable sort: equal weights keep map order.
    let mut by_weight: Vec<usize> = (0..weights.len()).collect();
    by_weight.sort_by(|&a, &b| weights[b].cmp(&weights[a]));

    for &idx in by_weight.iter().take(remainder) {
        shares[idx] += 1;
    }
    shares
}
